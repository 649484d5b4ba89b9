//! Single-line passphrase entry.

use super::{Display, Ui};
use zeroize::{Zeroize, ZeroizeOnDrop};

/// Fixed prefix of the entry line. Backspace never removes it.
pub const PROMPT_PREFIX: &str = "> ";

/// Y coordinate of the prompt text.
pub const PROMPT_Y: i32 = 38;

/// Height of the strip cleared before each redraw of the entry line.
const ENTRY_STRIP_HEIGHT: i32 = 25;

/// Characters typed so far, wiped on drop.
#[derive(Zeroize, ZeroizeOnDrop)]
pub struct SecretBuffer {
    text: String,
    #[zeroize(skip)]
    mask: bool,
}

impl SecretBuffer {
    /// Empty buffer. With `mask` set, [`SecretBuffer::echo`] hides the text.
    pub fn new(mask: bool) -> Self {
        Self {
            text: String::new(),
            mask,
        }
    }

    /// Append one character.
    pub fn push(&mut self, c: char) {
        self.text.push(c);
    }

    /// Remove the last character. Does nothing when empty.
    pub fn backspace(&mut self) {
        self.text.pop();
    }

    /// Line as shown on screen, prefix included.
    pub fn echo(&self) -> String {
        if self.mask {
            format!("{}{}", PROMPT_PREFIX, "*".repeat(self.text.chars().count()))
        } else {
            format!("{}{}", PROMPT_PREFIX, self.text)
        }
    }

    /// Text typed so far, without the prefix.
    pub fn value(&self) -> &str {
        &self.text
    }

    /// Number of characters typed.
    pub fn len(&self) -> usize {
        self.text.chars().count()
    }

    /// True if nothing has been typed.
    pub fn is_empty(&self) -> bool {
        self.text.is_empty()
    }

    /// Take the typed text, leaving the buffer empty.
    pub fn into_secret(mut self) -> String {
        std::mem::take(&mut self.text)
    }
}

fn draw_entry_line(display: &mut dyn Display, buffer: &SecretBuffer) {
    let y = display.height() - 24;
    let width = display.width();
    display.clear_region(0, y - 4, width, ENTRY_STRIP_HEIGHT);
    display.draw_text(&buffer.echo(), 4, y);
    display.present();
}

/// Show `prompt` and collect a line of text until enter.
///
/// Printable keys append, delete removes the last typed character, and the
/// line is redrawn after every key event. Returns the text without the
/// prefix.
pub fn read_secret_text(ui: &mut Ui<'_>, prompt: &str, mask: bool) -> String {
    ui.display.draw_text(prompt, 1, PROMPT_Y);

    let mut buffer = SecretBuffer::new(mask);
    draw_entry_line(ui.display, &buffer);

    loop {
        let keys = ui.next_key_press();
        for &c in &keys.word {
            buffer.push(c);
        }
        if keys.del {
            buffer.backspace();
        }
        if keys.enter {
            log::debug!("Secret entry finished ({} chars)", buffer.len());
            return buffer.into_secret();
        }
        draw_entry_line(ui.display, &buffer);
    }
}


#[cfg(feature = "tap-tests")]
mod tap_tests {
    use super::*;
    use cardputer_wifi_setup_macros::tap_test;

    #[tap_test]
    fn backspace_stops_at_prefix() {
        let mut buffer = SecretBuffer::new(false);
        buffer.push('x');
        buffer.backspace();
        buffer.backspace();
        assert_eq!(buffer.echo(), PROMPT_PREFIX);
    }
}
