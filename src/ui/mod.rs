//! Display and keyboard collaborators.
//!
//! The provisioning flow draws text and reads key events only through
//! [`Display`] and [`Input`]. Pixel rendering and keyboard matrix scanning
//! belong to whatever implements them.
//!
//! # Components
//!
//! - [`screen`] - [`screen::TextScreen`], a text model of what is on screen
//! - [`select`] - network list and selection cursor
//! - [`text_entry`] - passphrase entry line
//! - [`console`] - stdio-backed display and input (host and UART)

pub mod console;
pub mod screen;
pub mod select;
pub mod text_entry;

use crate::clock::Clock;
use std::time::Duration;

/// Cardputer key that moves the selection up (arrow legend on `;`).
pub const KEY_UP: char = ';';

/// Cardputer key that moves the selection down (arrow legend on `.`).
pub const KEY_DOWN: char = '.';

/// Approximate glyph width of the default font, in pixels.
pub const CHAR_WIDTH: i32 = 6;

/// Vertical pitch of list rows and status lines, in pixels.
pub const LINE_HEIGHT: i32 = 18;

/// Text output. Coordinates are pixels from the top-left corner.
pub trait Display {
    /// Draw `text` with its top-left corner at (`x`, `y`).
    fn draw_text(&mut self, text: &str, x: i32, y: i32);

    /// Blank a rectangle.
    fn clear_region(&mut self, x: i32, y: i32, width: i32, height: i32);

    /// Blank the whole screen.
    fn clear_all(&mut self);

    /// Screen width in pixels.
    fn width(&self) -> i32;

    /// Screen height in pixels.
    fn height(&self) -> i32;

    /// Push pending drawing to the output. No-op for displays that draw
    /// immediately.
    fn present(&mut self) {}
}

/// Keys reported by one keyboard event.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct KeysState {
    /// Printable characters pressed.
    pub word: Vec<char>,
    /// Delete (backspace) pressed.
    pub del: bool,
    /// Enter pressed.
    pub enter: bool,
}

impl KeysState {
    /// A single printable key.
    pub fn char(c: char) -> Self {
        Self {
            word: vec![c],
            ..Default::default()
        }
    }

    /// The enter key.
    pub fn enter() -> Self {
        Self {
            enter: true,
            ..Default::default()
        }
    }

    /// The delete key.
    pub fn delete() -> Self {
        Self {
            del: true,
            ..Default::default()
        }
    }

    /// True if `key` is among the pressed characters.
    pub fn has(&self, key: char) -> bool {
        self.word.contains(&key)
    }
}

/// One scripted or console-typed input event.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum InputStep {
    /// A key press.
    Keys(KeysState),
    /// An update with no key held.
    Idle,
    /// The reset button.
    Reset,
}

/// Keyboard plus the dedicated reset button.
///
/// Implementations sample the keyboard in [`Input::update`]; the key queries
/// report the state captured by the last update. The reset button is sampled
/// on its own by [`Input::reset_pressed`], so waiting for it never swallows
/// key presses.
pub trait Input {
    /// Sample the keyboard.
    fn update(&mut self);

    /// The key state changed since the previous update.
    fn has_change_event(&self) -> bool;

    /// At least one key is held.
    fn is_key_down(&self) -> bool;

    /// Keys held at the last update.
    fn current_keys(&self) -> KeysState;

    /// Sample the reset button; true while it is held.
    fn reset_pressed(&mut self) -> bool;
}

/// The pieces needed to run a blocking UI interaction.
pub struct Ui<'a> {
    pub display: &'a mut dyn Display,
    pub input: &'a mut dyn Input,
    pub clock: &'a dyn Clock,
    pub poll_interval: Duration,
}

impl Ui<'_> {
    /// Block until a key press event and return its keys.
    pub fn next_key_press(&mut self) -> KeysState {
        loop {
            self.input.update();
            if self.input.has_change_event() && self.input.is_key_down() {
                return self.input.current_keys();
            }
            self.clock.sleep(self.poll_interval);
        }
    }

    /// Block until enter is pressed.
    pub fn wait_for_enter(&mut self) {
        while !self.next_key_press().enter {}
    }
}
