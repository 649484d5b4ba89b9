//! Line-oriented console standing in for the Cardputer screen and keyboard.
//!
//! [`ConsoleDisplay`] keeps a [`TextScreen`] and prints it as a frame
//! whenever the flow presents a change. [`ConsoleInput`] reads lines on a
//! background thread and replays them as key events:
//!
//! | Typed | Event |
//! |---|---|
//! | any character | that key |
//! | `<up>` / `<down>` | navigation keys `;` / `.` |
//! | `<del>` | delete |
//! | `<enter>` or end of line | enter |
//! | `!reset` (whole line) | reset button |
//!
//! The same pair works over the ESP32 UART console and on a host terminal.

use super::screen::TextScreen;
use super::{Display, Input, InputStep, KeysState, KEY_DOWN, KEY_UP};
use log::{debug, info, warn};
use std::collections::VecDeque;
use std::io::{BufRead, Write};
use std::sync::mpsc::{self, Receiver, TryRecvError};

/// Line that presses the reset button.
pub const RESET_COMMAND: &str = "!reset";

/// Turn one typed line into input events. The line always ends with enter,
/// except for [`RESET_COMMAND`].
pub fn parse_console_line(line: &str) -> Vec<InputStep> {
    let line = line.trim_end_matches(['\r', '\n']);
    if line.trim() == RESET_COMMAND {
        return vec![InputStep::Reset];
    }

    let mut steps = Vec::new();
    let mut rest = line;
    while let Some(c) = rest.chars().next() {
        let tag = [
            ("<up>", KeysState::char(KEY_UP)),
            ("<down>", KeysState::char(KEY_DOWN)),
            ("<del>", KeysState::delete()),
            ("<enter>", KeysState::enter()),
        ]
        .into_iter()
        .find(|(name, _)| rest.starts_with(name));

        match tag {
            Some((name, keys)) => {
                steps.push(InputStep::Keys(keys));
                rest = &rest[name.len()..];
            }
            None => {
                steps.push(InputStep::Keys(KeysState::char(c)));
                rest = &rest[c.len_utf8()..];
            }
        }
    }
    steps.push(InputStep::Keys(KeysState::enter()));
    steps
}

/// [`Display`] that prints a text frame to stdout on [`Display::present`].
pub struct ConsoleDisplay {
    screen: TextScreen,
    dirty: bool,
}

impl ConsoleDisplay {
    /// Console sized like the Cardputer screen.
    pub fn new() -> Self {
        Self {
            screen: TextScreen::cardputer(),
            dirty: false,
        }
    }

    /// Current screen contents.
    pub fn screen(&self) -> &TextScreen {
        &self.screen
    }

    fn frame(&self) -> String {
        let rule = "-".repeat((self.screen.width() / super::CHAR_WIDTH) as usize);
        format!("+{}\n{}\n+{}\n", rule, self.screen.render(), rule)
    }
}

impl Default for ConsoleDisplay {
    fn default() -> Self {
        Self::new()
    }
}

impl Display for ConsoleDisplay {
    fn draw_text(&mut self, text: &str, x: i32, y: i32) {
        self.screen.draw_text(text, x, y);
        self.dirty = true;
    }

    fn clear_region(&mut self, x: i32, y: i32, width: i32, height: i32) {
        self.screen.clear_region(x, y, width, height);
        self.dirty = true;
    }

    fn clear_all(&mut self) {
        self.screen.clear_all();
        self.dirty = true;
    }

    fn width(&self) -> i32 {
        self.screen.width()
    }

    fn height(&self) -> i32 {
        self.screen.height()
    }

    fn present(&mut self) {
        if !self.dirty {
            return;
        }
        self.dirty = false;

        let mut stdout = std::io::stdout().lock();
        if let Err(e) = stdout
            .write_all(self.frame().as_bytes())
            .and_then(|()| stdout.flush())
        {
            warn!("Console write failed: {}", e);
        }
    }
}

/// [`Input`] fed by lines from a reader thread.
pub struct ConsoleInput {
    rx: Receiver<InputStep>,
    pending: VecDeque<InputStep>,
    closed: bool,
    exit_on_close: bool,
    changed: bool,
    keys: KeysState,
}

impl ConsoleInput {
    /// Read from stdin until it is closed.
    pub fn stdin() -> Self {
        Self::from_reader(std::io::BufReader::new(std::io::stdin()))
    }

    /// Read from the UART console. ESP-IDF reports end of input whenever
    /// the receive buffer is empty, so reading never stops.
    pub fn uart() -> Self {
        Self::spawn(std::io::BufReader::new(std::io::stdin()), true)
    }

    /// Exit the process once input is closed and every event was consumed.
    pub fn exit_on_close(mut self) -> Self {
        self.exit_on_close = true;
        self
    }

    /// Read lines from `reader` on a background thread.
    pub fn from_reader<R>(reader: R) -> Self
    where
        R: BufRead + Send + 'static,
    {
        Self::spawn(reader, false)
    }

    fn spawn<R>(mut reader: R, retry_on_eof: bool) -> Self
    where
        R: BufRead + Send + 'static,
    {
        let (tx, rx) = mpsc::channel();
        std::thread::spawn(move || {
            let mut line = String::new();
            loop {
                match reader.read_line(&mut line) {
                    Ok(0) if retry_on_eof => {
                        std::thread::sleep(std::time::Duration::from_millis(20));
                        continue;
                    }
                    Ok(0) if line.is_empty() => break,
                    Ok(_) if retry_on_eof && !line.ends_with('\n') => continue,
                    Ok(_) => {}
                    Err(e) => {
                        warn!("Console read failed: {}", e);
                        break;
                    }
                }
                for step in parse_console_line(&line) {
                    if tx.send(step).is_err() {
                        return;
                    }
                }
                line.clear();
            }
            debug!("Console reader finished");
        });

        Self {
            rx,
            pending: VecDeque::new(),
            closed: false,
            exit_on_close: false,
            changed: false,
            keys: KeysState::default(),
        }
    }

    /// True once the reader has finished and every event was consumed.
    pub fn is_exhausted(&self) -> bool {
        self.closed && self.pending.is_empty()
    }

    fn drain(&mut self) {
        loop {
            match self.rx.try_recv() {
                Ok(step) => self.pending.push_back(step),
                Err(TryRecvError::Empty) => break,
                Err(TryRecvError::Disconnected) => {
                    self.closed = true;
                    break;
                }
            }
        }
    }
}

impl Input for ConsoleInput {
    fn update(&mut self) {
        self.drain();
        match self.pending.pop_front() {
            Some(InputStep::Keys(keys)) => {
                self.changed = true;
                self.keys = keys;
            }
            Some(InputStep::Reset) | Some(InputStep::Idle) | None => {
                self.changed = self.keys != KeysState::default();
                self.keys = KeysState::default();
            }
        }

        if self.exit_on_close && self.is_exhausted() {
            info!("Console input closed, exiting");
            std::process::exit(0);
        }
    }

    fn has_change_event(&self) -> bool {
        self.changed
    }

    fn is_key_down(&self) -> bool {
        self.keys != KeysState::default()
    }

    fn current_keys(&self) -> KeysState {
        self.keys.clone()
    }

    fn reset_pressed(&mut self) -> bool {
        self.drain();
        match self.pending.iter().position(|s| *s == InputStep::Reset) {
            Some(at) => {
                self.pending.remove(at);
                true
            }
            None => false,
        }
    }
}
