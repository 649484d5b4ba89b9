//! Network selection list.
//!
//! Rows start below the title and stop above the footer; longer lists scroll
//! so the cursor row is always visible.

use super::{Display, Ui, KEY_DOWN, KEY_UP, LINE_HEIGHT};
use crate::network::NetworkRecord;
use log::debug;
use std::ops::Range;

/// Y coordinate of the first list row.
pub const LIST_TOP: i32 = 18;

/// Y coordinate of the footer hint.
pub const FOOTER_Y: i32 = 108;

/// Rows that fit between [`LIST_TOP`] and [`FOOTER_Y`].
pub const VISIBLE_ROWS: usize = ((FOOTER_Y - LIST_TOP) / LINE_HEIGHT) as usize;

/// Footer hint text.
pub const FOOTER_HINT: &str = "Select, ENTER: OK";

/// Selection index clamped to `[0, len - 1]`, plus a scroll window.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SelectionCursor {
    index: usize,
    len: usize,
    first_visible: usize,
}

impl SelectionCursor {
    /// Cursor on the first of `len` entries.
    pub fn new(len: usize) -> Self {
        Self {
            index: 0,
            len,
            first_visible: 0,
        }
    }

    /// Currently selected index.
    pub fn index(&self) -> usize {
        self.index
    }

    /// Move up one entry; stays at 0.
    pub fn up(&mut self) {
        self.index = self.index.saturating_sub(1);
        if self.index < self.first_visible {
            self.first_visible = self.index;
        }
    }

    /// Move down one entry; stays at the last entry.
    pub fn down(&mut self) {
        if self.index + 1 < self.len {
            self.index += 1;
        }
        if self.index >= self.first_visible + VISIBLE_ROWS {
            self.first_visible = self.index + 1 - VISIBLE_ROWS;
        }
    }

    /// Indices currently on screen.
    pub fn window(&self) -> Range<usize> {
        self.first_visible..(self.first_visible + VISIBLE_ROWS).min(self.len)
    }
}

/// Text for one list row.
pub fn row_label(record: &NetworkRecord, selected: bool) -> String {
    format!(
        "{}{} ({}dBm){}",
        if selected { "-> " } else { "   " },
        record.ssid,
        record.signal_dbm,
        if record.security.is_secured() { " *" } else { "" }
    )
}

/// Draw the visible rows and the footer.
pub fn render_list(display: &mut dyn Display, records: &[NetworkRecord], cursor: &SelectionCursor) {
    let width = display.width();
    for (row, index) in (0..VISIBLE_ROWS).zip(cursor.window().chain(std::iter::repeat(usize::MAX))) {
        let y = LIST_TOP + row as i32 * LINE_HEIGHT;
        display.clear_region(0, y, width, LINE_HEIGHT);
        if let Some(record) = records.get(index) {
            display.draw_text(&row_label(record, index == cursor.index()), 1, y);
        }
    }
    display.draw_text(FOOTER_HINT, 1, FOOTER_Y);
    display.present();
}

/// Let the user pick one of `records`.
///
/// Blocks until enter is pressed; [`KEY_UP`] and [`KEY_DOWN`] move the
/// cursor, anything else is ignored. Returns `None` only for an empty list.
pub fn select_network<'r>(ui: &mut Ui<'_>, records: &'r [NetworkRecord]) -> Option<&'r NetworkRecord> {
    if records.is_empty() {
        return None;
    }

    let mut cursor = SelectionCursor::new(records.len());
    render_list(ui.display, records, &cursor);

    loop {
        let keys = ui.next_key_press();
        let before = cursor;
        if keys.has(KEY_UP) {
            cursor.up();
        }
        if keys.has(KEY_DOWN) {
            cursor.down();
        }
        if keys.enter {
            let chosen = &records[cursor.index()];
            debug!("Selected '{}'", chosen.ssid);
            return Some(chosen);
        }
        if cursor != before {
            render_list(ui.display, records, &cursor);
        }
    }
}


#[cfg(feature = "tap-tests")]
mod tap_tests {
    use super::*;
    use cardputer_wifi_setup_macros::tap_test;

    #[tap_test]
    fn cursor_never_leaves_list() {
        let mut cursor = SelectionCursor::new(2);
        cursor.up();
        assert_eq!(cursor.index(), 0);
        cursor.down();
        cursor.down();
        assert_eq!(cursor.index(), 1);
    }
}
