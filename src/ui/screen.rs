//! Text model of the screen.
//!
//! [`TextScreen`] remembers every string drawn and where, and drops strings
//! whose anchor falls inside a cleared region. It backs the console display
//! and lets tests assert on what the user would see.

use super::{Display, CHAR_WIDTH, LINE_HEIGHT};

/// Cardputer display width in landscape orientation.
pub const CARDPUTER_WIDTH: i32 = 240;

/// Cardputer display height in landscape orientation.
pub const CARDPUTER_HEIGHT: i32 = 135;

#[derive(Debug, Clone, PartialEq, Eq)]
struct TextItem {
    x: i32,
    y: i32,
    text: String,
}

/// Display that records text instead of pixels.
#[derive(Debug, Clone)]
pub struct TextScreen {
    width: i32,
    height: i32,
    items: Vec<TextItem>,
    clears: usize,
}

impl TextScreen {
    /// Screen of the given pixel size.
    pub fn new(width: i32, height: i32) -> Self {
        Self {
            width,
            height,
            items: Vec::new(),
            clears: 0,
        }
    }

    /// Screen sized like the Cardputer display.
    pub fn cardputer() -> Self {
        Self::new(CARDPUTER_WIDTH, CARDPUTER_HEIGHT)
    }

    /// Rows of text, top to bottom. Items sharing a text row are merged
    /// left to right at their character column.
    pub fn rows(&self) -> Vec<String> {
        let mut items: Vec<&TextItem> = self.items.iter().collect();
        items.sort_by_key(|item| (item.y, item.x));

        let mut rows: Vec<(i32, String)> = Vec::new();
        for item in items {
            let band = item.y / LINE_HEIGHT;
            if rows.last().map(|(b, _)| *b) != Some(band) {
                rows.push((band, String::new()));
            }
            if let Some((_, row)) = rows.last_mut() {
                let column = (item.x.max(0) / CHAR_WIDTH) as usize;
                let used = row.chars().count();
                if column > used {
                    row.push_str(&" ".repeat(column - used));
                }
                row.push_str(&item.text);
            }
        }
        rows.into_iter().map(|(_, row)| row).collect()
    }

    /// Everything on screen, one row per line.
    pub fn render(&self) -> String {
        self.rows().join("\n")
    }

    /// True if any row contains `needle`.
    pub fn contains(&self, needle: &str) -> bool {
        self.rows().iter().any(|row| row.contains(needle))
    }

    /// Text drawn exactly at (`x`, `y`), if any.
    pub fn text_at(&self, x: i32, y: i32) -> Option<&str> {
        self.items
            .iter()
            .find(|item| item.x == x && item.y == y)
            .map(|item| item.text.as_str())
    }

    /// True if nothing is drawn.
    pub fn is_blank(&self) -> bool {
        self.items.is_empty()
    }

    /// Number of [`Display::clear_all`] calls so far.
    pub fn clear_count(&self) -> usize {
        self.clears
    }
}

impl Display for TextScreen {
    fn draw_text(&mut self, text: &str, x: i32, y: i32) {
        // Drawing at the same anchor overwrites
        self.items.retain(|item| !(item.x == x && item.y == y));
        self.items.push(TextItem {
            x,
            y,
            text: text.to_string(),
        });
    }

    fn clear_region(&mut self, x: i32, y: i32, width: i32, height: i32) {
        self.items.retain(|item| {
            !(item.x >= x && item.x < x + width && item.y >= y && item.y < y + height)
        });
    }

    fn clear_all(&mut self) {
        self.items.clear();
        self.clears += 1;
    }

    fn width(&self) -> i32 {
        self.width
    }

    fn height(&self) -> i32 {
        self.height
    }
}
