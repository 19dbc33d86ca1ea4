//! Alpha cursor: position, pending attribute, saved slot, and tab stops.
//!
//! Positions are viewport-relative (`x` column, `y` row). The screen buffer
//! owns clipping against its geometry; this module only stores state and
//! performs the tab-stop scans.

use crate::cell::Attr;

/// Tab step applied on reset; stops land every `step - 1` columns.
pub const DEFAULT_TAB_STEP: u16 = 8;

/// Alpha cursor state.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Cursor {
    /// Column, 0-indexed from the left edge.
    pub x: u16,
    /// Row, 0-indexed from the top of the viewport.
    pub y: u16,
    /// Attribute applied to newly written characters.
    pub attr: Attr,
}

impl Cursor {
    #[must_use]
    pub fn at(y: u16, x: u16) -> Self {
        Self {
            x,
            y,
            attr: Attr::PLAIN,
        }
    }
}

/// Saved cursor snapshot (`ESC 7` / `ESC 8`): position plus attribute.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct SavedCursor {
    pub x: u16,
    pub y: u16,
    pub attr: Attr,
}

impl SavedCursor {
    #[must_use]
    pub fn save(cursor: &Cursor) -> Self {
        Self {
            x: cursor.x,
            y: cursor.y,
            attr: cursor.attr,
        }
    }

    pub fn restore(&self, cursor: &mut Cursor) {
        cursor.x = self.x;
        cursor.y = self.y;
        cursor.attr = self.attr;
    }
}

/// One flag per column.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TabStops {
    stops: Vec<bool>,
}

impl TabStops {
    /// Tab stops for `cols` columns at the default step.
    #[must_use]
    pub fn new(cols: u16) -> Self {
        let mut tabs = Self {
            stops: vec![false; usize::from(cols)],
        };
        tabs.set_default(DEFAULT_TAB_STEP);
        tabs
    }

    /// Clear all stops, then set one every `step - 1` columns from column 0.
    pub fn set_default(&mut self, step: u16) {
        self.clear_all();
        let stride = usize::from(step.saturating_sub(1).max(1));
        for col in (0..self.stops.len()).step_by(stride) {
            self.stops[col] = true;
        }
    }

    pub fn clear_all(&mut self) {
        self.stops.fill(false);
    }

    pub fn set(&mut self, col: u16) {
        if let Some(stop) = self.stops.get_mut(usize::from(col)) {
            *stop = true;
        }
    }

    pub fn clear(&mut self, col: u16) {
        if let Some(stop) = self.stops.get_mut(usize::from(col)) {
            *stop = false;
        }
    }

    #[must_use]
    pub fn is_set(&self, col: u16) -> bool {
        self.stops.get(usize::from(col)).copied().unwrap_or(false)
    }

    /// First stop right of `col`, or `col` itself when there is none.
    #[must_use]
    pub fn next_from(&self, col: u16) -> u16 {
        let start = usize::from(col) + 1;
        self.stops
            .iter()
            .enumerate()
            .skip(start)
            .find(|(_, set)| **set)
            .map_or(col, |(idx, _)| idx as u16)
    }

    /// First stop left of `col`, or `col` itself when there is none.
    #[must_use]
    pub fn prev_from(&self, col: u16) -> u16 {
        let end = usize::from(col).min(self.stops.len());
        self.stops[..end]
            .iter()
            .rposition(|set| *set)
            .map_or(col, |idx| idx as u16)
    }
}
