//! Screen mode flags.
//!
//! Pure state toggled by the interpreter's dispatch handlers (insert mode,
//! line wrap, keyboard lock, display functions, cursor and key-label
//! visibility). Kept as a small bitflags value so resets are one assignment.

use bitflags::bitflags;

bitflags! {
    /// Mode bits of the alpha screen.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
    pub struct ScreenModes: u8 {
        /// `ESC Q` / `ESC R`: printable bytes shift the rest of the line right.
        const INSERT = 1 << 0;
        /// `ESC [ ? 7 h/l`: wrap to the next row after the last column.
        const LINE_WRAP = 1 << 1;
        /// `ESC c` / `ESC b`, `ESC & q`: keyboard input is ignored.
        const KEYBOARD_LOCKED = 1 << 2;
        /// `ESC Y` / `ESC Z`: control bytes are stored as visible cells.
        const DISPLAY_FUNCTIONS = 1 << 3;
        /// `ESC * d q/r`: alpha cursor shown.
        const CURSOR_VISIBLE = 1 << 4;
        /// `ESC & j`: soft-key labels shown.
        const KEY_LABELS = 1 << 5;
    }
}

/// Mode state of the alpha screen.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Modes {
    pub flags: ScreenModes,
}

impl Default for Modes {
    fn default() -> Self {
        Self::new()
    }
}

impl Modes {
    /// Power-on defaults: wrap, display functions, visible cursor and labels.
    #[must_use]
    pub fn new() -> Self {
        Self {
            flags: ScreenModes::LINE_WRAP
                | ScreenModes::DISPLAY_FUNCTIONS
                | ScreenModes::CURSOR_VISIBLE
                | ScreenModes::KEY_LABELS,
        }
    }

    pub fn reset(&mut self) {
        *self = Self::new();
    }

    fn set(&mut self, flag: ScreenModes, on: bool) {
        self.flags.set(flag, on);
    }

    // ── Accessors ───────────────────────────────────────────────────

    #[must_use]
    pub fn insert_mode(&self) -> bool {
        self.flags.contains(ScreenModes::INSERT)
    }

    pub fn set_insert_mode(&mut self, on: bool) {
        self.set(ScreenModes::INSERT, on);
    }

    #[must_use]
    pub fn line_wrap(&self) -> bool {
        self.flags.contains(ScreenModes::LINE_WRAP)
    }

    pub fn set_line_wrap(&mut self, on: bool) {
        self.set(ScreenModes::LINE_WRAP, on);
    }

    #[must_use]
    pub fn keyboard_locked(&self) -> bool {
        self.flags.contains(ScreenModes::KEYBOARD_LOCKED)
    }

    pub fn set_keyboard_locked(&mut self, on: bool) {
        self.set(ScreenModes::KEYBOARD_LOCKED, on);
    }

    #[must_use]
    pub fn display_functions(&self) -> bool {
        self.flags.contains(ScreenModes::DISPLAY_FUNCTIONS)
    }

    pub fn set_display_functions(&mut self, on: bool) {
        self.set(ScreenModes::DISPLAY_FUNCTIONS, on);
    }

    #[must_use]
    pub fn cursor_visible(&self) -> bool {
        self.flags.contains(ScreenModes::CURSOR_VISIBLE)
    }

    pub fn set_cursor_visible(&mut self, on: bool) {
        self.set(ScreenModes::CURSOR_VISIBLE, on);
    }

    #[must_use]
    pub fn key_labels(&self) -> bool {
        self.flags.contains(ScreenModes::KEY_LABELS)
    }

    pub fn set_key_labels(&mut self, on: bool) {
        self.set(ScreenModes::KEY_LABELS, on);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_match_power_on_state() {
        let modes = Modes::new();
        assert!(modes.line_wrap());
        assert!(modes.display_functions());
        assert!(modes.cursor_visible());
        assert!(modes.key_labels());
        assert!(!modes.insert_mode());
        assert!(!modes.keyboard_locked());
    }

    #[test]
    fn setters_toggle_single_flags() {
        let mut modes = Modes::new();
        modes.set_insert_mode(true);
        modes.set_line_wrap(false);
        modes.set_keyboard_locked(true);
        assert!(modes.insert_mode());
        assert!(!modes.line_wrap());
        assert!(modes.keyboard_locked());
        assert!(modes.display_functions());

        modes.reset();
        assert_eq!(modes, Modes::new());
    }
}
