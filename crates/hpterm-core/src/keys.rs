//! Keyboard input from the display side.
//!
//! The host UI translates its key presses into [`KeyEvent`]s and hands them to
//! [`Terminal::handle_key`]. Anything that has to reach the host goes through
//! the response channel, so it falls back to local echo like every other reply.

use tracing::debug;

use crate::config::CursorKey;
use crate::softkeys::KeyRow;
use crate::surface::{GraphicsSurface, HostLink};
use crate::terminal::Terminal;

const DEL: u8 = 0x7F;

/// A key press from the display side.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum KeyEvent {
    /// With `ctrl`, scrolls the viewport instead of moving the cursor.
    Up { ctrl: bool },
    /// With `ctrl`, scrolls the viewport instead of moving the cursor.
    Down { ctrl: bool },
    Left,
    Right,
    /// Viewport up by one screen less a row.
    PageUp,
    /// Viewport down by one screen less a row.
    PageDown,
    /// Cursor to the top of memory.
    Home,
    /// Cursor to the bottom viewport row.
    End,
    /// With `ctrl`, inserts a line; otherwise toggles insert mode when editing is local.
    Insert { ctrl: bool },
    /// With `ctrl`, deletes a line; otherwise deletes a character when editing is local.
    Delete { ctrl: bool },
    /// F1..F10.
    Function { n: u8, shift: bool },
    /// Locks the keyboard, or unlocks it when already locked.
    ScrollLock,
    /// Sends the configured enter byte.
    Enter,
    /// Sent to the host as typed.
    Char(u8),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum KeyOutcome {
    Handled,
    /// Keyboard locked or the key has no function.
    Ignored,
    /// A soft key was pressed; carries its current label.
    SoftKey(String),
}

impl<L: HostLink, G: GraphicsSurface> Terminal<L, G> {
    pub fn handle_key(&mut self, key: KeyEvent) -> KeyOutcome {
        if self.screen.modes().keyboard_locked() {
            if key != KeyEvent::ScrollLock {
                debug!(?key, "keyboard locked");
                return KeyOutcome::Ignored;
            }
            self.screen.modes_mut().set_keyboard_locked(false);
            return KeyOutcome::Handled;
        }

        let local = self.config.local_keys;
        let outcome = match key {
            KeyEvent::ScrollLock => {
                self.screen.modes_mut().set_keyboard_locked(true);
                KeyOutcome::Handled
            }
            KeyEvent::Up { ctrl: true } => {
                self.screen.scroll_viewport_up(1);
                KeyOutcome::Handled
            }
            KeyEvent::Down { ctrl: true } => {
                self.screen.scroll_viewport_down(1);
                KeyOutcome::Handled
            }
            KeyEvent::Up { ctrl: false } => self.cursor_key(CursorKey::Up, -1, 0),
            KeyEvent::Down { ctrl: false } => self.cursor_key(CursorKey::Down, 1, 0),
            KeyEvent::Left => self.cursor_key(CursorKey::Left, 0, -1),
            KeyEvent::Right => self.cursor_key(CursorKey::Right, 0, 1),
            KeyEvent::PageUp => {
                self.screen.page_up();
                KeyOutcome::Handled
            }
            KeyEvent::PageDown => {
                self.screen.page_down();
                KeyOutcome::Handled
            }
            KeyEvent::Home => {
                self.screen.home_up();
                KeyOutcome::Handled
            }
            KeyEvent::End => {
                self.screen.home_down();
                KeyOutcome::Handled
            }
            KeyEvent::Insert { ctrl: true } => {
                self.screen.insert_line();
                KeyOutcome::Handled
            }
            KeyEvent::Insert { ctrl: false } if local => {
                let on = !self.screen.modes().insert_mode();
                self.screen.modes_mut().set_insert_mode(on);
                KeyOutcome::Handled
            }
            KeyEvent::Delete { ctrl: true } => {
                self.screen.delete_line();
                KeyOutcome::Handled
            }
            KeyEvent::Delete { ctrl: false } if local => {
                self.screen.delete_chars(1);
                KeyOutcome::Handled
            }
            KeyEvent::Insert { .. } | KeyEvent::Delete { .. } => KeyOutcome::Ignored,
            KeyEvent::Function { n, shift } => self.function_key(n, shift),
            KeyEvent::Enter => {
                let byte = self.config.enter_byte;
                self.channel.send_byte(byte, &mut self.screen);
                KeyOutcome::Handled
            }
            KeyEvent::Char(DEL) if local => KeyOutcome::Ignored,
            KeyEvent::Char(byte) => {
                self.channel.send_byte(byte, &mut self.screen);
                KeyOutcome::Handled
            }
        };
        self.collect_downgrade();
        outcome
    }

    fn cursor_key(&mut self, key: CursorKey, rows: i32, cols: i32) -> KeyOutcome {
        if self.config.local_keys {
            self.screen.move_cursor(rows, cols);
        } else {
            let bytes = self.config.terminal_id.cursor_key(key);
            self.channel.send_bytes(bytes, &mut self.screen);
        }
        KeyOutcome::Handled
    }

    fn function_key(&mut self, n: u8, shift: bool) -> KeyOutcome {
        match n {
            1..=8 => {
                let label = self
                    .screen
                    .soft_keys()
                    .label(KeyRow::for_shift(shift), usize::from(n) - 1);
                KeyOutcome::SoftKey(label.to_owned())
            }
            9 => {
                self.screen.soft_keys_mut().toggle();
                KeyOutcome::Handled
            }
            10 => {
                let visible = !self.graphics.visible;
                self.graphics.visible = visible;
                self.surface.set_visible(visible);
                KeyOutcome::Handled
            }
            _ => KeyOutcome::Ignored,
        }
    }
}
