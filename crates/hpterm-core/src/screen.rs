//! Alpha screen memory: a multi-page character grid with a movable viewport.
//!
//! Memory is `PAGES × HEIGHT × WIDTH` cells stored flat and row-major. The
//! viewport is a `HEIGHT`-row window into it starting at `view_start` (a cell
//! index, always a multiple of `WIDTH`). The cursor addresses the viewport.
//!
//! Invariants maintained by every public operation:
//! - `0 <= view_start <= (PAGES - 1) * WIDTH * HEIGHT`,
//! - cursor `x < WIDTH`, `y < HEIGHT`.
//!
//! Address helpers (`idx_*`) are derived from the cursor and viewport and
//! never stored.

use tracing::trace;

use crate::cell::{Attr, Cell, Charset};
use crate::cursor::{Cursor, DEFAULT_TAB_STEP, SavedCursor, TabStops};
use crate::modes::Modes;
use crate::softkeys::{KeyBank, SoftKeyBanks};

/// Columns per row.
pub const WIDTH: usize = 80;
/// Rows in the viewport.
pub const HEIGHT: usize = 24;
/// Viewport-sized pages of memory.
pub const PAGES: usize = 4;

const PAGE_CELLS: usize = WIDTH * HEIGHT;
const MEMORY_CELLS: usize = PAGE_CELLS * PAGES;
const MAX_VIEW_START: usize = (PAGES - 1) * PAGE_CELLS;

const NUL: u8 = 0x00;
const BS: u8 = 0x08;
const HT: u8 = 0x09;
const LF: u8 = 0x0A;
const VT: u8 = 0x0B;
const FF: u8 = 0x0C;
const CR: u8 = 0x0D;

/// Left/right margin columns.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Margins {
    pub left: u16,
    pub right: u16,
}

impl Default for Margins {
    fn default() -> Self {
        Self {
            left: 0,
            right: (WIDTH - 1) as u16,
        }
    }
}

/// Screen memory plus cursor, viewport and mode state.
#[derive(Debug, Clone)]
pub struct ScreenBuffer {
    cells: Vec<Cell>,
    view_start: usize,
    cursor: Cursor,
    saved: SavedCursor,
    margins: Margins,
    tabs: TabStops,
    modes: Modes,
    alternate_charset: Charset,
    soft_keys: SoftKeyBanks,
}

impl Default for ScreenBuffer {
    fn default() -> Self {
        Self::new()
    }
}

impl ScreenBuffer {
    /// Empty memory, cursor home, power-on modes.
    #[must_use]
    pub fn new() -> Self {
        let mut screen = Self {
            cells: vec![Cell::EMPTY; MEMORY_CELLS],
            view_start: 0,
            cursor: Cursor::default(),
            saved: SavedCursor::default(),
            margins: Margins::default(),
            tabs: TabStops::new(WIDTH as u16),
            modes: Modes::new(),
            alternate_charset: Charset::Roman,
            soft_keys: SoftKeyBanks::new(),
        };
        screen.reset(true);
        screen
    }

    /// Restore defaults. A hard reset also erases all memory.
    pub fn reset(&mut self, hard: bool) {
        self.cursor = Cursor::default();
        self.margins = Margins::default();
        self.modes.reset();
        self.soft_keys.select(KeyBank::Mode);
        self.saved = SavedCursor::save(&self.cursor);
        self.tabs.set_default(DEFAULT_TAB_STEP);
        if hard {
            self.view_start = 0;
            self.clear_memory();
        }
    }

    // ── Accessors ───────────────────────────────────────────────────

    #[must_use]
    pub fn cursor(&self) -> &Cursor {
        &self.cursor
    }

    #[must_use]
    pub fn modes(&self) -> &Modes {
        &self.modes
    }

    pub fn modes_mut(&mut self) -> &mut Modes {
        &mut self.modes
    }

    #[must_use]
    pub fn margins(&self) -> Margins {
        self.margins
    }

    #[must_use]
    pub fn tabs(&self) -> &TabStops {
        &self.tabs
    }

    pub fn tabs_mut(&mut self) -> &mut TabStops {
        &mut self.tabs
    }

    #[must_use]
    pub fn soft_keys(&self) -> &SoftKeyBanks {
        &self.soft_keys
    }

    pub fn soft_keys_mut(&mut self) -> &mut SoftKeyBanks {
        &mut self.soft_keys
    }

    #[must_use]
    pub fn alternate_charset(&self) -> Charset {
        self.alternate_charset
    }

    pub fn set_alternate_charset(&mut self, charset: Charset) {
        self.alternate_charset = charset;
    }

    /// Cell index of the top-left viewport cell.
    #[must_use]
    pub fn view_start(&self) -> usize {
        self.view_start
    }

    /// Memory row shown at the top of the viewport.
    #[must_use]
    pub fn start_row(&self) -> usize {
        self.view_start / WIDTH
    }

    /// All memory cells, row-major.
    #[must_use]
    pub fn cells(&self) -> &[Cell] {
        &self.cells
    }

    /// Viewport cell at `row`, `col`.
    #[must_use]
    pub fn cell(&self, row: usize, col: usize) -> Option<&Cell> {
        if row >= HEIGHT || col >= WIDTH {
            return None;
        }
        self.cells.get(self.view_start + row * WIDTH + col)
    }

    /// Memory cell at absolute `row`, `col`.
    #[must_use]
    pub fn memory_cell(&self, row: usize, col: usize) -> Option<&Cell> {
        if col >= WIDTH {
            return None;
        }
        self.cells.get(row * WIDTH + col)
    }

    // ── Address helpers ─────────────────────────────────────────────

    #[must_use]
    pub fn idx_bos(&self) -> usize {
        self.view_start
    }

    #[must_use]
    pub fn idx_eos(&self) -> usize {
        self.view_start + PAGE_CELLS - 1
    }

    #[must_use]
    pub fn idx_eom(&self) -> usize {
        MEMORY_CELLS - 1
    }

    #[must_use]
    pub fn idx_bol(&self) -> usize {
        self.view_start + usize::from(self.cursor.y) * WIDTH
    }

    #[must_use]
    pub fn idx_eol(&self) -> usize {
        self.idx_bol() + WIDTH - 1
    }

    #[must_use]
    pub fn idx_cursor(&self) -> usize {
        self.idx_bol() + usize::from(self.cursor.x)
    }

    // ── Attributes, margins, tabs ───────────────────────────────────

    pub fn set_attribute(&mut self, code: i32) {
        self.cursor.attr.apply_code(code);
    }

    pub fn set_left_margin(&mut self) {
        self.margins.left = self.cursor.x;
    }

    pub fn set_right_margin(&mut self) {
        self.margins.right = self.cursor.x;
    }

    /// Move to the left margin of the current row.
    pub fn cursor_to_left_margin(&mut self) {
        self.cursor.x = self.margins.left.min((WIDTH - 1) as u16);
    }

    pub fn next_tab(&self) -> u16 {
        self.tabs.next_from(self.cursor.x)
    }

    pub fn prev_tab(&self) -> u16 {
        self.tabs.prev_from(self.cursor.x)
    }

    /// Back-tab: move to the previous stop.
    pub fn back_tab(&mut self) {
        self.cursor.x = self.prev_tab();
    }

    pub fn save_cursor(&mut self) {
        self.saved = SavedCursor::save(&self.cursor);
    }

    pub fn restore_cursor(&mut self) {
        self.saved.restore(&mut self.cursor);
        self.clip_cursor();
    }

    // ── Erase ───────────────────────────────────────────────────────

    /// Blank `first..=last` with the empty sentinel. A reversed range is a
    /// no-op and `last` is clamped to the end of memory.
    pub fn clear_range(&mut self, first: usize, last: usize) {
        let last = last.min(self.idx_eom());
        if first > last {
            return;
        }
        for cell in &mut self.cells[first..=last] {
            cell.erase();
        }
    }

    pub fn clear_screen(&mut self) {
        self.clear_range(self.idx_bos(), self.idx_eos());
    }

    pub fn clear_memory(&mut self) {
        self.clear_range(0, self.idx_eom());
    }

    pub fn clear_to_bos(&mut self) {
        self.clear_range(self.idx_bos(), self.idx_cursor());
    }

    pub fn clear_to_eos(&mut self) {
        self.clear_range(self.idx_cursor(), self.idx_eos());
    }

    pub fn clear_to_eom(&mut self) {
        self.clear_range(self.idx_cursor(), self.idx_eom());
    }

    pub fn clear_to_eol(&mut self) {
        self.clear_range(self.idx_cursor(), self.idx_eol());
    }

    pub fn clear_to_bol(&mut self) {
        self.clear_range(self.idx_bol(), self.idx_cursor());
    }

    pub fn clear_line(&mut self) {
        self.clear_range(self.idx_bol(), self.idx_eol());
    }

    /// Erase `count` cells from the cursor, clipped to the line; at least one.
    pub fn clear_chars(&mut self, count: usize) {
        let first = self.idx_cursor();
        let last = first.saturating_add(count.max(1) - 1).min(self.idx_eol());
        self.clear_range(first, last);
    }

    // ── Characters in line ──────────────────────────────────────────

    /// Shift the rest of the line right by `count`; new cells are blanks in
    /// the current attribute and cells pushed past the line end are lost.
    pub fn insert_chars(&mut self, count: usize) {
        let at = self.idx_cursor();
        let eol = self.idx_eol();
        let count = count.min(eol + 1 - at);
        if count == 0 {
            return;
        }
        self.cells.copy_within(at..=eol - count, at + count);
        let blank = Cell::new(b' ', self.cursor.attr);
        self.cells[at..at + count].fill(blank);
    }

    /// Shift the rest of the line left by `count`; vacated end cells are empty.
    pub fn delete_chars(&mut self, count: usize) {
        let at = self.idx_cursor();
        let eol = self.idx_eol();
        let count = count.min(eol + 1 - at);
        if count == 0 {
            return;
        }
        self.cells.copy_within(at + count..=eol, at);
        self.cells[eol + 1 - count..=eol].fill(Cell::EMPTY);
    }

    // ── Lines ───────────────────────────────────────────────────────

    /// Open a blank line at the cursor row. Memory below shifts down one row
    /// and the last memory row is lost.
    pub fn insert_line(&mut self) {
        let bol = self.idx_bol();
        let eom = self.idx_eom();
        if bol + WIDTH <= eom {
            self.cells.copy_within(bol..=eom - WIDTH, bol + WIDTH);
        }
        self.clear_line();
    }

    /// Remove the cursor row. Memory below shifts up one row and the last
    /// memory row is cleared.
    pub fn delete_line(&mut self) {
        let bol = self.idx_bol();
        let eom = self.idx_eom();
        if bol + WIDTH <= eom {
            self.cells.copy_within(bol + WIDTH..=eom, bol);
        }
        self.clear_range(eom + 1 - WIDTH, eom);
    }

    // ── Viewport ────────────────────────────────────────────────────

    /// Cursor to the top-left of memory.
    pub fn home_up(&mut self) {
        self.cursor.x = 0;
        self.cursor.y = 0;
        self.view_start = 0;
    }

    /// Cursor to the first column of the bottom viewport row.
    pub fn home_down(&mut self) {
        self.cursor.x = 0;
        self.cursor.y = (HEIGHT - 1) as u16;
    }

    /// Move the viewport `rows` rows towards the start of memory.
    pub fn scroll_viewport_up(&mut self, rows: usize) {
        self.view_start = self.view_start.saturating_sub(rows.saturating_mul(WIDTH));
        self.clip_view();
    }

    /// Move the viewport `rows` rows towards the end of memory.
    pub fn scroll_viewport_down(&mut self, rows: usize) {
        self.view_start = self
            .view_start
            .saturating_add(rows.saturating_mul(WIDTH))
            .min(MAX_VIEW_START);
        self.clip_view();
    }

    pub fn page_up(&mut self) {
        self.scroll_viewport_up(HEIGHT - 1);
    }

    pub fn page_down(&mut self) {
        self.scroll_viewport_down(HEIGHT - 1);
    }

    /// Shift all memory up one row and clear the new last row.
    pub fn scroll_memory_up(&mut self) {
        let eom = self.idx_eom();
        self.cells.copy_within(WIDTH..=eom, 0);
        self.clear_range(eom + 1 - WIDTH, eom);
    }

    fn clip_view(&mut self) {
        self.view_start = self.view_start.min(MAX_VIEW_START);
    }

    // ── Cursor addressing ───────────────────────────────────────────

    /// Place the cursor relative to the viewport, clipped to the screen.
    pub fn set_cursor_rel_screen(&mut self, row: i32, col: i32) {
        self.cursor.x = clip(col, WIDTH);
        self.cursor.y = clip(row, HEIGHT);
    }

    /// Place the cursor on an absolute memory row, scrolling the viewport
    /// first when the row is outside it.
    pub fn set_cursor_rel_memory(&mut self, row: i32, col: i32) {
        let start = self.start_row() as i64;
        let rel = i64::from(row) - start;
        if rel < 0 {
            self.scroll_viewport_up(rel.unsigned_abs() as usize);
        } else if rel >= HEIGHT as i64 {
            self.scroll_viewport_down((rel - HEIGHT as i64 + 2) as usize);
        }
        let rel = i64::from(row) - self.start_row() as i64;
        let rel = rel.clamp(i64::from(i32::MIN), i64::from(i32::MAX)) as i32;
        self.set_cursor_rel_screen(rel, col);
    }

    /// Relative move. Leaving the left or right edge wraps to the other edge
    /// of the previous/next row; leaving the top or bottom wraps vertically.
    pub fn move_cursor(&mut self, delta_row: i32, delta_col: i32) {
        let mut x = i64::from(self.cursor.x) + i64::from(delta_col);
        let mut y = i64::from(self.cursor.y) + i64::from(delta_row);
        if x < 0 {
            x = WIDTH as i64 - 1;
            y -= 1;
        } else if x >= WIDTH as i64 {
            x = 0;
            y += 1;
        }
        if y < 0 {
            y = HEIGHT as i64 - 1;
        } else if y >= HEIGHT as i64 {
            y = 0;
        }
        self.cursor.x = x as u16;
        self.cursor.y = y as u16;
    }

    fn clip_cursor(&mut self) {
        self.cursor.x = self.cursor.x.min((WIDTH - 1) as u16);
        self.cursor.y = self.cursor.y.min((HEIGHT - 1) as u16);
    }

    // ── Output ──────────────────────────────────────────────────────

    /// Apply one byte from the host (or from local echo).
    pub fn put_byte(&mut self, byte: u8) {
        match byte {
            LF | VT | FF => self.line_feed(),
            CR => {
                self.cursor.x = 0;
                self.cursor.attr = Attr::PLAIN;
            }
            BS => self.cursor.x = self.cursor.x.saturating_sub(1),
            HT => {
                let next = self.next_tab();
                if self.modes.insert_mode() {
                    self.insert_chars(usize::from(next.saturating_sub(self.cursor.x)));
                }
                self.cursor.x = next;
            }
            NUL => {}
            _ if !(0x20..0x80).contains(&byte) && !self.modes.display_functions() => {
                trace!(byte, "non-printing byte dropped");
            }
            _ => self.write_printable(byte),
        }
    }

    pub fn put_bytes(&mut self, bytes: &[u8]) {
        for &b in bytes {
            self.put_byte(b);
        }
    }

    pub fn put_str(&mut self, text: &str) {
        self.put_bytes(text.as_bytes());
    }

    fn write_printable(&mut self, byte: u8) {
        if self.modes.insert_mode() {
            self.insert_chars(1);
        }
        let idx = self.idx_cursor();
        self.cells[idx] = Cell::new(byte, self.cursor.attr);
        self.cursor.x += 1;
        if usize::from(self.cursor.x) >= WIDTH {
            if self.modes.line_wrap() {
                self.put_byte(CR);
                self.put_byte(LF);
            } else {
                self.cursor.x = (WIDTH - 1) as u16;
            }
        }
    }

    fn line_feed(&mut self) {
        if usize::from(self.cursor.y) + 1 < HEIGHT {
            self.cursor.y += 1;
            return;
        }
        self.cursor.y = (HEIGHT - 1) as u16;
        if self.idx_bol() < self.idx_eom() + 1 - WIDTH {
            self.scroll_viewport_down(1);
            self.clear_line();
        } else {
            self.scroll_memory_up();
        }
    }

    // ── Read back ───────────────────────────────────────────────────

    /// Up to `count` written characters of memory `row` from `col`, stopping
    /// at the first empty cell. Row and column are clipped into range.
    #[must_use]
    pub fn memory_line(&self, row: usize, col: usize, count: usize) -> String {
        let row = if row >= HEIGHT * PAGES { HEIGHT - 1 } else { row };
        let col = col.min(WIDTH - 1);
        let count = count.min(WIDTH - col);
        let start = row * WIDTH + col;
        self.cells[start..start + count]
            .iter()
            .take_while(|cell| !cell.is_empty())
            .map(|cell| char::from(cell.content()))
            .collect()
    }

    /// [`memory_line`](Self::memory_line) addressed relative to the viewport.
    #[must_use]
    pub fn screen_line(&self, row: usize, col: usize, count: usize) -> String {
        self.memory_line(row + self.start_row(), col, count)
    }

    /// Text of the viewport: written cells only, rows joined by `\n`.
    /// Trailing empty rows are left out.
    #[must_use]
    pub fn visible_text(&self) -> String {
        let mut out = String::with_capacity(PAGE_CELLS + HEIGHT);
        for row in 0..HEIGHT {
            if row > 0 {
                out.push('\n');
            }
            let start = self.view_start + row * WIDTH;
            out.extend(
                self.cells[start..start + WIDTH]
                    .iter()
                    .filter(|cell| !cell.is_empty())
                    .map(|cell| char::from(cell.content())),
            );
        }
        let len = out.trim_end_matches('\n').len();
        out.truncate(len);
        out
    }
}

fn clip(value: i32, limit: usize) -> u16 {
    value.clamp(0, limit as i32 - 1) as u16
}

#[cfg(test)]
mod tests {
    use super::*;

    fn row_text(screen: &ScreenBuffer, row: usize) -> String {
        screen.screen_line(row, 0, WIDTH)
    }

    #[test]
    fn printable_bytes_advance_the_cursor() {
        let mut screen = ScreenBuffer::new();
        screen.put_str("AB");
        assert_eq!(row_text(&screen, 0), "AB");
        assert_eq!((screen.cursor().y, screen.cursor().x), (0, 2));
    }

    #[test]
    fn full_row_wraps_to_next_line() {
        let mut screen = ScreenBuffer::new();
        screen.put_bytes(&[b'x'; WIDTH]);
        assert_eq!((screen.cursor().y, screen.cursor().x), (1, 0));
    }

    #[test]
    fn full_row_clamps_without_wrap() {
        let mut screen = ScreenBuffer::new();
        screen.modes_mut().set_line_wrap(false);
        screen.put_bytes(&[b'x'; WIDTH]);
        screen.put_byte(b'Z');
        assert_eq!((screen.cursor().y, screen.cursor().x), (0, 79));
        assert_eq!(screen.cell(0, 79).map(Cell::content), Some(b'Z'));
    }

    #[test]
    fn carriage_return_resets_column_and_attribute() {
        let mut screen = ScreenBuffer::new();
        screen.set_attribute(7);
        screen.put_str("ab\r");
        assert_eq!(screen.cursor().x, 0);
        assert_eq!(screen.cursor().attr, Attr::PLAIN);
    }

    #[test]
    fn backspace_floors_at_zero() {
        let mut screen = ScreenBuffer::new();
        screen.put_bytes(&[BS, BS]);
        assert_eq!(screen.cursor().x, 0);
    }

    #[test]
    fn tab_jumps_to_next_stop_and_inserts_in_insert_mode() {
        let mut screen = ScreenBuffer::new();
        screen.put_str("Q");
        screen.put_byte(HT);
        assert_eq!(screen.cursor().x, 7);

        let mut screen = ScreenBuffer::new();
        screen.put_str("abc\r");
        screen.modes_mut().set_insert_mode(true);
        screen.put_byte(HT);
        assert_eq!(screen.cursor().x, 7);
        assert_eq!(row_text(&screen, 0), "       abc");
    }

    #[test]
    fn control_bytes_follow_display_functions() {
        let mut screen = ScreenBuffer::new();
        screen.put_byte(0x01);
        assert_eq!(screen.cursor().x, 1);
        screen.modes_mut().set_display_functions(false);
        screen.put_byte(0x01);
        screen.put_byte(NUL);
        assert_eq!(screen.cursor().x, 1);
    }

    #[test]
    fn high_bit_bytes_follow_display_functions() {
        let mut screen = ScreenBuffer::new();
        screen.put_byte(0xC1);
        assert_eq!(screen.cell(0, 0).map(|c| c.content()), Some(0xC1));
        screen.modes_mut().set_display_functions(false);
        screen.put_byte(0xC1);
        screen.put_byte(0x80);
        assert_eq!(screen.cursor().x, 1);
    }

    #[test]
    fn line_feed_at_bottom_scrolls_viewport_then_memory() {
        let mut screen = ScreenBuffer::new();
        screen.put_str("top");
        screen.home_down();
        screen.put_byte(LF);
        assert_eq!(screen.start_row(), 1);
        assert_eq!(screen.cursor().y as usize, HEIGHT - 1);

        screen.scroll_viewport_down(usize::MAX);
        assert_eq!(screen.view_start(), MAX_VIEW_START);
        screen.put_byte(LF);
        assert_eq!(screen.view_start(), MAX_VIEW_START);
        assert_eq!(screen.memory_line(0, 0, WIDTH), "");
    }

    #[test]
    fn scroll_memory_up_drops_first_row() {
        let mut screen = ScreenBuffer::new();
        screen.put_str("one\r\ntwo");
        screen.scroll_memory_up();
        assert_eq!(screen.memory_line(0, 0, WIDTH), "two");
        assert_eq!(screen.memory_line(HEIGHT * PAGES - 1, 0, WIDTH), "");
    }

    #[test]
    fn insert_and_delete_chars_stay_in_line() {
        let mut screen = ScreenBuffer::new();
        screen.put_str("abcdef\r\nnext");
        screen.set_cursor_rel_screen(0, 1);
        screen.insert_chars(2);
        assert_eq!(row_text(&screen, 0), "a  bcdef");
        screen.delete_chars(3);
        assert_eq!(row_text(&screen, 0), "acdef");
        assert_eq!(row_text(&screen, 1), "next");
        assert!(screen.cell(0, 79).is_some_and(Cell::is_empty));
    }

    #[test]
    fn oversized_char_counts_are_clipped() {
        let mut screen = ScreenBuffer::new();
        screen.put_str("abc");
        screen.set_cursor_rel_screen(0, 78);
        screen.insert_chars(10_000);
        screen.delete_chars(10_000);
        assert_eq!(row_text(&screen, 0), "abc");
    }

    #[test]
    fn clear_chars_erases_at_least_one_cell() {
        let mut screen = ScreenBuffer::new();
        screen.put_str("abcdef");
        screen.set_cursor_rel_screen(0, 2);
        screen.clear_chars(0);
        assert_eq!(row_text(&screen, 0), "ab");
        assert_eq!(screen.screen_line(0, 3, WIDTH), "def");
    }

    #[test]
    fn erase_helpers_cover_their_ranges() {
        let mut screen = ScreenBuffer::new();
        screen.put_str("0123456789\r\nabcdefghij");
        screen.set_cursor_rel_screen(0, 5);
        screen.clear_to_eol();
        assert_eq!(row_text(&screen, 0), "01234");
        screen.clear_to_bol();
        assert_eq!(screen.screen_line(0, 0, WIDTH), "");
        screen.set_cursor_rel_screen(1, 3);
        screen.clear_to_eos();
        assert_eq!(row_text(&screen, 1), "abc");
    }

    #[test]
    fn clear_range_tolerates_reversed_and_oversized_ranges() {
        let mut screen = ScreenBuffer::new();
        screen.put_str("keep");
        screen.clear_range(10, 2);
        screen.clear_range(MEMORY_CELLS - 1, usize::MAX);
        assert_eq!(row_text(&screen, 0), "keep");
    }

    #[test]
    fn insert_then_delete_line_restores_view() {
        let mut screen = ScreenBuffer::new();
        screen.put_str("a\r\nb\r\nc");
        screen.set_cursor_rel_screen(1, 0);
        screen.insert_line();
        assert_eq!(row_text(&screen, 1), "");
        assert_eq!(row_text(&screen, 2), "b");
        screen.delete_line();
        assert_eq!(row_text(&screen, 1), "b");
        assert_eq!(row_text(&screen, 2), "c");
    }

    #[test]
    fn cursor_addressing_clips_to_screen() {
        let mut screen = ScreenBuffer::new();
        screen.set_cursor_rel_screen(-3, 500);
        assert_eq!((screen.cursor().y, screen.cursor().x), (0, 79));
        screen.set_cursor_rel_screen(100, -1);
        assert_eq!((screen.cursor().y, screen.cursor().x), (23, 0));
    }

    #[test]
    fn memory_addressing_scrolls_target_into_view() {
        let mut screen = ScreenBuffer::new();
        screen.set_cursor_rel_memory(50, 4);
        assert_eq!(screen.start_row() + usize::from(screen.cursor().y), 50);
        assert_eq!(screen.cursor().x, 4);

        screen.set_cursor_rel_memory(2, 0);
        assert_eq!(screen.start_row(), 2);
        assert_eq!(screen.cursor().y, 0);
    }

    #[test]
    fn relative_moves_wrap_at_edges() {
        let mut screen = ScreenBuffer::new();
        screen.move_cursor(0, -1);
        assert_eq!((screen.cursor().y, screen.cursor().x), (23, 79));
        screen.move_cursor(0, 1);
        assert_eq!((screen.cursor().y, screen.cursor().x), (0, 0));
        screen.move_cursor(-1, 0);
        assert_eq!(screen.cursor().y, 23);
        screen.move_cursor(i32::MAX, 0);
        assert_eq!(screen.cursor().y, 0);
    }

    #[test]
    fn viewport_is_clipped_to_memory() {
        let mut screen = ScreenBuffer::new();
        screen.scroll_viewport_up(3);
        assert_eq!(screen.view_start(), 0);
        for _ in 0..10 {
            screen.page_down();
        }
        assert_eq!(screen.view_start(), MAX_VIEW_START);
        screen.page_up();
        assert_eq!(screen.view_start(), MAX_VIEW_START - (HEIGHT - 1) * WIDTH);
        screen.home_up();
        assert_eq!(screen.view_start(), 0);
    }

    #[test]
    fn save_restore_cursor_includes_attribute() {
        let mut screen = ScreenBuffer::new();
        screen.set_cursor_rel_screen(4, 9);
        screen.set_attribute(5);
        screen.save_cursor();
        screen.put_str("\r\n");
        screen.restore_cursor();
        assert_eq!((screen.cursor().y, screen.cursor().x), (4, 9));
        assert_eq!(screen.cursor().attr.to_word(), 0x04);
    }

    #[test]
    fn soft_reset_keeps_memory_hard_reset_clears_it() {
        let mut screen = ScreenBuffer::new();
        screen.put_str("data");
        screen.modes_mut().set_insert_mode(true);
        screen.reset(false);
        assert!(!screen.modes().insert_mode());
        assert_eq!(row_text(&screen, 0), "data");
        screen.reset(true);
        assert_eq!(row_text(&screen, 0), "");
    }

    #[test]
    fn visible_text_skips_empty_cells() {
        let mut screen = ScreenBuffer::new();
        screen.put_str("hi\r\n\r\nthere");
        let text = screen.visible_text();
        let lines: Vec<&str> = text.split('\n').collect();
        assert_eq!(lines, ["hi", "", "there"]);
        assert_eq!(ScreenBuffer::new().visible_text(), "");
    }

    #[test]
    fn margins_follow_cursor_column() {
        let mut screen = ScreenBuffer::new();
        screen.set_cursor_rel_screen(2, 10);
        screen.set_left_margin();
        screen.set_cursor_rel_screen(2, 60);
        screen.set_right_margin();
        assert_eq!(screen.margins(), Margins { left: 10, right: 60 });
        screen.cursor_to_left_margin();
        assert_eq!(screen.cursor().x, 10);
    }
}
