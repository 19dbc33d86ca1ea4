//! Screen memory cell: one byte of content plus its display attribute.
//!
//! A cell that was never written (or was erased) carries no attribute at all,
//! which is how the screen tells trailing blank space from typed spaces when a
//! line is read back.

use bitflags::bitflags;

bitflags! {
    /// Display enhancement bits of an attribute word.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
    pub struct AttrFlags: u8 {
        const INTENSE   = 1 << 0;
        const INVERSE   = 1 << 1;
        const UNDERLINE = 1 << 2;
    }
}

/// Largest colour index representable in the 5-bit colour field.
pub const MAX_COLOR_INDEX: u8 = 0x1F;

/// Attribute applied to newly written characters.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct Attr {
    pub flags: AttrFlags,
    /// 5-bit colour index: 0..=7 foreground, 8..=15 background.
    pub color: u8,
}

impl Attr {
    /// No enhancement, colour 0.
    pub const PLAIN: Self = Self {
        flags: AttrFlags::empty(),
        color: 0,
    };

    /// Apply one attribute code.
    ///
    /// `0` clears everything, `1`/`5`/`7` add intensity/underline/inverse,
    /// `30..=37` and `40..=47` replace only the colour field. Other codes
    /// are ignored.
    pub fn apply_code(&mut self, code: i32) {
        match code {
            0 => *self = Self::PLAIN,
            1 => self.flags |= AttrFlags::INTENSE,
            5 => self.flags |= AttrFlags::UNDERLINE,
            7 => self.flags |= AttrFlags::INVERSE,
            30..=37 => self.color = (code - 30) as u8,
            40..=47 => self.color = (code - 40 + 8) as u8,
            _ => {}
        }
    }

    /// Packed `CCCCC.UVI` word as seen by renderers.
    #[must_use]
    pub fn to_word(self) -> u16 {
        u16::from(self.flags.bits()) | (u16::from(self.color & MAX_COLOR_INDEX) << 3)
    }
}

/// Character set selectable as the alternate set (`ESC ) x`).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum Charset {
    #[default]
    Roman,
    LineDraw,
    Math,
}

impl Charset {
    /// Map the designator byte of `ESC ) x`.
    #[must_use]
    pub fn from_designator(byte: u8) -> Self {
        match byte {
            b'B' | b'C' => Self::LineDraw,
            b'D' => Self::Math,
            _ => Self::Roman,
        }
    }
}

/// A single cell of screen memory.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Cell {
    content: u8,
    /// `None` marks a cell that was never written since the last erase.
    attr: Option<Attr>,
}

impl Default for Cell {
    fn default() -> Self {
        Self::EMPTY
    }
}

impl Cell {
    /// Erased cell: a blank with the empty sentinel attribute.
    pub const EMPTY: Self = Self {
        content: b' ',
        attr: None,
    };

    #[must_use]
    pub fn new(content: u8, attr: Attr) -> Self {
        Self {
            content,
            attr: Some(attr),
        }
    }

    #[must_use]
    pub fn content(&self) -> u8 {
        self.content
    }

    #[must_use]
    pub fn attr(&self) -> Option<Attr> {
        self.attr
    }

    /// Whether this cell carries the empty sentinel.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.attr.is_none()
    }

    /// Erase back to [`Cell::EMPTY`].
    pub fn erase(&mut self) {
        *self = Self::EMPTY;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn enhancement_codes_accumulate_until_cleared() {
        let mut attr = Attr::PLAIN;
        attr.apply_code(1);
        attr.apply_code(7);
        attr.apply_code(5);
        assert_eq!(attr.flags, AttrFlags::all());
        attr.apply_code(0);
        assert_eq!(attr, Attr::PLAIN);
    }

    #[test]
    fn colour_codes_replace_only_the_colour_field() {
        let mut attr = Attr::PLAIN;
        attr.apply_code(7);
        attr.apply_code(33);
        assert_eq!(attr.color, 3);
        attr.apply_code(41);
        assert_eq!(attr.color, 9);
        assert!(attr.flags.contains(AttrFlags::INVERSE));
        assert_eq!(attr.to_word(), 0x02 | (9 << 3));
    }

    #[test]
    fn unknown_codes_are_ignored() {
        let mut attr = Attr::PLAIN;
        attr.apply_code(4);
        attr.apply_code(38);
        attr.apply_code(-1);
        assert_eq!(attr, Attr::PLAIN);
    }

    #[test]
    fn written_and_erased_cells() {
        let mut cell = Cell::new(b'A', Attr::PLAIN);
        assert!(!cell.is_empty());
        assert_eq!(cell.content(), b'A');
        cell.erase();
        assert!(cell.is_empty());
        assert_eq!(cell.content(), b' ');
        assert_eq!(Cell::default(), Cell::EMPTY);
    }

    #[test]
    fn charset_designators() {
        assert_eq!(Charset::from_designator(b'@'), Charset::Roman);
        assert_eq!(Charset::from_designator(b'A'), Charset::Roman);
        assert_eq!(Charset::from_designator(b'C'), Charset::LineDraw);
        assert_eq!(Charset::from_designator(b'D'), Charset::Math);
        assert_eq!(Charset::from_designator(b'z'), Charset::Roman);
    }
}
