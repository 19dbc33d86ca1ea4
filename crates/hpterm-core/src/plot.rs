//! Plot interpreter for `ESC * p` bodies.
//!
//! A body is a run of single-letter selectors and coordinate numbers:
//!
//! | Letter | Effect |
//! |---|---|
//! | `a` / `b` | pen up / pen down |
//! | `e` | relocation origin := current point |
//! | `f` `g` `h` | ASCII absolute / incremental / relocatable |
//! | `i` `j` `k` `l` | binary absolute / short incremental / incremental / relocatable |
//! | `s` / `t` | open / close a polygon fill region |
//! | `c` `d` `z` | accepted, no effect |
//!
//! Numbers come in `x, y` pairs decoded with the active number form. Each
//! completed pair is transformed by the move mode and plotted: a move with the
//! pen up (after which the pen goes down), a draw with the pen down.
//!
//! In ASCII form a pen letter written directly after the second number of a
//! pair, with no separator, applies to that pair: `100,100a` is a move to
//! `(100,100)` that leaves the pen up, `0,0b` is a draw to `(0,0)`. Anywhere
//! else a pen letter selects the pen state for the pairs that follow.
//!
//! Letters are matched case-insensitively so the sequence terminator takes
//! part as a final selector.

use std::fmt;

use tracing::trace;

use crate::escape::EscapeAccumulator;
use crate::surface::{GraphicsSurface, Point};

/// Largest value of a packed 15-bit coordinate that is still positive.
const BINARY_TRIPLE_MAX_POSITIVE: i32 = 16383;
/// Largest value of a packed 5-bit short increment that is still positive.
const BINARY_SHORT_MAX_POSITIVE: i32 = 16;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum PenState {
    #[default]
    Up,
    Down,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum MoveMode {
    #[default]
    Absolute,
    Incremental,
    Relocatable,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum NumberForm {
    #[default]
    Ascii,
    /// Packed 10-bit (absolute) or 15-bit (incremental/relocatable) values.
    Binary,
    /// Packed 5-bit signed increments.
    BinaryShort,
}

/// Running selectors and coordinates of one plot body.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct PlotState {
    pub pen: PenState,
    pub move_mode: MoveMode,
    pub number_form: NumberForm,
    pub current: Point,
    pub origin: Point,
    pub filling: bool,
    pub polygon: Vec<Point>,
}

/// Why a plot body was abandoned.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PlotError {
    /// The active decoder found no number at `offset`.
    MalformedNumber { offset: usize },
    /// A control byte sat where a number was expected.
    NotANumber { byte: u8, offset: usize },
}

impl fmt::Display for PlotError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::MalformedNumber { offset } => {
                write!(f, "cannot parse plot number at offset {offset}")
            }
            Self::NotANumber { byte, offset } => {
                write!(f, "unexpected byte 0x{byte:02x} in plot body at offset {offset}")
            }
        }
    }
}

impl std::error::Error for PlotError {}

/// Decodes plot bodies into surface calls.
#[derive(Debug, Clone, Default)]
pub struct PlotInterpreter {
    state: PlotState,
}

impl PlotInterpreter {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// State left behind by the last body.
    #[must_use]
    pub fn state(&self) -> &PlotState {
        &self.state
    }

    /// Run the body starting at the accumulator's current index.
    ///
    /// State is reset first. Points plotted before an error stay plotted, and
    /// an open polygon is handed to the surface even when the body fails.
    pub fn run(
        &mut self,
        body: &mut EscapeAccumulator,
        surface: &mut dyn GraphicsSurface,
    ) -> Result<(), PlotError> {
        self.state = PlotState::default();
        let result = self.run_body(body, surface);
        self.close_polygon(surface);
        result
    }

    fn run_body(
        &mut self,
        body: &mut EscapeAccumulator,
        surface: &mut dyn GraphicsSurface,
    ) -> Result<(), PlotError> {
        let mut pending_x: Option<i32> = None;

        while body.has_more() {
            let next = body.peek_char().to_ascii_lowercase();
            if self.apply_selector(next, surface) {
                body.advance(1);
                continue;
            }

            let offset = body.index();
            if next < 0x20 {
                if matches!(next, b'\r' | b'\n') && offset + 1 == body.len() {
                    body.advance(1);
                    continue;
                }
                return Err(PlotError::NotANumber { byte: next, offset });
            }

            let value = self
                .read_number(body)
                .ok_or(PlotError::MalformedNumber { offset })?;

            let Some(x) = pending_x.take() else {
                pending_x = Some(value);
                continue;
            };

            let pen_letter = self.adjacent_pen_letter(body);
            if let Some(pen) = pen_letter {
                self.state.pen = pen;
                body.advance(1);
            }
            self.plot(Point::new(x, value), pen_letter.is_some(), surface);
        }
        Ok(())
    }

    /// Apply a selector letter; `false` when `byte` is not one.
    fn apply_selector(&mut self, byte: u8, surface: &mut dyn GraphicsSurface) -> bool {
        match byte {
            b'a' => self.state.pen = PenState::Up,
            b'b' => self.state.pen = PenState::Down,
            b'c' | b'd' | b'z' => {}
            b'e' => self.state.origin = self.state.current,
            b'f' => self.select(NumberForm::Ascii, MoveMode::Absolute),
            b'g' => self.select(NumberForm::Ascii, MoveMode::Incremental),
            b'h' => self.select(NumberForm::Ascii, MoveMode::Relocatable),
            b'i' => self.select(NumberForm::Binary, MoveMode::Absolute),
            b'j' => self.select(NumberForm::BinaryShort, MoveMode::Incremental),
            b'k' => self.select(NumberForm::Binary, MoveMode::Incremental),
            b'l' => self.select(NumberForm::Binary, MoveMode::Relocatable),
            b's' => {
                self.close_polygon(surface);
                self.state.filling = true;
            }
            b't' => self.close_polygon(surface),
            b',' | b' ' if self.state.number_form == NumberForm::Ascii => {}
            _ => return false,
        }
        true
    }

    fn select(&mut self, form: NumberForm, mode: MoveMode) {
        self.state.number_form = form;
        self.state.move_mode = mode;
    }

    fn read_number(&self, body: &mut EscapeAccumulator) -> Option<i32> {
        match (self.state.number_form, self.state.move_mode) {
            (NumberForm::Ascii, _) => body.parse_signed_int(),
            (NumberForm::Binary, MoveMode::Absolute) => {
                body.parse_binary_word().map(|v| v as i32)
            }
            (NumberForm::Binary, _) => body.parse_binary_triple().map(|v| {
                let v = v as i32;
                if v > BINARY_TRIPLE_MAX_POSITIVE {
                    v - 32768
                } else {
                    v
                }
            }),
            (NumberForm::BinaryShort, _) => body.parse_binary_byte().map(|v| {
                let v = v as i32;
                if v > BINARY_SHORT_MAX_POSITIVE { v - 32 } else { v }
            }),
        }
    }

    /// Pen letter glued to the digits just read.
    fn adjacent_pen_letter(&self, body: &EscapeAccumulator) -> Option<PenState> {
        if self.state.number_form != NumberForm::Ascii || body.index() == 0 {
            return None;
        }
        if !body.byte_at(body.index() - 1).is_ascii_digit() {
            return None;
        }
        match body.peek_char().to_ascii_lowercase() {
            b'a' => Some(PenState::Up),
            b'b' => Some(PenState::Down),
            _ => None,
        }
    }

    fn plot(&mut self, pair: Point, explicit_pen: bool, surface: &mut dyn GraphicsSurface) {
        let state = &mut self.state;
        state.current = match state.move_mode {
            MoveMode::Absolute => pair,
            MoveMode::Incremental => state.current.offset(pair.x, pair.y),
            MoveMode::Relocatable => state.origin.offset(pair.x, pair.y),
        };
        if state.filling {
            state.polygon.push(state.current);
        }

        match state.pen {
            PenState::Up => {
                trace!(x = state.current.x, y = state.current.y, "plot move");
                surface.moveto(state.current);
                if !explicit_pen {
                    state.pen = PenState::Down;
                }
            }
            PenState::Down => {
                trace!(x = state.current.x, y = state.current.y, "plot draw");
                surface.lineto(state.current);
            }
        }
    }

    fn close_polygon(&mut self, surface: &mut dyn GraphicsSurface) {
        if self.state.filling && !self.state.polygon.is_empty() {
            surface.fill_polygon(&self.state.polygon);
        }
        self.state.polygon.clear();
        self.state.filling = false;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::surface::{PlotCall, RecordingSurface};

    fn run(body: &[u8]) -> (RecordingSurface, Result<(), PlotError>, PlotState) {
        let mut acc = EscapeAccumulator::from_bytes(body);
        acc.set_index(2);
        let mut surface = RecordingSurface::new();
        let mut interp = PlotInterpreter::new();
        let result = interp.run(&mut acc, &mut surface);
        (surface, result, interp.state().clone())
    }

    fn mv(x: i32, y: i32) -> PlotCall {
        PlotCall::MoveTo(Point::new(x, y))
    }

    fn ln(x: i32, y: i32) -> PlotCall {
        PlotCall::LineTo(Point::new(x, y))
    }

    #[test]
    fn glued_pen_letters_apply_to_their_pair() {
        let (surface, result, state) = run(b"*pf100,100a0,0bE");
        assert_eq!(result, Ok(()));
        assert_eq!(surface.calls(), &[mv(100, 100), ln(0, 0)]);
        assert_eq!(state.origin, Point::new(0, 0));
    }

    #[test]
    fn first_point_moves_then_pen_goes_down() {
        let (surface, result, _) = run(b"*pa 10,10 20,20 30,30 a 40,40 50,50Z");
        assert_eq!(result, Ok(()));
        assert_eq!(
            surface.calls(),
            &[mv(10, 10), ln(20, 20), ln(30, 30), mv(40, 40), ln(50, 50)]
        );
    }

    #[test]
    fn incremental_and_relocatable_modes() {
        let (surface, _, _) = run(b"*pg10,10 5,-5Z");
        assert_eq!(surface.calls(), &[mv(10, 10), ln(15, 5)]);

        let (surface, _, _) = run(b"*pf100,100 e h1,1 2,2Z");
        assert_eq!(surface.calls(), &[mv(100, 100), ln(101, 101), ln(102, 102)]);
    }

    #[test]
    fn binary_absolute_uses_ten_bit_words() {
        // "%2" = (5 << 5) | 18 = 178, "!$" = (1 << 5) | 4 = 36
        let (surface, result, _) = run(b"*pi%2!$Z");
        assert_eq!(result, Ok(()));
        assert_eq!(surface.calls(), &[mv(178, 36)]);
    }

    #[test]
    fn binary_incremental_triples_are_signed() {
        // "?? " = 0x7FE0 = 32736 -> -32, "  %" = 5
        let (surface, _, _) = run(b"*pk??   %Z");
        assert_eq!(surface.calls(), &[mv(-32, 5)]);
    }

    #[test]
    fn binary_short_increments_are_signed() {
        // '#' = 3, '?' = 31 -> -1
        let (surface, _, _) = run(b"*pj#?#?Z");
        assert_eq!(surface.calls(), &[mv(3, -1), ln(6, -2)]);
    }

    #[test]
    fn malformed_number_aborts_rest_of_body() {
        let (surface, result, _) = run(b"*pf1,2 3,xyZ");
        assert_eq!(surface.calls(), &[mv(1, 2)]);
        assert_eq!(result, Err(PlotError::MalformedNumber { offset: 9 }));
    }

    #[test]
    fn control_byte_in_body_is_rejected_but_trailing_newline_ends_quietly() {
        let (_, result, _) = run(b"*pf1,\x012Z");
        assert_eq!(result, Err(PlotError::NotANumber { byte: 1, offset: 5 }));

        let (surface, result, _) = run(b"*pf1,2\r");
        assert_eq!(result, Ok(()));
        assert_eq!(surface.calls(), &[mv(1, 2)]);
    }

    #[test]
    fn polygon_points_are_collected_and_still_stroked() {
        let (surface, _, state) = run(b"*ps 0,0 10,0 10,10 t 20,20Z");
        assert_eq!(
            surface.calls(),
            &[
                mv(0, 0),
                ln(10, 0),
                ln(10, 10),
                PlotCall::FillPolygon(vec![
                    Point::new(0, 0),
                    Point::new(10, 0),
                    Point::new(10, 10)
                ]),
                ln(20, 20),
            ]
        );
        assert!(!state.filling);
    }

    #[test]
    fn unterminated_polygon_is_closed_at_end_of_body() {
        let (surface, _, _) = run(b"*ps1,1 2,2Z");
        assert!(matches!(surface.calls().last(), Some(PlotCall::FillPolygon(p)) if p.len() == 2));
    }

    #[test]
    fn state_resets_between_bodies() {
        let mut interp = PlotInterpreter::new();
        let mut surface = RecordingSurface::new();
        let mut first = EscapeAccumulator::from_bytes(b"*pg5,5Z");
        first.set_index(2);
        interp.run(&mut first, &mut surface).unwrap();
        let mut second = EscapeAccumulator::from_bytes(b"*p1,1Z");
        second.set_index(2);
        interp.run(&mut second, &mut surface).unwrap();
        assert_eq!(surface.calls(), &[mv(5, 5), mv(1, 1)]);
    }

    #[test]
    fn plot_error_display() {
        assert_eq!(
            PlotError::NotANumber { byte: 7, offset: 3 }.to_string(),
            "unexpected byte 0x07 in plot body at offset 3"
        );
    }
}
