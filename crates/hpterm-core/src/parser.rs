//! HP/ANSI escape-sequence state machine.
//!
//! The parser classifies the host byte stream one byte at a time and turns
//! every completed unit into an [`Action`] for the terminal to apply. It
//! holds no screen state; decoding a sequence only reads the accumulated
//! bytes.
//!
//! Sequence shapes (the accumulator holds everything after `ESC`):
//! - `ESC x`: single-character HP command, see [`HpCommand`].
//! - `ESC [ ... F`: ANSI control, ended by a final byte in `0x40..=0x7E`.
//! - `ESC * s ... T` / `ESC & s ... T`: HP extended command; `s` selects the
//!   sub-handler and the sequence ends at an uppercase letter, `@`, `^`, CR
//!   or LF.
//! - `ESC ) c`: alternate character set.
//!
//! `ENQ` is not part of the grammar; the terminal intercepts it before the
//! parser sees it.

use tracing::trace;

use crate::cell::Charset;
use crate::escape::EscapeAccumulator;
use crate::surface::Point;

const BEL: u8 = 0x07;
const LF: u8 = 0x0A;
const CR: u8 = 0x0D;
const DC1: u8 = 0x11;
const ESC: u8 = 0x1B;

/// Sub-handler selected by the byte after `ESC *`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AsteriskMode {
    /// Selector not seen yet.
    Unselected,
    /// `d`: graphics display control.
    Display,
    /// `e`: image control.
    Image,
    /// `m`: plot mode, line style, text size.
    Mode,
    /// `n`: graphics text pen.
    Text,
    /// `p`: plot body.
    Plot,
    /// `s`: status and identification queries.
    Status,
    /// `t`: compatibility mode.
    Compatibility,
    /// `w`: graphics initialisation.
    Init,
    Other(u8),
}

impl AsteriskMode {
    fn from_selector(byte: u8) -> Self {
        match byte.to_ascii_lowercase() {
            b'd' => Self::Display,
            b'e' => Self::Image,
            b'm' => Self::Mode,
            b'n' => Self::Text,
            b'p' => Self::Plot,
            b's' => Self::Status,
            b't' => Self::Compatibility,
            b'w' => Self::Init,
            other => Self::Other(other),
        }
    }
}

/// Sub-handler selected by the byte after `ESC &`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AmpersandMode {
    /// Selector byte not yet seen.
    Unselected,
    /// `a`: cursor addressing.
    Cursor,
    /// `d`: display enhancements.
    Attributes,
    /// `j`: soft-key labels.
    KeyLabels,
    /// `q`: keyboard lock.
    Keyboard,
    /// `s`: line/page mode.
    PageMode,
    /// `@`: attribute clear.
    AttrClear,
    /// Any other selector; the sequence is reported unrecognized.
    Other(u8),
}

impl AmpersandMode {
    fn from_selector(byte: u8) -> Self {
        match byte {
            b'a' => Self::Cursor,
            b'd' => Self::Attributes,
            b'j' => Self::KeyLabels,
            b'q' => Self::Keyboard,
            b's' => Self::PageMode,
            b'@' => Self::AttrClear,
            other => Self::Other(other),
        }
    }
}

/// Where the parser is within the byte stream.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ProtocolState {
    #[default]
    Idle,
    InEscape,
    InBracket,
    InAsterisk(AsteriskMode),
    InAmpersand(AmpersandMode),
    InCloseParen,
    /// Collecting graphics text until `ESC`.
    GraphText,
    /// Collecting a graphics label until CR or LF.
    GraphLabel,
    /// Waiting for a graphics cursor click; bytes are handled as in `Idle`.
    AwaitClick,
}

/// Single-character HP command (`ESC x`).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HpCommand {
    /// `ESC A`
    CursorUp,
    /// `ESC B`
    CursorDown,
    /// `ESC C`
    CursorRight,
    /// `ESC D`
    CursorLeft,
    /// `ESC E`: full reset, clearing memory and graphics.
    HardReset,
    /// `ESC g`: reset modes, keep memory.
    SoftReset,
    /// `ESC H` or `ESC h`: top of memory.
    HomeUp,
    /// `ESC F`: first column of the bottom viewport row.
    HomeDown,
    /// `ESC G`
    CursorToLeftMargin,
    /// `ESC J`
    ClearToEndOfMemory,
    /// `ESC K`
    ClearToEndOfLine,
    /// `ESC L`
    InsertLine,
    /// `ESC M`
    DeleteLine,
    /// `ESC P`
    DeleteChar,
    /// `ESC Q` on, `ESC R` off.
    InsertMode(bool),
    /// `ESC S`: viewport moves one row towards the end of memory.
    RollUp,
    /// `ESC T`: viewport moves one row towards the start of memory.
    RollDown,
    /// `ESC Y` on, `ESC Z` off: control bytes are shown instead of obeyed.
    DisplayFunctions(bool),
    /// `ESC c` locks, `ESC b` unlocks.
    KeyboardLock(bool),
    /// `ESC i`
    BackTab,
    /// `ESC 1`
    SetTab,
    /// `ESC 2`
    ClearTab,
    /// `ESC 3`
    ClearAllTabs,
    /// `ESC 4`
    SetLeftMargin,
    /// `ESC 5`
    SetRightMargin,
    /// `ESC 7`
    SaveCursor,
    /// `ESC 8`
    RestoreCursor,
    /// `ESC a`: report cursor position in memory.
    CursorSense,
    /// `ESC d`: send the line from the cursor.
    SendLine,
    /// `ESC e`: raw file transfer.
    FileTransfer,
    /// `ESC ^`: primary terminal status reply.
    PrimaryStatus,
    /// `ESC ~`: secondary terminal status reply.
    SecondaryStatus,
    /// Recognised codes with no effect here (format mode, memory lock, delay).
    Inert(u8),
}

/// Decode `ESC x`.
#[must_use]
pub fn decode_single(byte: u8) -> Option<HpCommand> {
    let cmd = match byte {
        b'A' => HpCommand::CursorUp,
        b'B' => HpCommand::CursorDown,
        b'C' => HpCommand::CursorRight,
        b'D' => HpCommand::CursorLeft,
        b'E' => HpCommand::HardReset,
        b'F' => HpCommand::HomeDown,
        b'G' => HpCommand::CursorToLeftMargin,
        b'H' | b'h' => HpCommand::HomeUp,
        b'J' => HpCommand::ClearToEndOfMemory,
        b'K' => HpCommand::ClearToEndOfLine,
        b'L' => HpCommand::InsertLine,
        b'M' => HpCommand::DeleteLine,
        b'P' => HpCommand::DeleteChar,
        b'Q' => HpCommand::InsertMode(true),
        b'R' => HpCommand::InsertMode(false),
        b'S' => HpCommand::RollUp,
        b'T' => HpCommand::RollDown,
        b'Y' => HpCommand::DisplayFunctions(true),
        b'Z' => HpCommand::DisplayFunctions(false),
        b'a' => HpCommand::CursorSense,
        b'b' => HpCommand::KeyboardLock(false),
        b'c' => HpCommand::KeyboardLock(true),
        b'd' => HpCommand::SendLine,
        b'e' => HpCommand::FileTransfer,
        b'g' => HpCommand::SoftReset,
        b'i' => HpCommand::BackTab,
        b'1' => HpCommand::SetTab,
        b'2' => HpCommand::ClearTab,
        b'3' => HpCommand::ClearAllTabs,
        b'4' => HpCommand::SetLeftMargin,
        b'5' => HpCommand::SetRightMargin,
        b'7' => HpCommand::SaveCursor,
        b'8' => HpCommand::RestoreCursor,
        b'^' => HpCommand::PrimaryStatus,
        b'~' => HpCommand::SecondaryStatus,
        b'X' | b'l' | b'm' | b'@' => HpCommand::Inert(byte),
        _ => return None,
    };
    Some(cmd)
}

/// ANSI control (`ESC [ ... F`).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CsiCommand {
    InsertChars(i32),
    /// Relative move by rows and columns.
    MoveCursor { rows: i32, cols: i32 },
    /// 0-based row and column relative to the viewport.
    Position { row: i32, col: i32 },
    EraseInDisplay(i32),
    EraseInLine(i32),
    InsertLines(i32),
    DeleteLines(i32),
    DeleteChars(i32),
    EraseChars(i32),
    /// Attribute codes in order.
    Attributes([i32; 4], usize),
    /// `CSI 6 n`.
    CursorReport,
    /// `CSI ? 7 h` / `CSI ? 7 l`.
    LineWrap(bool),
    /// `CSI > 0 s` homes up, any other value homes down.
    Home { down: bool },
}

/// Decode a completed `[ ... F` sequence.
#[must_use]
pub fn decode_csi(esc: &mut EscapeAccumulator) -> Option<CsiCommand> {
    let final_byte = esc.last()?;
    esc.set_index(1);
    let cmd = match final_byte {
        b'@' => CsiCommand::InsertChars(esc.parse_signed_int_or(1)),
        b'A' => CsiCommand::MoveCursor {
            rows: esc.parse_signed_int_or(1).saturating_neg(),
            cols: 0,
        },
        b'B' => CsiCommand::MoveCursor {
            rows: esc.parse_signed_int_or(1),
            cols: 0,
        },
        b'C' => CsiCommand::MoveCursor {
            rows: 0,
            cols: esc.parse_signed_int_or(1),
        },
        b'D' => CsiCommand::MoveCursor {
            rows: 0,
            cols: esc.parse_signed_int_or(1).saturating_neg(),
        },
        b'H' | b'f' => {
            let row = esc.parse_signed_int_or(0);
            let col = esc.parse_signed_int_or(0);
            CsiCommand::Position { row, col }
        }
        b'J' => CsiCommand::EraseInDisplay(esc.parse_signed_int_or(0)),
        b'K' => CsiCommand::EraseInLine(esc.parse_signed_int_or(0)),
        b'L' => CsiCommand::InsertLines(esc.parse_signed_int_or(1)),
        b'M' => CsiCommand::DeleteLines(esc.parse_signed_int_or(1)),
        b'P' => CsiCommand::DeleteChars(esc.parse_signed_int_or(1)),
        b'X' => CsiCommand::EraseChars(esc.parse_signed_int_or(1)),
        b'm' => {
            let mut codes = [0; 4];
            let mut count = 0;
            while count < codes.len() {
                let Some(code) = esc.parse_signed_int() else {
                    break;
                };
                codes[count] = code;
                count += 1;
            }
            if count == 0 {
                count = 1;
            }
            CsiCommand::Attributes(codes, count)
        }
        b'n' if esc.peek_char() == b'6' => CsiCommand::CursorReport,
        b'h' | b'l' if esc.peek_char() == b'?' => {
            esc.advance(1);
            if esc.peek_char() != b'7' {
                return None;
            }
            CsiCommand::LineWrap(final_byte == b'h')
        }
        b's' => {
            let up = esc.peek_char() == b'>' && {
                esc.advance(1);
                esc.parse_signed_int() == Some(0)
            };
            CsiCommand::Home { down: !up }
        }
        _ => return None,
    };
    Some(cmd)
}

// ── Extended (`ESC *` / `ESC &`) decoders ───────────────────────────

/// Up to four numeric parameters read ahead of a code letter.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Numbers {
    values: [i32; 4],
    count: usize,
}

impl Numbers {
    /// Read at most `max` (≤ 4) numbers, stopping at the first non-number.
    pub fn read(esc: &mut EscapeAccumulator, max: usize) -> Self {
        let mut numbers = Self::default();
        while numbers.count < max.min(4) {
            let Some(value) = esc.parse_signed_int() else {
                break;
            };
            numbers.values[numbers.count] = value;
            numbers.count += 1;
        }
        numbers
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.count
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.count == 0
    }

    #[must_use]
    pub fn get(&self, idx: usize) -> Option<i32> {
        (idx < self.count).then(|| self.values[idx])
    }
}

/// One `ESC * d` operation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DisplayOp {
    /// `a`: snapshot, then clear with the colour or the background.
    Clear(Option<i32>),
    /// `b`: set graphics memory to a colour (default 7).
    Fill(i32),
    GraphicsVisible(bool),
    AlphaVisible(bool),
    GraphicsCursorVisible(bool),
    SetGraphicsCursor(Point),
    MoveGraphicsCursor(Point),
    AlphaCursorVisible(bool),
    /// `s`: following bytes are graphics text.
    EnterGraphText,
    /// `y`: inclusive corner coordinates.
    ScreenSize { width: i32, height: i32 },
    /// Recognised, no effect (`t`, `z`, CR, LF, separators).
    Skip,
    Unknown(u8),
}

/// Decode an `ESC * d` body.
#[must_use]
pub fn decode_display(esc: &mut EscapeAccumulator) -> Vec<DisplayOp> {
    esc.set_index(2);
    let mut ops = Vec::new();
    while esc.has_more() {
        let numbers = Numbers::read(esc, 4);
        let code = esc.next_char().to_ascii_lowercase();
        let op = match code {
            0 => break,
            b'a' => DisplayOp::Clear(numbers.get(0)),
            b'b' => DisplayOp::Fill(numbers.get(0).unwrap_or(7)),
            b'c' | b'd' => DisplayOp::GraphicsVisible(code == b'c'),
            b'e' | b'f' => DisplayOp::AlphaVisible(code == b'e'),
            b'k' | b'l' => DisplayOp::GraphicsCursorVisible(code == b'k'),
            b'o' | b'p' => match (numbers.get(0), numbers.get(1)) {
                (Some(x), Some(y)) if code == b'o' => DisplayOp::SetGraphicsCursor(Point::new(x, y)),
                (Some(x), Some(y)) => DisplayOp::MoveGraphicsCursor(Point::new(x, y)),
                _ => DisplayOp::Skip,
            },
            b'q' | b'r' => DisplayOp::AlphaCursorVisible(code == b'q'),
            b's' => DisplayOp::EnterGraphText,
            b'y' => match (numbers.get(0), numbers.get(1), numbers.get(2), numbers.get(3)) {
                (Some(x1), Some(y1), Some(x2), Some(y2)) => DisplayOp::ScreenSize {
                    width: x2.saturating_sub(x1).saturating_add(1),
                    height: y2.saturating_sub(y1).saturating_add(1),
                },
                _ => DisplayOp::Unknown(code),
            },
            b't' | b'z' | CR | LF | b' ' | b',' | b';' => DisplayOp::Skip,
            other => DisplayOp::Unknown(other),
        };
        ops.push(op);
    }
    ops
}

/// One `ESC * m` operation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ModeOp {
    DrawMode(u8),
    LineType(u8),
    FillRect { x: i32, y: i32, width: i32, height: i32 },
    TextSize(i32),
    /// Degrees: 0, 90, 180 or 270.
    TextOrientation(i32),
    TextSlant(bool),
    GraphicsDefaults,
    /// 1-based primary pen.
    PrimaryPen(i32),
    Skip,
    Unknown(u8),
}

/// Decode an `ESC * m` body.
#[must_use]
pub fn decode_mode(esc: &mut EscapeAccumulator) -> Vec<ModeOp> {
    esc.set_index(2);
    let mut ops = Vec::new();
    while esc.has_more() {
        let numbers = Numbers::read(esc, 4);
        let code = esc.next_char().to_ascii_lowercase();
        let op = match code {
            0 => break,
            b'a' => ModeOp::DrawMode(numbers.get(0).map_or(0, |n| n.clamp(0, 5) as u8)),
            b'b' => ModeOp::LineType(numbers.get(0).map_or(0, |n| n.clamp(0, 11) as u8)),
            b'e' => match (numbers.get(0), numbers.get(1), numbers.get(2), numbers.get(3)) {
                (Some(x1), Some(y1), Some(x2), Some(y2)) => ModeOp::FillRect {
                    x: x1,
                    y: y1,
                    width: x2.saturating_sub(x1),
                    height: y2.saturating_sub(y1),
                },
                _ => ModeOp::Skip,
            },
            b'm' => ModeOp::TextSize(numbers.get(0).map_or(1, |n| n.clamp(1, 8))),
            b'n' => ModeOp::TextOrientation(numbers.get(0).map_or(0, |n| (n.clamp(1, 4) - 1) * 90)),
            b'o' | b'p' => ModeOp::TextSlant(code == b'o'),
            b'r' => ModeOp::GraphicsDefaults,
            b'x' => ModeOp::PrimaryPen(numbers.get(0).unwrap_or(0).saturating_add(1)),
            b'z' | CR | LF | b' ' | b',' | b';' => ModeOp::Skip,
            other => ModeOp::Unknown(other),
        };
        ops.push(op);
    }
    ops
}

/// Axis addressed by one `ESC & a` term.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AddressAxis {
    /// `r`: memory row.
    MemoryRow,
    /// `y`: screen row.
    ScreenRow,
    /// `c`: column.
    Column,
}

/// One `ESC & a` term; signed numbers are relative to the cursor.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AddressTerm {
    pub axis: AddressAxis,
    pub value: i32,
    pub relative: bool,
}

/// Decode an `ESC & a` body.
#[must_use]
pub fn decode_cursor_address(esc: &mut EscapeAccumulator) -> Vec<AddressTerm> {
    esc.set_index(2);
    let mut terms = Vec::new();
    while esc.has_more() {
        let relative = matches!(esc.peek_char(), b'+' | b'-');
        let value = esc.parse_signed_int();
        let code = esc.next_char().to_ascii_lowercase();
        let axis = match code {
            0 => break,
            b'r' => AddressAxis::MemoryRow,
            b'y' => AddressAxis::ScreenRow,
            b'c' => AddressAxis::Column,
            _ => continue,
        };
        if let Some(value) = value {
            terms.push(AddressTerm {
                axis,
                value,
                relative,
            });
        }
    }
    terms
}

/// Soft-key label command (`ESC & j x`).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum KeyLabelCommand {
    Hide,
    ShowModeKeys,
    ShowUserKeys,
    Inert(u8),
}

// ── Actions ─────────────────────────────────────────────────────────

/// Parser output.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Action {
    /// Byte for the alpha screen.
    Data(u8),
    Bell,
    /// `DC1` handshake from the host.
    Handshake,
    Hp(HpCommand),
    Csi(CsiCommand),
    Display(Vec<DisplayOp>),
    PlotMode(Vec<ModeOp>),
    /// `ESC * n <n> X`: 1-based text pen.
    TextPen(i32),
    /// `ESC * p`: the sequence, indexed at the start of the body.
    Plot(EscapeAccumulator),
    /// `ESC * s <n> ^`.
    Status(Option<i32>),
    CursorAddress(Vec<AddressTerm>),
    /// Attribute codes applied in order.
    SetAttributes(Vec<i32>),
    KeyLabels(KeyLabelCommand),
    KeyboardLock(bool),
    Charset(Charset),
    /// Completed graphics text or label run.
    GraphicsText(String),
    /// Recognised sequence without effect.
    Inert(Vec<u8>),
    /// Sequence nobody handles.
    Unrecognized(Vec<u8>),
}

/// Escape-sequence state machine.
#[derive(Debug, Clone, Default)]
pub struct Parser {
    state: ProtocolState,
    esc: EscapeAccumulator,
    text: Vec<u8>,
    swallow_lf: bool,
}

impl Parser {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn state(&self) -> ProtocolState {
        self.state
    }

    /// Arm the click wait after a `ESC * s 4 ^` query.
    pub fn await_click(&mut self) {
        self.state = ProtocolState::AwaitClick;
    }

    /// Leave the click wait once the click has been reported.
    pub fn click_resolved(&mut self) {
        if self.state == ProtocolState::AwaitClick {
            self.state = ProtocolState::Idle;
        }
    }

    /// Drop any partial sequence and return to `Idle`.
    pub fn reset(&mut self) {
        *self = Self::default();
    }

    /// Feed a chunk and collect the completed actions.
    #[must_use]
    pub fn feed(&mut self, bytes: &[u8]) -> Vec<Action> {
        bytes.iter().filter_map(|&b| self.advance(b)).collect()
    }

    /// Advance by one byte.
    pub fn advance(&mut self, byte: u8) -> Option<Action> {
        if std::mem::take(&mut self.swallow_lf) && byte == LF {
            return None;
        }
        trace!(byte, state = ?self.state, "parser byte");
        match self.state {
            ProtocolState::Idle | ProtocolState::AwaitClick => self.advance_idle(byte),
            ProtocolState::InEscape => self.advance_escape(byte),
            ProtocolState::InBracket => self.advance_bracket(byte),
            ProtocolState::InAsterisk(mode) => self.advance_asterisk(mode, byte),
            ProtocolState::InAmpersand(mode) => self.advance_ampersand(mode, byte),
            ProtocolState::InCloseParen => self.advance_close_paren(byte),
            ProtocolState::GraphText => self.advance_graph_text(byte),
            ProtocolState::GraphLabel => self.advance_graph_label(byte),
        }
    }

    fn begin_escape(&mut self) {
        self.state = ProtocolState::InEscape;
        self.esc.reset();
    }

    fn advance_idle(&mut self, byte: u8) -> Option<Action> {
        match byte {
            ESC => {
                self.begin_escape();
                None
            }
            DC1 => Some(Action::Handshake),
            BEL => Some(Action::Bell),
            _ => Some(Action::Data(byte)),
        }
    }

    fn advance_escape(&mut self, byte: u8) -> Option<Action> {
        self.esc.push(byte);
        self.state = match byte {
            b'[' => ProtocolState::InBracket,
            b'*' => ProtocolState::InAsterisk(AsteriskMode::Unselected),
            b'&' => ProtocolState::InAmpersand(AmpersandMode::Unselected),
            b')' => ProtocolState::InCloseParen,
            _ => {
                self.state = ProtocolState::Idle;
                return Some(match decode_single(byte) {
                    Some(cmd) => Action::Hp(cmd),
                    None => Action::Unrecognized(self.esc.as_bytes().to_vec()),
                });
            }
        };
        None
    }

    fn advance_bracket(&mut self, byte: u8) -> Option<Action> {
        self.esc.push(byte);
        if !(0x40..=0x7E).contains(&byte) {
            return None;
        }
        self.state = ProtocolState::Idle;
        Some(match decode_csi(&mut self.esc) {
            Some(cmd) => Action::Csi(cmd),
            None => Action::Unrecognized(self.esc.as_bytes().to_vec()),
        })
    }

    fn advance_asterisk(&mut self, mode: AsteriskMode, byte: u8) -> Option<Action> {
        if byte == ESC {
            // The interrupted sequence ends here; its last byte, upper-cased,
            // stands in for the missing terminator.
            if let Some(last) = self.esc.last() {
                self.esc.remove_last();
                self.esc.push(last.to_ascii_uppercase());
            }
            let action = self.dispatch_asterisk(mode);
            self.begin_escape();
            return Some(action);
        }

        if mode == AsteriskMode::Unselected && byte == b'l' {
            self.state = ProtocolState::GraphLabel;
            self.text.clear();
            return None;
        }

        self.esc.push(byte);
        let mode = match mode {
            AsteriskMode::Unselected => AsteriskMode::from_selector(byte),
            selected => selected,
        };
        self.state = ProtocolState::InAsterisk(mode);
        if !is_extended_terminator(byte) {
            return None;
        }
        self.state = ProtocolState::Idle;
        Some(self.dispatch_asterisk(mode))
    }

    fn dispatch_asterisk(&mut self, mode: AsteriskMode) -> Action {
        self.state = ProtocolState::Idle;
        match mode {
            AsteriskMode::Display => {
                let ops = decode_display(&mut self.esc);
                if ops.contains(&DisplayOp::EnterGraphText) {
                    self.state = ProtocolState::GraphText;
                    self.text.clear();
                }
                Action::Display(ops)
            }
            AsteriskMode::Mode => Action::PlotMode(decode_mode(&mut self.esc)),
            AsteriskMode::Text if self.esc.last() == Some(b'X') => {
                self.esc.set_index(2);
                Action::TextPen(self.esc.parse_signed_int_or(-1).saturating_add(1))
            }
            AsteriskMode::Plot => {
                let mut body = self.esc.clone();
                body.set_index(2);
                Action::Plot(body)
            }
            AsteriskMode::Status if self.esc.last() == Some(b'^') => {
                self.esc.set_index(2);
                Action::Status(self.esc.parse_signed_int())
            }
            AsteriskMode::Unselected => Action::Unrecognized(self.esc.as_bytes().to_vec()),
            _ => Action::Inert(self.esc.as_bytes().to_vec()),
        }
    }

    fn advance_ampersand(&mut self, mode: AmpersandMode, byte: u8) -> Option<Action> {
        self.esc.push(byte);
        let mode = match mode {
            AmpersandMode::Unselected => AmpersandMode::from_selector(byte),
            selected => selected,
        };
        self.state = ProtocolState::InAmpersand(mode);
        if !is_extended_terminator(byte) {
            return None;
        }
        self.state = ProtocolState::Idle;

        let action = match mode {
            AmpersandMode::Cursor => Action::CursorAddress(decode_cursor_address(&mut self.esc)),
            AmpersandMode::Attributes => match byte {
                b'@' => Action::SetAttributes(vec![0]),
                b'B' | b'C' | b'J' => Action::SetAttributes(vec![7]),
                b'D' | b'E' => Action::SetAttributes(vec![5]),
                b'F' | b'G' => Action::SetAttributes(vec![7, 5]),
                _ => Action::Inert(self.esc.as_bytes().to_vec()),
            },
            AmpersandMode::KeyLabels => Action::KeyLabels(match byte {
                b'@' => KeyLabelCommand::Hide,
                b'A' => KeyLabelCommand::ShowModeKeys,
                b'B' => KeyLabelCommand::ShowUserKeys,
                other => KeyLabelCommand::Inert(other),
            }),
            AmpersandMode::Keyboard => Action::KeyboardLock(self.esc.byte_at(2) != b'0'),
            AmpersandMode::AttrClear => Action::SetAttributes(vec![0]),
            AmpersandMode::PageMode => Action::Inert(self.esc.as_bytes().to_vec()),
            AmpersandMode::Unselected | AmpersandMode::Other(_) => {
                Action::Unrecognized(self.esc.as_bytes().to_vec())
            }
        };
        Some(action)
    }

    fn advance_close_paren(&mut self, byte: u8) -> Option<Action> {
        self.esc.push(byte);
        self.state = ProtocolState::Idle;
        Some(Action::Charset(Charset::from_designator(byte)))
    }

    fn advance_graph_text(&mut self, byte: u8) -> Option<Action> {
        if byte != ESC {
            self.text.push(byte);
            return None;
        }
        self.begin_escape();
        self.take_text()
    }

    fn advance_graph_label(&mut self, byte: u8) -> Option<Action> {
        match byte {
            CR | LF => {
                self.swallow_lf = byte == CR;
                self.state = ProtocolState::Idle;
                self.take_text()
            }
            _ => {
                self.text.push(byte);
                None
            }
        }
    }

    fn take_text(&mut self) -> Option<Action> {
        if self.text.is_empty() {
            return None;
        }
        let text = std::mem::take(&mut self.text);
        Some(Action::GraphicsText(
            text.into_iter().map(char::from).collect(),
        ))
    }
}

fn is_extended_terminator(byte: u8) -> bool {
    byte.is_ascii_uppercase() || matches!(byte, b'@' | b'^' | CR | LF)
}
