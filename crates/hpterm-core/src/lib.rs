#![forbid(unsafe_code)]

//! HP 2627A / 2648A terminal protocol engine.
//!
//! # Role
//! `hpterm-core` turns the byte stream of an HP graphics terminal session into
//! screen memory, plot primitives and host replies. It owns no window and no
//! transport: bytes come in through a ring buffer, screen memory is read
//! directly by a renderer, vector output goes to a [`GraphicsSurface`], and
//! replies leave through a [`HostLink`].
//!
//! # Primary responsibilities
//! - **Ring**: producer/consumer byte queue between transport and interpreter.
//! - **Parser**: escape-sequence state machine for HP and ANSI commands.
//! - **Screen**: four pages of 80×24 alpha memory with an 80×24 viewport.
//! - **Plot**: `ESC * p` vector bodies in ASCII and packed binary forms.
//! - **Reply**: status formats and the `DC1`-gated response channel.
//!
//! # Example
//! ```
//! use hpterm_core::{RecordingLink, RecordingSurface, Terminal};
//!
//! let mut terminal = Terminal::new(RecordingLink::new(), RecordingSurface::new());
//! terminal.feed(b"\x1b*pf100,100a0,0bE");
//! assert_eq!(terminal.surface().strokes().len(), 2);
//! ```

pub mod cell;
pub mod config;
pub mod cursor;
pub mod escape;
pub mod hpgl;
pub mod keys;
pub mod modes;
pub mod parser;
pub mod plot;
pub mod reply;
pub mod ring;
pub mod screen;
pub mod session;
pub mod softkeys;
pub mod surface;
pub mod terminal;
pub mod transfer;

pub use cell::{Attr, AttrFlags, Cell, Charset};
pub use config::{ConfigError, CursorKey, SessionConfig, SessionConfigParse, TerminalId};
pub use cursor::{Cursor, SavedCursor, TabStops};
pub use escape::EscapeAccumulator;
pub use hpgl::HpglRecorder;
pub use keys::{KeyEvent, KeyOutcome};
pub use modes::Modes;
pub use parser::{
    Action, AmpersandMode, AsteriskMode, CsiCommand, DisplayOp, HpCommand, ModeOp, Parser,
    ProtocolState,
};
pub use plot::{PlotError, PlotInterpreter};
pub use reply::ResponseChannel;
pub use ring::{RingBuffer, RingProducer, SharedRing};
pub use screen::{HEIGHT, PAGES, ScreenBuffer, WIDTH};
pub use session::{Session, SessionCommand};
pub use softkeys::{KeyBank, KeyRow, SoftKeyBanks};
pub use surface::{
    ClickEvent, GraphicsState, GraphicsSurface, HostLink, NullSurface, PlotCall, Point,
    RecordingLink, RecordingSurface, WriterLink,
};
pub use terminal::{Terminal, TerminalEvent};
pub use transfer::{FileTransferSource, MemoryTransferSource, TransferError, TransferSource};
