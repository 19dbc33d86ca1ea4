//! Protocol loop driver.
//!
//! [`Terminal`] owns every piece of session state: the input ring, the
//! parser, screen memory, the response channel and the graphics collaborator.
//! Host bytes enter through the ring (directly via [`Terminal::feed`] or from a
//! transport thread through a [`RingProducer`]); [`Terminal::step`] consumes one
//! byte and applies whatever the parser produced.
//!
//! Primary responsibilities:
//! - ENQ handling ahead of the parser (deferred ACK or immediate answerback),
//! - DC1 release of the armed reply,
//! - idle housekeeping (queued ACK) when the ring is empty,
//! - polling the surface for a click while a click wait is armed,
//! - applying decoded commands to the screen and the graphics surface.

use tracing::{debug, warn};

use crate::config::SessionConfig;
use crate::parser::{
    Action, AddressAxis, AddressTerm, CsiCommand, DisplayOp, HpCommand, KeyLabelCommand, ModeOp,
    Parser, ProtocolState,
};
use crate::plot::PlotInterpreter;
use crate::reply::{self, ResponseChannel};
use crate::ring::{RingProducer, SharedRing};
use crate::screen::{HEIGHT, PAGES, ScreenBuffer, WIDTH};
use crate::softkeys::KeyBank;
use crate::surface::{ClickEvent, GraphicsState, GraphicsSurface, HostLink, Point};
use crate::transfer::{self, FileTransferSource, TransferSource};

const ENQ: u8 = 0x05;
const DC1: u8 = 0x11;

/// Things the host application should react to.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TerminalEvent {
    Bell,
    /// The host link failed; the session continues in local mode.
    LinkLost(String),
}

/// HP terminal session.
pub struct Terminal<L, G> {
    pub(crate) config: SessionConfig,
    ring: SharedRing,
    parser: Parser,
    pub(crate) screen: ScreenBuffer,
    pub(crate) channel: ResponseChannel<L>,
    pub(crate) surface: G,
    pub(crate) graphics: GraphicsState,
    plotter: PlotInterpreter,
    transfer: Box<dyn TransferSource + Send>,
    alpha_active: bool,
    events: Vec<TerminalEvent>,
}

impl<L, G> std::fmt::Debug for Terminal<L, G> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Terminal")
            .field("terminal_id", &self.config.terminal_id)
            .field("state", &self.parser.state())
            .field("cursor", self.screen.cursor())
            .finish_non_exhaustive()
    }
}

impl<L: HostLink, G: GraphicsSurface> Terminal<L, G> {
    /// Session with default configuration.
    pub fn new(link: L, surface: G) -> Self {
        Self::with_config(SessionConfig::default(), link, surface)
    }

    pub fn with_config(config: SessionConfig, link: L, mut surface: G) -> Self {
        let (width, height) = config.terminal_id.graphics_size();
        let graphics = GraphicsState::new(width, height);
        let (width, height) = graphics.size();
        surface.set_screen_size(width, height);
        Self {
            ring: SharedRing::new(config.ring_capacity),
            parser: Parser::new(),
            screen: ScreenBuffer::new(),
            channel: ResponseChannel::new(link, config.remote),
            surface,
            graphics,
            plotter: PlotInterpreter::new(),
            transfer: Box::new(FileTransferSource::new(config.tape_path.clone())),
            alpha_active: true,
            events: Vec::new(),
            config,
        }
    }

    /// Replace the `ESC e` data source.
    #[must_use]
    pub fn with_transfer_source(mut self, source: impl TransferSource + Send + 'static) -> Self {
        self.transfer = Box::new(source);
        self
    }

    // ── Accessors ───────────────────────────────────────────────────

    #[must_use]
    pub fn config(&self) -> &SessionConfig {
        &self.config
    }

    #[must_use]
    pub fn screen(&self) -> &ScreenBuffer {
        &self.screen
    }

    #[must_use]
    pub fn state(&self) -> ProtocolState {
        self.parser.state()
    }

    #[must_use]
    pub fn link(&self) -> &L {
        self.channel.link()
    }

    pub fn link_mut(&mut self) -> &mut L {
        self.channel.link_mut()
    }

    #[must_use]
    pub fn is_remote(&self) -> bool {
        self.channel.is_remote()
    }

    /// Reply waiting for `DC1`.
    #[must_use]
    pub fn pending_reply(&self) -> Option<&str> {
        self.channel.pending()
    }

    #[must_use]
    pub fn surface(&self) -> &G {
        &self.surface
    }

    pub fn surface_mut(&mut self) -> &mut G {
        &mut self.surface
    }

    #[must_use]
    pub fn graphics(&self) -> &GraphicsState {
        &self.graphics
    }

    #[must_use]
    pub fn alpha_active(&self) -> bool {
        self.alpha_active
    }

    /// Handle for a transport reader thread.
    #[must_use]
    pub fn producer(&self) -> RingProducer {
        self.ring.producer()
    }

    /// Drain events in the order they occurred.
    pub fn drain_events(&mut self) -> Vec<TerminalEvent> {
        std::mem::take(&mut self.events)
    }

    /// Tear down into the link and the surface.
    pub fn into_parts(self) -> (L, G) {
        let Self {
            channel, surface, ..
        } = self;
        (channel.into_link(), surface)
    }

    // ── Input ───────────────────────────────────────────────────────

    /// Queue host bytes and process them. Input larger than the ring is
    /// processed in ring-sized slices so nothing overruns.
    pub fn feed(&mut self, bytes: &[u8]) {
        let mut rest = bytes;
        while !rest.is_empty() {
            let room = self.ring.free().max(1).min(rest.len());
            let (chunk, tail) = rest.split_at(room);
            self.ring.lock().extend_from_slice(chunk);
            rest = tail;
            self.run_until_idle();
        }
        self.run_until_idle();
    }

    /// Step until the ring is empty.
    pub fn run_until_idle(&mut self) {
        while self.step() {}
    }

    /// Consume one byte. Returns `false` when the ring was empty, after doing
    /// idle housekeeping.
    pub fn step(&mut self) -> bool {
        if self.parser.state() == ProtocolState::AwaitClick {
            if let Some(click) = self.surface.take_click() {
                self.resolve_click(click);
            }
        }

        let Some(byte) = self.ring.pop() else {
            self.channel.flush_ack(&mut self.screen);
            self.collect_downgrade();
            return false;
        };

        if byte == ENQ {
            self.answer_enq();
        } else if let Some(action) = self.parser.advance(byte) {
            self.apply(action);
        }
        self.collect_downgrade();
        true
    }

    fn answer_enq(&mut self) {
        if self.config.enq_ack {
            debug!("ENQ: ACK queued");
            self.channel.queue_ack();
        } else {
            debug!("ENQ: answerback");
            let text = reply::answerback(&self.config.answerback);
            self.channel.send_str(&text, &mut self.screen);
        }
    }

    fn resolve_click(&mut self, click: ClickEvent) {
        debug!(x = click.position.x, y = click.position.y, code = click.code, "click");
        self.channel.arm(reply::click_report(click));
        self.parser.click_resolved();
        self.ring.push_back(DC1);
    }

    pub(crate) fn collect_downgrade(&mut self) {
        if let Some(downgrade) = self.channel.take_downgrade() {
            self.events.push(TerminalEvent::LinkLost(downgrade.reason));
        }
    }

    pub(crate) fn bell(&mut self) {
        if self.config.sound {
            self.events.push(TerminalEvent::Bell);
        }
    }

    // ── Command application ─────────────────────────────────────────

    fn apply(&mut self, action: Action) {
        match action {
            Action::Data(byte) => self.put_data(byte),
            Action::Bell => self.bell(),
            Action::Handshake => self.channel.release(&mut self.screen),
            Action::Hp(cmd) => self.apply_hp(cmd),
            Action::Csi(cmd) => self.apply_csi(cmd),
            Action::Display(ops) => {
                for op in ops {
                    self.apply_display(op);
                }
            }
            Action::PlotMode(ops) => {
                for op in ops {
                    self.apply_mode(op);
                }
            }
            Action::TextPen(pen) => self.surface.set_text_pen(pen),
            Action::Plot(mut body) => {
                let mut tracked = Tracked {
                    surface: &mut self.surface,
                    graphics: &mut self.graphics,
                };
                if let Err(err) = self.plotter.run(&mut body, &mut tracked) {
                    warn!(
                        error = %err,
                        seq = %String::from_utf8_lossy(body.as_bytes()),
                        "plot body aborted"
                    );
                }
            }
            Action::Status(code) => self.apply_status(code),
            Action::CursorAddress(terms) => self.address_cursor(&terms),
            Action::SetAttributes(codes) => {
                for code in codes {
                    self.screen.set_attribute(code);
                }
            }
            Action::KeyLabels(cmd) => self.apply_key_labels(cmd),
            Action::KeyboardLock(locked) => self.screen.modes_mut().set_keyboard_locked(locked),
            Action::Charset(charset) => self.screen.set_alternate_charset(charset),
            Action::GraphicsText(text) => self.surface.draw_text(&text),
            Action::Inert(seq) => {
                debug!(seq = %String::from_utf8_lossy(&seq), "sequence accepted without effect");
            }
            Action::Unrecognized(seq) => {
                warn!(seq = %String::from_utf8_lossy(&seq), "unrecognized escape sequence");
            }
        }
    }

    fn put_data(&mut self, byte: u8) {
        if !self.alpha_active {
            return;
        }
        if self.config.cpm_high_bit && byte >= 0x80 {
            self.screen.set_attribute(7);
            self.screen.put_byte(byte & 0x7F);
            self.screen.set_attribute(0);
        } else {
            self.screen.put_byte(byte);
        }
    }

    fn apply_hp(&mut self, cmd: HpCommand) {
        let screen = &mut self.screen;
        match cmd {
            HpCommand::CursorUp => screen.move_cursor(-1, 0),
            HpCommand::CursorDown => screen.move_cursor(1, 0),
            HpCommand::CursorRight => screen.move_cursor(0, 1),
            HpCommand::CursorLeft => screen.move_cursor(0, -1),
            HpCommand::HardReset => self.reset(true),
            HpCommand::SoftReset => self.reset(false),
            HpCommand::HomeUp => screen.home_up(),
            HpCommand::HomeDown => screen.home_down(),
            HpCommand::CursorToLeftMargin => screen.cursor_to_left_margin(),
            HpCommand::ClearToEndOfMemory => screen.clear_to_eom(),
            HpCommand::ClearToEndOfLine => screen.clear_to_eol(),
            HpCommand::InsertLine => screen.insert_line(),
            HpCommand::DeleteLine => screen.delete_line(),
            HpCommand::DeleteChar => screen.delete_chars(1),
            HpCommand::InsertMode(on) => screen.modes_mut().set_insert_mode(on),
            HpCommand::RollUp => screen.scroll_viewport_down(1),
            HpCommand::RollDown => screen.scroll_viewport_up(1),
            HpCommand::DisplayFunctions(on) => screen.modes_mut().set_display_functions(on),
            HpCommand::KeyboardLock(locked) => screen.modes_mut().set_keyboard_locked(locked),
            HpCommand::BackTab => screen.back_tab(),
            HpCommand::SetTab => {
                let col = screen.cursor().x;
                screen.tabs_mut().set(col);
            }
            HpCommand::ClearTab => {
                let col = screen.cursor().x;
                screen.tabs_mut().clear(col);
            }
            HpCommand::ClearAllTabs => screen.tabs_mut().clear_all(),
            HpCommand::SetLeftMargin => screen.set_left_margin(),
            HpCommand::SetRightMargin => screen.set_right_margin(),
            HpCommand::SaveCursor => screen.save_cursor(),
            HpCommand::RestoreCursor => screen.restore_cursor(),
            HpCommand::CursorSense => {
                let cursor = screen.cursor();
                let row = usize::from(cursor.y) + screen.start_row();
                self.channel.arm(reply::cursor_sense(cursor.x, row));
            }
            HpCommand::SendLine => {
                let cursor = screen.cursor();
                let line = screen.screen_line(usize::from(cursor.y), usize::from(cursor.x), WIDTH);
                self.channel.arm(format!("{line}\r"));
            }
            HpCommand::FileTransfer => self.run_transfer(),
            HpCommand::PrimaryStatus => self.channel.arm(reply::PRIMARY_STATUS),
            HpCommand::SecondaryStatus => self.channel.arm(reply::SECONDARY_STATUS),
            HpCommand::Inert(code) => debug!(code = %char::from(code), "inert HP command"),
        }
    }

    fn reset(&mut self, hard: bool) {
        self.bell();
        self.screen.reset(hard);
        self.graphics.reset();
        self.surface.reset_defaults(hard);
        self.alpha_active = true;
    }

    fn run_transfer(&mut self) {
        let channel = &mut self.channel;
        let screen = &mut self.screen;
        let result = transfer::stream(
            self.transfer.as_mut(),
            self.config.transfer_pacing,
            |byte| {
                let was_remote = channel.is_remote();
                channel.send_byte(byte, screen);
                if was_remote && !channel.is_remote() {
                    return Err(std::io::Error::new(
                        std::io::ErrorKind::BrokenPipe,
                        "host link lost",
                    ));
                }
                Ok(())
            },
        );
        if let Err(err) = result {
            warn!(error = %err, "file transfer incomplete");
        }
    }

    fn apply_csi(&mut self, cmd: CsiCommand) {
        let screen = &mut self.screen;
        match cmd {
            CsiCommand::InsertChars(n) => screen.insert_chars(count(n)),
            CsiCommand::MoveCursor { rows, cols } => screen.move_cursor(rows, cols),
            CsiCommand::Position { row, col } => screen.set_cursor_rel_screen(row, col),
            CsiCommand::EraseInDisplay(mode) => match mode {
                0 => screen.clear_to_eos(),
                1 => screen.clear_to_bos(),
                2 => screen.clear_screen(),
                _ => warn!(mode, "unsupported erase-in-display mode"),
            },
            CsiCommand::EraseInLine(mode) => match mode {
                0 => screen.clear_to_eol(),
                1 => screen.clear_to_bol(),
                2 => screen.clear_line(),
                _ => warn!(mode, "unsupported erase-in-line mode"),
            },
            CsiCommand::InsertLines(n) => {
                for _ in 0..count(n).min(HEIGHT * PAGES) {
                    screen.insert_line();
                }
            }
            CsiCommand::DeleteLines(n) => {
                for _ in 0..count(n).min(HEIGHT * PAGES) {
                    screen.delete_line();
                }
            }
            CsiCommand::DeleteChars(n) => screen.delete_chars(count(n)),
            CsiCommand::EraseChars(n) => screen.clear_chars(count(n)),
            CsiCommand::Attributes(codes, len) => {
                for &code in &codes[..len.min(codes.len())] {
                    screen.set_attribute(code);
                }
            }
            CsiCommand::CursorReport => {
                let cursor = screen.cursor();
                let text = reply::ansi_cursor_report(cursor.x, cursor.y);
                self.channel.send_str(&text, &mut self.screen);
            }
            CsiCommand::LineWrap(on) => screen.modes_mut().set_line_wrap(on),
            CsiCommand::Home { down } => {
                if down {
                    screen.home_down();
                } else {
                    screen.home_up();
                }
            }
        }
    }

    fn apply_display(&mut self, op: DisplayOp) {
        match op {
            DisplayOp::Clear(color) => {
                self.surface.save_image();
                self.surface.clear(color);
            }
            DisplayOp::Fill(color) => self.surface.clear(Some(color)),
            DisplayOp::GraphicsVisible(on) => {
                self.graphics.visible = on;
                self.surface.set_visible(on);
            }
            DisplayOp::AlphaVisible(on) => self.alpha_active = on,
            DisplayOp::GraphicsCursorVisible(on) => {
                self.graphics.cursor_visible = on;
                self.surface.set_cursor_visible(on);
            }
            DisplayOp::SetGraphicsCursor(point) => self.place_graphics_cursor(point),
            DisplayOp::MoveGraphicsCursor(delta) => {
                let point = self.graphics.cursor.offset(delta.x, delta.y);
                self.place_graphics_cursor(point);
            }
            DisplayOp::AlphaCursorVisible(on) => self.screen.modes_mut().set_cursor_visible(on),
            DisplayOp::EnterGraphText | DisplayOp::Skip => {}
            DisplayOp::ScreenSize { width, height } => {
                let (width, height) = self
                    .graphics
                    .set_size(width.unsigned_abs(), height.unsigned_abs());
                self.surface.set_screen_size(width, height);
            }
            DisplayOp::Unknown(code) => {
                warn!(code = %char::from(code), "unknown graphics display code");
            }
        }
    }

    fn place_graphics_cursor(&mut self, point: Point) {
        self.graphics.cursor = point;
        self.surface.set_cursor_position(point);
    }

    fn apply_mode(&mut self, op: ModeOp) {
        match op {
            ModeOp::DrawMode(mode) => self.surface.set_draw_mode(mode),
            ModeOp::LineType(line_type) => self.surface.set_line_type(line_type),
            ModeOp::FillRect {
                x,
                y,
                width,
                height,
            } => self.surface.fill_rect(x, y, width, height),
            ModeOp::TextSize(size) => self.surface.set_text_size(size),
            ModeOp::TextOrientation(degrees) => self.surface.set_text_orientation(degrees),
            ModeOp::TextSlant(on) => self.surface.set_text_slant(on),
            ModeOp::GraphicsDefaults => {
                self.graphics.reset();
                self.surface.reset_defaults(false);
            }
            ModeOp::PrimaryPen(pen) => self.surface.set_pen(pen),
            ModeOp::Skip => {}
            ModeOp::Unknown(code) => warn!(code = %char::from(code), "unknown graphics mode code"),
        }
    }

    fn apply_status(&mut self, code: Option<i32>) {
        match code {
            Some(1) => self.channel.arm(reply::answerback(&self.config.answerback)),
            Some(2) => self
                .channel
                .arm(reply::pen_report(self.graphics.pen, self.graphics.pen_down)),
            Some(3) => self
                .channel
                .arm(reply::graphics_cursor_report(self.graphics.cursor)),
            Some(4) => {
                self.surface.begin_click_wait();
                self.parser.await_click();
            }
            Some(5) => {
                let (width, height) = self.graphics.size();
                let digit = self.config.terminal_id.size_digit();
                self.channel
                    .arm(reply::display_size_report(width, height, digit));
            }
            Some(8) => self.channel.arm(reply::ZOOM_STATUS),
            other => {
                debug!(code = ?other, "unsupported status query");
                self.channel
                    .send_str(reply::UNSUPPORTED_STATUS, &mut self.screen);
            }
        }
    }

    fn address_cursor(&mut self, terms: &[AddressTerm]) {
        let start = i64::try_from(self.screen.start_row()).unwrap_or(0);
        let cursor = self.screen.cursor();
        let mut row = i64::from(cursor.y) + start;
        let mut col = i64::from(cursor.x);
        for term in terms {
            let value = i64::from(term.value);
            match (term.axis, term.relative) {
                (AddressAxis::MemoryRow, false) => row = value,
                (AddressAxis::ScreenRow, false) => row = value + start,
                (AddressAxis::MemoryRow | AddressAxis::ScreenRow, true) => row += value,
                (AddressAxis::Column, false) => col = value,
                (AddressAxis::Column, true) => col += value,
            }
        }
        self.screen.set_cursor_rel_memory(saturate(row), saturate(col));
    }

    fn apply_key_labels(&mut self, cmd: KeyLabelCommand) {
        match cmd {
            KeyLabelCommand::Hide => self.screen.modes_mut().set_key_labels(false),
            KeyLabelCommand::ShowModeKeys => self.show_bank(KeyBank::Mode),
            KeyLabelCommand::ShowUserKeys => self.show_bank(KeyBank::User),
            KeyLabelCommand::Inert(code) => {
                debug!(code = %char::from(code), "key label command without effect");
            }
        }
    }

    fn show_bank(&mut self, bank: KeyBank) {
        self.screen.soft_keys_mut().select(bank);
        self.screen.modes_mut().set_key_labels(true);
    }
}

/// Surface wrapper that keeps [`GraphicsState`] in step with plot output.
struct Tracked<'a, G> {
    surface: &'a mut G,
    graphics: &'a mut GraphicsState,
}

impl<G: GraphicsSurface> GraphicsSurface for Tracked<'_, G> {
    fn moveto(&mut self, point: Point) {
        self.graphics.record_move(point);
        self.surface.moveto(point);
    }

    fn lineto(&mut self, point: Point) {
        self.graphics.record_draw(point);
        self.surface.lineto(point);
    }

    fn fill_polygon(&mut self, points: &[Point]) {
        self.surface.fill_polygon(points);
    }
}

fn count(n: i32) -> usize {
    usize::try_from(n).unwrap_or(0)
}

fn saturate(value: i64) -> i32 {
    value.clamp(i64::from(i32::MIN), i64::from(i32::MAX)) as i32
}
