//! Status replies and the DC1-gated response channel.
//!
//! Most replies are not written immediately: they are *armed* and go out
//! when the host polls with `DC1`. A newer reply replaces an unsent one.
//! A few answers (ANSI cursor report, unsupported status codes, ENQ without
//! ACK handshake) bypass the gate.
//!
//! When the link fails the channel permanently switches to local echo and
//! everything it would have sent is rendered on the screen instead.

use std::fmt;

use tracing::{debug, warn};

use crate::screen::ScreenBuffer;
use crate::surface::{ClickEvent, HostLink, Point};

pub const ACK: u8 = 0x06;

/// `ESC ^` reply.
pub const PRIMARY_STATUS: &str = "\x1b\\8000020\r";
/// `ESC ~` reply.
pub const SECONDARY_STATUS: &str = "\x1b|4506000\r";
/// `ESC * s 8 ^` reply.
pub const ZOOM_STATUS: &str = "001.,0\r";
/// Reply to status codes without an answer; sent ungated.
pub const UNSUPPORTED_STATUS: &str = "0\r";

// ── Formatting ──────────────────────────────────────────────────────

/// `ESC a`: cursor column and absolute memory row.
#[must_use]
pub fn cursor_sense(col: u16, memory_row: usize) -> String {
    format!("\x1b&a{col:03}c{memory_row:03}R\r")
}

/// `CSI 6 n`: column first, then viewport row.
#[must_use]
pub fn ansi_cursor_report(col: u16, row: u16) -> String {
    format!("\x1b[{col:03};{row:03}R\r")
}

/// `ESC * s 2 ^`: pen position and pen state.
#[must_use]
pub fn pen_report(pen: Point, pen_down: bool) -> String {
    format!("+{:05},+{:05},{}\r", pen.x, pen.y, u8::from(pen_down))
}

/// `ESC * s 3 ^`: graphics cursor position.
#[must_use]
pub fn graphics_cursor_report(cursor: Point) -> String {
    format!("+{:05},+{:05}\r", cursor.x, cursor.y)
}

/// Answer to a `ESC * s 4 ^` click wait.
#[must_use]
pub fn click_report(click: ClickEvent) -> String {
    format!(
        "+{:05},+{:05},{:03}\r",
        click.position.x, click.position.y, click.code
    )
}

/// `ESC * s 5 ^`: display extent. `digit` is the model-specific unit marker.
#[must_use]
pub fn display_size_report(width: u32, height: u32, digit: char) -> String {
    format!(
        "+00000,+00000,+{:05},+{:05},0000{digit}.,0000{digit}.\r",
        width.saturating_sub(1),
        height.saturating_sub(1)
    )
}

/// `ESC * s 1 ^` and ENQ without handshake.
#[must_use]
pub fn answerback(id: &str) -> String {
    format!("{id}\r")
}

// ── Channel ─────────────────────────────────────────────────────────

/// Why the channel switched to local echo.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Downgrade {
    pub reason: String,
}

impl fmt::Display for Downgrade {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "host link lost, local mode: {}", self.reason)
    }
}

/// Outbound side of the terminal.
#[derive(Debug)]
pub struct ResponseChannel<L> {
    link: L,
    remote: bool,
    pending: Option<String>,
    pending_ack: bool,
    downgrade: Option<Downgrade>,
}

impl<L: HostLink> ResponseChannel<L> {
    /// A channel that starts remote when `remote` is set, local otherwise.
    pub fn new(link: L, remote: bool) -> Self {
        Self {
            link,
            remote,
            pending: None,
            pending_ack: false,
            downgrade: None,
        }
    }

    #[must_use]
    pub fn is_remote(&self) -> bool {
        self.remote
    }

    #[must_use]
    pub fn link(&self) -> &L {
        &self.link
    }

    pub fn link_mut(&mut self) -> &mut L {
        &mut self.link
    }

    pub fn into_link(self) -> L {
        self.link
    }

    /// Reply waiting for the next `DC1`.
    #[must_use]
    pub fn pending(&self) -> Option<&str> {
        self.pending.as_deref()
    }

    #[must_use]
    pub fn ack_pending(&self) -> bool {
        self.pending_ack
    }

    /// Arm `reply`, replacing any unsent one.
    pub fn arm(&mut self, reply: impl Into<String>) {
        let reply = reply.into();
        if let Some(old) = self.pending.replace(reply) {
            debug!(dropped = %old.escape_debug(), "armed reply replaced");
        }
    }

    /// `DC1` from the host: send the armed reply, if any.
    pub fn release(&mut self, screen: &mut ScreenBuffer) {
        if let Some(reply) = self.pending.take() {
            debug!(reply = %reply.escape_debug(), "DC1 release");
            self.send_str(&reply, screen);
        }
    }

    /// Remember to answer ENQ with ACK once the input is idle.
    pub fn queue_ack(&mut self) {
        self.pending_ack = true;
    }

    /// Send a queued ACK.
    pub fn flush_ack(&mut self, screen: &mut ScreenBuffer) {
        if std::mem::take(&mut self.pending_ack) {
            debug!("ACK sent");
            self.send_byte(ACK, screen);
        }
    }

    pub fn send_str(&mut self, text: &str, screen: &mut ScreenBuffer) {
        self.send_bytes(text.as_bytes(), screen);
    }

    pub fn send_byte(&mut self, byte: u8, screen: &mut ScreenBuffer) {
        self.send_bytes(&[byte], screen);
    }

    /// Write to the host, or render locally once the link is gone.
    pub fn send_bytes(&mut self, bytes: &[u8], screen: &mut ScreenBuffer) {
        if !self.remote {
            screen.put_bytes(bytes);
            return;
        }
        if let Err(err) = self.link.send_bytes(bytes) {
            warn!(error = %err, "host write failed; switching to local mode");
            self.remote = false;
            let downgrade = Downgrade {
                reason: err.to_string(),
            };
            screen.put_str(&format!("\r\n{downgrade}\r\n"));
            self.downgrade = Some(downgrade);
        }
    }

    /// The downgrade notice, once.
    pub fn take_downgrade(&mut self) -> Option<Downgrade> {
        self.downgrade.take()
    }
}
