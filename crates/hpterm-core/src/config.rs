//! Session configuration.
//!
//! One value carries every per-session switch; it is handed to
//! [`Terminal::with_config`](crate::Terminal::with_config) and never stored
//! globally. Environment parsing collects all problems instead of stopping at
//! the first, and a bad value leaves the default in place.

use std::env;
use std::fmt;
use std::path::PathBuf;
use std::time::Duration;

use crate::ring::DEFAULT_RING_CAPACITY;

const ENV_TERMINAL: &str = "HPTERM_TERMINAL";
const ENV_ENQ_ACK: &str = "HPTERM_ENQ_ACK";
const ENV_ANSWERBACK: &str = "HPTERM_ANSWERBACK";
const ENV_SOUND: &str = "HPTERM_SOUND";
const ENV_REMOTE: &str = "HPTERM_REMOTE";
const ENV_LOCAL_KEYS: &str = "HPTERM_LOCAL_KEYS";
const ENV_CPM_HIGH_BIT: &str = "HPTERM_CPM_HIGH_BIT";
const ENV_TAPE_PATH: &str = "HPTERM_TAPE_PATH";
const ENV_TRACE: &str = "HPTERM_TRACE";

const MAX_PACING: Duration = Duration::from_secs(1);
const MAX_IDLE_POLL: Duration = Duration::from_secs(1);

/// Emulated terminal model.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum TerminalId {
    Ansi,
    Hp2648A,
    #[default]
    Hp2627A,
}

impl TerminalId {
    /// Accepts `ansi`/`vt100`, `2648a`, `2627a` (case-insensitive, optional `hp` prefix).
    #[must_use]
    pub fn parse(value: &str) -> Option<Self> {
        let value = value.trim().to_ascii_lowercase();
        match value.strip_prefix("hp").unwrap_or(&value) {
            "ansi" | "vt100" => Some(Self::Ansi),
            "2648a" | "2648" => Some(Self::Hp2648A),
            "2627a" | "2627" => Some(Self::Hp2627A),
            _ => None,
        }
    }

    /// Default answerback string.
    #[must_use]
    pub const fn answerback(self) -> &'static str {
        match self {
            Self::Ansi => "VT100",
            Self::Hp2648A => "2648A",
            Self::Hp2627A => "2627A",
        }
    }

    /// Native graphics size in dots.
    #[must_use]
    pub const fn graphics_size(self) -> (u32, u32) {
        match self {
            Self::Ansi => (640, 480),
            Self::Hp2648A => (720, 360),
            Self::Hp2627A => (512, 390),
        }
    }

    /// Unit marker in the display size reply.
    #[must_use]
    pub const fn size_digit(self) -> char {
        match self {
            Self::Hp2627A => '2',
            _ => '3',
        }
    }

    /// Bytes a cursor key sends to the host.
    #[must_use]
    pub const fn cursor_key(self, key: CursorKey) -> &'static [u8] {
        match (self, key) {
            (Self::Ansi, CursorKey::Up) => b"\x1b[A",
            (Self::Ansi, CursorKey::Down) => b"\x1b[B",
            (Self::Ansi, CursorKey::Right) => b"\x1b[C",
            (Self::Ansi, CursorKey::Left) => b"\x1b[D",
            (_, CursorKey::Up) => b"\x01",
            (_, CursorKey::Down) => b"\x02",
            (_, CursorKey::Right) => b"\x03",
            (_, CursorKey::Left) => b"\x04",
        }
    }
}

impl fmt::Display for TerminalId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Ansi => "ANSI",
            Self::Hp2648A => "2648A",
            Self::Hp2627A => "2627A",
        })
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CursorKey {
    Up,
    Down,
    Left,
    Right,
}

/// Per-session settings.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SessionConfig {
    pub terminal_id: TerminalId,
    /// Answer ENQ with a deferred ACK instead of the answerback.
    pub enq_ack: bool,
    pub answerback: String,
    pub enter_byte: u8,
    pub sound: bool,
    /// Start with the host link active; local echo otherwise.
    pub remote: bool,
    /// Cursor and editing keys act locally instead of being sent.
    pub local_keys: bool,
    /// Render high-bit bytes as inverse 7-bit characters.
    pub cpm_high_bit: bool,
    pub tape_path: PathBuf,
    pub transfer_pacing: Duration,
    pub idle_poll: Duration,
    pub ring_capacity: usize,
    /// 0 = warnings, 1 = info, 2 = debug, 3+ = trace.
    pub trace_level: u8,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self::for_terminal(TerminalId::default())
    }
}

/// Configuration parse diagnostics (env + validation).
#[derive(Debug, Clone)]
pub struct SessionConfigParse {
    pub config: SessionConfig,
    pub errors: Vec<ConfigError>,
}

/// Configuration error with field context.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConfigError {
    pub field: &'static str,
    pub value: String,
    pub message: String,
}

impl ConfigError {
    fn new(field: &'static str, value: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            field,
            value: value.into(),
            message: message.into(),
        }
    }
}

impl fmt::Display for ConfigError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}={} ({})", self.field, self.value, self.message)
    }
}

impl std::error::Error for ConfigError {}

impl SessionConfig {
    /// Defaults for `id`, including its answerback.
    #[must_use]
    pub fn for_terminal(id: TerminalId) -> Self {
        Self {
            terminal_id: id,
            enq_ack: true,
            answerback: id.answerback().to_owned(),
            enter_byte: b'\r',
            sound: true,
            remote: true,
            local_keys: true,
            cpm_high_bit: false,
            tape_path: PathBuf::from("LTape.raw"),
            transfer_pacing: Duration::from_millis(10),
            idle_poll: Duration::from_millis(10),
            ring_capacity: DEFAULT_RING_CAPACITY,
            trace_level: 0,
        }
    }

    /// Parse config from environment variables.
    #[must_use]
    pub fn from_env() -> SessionConfigParse {
        Self::from_env_with(|key| env::var(key).ok())
    }

    /// Parse config from a key lookup; unset keys keep their defaults.
    pub fn from_env_with<F>(mut get: F) -> SessionConfigParse
    where
        F: FnMut(&str) -> Option<String>,
    {
        let mut config = Self::default();
        let mut errors = Vec::new();

        if let Some(value) = get(ENV_TERMINAL) {
            match TerminalId::parse(&value) {
                Some(id) => config = Self::for_terminal(id),
                None => errors.push(ConfigError::new(
                    "terminal",
                    value,
                    "expected ansi|2648a|2627a",
                )),
            }
        }

        let bools: [(&str, &'static str, &mut bool); 5] = [
            (ENV_ENQ_ACK, "enq_ack", &mut config.enq_ack),
            (ENV_SOUND, "sound", &mut config.sound),
            (ENV_REMOTE, "remote", &mut config.remote),
            (ENV_LOCAL_KEYS, "local_keys", &mut config.local_keys),
            (ENV_CPM_HIGH_BIT, "cpm_high_bit", &mut config.cpm_high_bit),
        ];
        for (key, field, slot) in bools {
            if let Some(value) = get(key) {
                match parse_bool(&value) {
                    Some(parsed) => *slot = parsed,
                    None => errors.push(ConfigError::new(
                        field,
                        value,
                        "expected bool (1/0/true/false)",
                    )),
                }
            }
        }

        if let Some(value) = get(ENV_ANSWERBACK) {
            config.answerback = value;
        }

        if let Some(value) = get(ENV_TAPE_PATH) {
            config.tape_path = PathBuf::from(value);
        }

        if let Some(value) = get(ENV_TRACE) {
            match value.trim().parse::<u8>() {
                Ok(level) => config.trace_level = level,
                Err(_) => errors.push(ConfigError::new(
                    "trace_level",
                    value,
                    "expected integer 0-255",
                )),
            }
        }

        if let Err(mut validation) = config.validate() {
            errors.append(&mut validation);
        }

        SessionConfigParse { config, errors }
    }

    /// Validate config constraints and return all violations.
    pub fn validate(&self) -> Result<(), Vec<ConfigError>> {
        let mut errors = Vec::new();
        if self.ring_capacity < 2 {
            errors.push(ConfigError::new(
                "ring_capacity",
                self.ring_capacity.to_string(),
                "must be >= 2",
            ));
        }
        if self.answerback.is_empty() {
            errors.push(ConfigError::new("answerback", "", "must not be empty"));
        }
        if self.transfer_pacing > MAX_PACING {
            errors.push(ConfigError::new(
                "transfer_pacing",
                format!("{:?}", self.transfer_pacing),
                "must be <= 1s",
            ));
        }
        if self.idle_poll.is_zero() || self.idle_poll > MAX_IDLE_POLL {
            errors.push(ConfigError::new(
                "idle_poll",
                format!("{:?}", self.idle_poll),
                "must be within 1ns..=1s",
            ));
        }
        if errors.is_empty() {
            Ok(())
        } else {
            Err(errors)
        }
    }

    /// `tracing` filter directive for `trace_level`.
    #[must_use]
    pub fn trace_directive(&self) -> &'static str {
        match self.trace_level {
            0 => "warn",
            1 => "info",
            2 => "debug",
            _ => "trace",
        }
    }
}

#[inline]
fn parse_bool(value: &str) -> Option<bool> {
    match value.trim().to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Some(true),
        "0" | "false" | "no" | "off" => Some(false),
        _ => None,
    }
}
