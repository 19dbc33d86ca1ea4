//! Command-line argument parsing for `hpterm`.
//!
//! Arguments are parsed by hand. Session settings start from the
//! `HPTERM_*` environment (see [`SessionConfig::from_env_with`]) and explicit
//! flags override them.

use std::env;
use std::path::PathBuf;
use std::process;

use hpterm_core::{ConfigError, SessionConfig, TerminalId};

const VERSION: &str = env!("CARGO_PKG_VERSION");

const HELP_TEXT: &str = "\
hpterm: HP 2627A / 2648A terminal engine

USAGE:
    hpterm [OPTIONS] connect HOST:PORT
    hpterm [OPTIONS] run -- COMMAND [ARGS...]
    hpterm [OPTIONS] replay FILE

OPTIONS:
    --terminal=ID        Terminal model: '2627A', '2648A', or 'ANSI' (default: 2627A)
    --no-enq-ack         Answer ENQ with the answerback string instead of ACK
    --answerback=TEXT    Override the answerback string
    --hpgl=PATH          Write plot output as HP-GL to PATH
    --dump               Print the visible screen text on exit
    --help, -h           Show this help message
    --version, -V        Show version

KEYBOARD:
    Lines typed on stdin are sent to the host as keystrokes; newline sends
    the configured enter byte.

ENVIRONMENT VARIABLES:
    HPTERM_TERMINAL      Terminal model (overridden by --terminal)
    HPTERM_ENQ_ACK       ENQ/ACK handshake (1/true, 0/false)
    HPTERM_ANSWERBACK    Answerback string
    HPTERM_SOUND         Ring the bell (1/true, 0/false)
    HPTERM_REMOTE        Start in remote mode (1/true, 0/false)
    HPTERM_LOCAL_KEYS    Interpret editing keys locally (1/true, 0/false)
    HPTERM_CPM_HIGH_BIT  Render high-bit bytes in inverse (1/true, 0/false)
    HPTERM_TAPE_PATH     File served by the ESC e transfer
    HPTERM_TRACE         Log verbosity 0..3 (RUST_LOG wins when set)";

/// Where host bytes come from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Mode {
    /// TCP connection to `HOST:PORT`.
    Connect(String),
    /// Child process on a pseudo-terminal.
    Run(Vec<String>),
    /// Captured host output read from a file.
    Replay(PathBuf),
}

/// Parsed command-line options.
#[derive(Debug, Clone)]
pub struct Opts {
    pub config: SessionConfig,
    /// Environment values that failed to parse; defaults were kept.
    pub config_errors: Vec<ConfigError>,
    pub hpgl: Option<PathBuf>,
    pub dump: bool,
    pub mode: Mode,
}

#[derive(Debug, Clone, PartialEq, Eq)]
enum ParseError {
    Help,
    Version,
    InvalidValue { flag: &'static str, value: String },
    UnknownArg(String),
    MissingMode,
    MissingOperand(&'static str),
}

impl Opts {
    /// Parse command-line arguments and environment variables.
    pub fn parse() -> Self {
        match Self::parse_from_env_and_args(env::args().skip(1), |key| env::var(key).ok()) {
            Ok(opts) => opts,
            Err(ParseError::Help) => {
                println!("{HELP_TEXT}");
                process::exit(0);
            }
            Err(ParseError::Version) => {
                println!("hpterm {VERSION}");
                process::exit(0);
            }
            Err(ParseError::InvalidValue { flag, value }) => {
                eprintln!("Invalid {flag} value: {value}");
                process::exit(1);
            }
            Err(ParseError::UnknownArg(arg)) => {
                eprintln!("Unknown argument: {arg}");
                eprintln!("Run with --help for usage information.");
                process::exit(1);
            }
            Err(ParseError::MissingMode) => {
                eprintln!("Expected one of: connect, run, replay");
                eprintln!("Run with --help for usage information.");
                process::exit(1);
            }
            Err(ParseError::MissingOperand(mode)) => {
                eprintln!("Missing operand for '{mode}'");
                process::exit(1);
            }
        }
    }

    fn parse_from_env_and_args<I, S, F>(args: I, get_env: F) -> Result<Self, ParseError>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
        F: Fn(&str) -> Option<String>,
    {
        let parsed = SessionConfig::from_env_with(get_env);
        let mut config = parsed.config;
        let mut hpgl = None;
        let mut dump = false;
        let mut answerback_flag = None;
        let mut mode = None;

        let mut args = args.into_iter().map(|arg| arg.as_ref().to_owned());
        while let Some(arg) = args.next() {
            match arg.as_str() {
                "--help" | "-h" => return Err(ParseError::Help),
                "--version" | "-V" => return Err(ParseError::Version),
                "--no-enq-ack" => config.enq_ack = false,
                "--dump" => dump = true,
                "connect" => {
                    let addr = args.next().ok_or(ParseError::MissingOperand("connect"))?;
                    mode = Some(Mode::Connect(addr));
                }
                "replay" => {
                    let path = args.next().ok_or(ParseError::MissingOperand("replay"))?;
                    mode = Some(Mode::Replay(PathBuf::from(path)));
                }
                "run" => {
                    let mut command: Vec<String> = args.by_ref().collect();
                    if command.first().is_some_and(|first| first == "--") {
                        command.remove(0);
                    }
                    if command.is_empty() {
                        return Err(ParseError::MissingOperand("run"));
                    }
                    mode = Some(Mode::Run(command));
                }
                other => {
                    if let Some(val) = other.strip_prefix("--terminal=") {
                        let id = TerminalId::parse(val).ok_or_else(|| ParseError::InvalidValue {
                            flag: "--terminal",
                            value: val.to_owned(),
                        })?;
                        config.terminal_id = id;
                        config.answerback = id.answerback().to_owned();
                    } else if let Some(val) = other.strip_prefix("--answerback=") {
                        if val.is_empty() {
                            return Err(ParseError::InvalidValue {
                                flag: "--answerback",
                                value: val.to_owned(),
                            });
                        }
                        answerback_flag = Some(val.to_owned());
                    } else if let Some(val) = other.strip_prefix("--hpgl=") {
                        if val.is_empty() {
                            return Err(ParseError::InvalidValue {
                                flag: "--hpgl",
                                value: val.to_owned(),
                            });
                        }
                        hpgl = Some(PathBuf::from(val));
                    } else {
                        return Err(ParseError::UnknownArg(other.to_owned()));
                    }
                }
            }
        }

        if let Some(answerback) = answerback_flag {
            config.answerback = answerback;
        }

        Ok(Self {
            config,
            config_errors: parsed.errors,
            hpgl,
            dump,
            mode: mode.ok_or(ParseError::MissingMode)?,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use std::collections::HashMap;

    fn parse_with_env<I, S>(args: I, env: &[(&str, &str)]) -> Result<Opts, ParseError>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let map: HashMap<String, String> = env
            .iter()
            .map(|(k, v)| ((*k).to_owned(), (*v).to_owned()))
            .collect();
        Opts::parse_from_env_and_args(args, |key| map.get(key).cloned())
    }

    fn parse(args: &[&str]) -> Result<Opts, ParseError> {
        parse_with_env(args.iter().copied(), &[])
    }

    #[test]
    fn connect_with_defaults() {
        let opts = parse(&["connect", "localhost:2000"]).unwrap();
        assert_eq!(opts.mode, Mode::Connect("localhost:2000".into()));
        assert_eq!(opts.config.terminal_id, TerminalId::Hp2627A);
        assert!(opts.config.enq_ack);
        assert!(!opts.dump);
        assert_eq!(opts.hpgl, None);
    }

    #[test]
    fn run_takes_everything_after_the_separator() {
        let opts = parse(&["--dump", "run", "--", "sh", "-c", "echo hi"]).unwrap();
        assert_eq!(
            opts.mode,
            Mode::Run(vec!["sh".into(), "-c".into(), "echo hi".into()])
        );
        assert!(opts.dump);
    }

    #[test]
    fn flags_override_environment() {
        let opts = parse_with_env(
            ["--terminal=ansi", "replay", "capture.bin"],
            &[("HPTERM_TERMINAL", "2648A"), ("HPTERM_ENQ_ACK", "1")],
        )
        .unwrap();
        assert_eq!(opts.config.terminal_id, TerminalId::Ansi);
        assert_eq!(opts.config.answerback, "VT100");
        assert!(opts.config.enq_ack);
        assert_eq!(opts.mode, Mode::Replay(PathBuf::from("capture.bin")));
    }

    #[test]
    fn environment_applies_without_flags() {
        let opts = parse_with_env(
            ["--no-enq-ack", "--hpgl=plot.hpgl", "replay", "x"],
            &[("HPTERM_TERMINAL", "2648A")],
        )
        .unwrap();
        assert_eq!(opts.config.terminal_id, TerminalId::Hp2648A);
        assert!(!opts.config.enq_ack);
        assert_eq!(opts.hpgl, Some(PathBuf::from("plot.hpgl")));
    }

    #[test]
    fn answerback_flag_wins_over_terminal_default() {
        let opts = parse(&["--answerback=LAB7", "--terminal=2648A", "replay", "x"]).unwrap();
        assert_eq!(opts.config.answerback, "LAB7");
    }

    #[test]
    fn bad_environment_is_reported_not_fatal() {
        let opts = parse_with_env(["replay", "x"], &[("HPTERM_ENQ_ACK", "maybe")]).unwrap();
        assert_eq!(opts.config_errors.len(), 1);
        assert!(opts.config.enq_ack);
    }

    #[test]
    fn errors() {
        assert_eq!(parse(&["--help"]).unwrap_err(), ParseError::Help);
        assert_eq!(parse(&["-V"]).unwrap_err(), ParseError::Version);
        assert_eq!(parse(&["--dump"]).unwrap_err(), ParseError::MissingMode);
        assert_eq!(
            parse(&["connect"]).unwrap_err(),
            ParseError::MissingOperand("connect")
        );
        assert_eq!(
            parse(&["run", "--"]).unwrap_err(),
            ParseError::MissingOperand("run")
        );
        assert_eq!(
            parse(&["--terminal=vt220", "replay", "x"]).unwrap_err(),
            ParseError::InvalidValue {
                flag: "--terminal",
                value: "vt220".into(),
            }
        );
        assert_eq!(
            parse(&["--bogus"]).unwrap_err(),
            ParseError::UnknownArg("--bogus".into())
        );
    }
}
