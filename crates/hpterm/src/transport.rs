//! Host transports: TCP, pseudo-terminal child, and capture replay.
//!
//! Each transport yields a reader for host output and a writer for the
//! [`WriterLink`]. The reader is drained on its own thread into the
//! session's [`RingProducer`], waiting whenever the ring is full so host
//! bytes are never overrun. Local keystrokes come from stdin on a second
//! thread.

use std::fmt;
use std::fs::File;
use std::io::{self, Read, Write};
use std::net::TcpStream;
use std::path::Path;
use std::sync::mpsc::SyncSender;
use std::thread::{self, JoinHandle};
use std::time::Duration;

use hpterm_core::{KeyEvent, RingProducer, SessionCommand, TerminalId, WriterLink};
use portable_pty::{Child, CommandBuilder, MasterPty, PtySize};
use tracing::{debug, info, warn};

/// Link type shared by every transport.
pub type HostWriter = Box<dyn Write + Send>;

const READ_CHUNK: usize = 4096;
const RING_FULL_WAIT: Duration = Duration::from_millis(1);

/// An opened host connection.
pub struct Host {
    pub link: WriterLink<HostWriter>,
    pub reader: Box<dyn Read + Send>,
    /// Whether local keystrokes should be forwarded.
    pub interactive: bool,
    child: Option<Box<dyn Child + Send + Sync>>,
    master: Option<Box<dyn MasterPty + Send>>,
}

impl fmt::Debug for Host {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Host")
            .field("interactive", &self.interactive)
            .field("child_pid", &self.child.as_ref().and_then(|c| c.process_id()))
            .finish_non_exhaustive()
    }
}

impl Host {
    /// Open a TCP connection to `addr`.
    pub fn connect(addr: &str) -> io::Result<Self> {
        let stream = TcpStream::connect(addr)?;
        stream.set_nodelay(true)?;
        let reader = stream.try_clone()?;
        info!(%addr, "connected");
        Ok(Self {
            link: WriterLink::new(Box::new(stream)),
            reader: Box::new(reader),
            interactive: true,
            child: None,
            master: None,
        })
    }

    /// Spawn `command` on an 80x24 pseudo-terminal with `TERM` set for `id`.
    pub fn spawn(command: &[String], id: TerminalId) -> io::Result<Self> {
        let (program, args) = command
            .split_first()
            .ok_or_else(|| io::Error::new(io::ErrorKind::InvalidInput, "empty command"))?;

        let mut cmd = CommandBuilder::new(program);
        cmd.args(args);
        cmd.env("TERM", term_name(id));

        let pair = portable_pty::native_pty_system()
            .openpty(PtySize {
                rows: 24,
                cols: 80,
                pixel_width: 0,
                pixel_height: 0,
            })
            .map_err(portable_pty_error)?;

        let child = pair.slave.spawn_command(cmd).map_err(portable_pty_error)?;
        drop(pair.slave);
        let reader = pair.master.try_clone_reader().map_err(portable_pty_error)?;
        let writer = pair.master.take_writer().map_err(portable_pty_error)?;
        info!(program = %program, pid = ?child.process_id(), "spawned");

        Ok(Self {
            link: WriterLink::new(writer),
            reader,
            interactive: true,
            child: Some(child),
            master: Some(pair.master),
        })
    }

    /// Replay captured host output from `path`. Replies are discarded.
    pub fn replay(path: &Path) -> io::Result<Self> {
        let file = File::open(path)?;
        info!(path = %path.display(), "replaying");
        Ok(Self {
            link: WriterLink::new(Box::new(io::sink())),
            reader: Box::new(file),
            interactive: false,
            child: None,
            master: None,
        })
    }

    /// Split into the link and reader, keeping any child handle for [`ChildGuard::wait`].
    pub fn into_parts(self) -> (WriterLink<HostWriter>, Box<dyn Read + Send>, ChildGuard) {
        (
            self.link,
            self.reader,
            ChildGuard {
                child: self.child,
                _master: self.master,
            },
        )
    }
}

/// Keeps the PTY master and child alive until the session ends.
pub struct ChildGuard {
    child: Option<Box<dyn Child + Send + Sync>>,
    _master: Option<Box<dyn MasterPty + Send>>,
}

impl ChildGuard {
    /// Reap the child, if there is one.
    pub fn wait(mut self) {
        let Some(child) = self.child.as_mut() else {
            return;
        };
        match child.wait() {
            Ok(status) => debug!(code = status.exit_code(), "child exited"),
            Err(err) => warn!(error = %err, "child wait failed"),
        }
    }
}

/// `TERM` value advertised to a spawned child.
#[must_use]
pub fn term_name(id: TerminalId) -> &'static str {
    match id {
        TerminalId::Ansi => "vt100",
        TerminalId::Hp2648A => "hp2648a",
        TerminalId::Hp2627A => "hp2627a",
    }
}

/// Copy host output into the ring on a thread named `hpterm-reader`.
/// The thread returns the byte count once the host closes the stream.
pub fn pump<R>(mut reader: R, producer: RingProducer) -> io::Result<JoinHandle<io::Result<u64>>>
where
    R: Read + Send + 'static,
{
    thread::Builder::new()
        .name("hpterm-reader".into())
        .spawn(move || {
            let mut buf = [0u8; READ_CHUNK];
            let mut total = 0u64;
            loop {
                let n = match reader.read(&mut buf) {
                    Ok(0) => break,
                    Ok(n) => n,
                    Err(err) if err.kind() == io::ErrorKind::Interrupted => continue,
                    Err(err) => return Err(err),
                };
                push_all(&producer, &buf[..n]);
                total += n as u64;
            }
            debug!(bytes = total, "host stream closed");
            Ok(total)
        })
}

fn push_all(producer: &RingProducer, mut bytes: &[u8]) {
    while !bytes.is_empty() {
        let room = producer.free().min(bytes.len());
        if room == 0 {
            thread::sleep(RING_FULL_WAIT);
            continue;
        }
        let (chunk, rest) = bytes.split_at(room);
        producer.push_bytes(chunk);
        bytes = rest;
    }
}

/// Local key for a byte typed on stdin.
#[must_use]
pub fn key_for_byte(byte: u8) -> KeyEvent {
    match byte {
        b'\n' => KeyEvent::Enter,
        other => KeyEvent::Char(other),
    }
}

/// Forward stdin to the session as keystrokes. The thread is detached; it
/// ends when stdin closes or the session stops listening.
pub fn forward_keyboard(commands: SyncSender<SessionCommand>) -> io::Result<()> {
    thread::Builder::new()
        .name("hpterm-keyboard".into())
        .spawn(move || {
            let mut stdin = io::stdin().lock();
            let mut buf = [0u8; 256];
            loop {
                let n = match stdin.read(&mut buf) {
                    Ok(0) | Err(_) => return,
                    Ok(n) => n,
                };
                for &byte in &buf[..n] {
                    if commands
                        .send(SessionCommand::Key(key_for_byte(byte)))
                        .is_err()
                    {
                        return;
                    }
                }
            }
        })?;
    Ok(())
}

fn portable_pty_error<E: fmt::Display>(err: E) -> io::Error {
    io::Error::other(err.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;
    use hpterm_core::SharedRing;
    use pretty_assertions::assert_eq;

    #[test]
    fn pump_delivers_everything_through_a_small_ring() {
        let ring = SharedRing::new(8);
        let data: Vec<u8> = (0..200u8).collect();
        let handle = pump(io::Cursor::new(data.clone()), ring.producer()).unwrap();

        let mut received = Vec::new();
        while received.len() < data.len() {
            match ring.pop() {
                Some(byte) => received.push(byte),
                None => thread::yield_now(),
            }
        }
        assert_eq!(handle.join().unwrap().unwrap(), 200);
        assert_eq!(received, data);
        assert_eq!(ring.lock().overruns(), 0);
    }

    #[test]
    fn newline_is_enter() {
        assert_eq!(key_for_byte(b'\n'), KeyEvent::Enter);
        assert_eq!(key_for_byte(b'q'), KeyEvent::Char(b'q'));
    }

    #[test]
    fn term_names() {
        assert_eq!(term_name(TerminalId::Ansi), "vt100");
        assert_eq!(term_name(TerminalId::Hp2627A), "hp2627a");
    }

    #[test]
    fn replay_of_missing_file_fails() {
        let err = Host::replay(Path::new("/nonexistent/hpterm-capture")).unwrap_err();
        assert_eq!(err.kind(), io::ErrorKind::NotFound);
    }
}
