//! Consumer thread for a live session.
//!
//! The transport pushes host bytes through a [`RingProducer`]; the session
//! thread steps the [`Terminal`] and sleeps for the configured idle interval
//! whenever the ring runs dry. Keys and shutdown arrive over a command
//! channel. Stopping the session returns the terminal so callers can inspect
//! the final screen.

use std::io;
use std::sync::mpsc;
use std::thread::{self, JoinHandle};

use tracing::debug;

use crate::keys::KeyEvent;
use crate::ring::RingProducer;
use crate::surface::{GraphicsSurface, HostLink};
use crate::terminal::{Terminal, TerminalEvent};

/// Channel capacity for session commands.
const COMMAND_CAPACITY: usize = 64;

/// Messages to the session thread.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionCommand {
    /// Apply a key press to the terminal.
    Key(KeyEvent),
    /// Drain the ring and stop the thread.
    Shutdown,
}

/// A [`Terminal`] running on its own thread, fed through a byte ring.
pub struct Session<L, G> {
    producer: RingProducer,
    sender: mpsc::SyncSender<SessionCommand>,
    events: mpsc::Receiver<TerminalEvent>,
    handle: Option<JoinHandle<Terminal<L, G>>>,
}

impl<L, G> Session<L, G>
where
    L: HostLink + Send + 'static,
    G: GraphicsSurface + Send + 'static,
{
    /// Move `terminal` onto a thread named `hpterm-session`.
    pub fn spawn(terminal: Terminal<L, G>) -> io::Result<Self> {
        let producer = terminal.producer();
        let (tx, rx) = mpsc::sync_channel::<SessionCommand>(COMMAND_CAPACITY);
        let (event_tx, event_rx) = mpsc::channel::<TerminalEvent>();

        let handle = thread::Builder::new()
            .name("hpterm-session".into())
            .spawn(move || session_loop(terminal, &rx, &event_tx))?;

        Ok(Self {
            producer,
            sender: tx,
            events: event_rx,
            handle: Some(handle),
        })
    }

    /// Handle for the transport reader.
    #[must_use]
    pub fn producer(&self) -> RingProducer {
        self.producer.clone()
    }

    /// Command sender for threads that outlive a borrow of the session.
    #[must_use]
    pub fn commands(&self) -> mpsc::SyncSender<SessionCommand> {
        self.sender.clone()
    }

    /// Queue a key press; fails once the session thread has stopped.
    pub fn send_key(&self, key: KeyEvent) -> Result<(), mpsc::SendError<SessionCommand>> {
        self.sender.send(SessionCommand::Key(key))
    }

    /// Next pending terminal event, if any.
    pub fn try_event(&self) -> Option<TerminalEvent> {
        self.events.try_recv().ok()
    }

    /// Stop the thread after it has drained the ring, and return the terminal.
    /// `None` if the session thread panicked.
    pub fn shutdown(mut self) -> Option<Terminal<L, G>> {
        let _ = self.sender.send(SessionCommand::Shutdown);
        self.handle.take().and_then(|handle| handle.join().ok())
    }
}

impl<L, G> Drop for Session<L, G> {
    fn drop(&mut self) {
        let _ = self.sender.send(SessionCommand::Shutdown);
        if let Some(handle) = self.handle.take() {
            let _ = handle.join();
        }
    }
}

fn session_loop<L: HostLink, G: GraphicsSurface>(
    mut terminal: Terminal<L, G>,
    commands: &mpsc::Receiver<SessionCommand>,
    events: &mpsc::Sender<TerminalEvent>,
) -> Terminal<L, G> {
    let idle_poll = terminal.config().idle_poll;
    loop {
        let mut shutdown = false;
        loop {
            match commands.try_recv() {
                Ok(SessionCommand::Key(key)) => {
                    let outcome = terminal.handle_key(key);
                    debug!(?key, ?outcome, "key");
                }
                Ok(SessionCommand::Shutdown) | Err(mpsc::TryRecvError::Disconnected) => {
                    shutdown = true;
                    break;
                }
                Err(mpsc::TryRecvError::Empty) => break,
            }
        }

        let busy = terminal.step();
        for event in terminal.drain_events() {
            if let Err(mpsc::SendError(event)) = events.send(event) {
                debug!(?event, "event receiver gone, dropping remaining events");
                break;
            }
        }

        if shutdown {
            terminal.run_until_idle();
            debug!("session stopped");
            return terminal;
        }
        if !busy {
            thread::sleep(idle_poll);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::surface::{RecordingLink, RecordingSurface};

    #[test]
    fn bytes_from_producer_reach_the_screen() {
        let terminal = Terminal::new(RecordingLink::new(), RecordingSurface::new());
        let session = Session::spawn(terminal).unwrap();
        session.producer().push_bytes(b"LIVE\x07");
        let terminal = session.shutdown().unwrap();
        assert_eq!(terminal.screen().visible_text(), "LIVE");
    }

    #[test]
    fn keys_are_applied_on_the_session_thread() {
        let terminal = Terminal::new(RecordingLink::new(), RecordingSurface::new());
        let session = Session::spawn(terminal).unwrap();
        session.send_key(KeyEvent::Char(b'k')).unwrap();
        let terminal = session.shutdown().unwrap();
        assert_eq!(terminal.link().sent(), b"k");
    }

    #[test]
    fn session_keeps_running_after_the_event_receiver_is_dropped() {
        let terminal = Terminal::new(RecordingLink::new(), RecordingSurface::new());
        let mut session = Session::spawn(terminal).unwrap();
        let (_, detached) = mpsc::channel();
        drop(std::mem::replace(&mut session.events, detached));
        session.producer().push_bytes(b"\x07\x07");
        session.send_key(KeyEvent::Char(b'k')).unwrap();
        let terminal = session.shutdown().unwrap();
        assert_eq!(terminal.link().sent(), b"k");
    }
}
