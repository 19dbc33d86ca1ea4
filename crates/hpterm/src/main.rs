#![forbid(unsafe_code)]

//! `hpterm` binary entry point.
//!
//! Opens the selected host transport, runs a [`Session`] until the host
//! closes its side, then optionally prints the final screen text.

mod cli;
mod transport;

use std::fs::File;
use std::io::{self, BufWriter};
use std::process;
use std::thread;
use std::time::Duration;

use hpterm_core::{
    FileTransferSource, GraphicsSurface, HpglRecorder, NullSurface, Session, SessionConfig,
    Terminal, TerminalEvent, WriterLink,
};
use tracing::{debug, warn};
use tracing_subscriber::EnvFilter;

use crate::cli::{Mode, Opts};
use crate::transport::{Host, HostWriter};

const EVENT_POLL: Duration = Duration::from_millis(20);

type Link = WriterLink<HostWriter>;

fn main() {
    let opts = Opts::parse();
    init_tracing(&opts.config);
    for err in &opts.config_errors {
        warn!(%err, "ignoring environment setting");
    }
    if let Err(errors) = opts.config.validate() {
        for err in errors {
            eprintln!("Invalid configuration: {err}");
        }
        process::exit(1);
    }

    if let Err(err) = run(&opts) {
        eprintln!("hpterm: {err}");
        process::exit(1);
    }
}

fn init_tracing(config: &SessionConfig) {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(config.trace_directive()));
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(io::stderr)
        .try_init();
}

fn run(opts: &Opts) -> io::Result<()> {
    let host = match &opts.mode {
        Mode::Connect(addr) => Host::connect(addr)?,
        Mode::Run(command) => Host::spawn(command, opts.config.terminal_id)?,
        Mode::Replay(path) => Host::replay(path)?,
    };

    let screen_text = match &opts.hpgl {
        Some(path) => {
            let out = BufWriter::new(File::create(path)?);
            let terminal = drive(opts, host, HpglRecorder::new(NullSurface, out))?;
            let text = terminal.screen().visible_text();
            let (_, recorder) = terminal.into_parts();
            let (_, out) = recorder.finish();
            if out.is_none() {
                warn!(path = %path.display(), "HP-GL capture incomplete");
            }
            text
        }
        None => drive(opts, host, NullSurface)?.screen().visible_text(),
    };

    if opts.dump {
        println!("{screen_text}");
    }
    Ok(())
}

/// Run a session over `host` until the host closes, and return the terminal.
fn drive<G>(opts: &Opts, host: Host, surface: G) -> io::Result<Terminal<Link, G>>
where
    G: GraphicsSurface + Send + 'static,
{
    let interactive = host.interactive;
    let (link, reader, child) = host.into_parts();
    let terminal = Terminal::with_config(opts.config.clone(), link, surface)
        .with_transfer_source(FileTransferSource::new(opts.config.tape_path.clone()));

    let session = Session::spawn(terminal)?;
    let reader = transport::pump(reader, session.producer())?;
    if interactive {
        transport::forward_keyboard(session.commands())?;
    }

    while !reader.is_finished() {
        report_events(&session);
        thread::sleep(EVENT_POLL);
    }
    match reader.join() {
        Ok(Ok(bytes)) => debug!(bytes, "host finished"),
        Ok(Err(err)) => debug!(error = %err, "host read ended"),
        Err(_) => warn!("reader thread panicked"),
    }
    report_events(&session);

    let terminal = session
        .shutdown()
        .ok_or_else(|| io::Error::other("session thread panicked"))?;
    child.wait();
    Ok(terminal)
}

fn report_events<G>(session: &Session<Link, G>)
where
    G: GraphicsSurface + Send + 'static,
{
    while let Some(event) = session.try_event() {
        match event {
            TerminalEvent::Bell => eprint!("\x07"),
            TerminalEvent::LinkLost(reason) => eprintln!("hpterm: {reason}"),
        }
    }
}
