//! `ESC e` raw file transfer.
//!
//! The whole tape image is sent to the host one byte at a time with a fixed
//! delay between bytes, followed by two NULs. If the image cannot be read the
//! host receives two `0xFF` bytes instead.

use std::fmt;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use std::thread;
use std::time::Duration;

use tracing::{debug, warn};

/// Trailer after a complete transfer.
pub const TRAILER_OK: [u8; 2] = [0x00, 0x00];
/// Trailer when the source could not be read.
pub const TRAILER_FAILED: [u8; 2] = [0xFF, 0xFF];

/// Where transfer data comes from.
pub trait TransferSource {
    fn load(&mut self) -> io::Result<Vec<u8>>;
}

/// Reads the configured tape file on every transfer.
#[derive(Debug, Clone)]
pub struct FileTransferSource {
    path: PathBuf,
}

impl FileTransferSource {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl TransferSource for FileTransferSource {
    fn load(&mut self) -> io::Result<Vec<u8>> {
        fs::read(&self.path)
    }
}

/// In-memory data; `None` fails every load with `NotFound`.
#[derive(Debug, Clone, Default)]
pub struct MemoryTransferSource {
    data: Option<Vec<u8>>,
}

impl MemoryTransferSource {
    pub fn new(data: impl Into<Vec<u8>>) -> Self {
        Self {
            data: Some(data.into()),
        }
    }

    #[must_use]
    pub fn missing() -> Self {
        Self { data: None }
    }
}

impl TransferSource for MemoryTransferSource {
    fn load(&mut self) -> io::Result<Vec<u8>> {
        self.data
            .clone()
            .ok_or_else(|| io::Error::new(io::ErrorKind::NotFound, "no transfer data"))
    }
}

#[derive(Debug)]
pub enum TransferError {
    /// The source could not be read; the failure trailer was sent.
    Io(io::Error),
    /// The host link failed mid-transfer.
    Link(io::Error),
}

impl fmt::Display for TransferError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Io(err) => write!(f, "cannot read transfer source: {err}"),
            Self::Link(err) => write!(f, "host link failed during transfer: {err}"),
        }
    }
}

impl std::error::Error for TransferError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Self::Io(err) | Self::Link(err) => Some(err),
        }
    }
}

/// Stream `source` through `send`, sleeping `pacing` after each data byte.
/// Returns the number of data bytes sent.
pub fn stream<F>(
    source: &mut dyn TransferSource,
    pacing: Duration,
    mut send: F,
) -> Result<usize, TransferError>
where
    F: FnMut(u8) -> io::Result<()>,
{
    let data = match source.load() {
        Ok(data) => data,
        Err(err) => {
            warn!(error = %err, "transfer source unreadable");
            for byte in TRAILER_FAILED {
                send(byte).map_err(TransferError::Link)?;
            }
            return Err(TransferError::Io(err));
        }
    };

    for &byte in &data {
        send(byte).map_err(TransferError::Link)?;
        if !pacing.is_zero() {
            thread::sleep(pacing);
        }
    }
    for byte in TRAILER_OK {
        send(byte).map_err(TransferError::Link)?;
    }
    debug!(bytes = data.len(), "transfer complete");
    Ok(data.len())
}
