//! Error taxonomy for one transfer.
//!
//! Every variant is terminal for the current run; nothing here is retried.

use std::io;
use std::path::PathBuf;

/// Errors raised while negotiating or streaming a transfer.
#[derive(Debug)]
pub enum TransferError {
    /// The listening endpoint could not be created.
    Bind(String, io::Error),
    /// Accepting the inbound connection failed.
    Accept(io::Error),
    /// The server could not be resolved or reached.
    Connect(String, io::Error),
    /// The command token is neither `send` nor `download`.
    InvalidCommand(String),
    /// The file to be sent does not exist.
    MissingFile(PathBuf),
    /// The peer stalled past the configured socket timeout.
    Timeout(io::Error),
    /// A local file could not be opened.
    FileOpen(PathBuf, io::Error),
    /// Socket or disk failure mid-transfer.
    Io(io::Error),
}

impl std::fmt::Display for TransferError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            TransferError::Bind(addr, e) => write!(f, "Failed to bind '{}': {}", addr, e),
            TransferError::Accept(e) => write!(f, "Failed to accept connection: {}", e),
            TransferError::Connect(addr, e) => {
                write!(f, "Failed to connect to '{}': {}", addr, e)
            }
            TransferError::InvalidCommand(token) => write!(
                f,
                "Invalid command '{}': expected 'send' or 'download'",
                token
            ),
            TransferError::MissingFile(path) => {
                write!(f, "File '{}' does not exist", path.display())
            }
            TransferError::Timeout(_) => write!(f, "Timed out waiting for peer"),
            TransferError::FileOpen(path, e) => {
                write!(f, "Failed to open '{}': {}", path.display(), e)
            }
            TransferError::Io(e) => write!(f, "I/O error: {}", e),
        }
    }
}

impl std::error::Error for TransferError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            TransferError::Bind(_, e)
            | TransferError::Accept(e)
            | TransferError::Connect(_, e)
            | TransferError::Timeout(e)
            | TransferError::FileOpen(_, e)
            | TransferError::Io(e) => Some(e),
            TransferError::InvalidCommand(_) | TransferError::MissingFile(_) => None,
        }
    }
}

impl From<io::Error> for TransferError {
    /// Socket timeouts surface as `WouldBlock` on Unix and `TimedOut` on Windows.
    fn from(e: io::Error) -> Self {
        match e.kind() {
            io::ErrorKind::WouldBlock | io::ErrorKind::TimedOut => TransferError::Timeout(e),
            _ => TransferError::Io(e),
        }
    }
}
