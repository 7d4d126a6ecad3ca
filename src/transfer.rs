//! Streaming primitives shared by both roles.
//!
//! Both take ownership of the connection side they use. Dropping it at the
//! end closes the socket, which is the only end-of-transfer signal the
//! protocol has.

use crate::error::TransferError;
use bytes::BytesMut;
use std::fs::File;
use std::io::{self, BufRead, BufReader, Read, Write};
use std::path::{Path, PathBuf};
use tracing::{debug, trace};

/// Default receive chunk size.
pub const DEFAULT_CHUNK_SIZE: usize = 4096;

/// How a finished exchange ended.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Outcome {
    /// Payload stored locally.
    Received { bytes: u64 },
    /// Local file streamed to the peer.
    Sent { bytes: u64 },
    /// Peer sent an unknown command; connection closed without transfer.
    Rejected { token: String },
    /// Nothing to send; connection closed without payload.
    SourceMissing { path: PathBuf },
}

/// Read `source` until end-of-stream, writing every chunk to `destination`.
///
/// The destination is created or truncated before the first read. Returns
/// the number of bytes written.
pub fn receive_file<R: Read>(
    mut source: R,
    destination: &Path,
    chunk_size: usize,
) -> Result<u64, TransferError> {
    let mut file = File::create(destination)
        .map_err(|e| TransferError::FileOpen(destination.to_path_buf(), e))?;

    let mut buffer = BytesMut::zeroed(chunk_size.max(1));
    let mut total = 0u64;

    loop {
        let n = match source.read(&mut buffer[..]) {
            Ok(0) => break,
            Ok(n) => n,
            Err(e) if e.kind() == io::ErrorKind::Interrupted => continue,
            Err(e) => return Err(e.into()),
        };

        file.write_all(&buffer[..n])?;
        total += n as u64;
        trace!(bytes = n, total, "Received chunk");
    }

    file.flush()?;
    drop(source);

    debug!(path = %destination.display(), bytes = total, "Receive complete");
    Ok(total)
}

/// Stream the file at `source` into `destination` one line at a time.
///
/// A missing source closes `destination` without writing anything.
pub fn send_file<W: Write>(source: &Path, mut destination: W) -> Result<u64, TransferError> {
    if !source.is_file() {
        drop(destination);
        return Err(TransferError::MissingFile(source.to_path_buf()));
    }

    let file = File::open(source).map_err(|e| TransferError::FileOpen(source.to_path_buf(), e))?;
    let mut reader = BufReader::new(file);
    let mut line = Vec::with_capacity(256);
    let mut total = 0u64;

    loop {
        line.clear();
        let n = reader.read_until(b'\n', &mut line)?;
        if n == 0 {
            break;
        }

        destination.write_all(&line)?;
        total += n as u64;
        trace!(bytes = n, total, "Sent line");
    }

    destination.flush()?;
    drop(destination);

    debug!(path = %source.display(), bytes = total, "Send complete");
    Ok(total)
}
