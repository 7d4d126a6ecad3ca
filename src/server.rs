//! TCP server for a single file transfer.
//!
//! Binds, accepts exactly one connection, reads its command, runs the
//! matching transfer and returns. The listener is dropped with the
//! `Server`, so later connection attempts are refused.

use crate::config::ServerConfig;
use crate::error::TransferError;
use crate::protocol::{self, display_token, Command, ParseResult, MAX_COMMAND_LEN};
use crate::transfer::{receive_file, send_file, Outcome};
use std::io::{self, BufRead, BufReader, Read, Write};
use std::net::{SocketAddr, TcpListener, TcpStream, ToSocketAddrs};
use std::path::{Path, PathBuf};
use std::time::Duration;
use tracing::{debug, info, warn};

/// Server instance
pub struct Server {
    listener: TcpListener,
    target_file: PathBuf,
    chunk_size: usize,
    timeout: Option<Duration>,
}

/// Bind according to `config` and serve one transfer.
pub fn serve(config: &ServerConfig) -> Result<Outcome, TransferError> {
    Server::bind(config)?.run()
}

impl Server {
    /// Create the listening endpoint.
    pub fn bind(config: &ServerConfig) -> Result<Self, TransferError> {
        let address = format!("{}:{}", config.bind, config.port);

        let addr = address
            .to_socket_addrs()
            .map_err(|e| TransferError::Bind(address.clone(), e))?
            .next()
            .ok_or_else(|| {
                TransferError::Bind(
                    address.clone(),
                    io::Error::new(io::ErrorKind::AddrNotAvailable, "no address resolved"),
                )
            })?;

        let listener = create_listener(addr, config.backlog)
            .map_err(|e| TransferError::Bind(address.clone(), e))?;

        info!(
            address = %addr,
            backlog = config.backlog,
            target_file = %config.target_file.display(),
            "Server listening"
        );

        Ok(Server {
            listener,
            target_file: config.target_file.clone(),
            chunk_size: config.chunk_size,
            timeout: config.timeout,
        })
    }

    /// Address the listener is bound to.
    pub fn local_addr(&self) -> io::Result<SocketAddr> {
        self.listener.local_addr()
    }

    /// Block until one inbound connection arrives.
    pub fn accept_once(&self) -> Result<(TcpStream, SocketAddr), TransferError> {
        let (stream, peer) = self.listener.accept().map_err(TransferError::Accept)?;
        stream.set_read_timeout(self.timeout)?;
        stream.set_write_timeout(self.timeout)?;
        Ok((stream, peer))
    }

    /// Serve exactly one connection, then shut down.
    pub fn run(self) -> Result<Outcome, TransferError> {
        debug!(address = ?self.local_addr(), "Waiting for connection");
        let (stream, peer) = self.accept_once()?;
        info!(peer = %peer, "Connected to client");

        let outcome = handle_connection(stream, &self.target_file, self.chunk_size)?;

        info!(?outcome, "Server shutting down");
        Ok(outcome)
    }
}

/// Read the command from a fresh connection and run the transfer it asks for.
fn handle_connection(
    stream: TcpStream,
    target_file: &Path,
    chunk_size: usize,
) -> Result<Outcome, TransferError> {
    let mut reader = BufReader::new(stream);

    let command = match read_command(&mut reader) {
        Ok(command) => command,
        Err(TransferError::InvalidCommand(token)) => {
            warn!(token = %token, "Invalid command, closing connection");
            return Ok(Outcome::Rejected { token });
        }
        Err(e) => return Err(e),
    };

    info!(%command, "Got command from client");
    dispatch(reader, command, target_file, chunk_size)
}

/// Read one framed command, leaving any payload that follows it buffered.
///
/// A line longer than `MAX_COMMAND_LEN`, or a connection closed before the
/// terminator, is an invalid command.
pub fn read_command<R: BufRead>(reader: &mut R) -> Result<Command, TransferError> {
    let mut line = Vec::with_capacity(32);
    reader
        .by_ref()
        .take(MAX_COMMAND_LEN as u64)
        .read_until(b'\n', &mut line)?;

    debug!(len = line.len(), "Read command line");

    match protocol::parse(&line) {
        ParseResult::Complete(command, _) => Ok(command),
        ParseResult::Invalid(token) => Err(TransferError::InvalidCommand(token)),
        ParseResult::Incomplete => Err(TransferError::InvalidCommand(display_token(&line))),
    }
}

/// Run the transfer direction `command` selects over `conn`.
pub fn dispatch<S: Read + Write>(
    conn: BufReader<S>,
    command: Command,
    target_file: &Path,
    chunk_size: usize,
) -> Result<Outcome, TransferError> {
    match command {
        Command::Send => {
            let bytes = receive_file(conn, target_file, chunk_size)?;
            info!(bytes, path = %target_file.display(), "File received");
            Ok(Outcome::Received { bytes })
        }
        Command::Download => match send_file(target_file, conn.into_inner()) {
            Ok(bytes) => {
                info!(bytes, path = %target_file.display(), "File sent");
                Ok(Outcome::Sent { bytes })
            }
            Err(TransferError::MissingFile(path)) => {
                warn!(path = %path.display(), "File does not exist on server");
                Ok(Outcome::SourceMissing { path })
            }
            Err(e) => Err(e),
        },
    }
}

/// Create a blocking TCP listener with a bounded accept backlog.
fn create_listener(addr: SocketAddr, backlog: i32) -> io::Result<TcpListener> {
    let socket = socket2::Socket::new(
        match addr {
            SocketAddr::V4(_) => socket2::Domain::IPV4,
            SocketAddr::V6(_) => socket2::Domain::IPV6,
        },
        socket2::Type::STREAM,
        Some(socket2::Protocol::TCP),
    )?;

    socket.set_reuse_address(true)?;
    socket.bind(&addr.into())?;
    socket.listen(backlog)?;

    Ok(socket.into())
}
