//! Client side of a transfer: connect, announce the command, stream.

use crate::config::ClientConfig;
use crate::error::TransferError;
use crate::protocol::Command;
use crate::transfer::{receive_file, send_file, Outcome};
use std::io::{self, Write};
use std::net::{SocketAddr, TcpStream, ToSocketAddrs};
use std::path::Path;
use std::time::Duration;
use tracing::{debug, info};

/// One outbound connection to a server.
pub struct Client {
    stream: TcpStream,
    peer: SocketAddr,
}

impl Client {
    /// Resolve `host:port` and connect to the first address that accepts.
    pub fn connect(
        host: &str,
        port: u16,
        timeout: Option<Duration>,
    ) -> Result<Self, TransferError> {
        let address = format!("{}:{}", host, port);
        info!(host, port, "Connect to server");

        let addrs = (host, port)
            .to_socket_addrs()
            .map_err(|e| TransferError::Connect(address.clone(), e))?;

        let mut last_err = None;
        for addr in addrs {
            let attempt = match timeout {
                Some(t) => TcpStream::connect_timeout(&addr, t),
                None => TcpStream::connect(addr),
            };

            match attempt {
                Ok(stream) => {
                    stream.set_read_timeout(timeout)?;
                    stream.set_write_timeout(timeout)?;
                    debug!(peer = %addr, "Connected");
                    return Ok(Client { stream, peer: addr });
                }
                Err(e) => {
                    debug!(peer = %addr, error = %e, "Connect attempt failed");
                    last_err = Some(e);
                }
            }
        }

        Err(TransferError::Connect(
            address,
            last_err.unwrap_or_else(|| {
                io::Error::new(io::ErrorKind::AddrNotAvailable, "no address resolved")
            }),
        ))
    }

    /// Address of the connected server.
    pub fn peer_addr(&self) -> SocketAddr {
        self.peer
    }

    /// Write the framed command as the first payload on the connection.
    pub fn send_command(&mut self, command: Command) -> Result<(), TransferError> {
        self.stream.write_all(&command.encode())?;
        debug!(%command, "Sent command");
        Ok(())
    }

    /// Hand the connection to a transfer primitive.
    pub fn into_stream(self) -> TcpStream {
        self.stream
    }
}

/// Run one transfer against the server described by `config`.
///
/// `command` is validated before any network I/O happens.
pub fn run(
    config: &ClientConfig,
    command: &str,
    filepath: &Path,
) -> Result<Outcome, TransferError> {
    let command: Command = command.parse()?;

    let mut client = Client::connect(&config.host, config.port, config.timeout)?;
    let peer = client.peer_addr();
    client.send_command(command)?;

    let outcome = match command {
        Command::Send => {
            let bytes = send_file(filepath, client.into_stream())?;
            Outcome::Sent { bytes }
        }
        Command::Download => {
            let bytes = receive_file(client.into_stream(), filepath, config.chunk_size)?;
            Outcome::Received { bytes }
        }
    };

    info!(peer = %peer, ?outcome, path = %filepath.display(), "Transfer finished");
    Ok(outcome)
}
