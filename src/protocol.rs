//! Command framing for the transfer protocol.
//!
//! The first payload on a fresh connection is a single command line:
//!
//! ```text
//! send\r\n       client uploads, server receives
//! download\r\n   server uploads, client receives
//! ```
//!
//! Everything after the terminator is file payload. There is no length
//! header; the sender closes its socket when the file is exhausted.

use crate::error::TransferError;
use bytes::{BufMut, BytesMut};
use std::fmt;
use std::str::FromStr;

/// Longest command line the server will read before giving up.
pub const MAX_COMMAND_LEN: usize = 1024;

/// Longest token kept in errors and logs.
pub const MAX_TOKEN_DISPLAY: usize = 64;

/// Command line terminator.
pub const TERMINATOR: &[u8] = b"\r\n";

/// Direction of the transfer, as requested by the client.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Command {
    /// Client sends a file, server stores it.
    Send,
    /// Server sends its file, client stores it.
    Download,
}

impl Command {
    /// Wire token for this command.
    pub fn as_str(&self) -> &'static str {
        match self {
            Command::Send => "send",
            Command::Download => "download",
        }
    }

    /// Encode the framed command line.
    pub fn encode(&self) -> BytesMut {
        let token = self.as_str().as_bytes();
        let mut frame = BytesMut::with_capacity(token.len() + TERMINATOR.len());
        frame.put_slice(token);
        frame.put_slice(TERMINATOR);
        frame
    }
}

impl fmt::Display for Command {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Command {
    type Err = TransferError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "send" => Ok(Command::Send),
            "download" => Ok(Command::Download),
            other => Err(TransferError::InvalidCommand(other.to_string())),
        }
    }
}

/// Parse result.
#[derive(Debug)]
pub enum ParseResult {
    /// Successfully parsed command with bytes consumed.
    Complete(Command, usize),
    /// No terminator yet.
    Incomplete,
    /// Terminated line that is not a known command.
    Invalid(String),
}

/// Parse a framed command from the start of `input`.
pub fn parse(input: &[u8]) -> ParseResult {
    let line_end = match find_crlf(input) {
        Some(pos) => pos,
        None => return ParseResult::Incomplete,
    };

    let consumed = line_end + TERMINATOR.len();
    let token = String::from_utf8_lossy(&input[..line_end]);

    match token.parse() {
        Ok(command) => ParseResult::Complete(command, consumed),
        Err(_) => ParseResult::Invalid(display_token(&input[..line_end])),
    }
}

/// Render a rejected command line for errors and logs: line ending
/// stripped, at most `MAX_TOKEN_DISPLAY` characters.
pub fn display_token(line: &[u8]) -> String {
    let line = line
        .strip_suffix(TERMINATOR)
        .or_else(|| line.strip_suffix(b"\n"))
        .unwrap_or(line);

    String::from_utf8_lossy(line)
        .chars()
        .take(MAX_TOKEN_DISPLAY)
        .collect()
}

/// Find \r\n in buffer, returning the position of \r.
fn find_crlf(buffer: &[u8]) -> Option<usize> {
    (0..buffer.len().saturating_sub(1)).find(|&i| buffer[i] == b'\r' && buffer[i + 1] == b'\n')
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_send() {
        match parse(b"send\r\n") {
            ParseResult::Complete(Command::Send, 6) => {}
            other => panic!("unexpected: {:?}", other),
        }
    }

    #[test]
    fn test_parse_download_with_trailing_payload() {
        match parse(b"download\r\nalpha\n") {
            ParseResult::Complete(Command::Download, 10) => {}
            other => panic!("unexpected: {:?}", other),
        }
    }

    #[test]
    fn test_incomplete() {
        match parse(b"send") {
            ParseResult::Incomplete => {}
            other => panic!("unexpected: {:?}", other),
        }

        match parse(b"") {
            ParseResult::Incomplete => {}
            other => panic!("unexpected: {:?}", other),
        }
    }

    #[test]
    fn test_unknown_command() {
        match parse(b"upload\r\n") {
            ParseResult::Invalid(token) => assert_eq!(token, "upload"),
            other => panic!("unexpected: {:?}", other),
        }
    }

    #[test]
    fn test_tokens_are_case_sensitive() {
        assert!(matches!(parse(b"SEND\r\n"), ParseResult::Invalid(_)));
        assert!("Download".parse::<Command>().is_err());
    }

    #[test]
    fn test_display_token() {
        assert_eq!(display_token(b"send\r\n"), "send");
        assert_eq!(display_token(b"send\n"), "send");
        assert_eq!(display_token(b"send"), "send");

        let long = vec![b'x'; MAX_COMMAND_LEN];
        assert_eq!(display_token(&long).len(), MAX_TOKEN_DISPLAY);
    }

    #[test]
    fn test_invalid_token_is_capped() {
        let mut input = vec![b'y'; 500];
        input.extend_from_slice(TERMINATOR);
        match parse(&input) {
            ParseResult::Invalid(token) => assert_eq!(token, "y".repeat(MAX_TOKEN_DISPLAY)),
            other => panic!("unexpected: {:?}", other),
        }
    }

    #[test]
    fn test_encode() {
        assert_eq!(&Command::Send.encode()[..], b"send\r\n");
        assert_eq!(&Command::Download.encode()[..], b"download\r\n");
    }

    #[test]
    fn test_from_str_error_keeps_token() {
        match "put".parse::<Command>() {
            Err(TransferError::InvalidCommand(token)) => assert_eq!(token, "put"),
            other => panic!("unexpected: {:?}", other),
        }
    }
}
