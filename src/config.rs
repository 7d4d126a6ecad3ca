//! Configuration module for text-ferry.
//!
//! Supports both command-line arguments and TOML configuration file.
//! CLI arguments take precedence over config file values.

use crate::transfer::DEFAULT_CHUNK_SIZE;
use clap::{Parser, Subcommand};
use serde::Deserialize;
use std::path::PathBuf;
use std::time::Duration;

/// Command-line arguments for both roles
#[derive(Parser, Debug)]
#[command(name = "text-ferry")]
#[command(author = "text-ferry authors")]
#[command(version = "0.1.0")]
#[command(about = "Send or download one text file over a single TCP connection", long_about = None)]
pub struct CliArgs {
    /// Path to TOML configuration file
    #[arg(short, long, global = true)]
    pub config: Option<PathBuf>,

    /// Socket timeout in seconds (0 = block forever)
    #[arg(short = 't', long, global = true)]
    pub timeout: Option<u64>,

    /// Receive chunk size in bytes
    #[arg(long, global = true)]
    pub chunk_size: Option<usize>,

    /// Log level (trace, debug, info, warn, error)
    #[arg(long, default_value = "info", global = true)]
    pub log_level: String,

    #[command(subcommand)]
    pub role: RoleArgs,
}

/// Which side of the exchange to run
#[derive(Subcommand, Debug)]
pub enum RoleArgs {
    /// Accept one connection and serve one transfer
    Server {
        /// Port number to bind on
        port: u16,

        /// Address to bind to
        #[arg(short = 'l', long)]
        bind: Option<String>,

        /// File stored on `send` and served on `download`
        #[arg(long)]
        target_file: Option<PathBuf>,
    },
    /// Connect to a server and run one transfer
    Client {
        /// Server host name
        hostname: String,

        /// Server port number
        port: u16,

        /// File to send, or where to store the download
        filepath: PathBuf,

        /// Either `send` or `download`
        #[arg(long, default_value = "send")]
        command: String,
    },
}

/// TOML configuration file structure
#[derive(Debug, Deserialize, Default)]
pub struct TomlConfig {
    #[serde(default)]
    pub server: ServerSection,
    #[serde(default)]
    pub transfer: TransferSection,
    #[serde(default)]
    pub logging: LoggingSection,
}

/// Server-related configuration
#[derive(Debug, Deserialize)]
pub struct ServerSection {
    /// Address to bind to
    #[serde(default = "default_bind")]
    pub bind: String,
    /// Pending connections allowed before accept
    #[serde(default = "default_backlog")]
    pub backlog: i32,
    /// Fixed file the server reads or writes
    #[serde(default = "default_target_file")]
    pub target_file: PathBuf,
}

impl Default for ServerSection {
    fn default() -> Self {
        Self {
            bind: default_bind(),
            backlog: default_backlog(),
            target_file: default_target_file(),
        }
    }
}

/// Transfer-related configuration
#[derive(Debug, Deserialize)]
pub struct TransferSection {
    /// Receive chunk size in bytes
    #[serde(default = "default_chunk_size")]
    pub chunk_size: usize,
    /// Socket timeout in seconds
    #[serde(default)]
    pub timeout_secs: u64,
}

impl Default for TransferSection {
    fn default() -> Self {
        Self {
            chunk_size: default_chunk_size(),
            timeout_secs: 0,
        }
    }
}

/// Logging configuration
#[derive(Debug, Deserialize)]
pub struct LoggingSection {
    /// Log level
    #[serde(default = "default_log_level")]
    pub level: String,
}

impl Default for LoggingSection {
    fn default() -> Self {
        Self {
            level: default_log_level(),
        }
    }
}

fn default_bind() -> String {
    "127.0.0.1".to_string()
}

fn default_backlog() -> i32 {
    5
}

fn default_target_file() -> PathBuf {
    PathBuf::from("output.txt")
}

fn default_chunk_size() -> usize {
    DEFAULT_CHUNK_SIZE
}

fn default_log_level() -> String {
    "info".to_string()
}

/// Resolved server settings
#[derive(Debug, Clone)]
pub struct ServerConfig {
    pub bind: String,
    pub port: u16,
    pub backlog: i32,
    pub target_file: PathBuf,
    pub chunk_size: usize,
    pub timeout: Option<Duration>,
}

/// Resolved client connection settings
#[derive(Debug, Clone)]
pub struct ClientConfig {
    pub host: String,
    pub port: u16,
    pub chunk_size: usize,
    pub timeout: Option<Duration>,
}

/// Role selected on the command line, with its settings
#[derive(Debug, Clone)]
pub enum Role {
    Server(ServerConfig),
    Client {
        settings: ClientConfig,
        command: String,
        filepath: PathBuf,
    },
}

/// Final resolved configuration
#[derive(Debug, Clone)]
pub struct Config {
    pub role: Role,
    pub log_level: String,
}

impl Config {
    /// Load configuration from process arguments and optional TOML file.
    pub fn load() -> Result<Self, ConfigError> {
        Self::from_args(CliArgs::parse())
    }

    /// Merge parsed CLI args with the TOML file they point at.
    /// CLI arguments take precedence over TOML file values.
    pub fn from_args(cli: CliArgs) -> Result<Self, ConfigError> {
        // Load TOML config if specified
        let toml_config = if let Some(ref config_path) = cli.config {
            let contents = std::fs::read_to_string(config_path)
                .map_err(|e| ConfigError::FileRead(config_path.clone(), e))?;
            toml::from_str(&contents)
                .map_err(|e| ConfigError::TomlParse(config_path.clone(), e))?
        } else {
            TomlConfig::default()
        };

        let chunk_size = cli.chunk_size.unwrap_or(toml_config.transfer.chunk_size);
        if chunk_size == 0 {
            return Err(ConfigError::Invalid("chunk_size must be greater than 0"));
        }

        let timeout = match cli.timeout.unwrap_or(toml_config.transfer.timeout_secs) {
            0 => None,
            secs => Some(Duration::from_secs(secs)),
        };

        let role = match cli.role {
            RoleArgs::Server {
                port,
                bind,
                target_file,
            } => {
                if toml_config.server.backlog <= 0 {
                    return Err(ConfigError::Invalid("backlog must be greater than 0"));
                }
                Role::Server(ServerConfig {
                    bind: bind.unwrap_or(toml_config.server.bind),
                    port,
                    backlog: toml_config.server.backlog,
                    target_file: target_file.unwrap_or(toml_config.server.target_file),
                    chunk_size,
                    timeout,
                })
            }
            RoleArgs::Client {
                hostname,
                port,
                filepath,
                command,
            } => Role::Client {
                settings: ClientConfig {
                    host: hostname,
                    port,
                    chunk_size,
                    timeout,
                },
                command,
                filepath,
            },
        };

        Ok(Config {
            role,
            log_level: if cli.log_level != "info" {
                cli.log_level
            } else {
                toml_config.logging.level
            },
        })
    }
}

/// Configuration loading errors
#[derive(Debug)]
pub enum ConfigError {
    FileRead(PathBuf, std::io::Error),
    TomlParse(PathBuf, toml::de::Error),
    Invalid(&'static str),
}

impl std::fmt::Display for ConfigError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ConfigError::FileRead(path, e) => {
                write!(f, "Failed to read config file '{}': {}", path.display(), e)
            }
            ConfigError::TomlParse(path, e) => {
                write!(f, "Failed to parse config file '{}': {}", path.display(), e)
            }
            ConfigError::Invalid(msg) => write!(f, "Invalid configuration: {}", msg),
        }
    }
}

impl std::error::Error for ConfigError {}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse(args: &[&str]) -> Result<Config, ConfigError> {
        Config::from_args(CliArgs::try_parse_from(args).unwrap())
    }

    #[test]
    fn test_default_config() {
        let config = TomlConfig::default();
        assert_eq!(config.server.bind, "127.0.0.1");
        assert_eq!(config.server.backlog, 5);
        assert_eq!(config.server.target_file, PathBuf::from("output.txt"));
        assert_eq!(config.transfer.chunk_size, 4096);
        assert_eq!(config.transfer.timeout_secs, 0);
        assert_eq!(config.logging.level, "info");
    }

    #[test]
    fn test_toml_parsing() {
        let toml_str = r#"
            [server]
            bind = "0.0.0.0"
            backlog = 16
            target_file = "/srv/inbox.txt"

            [transfer]
            chunk_size = 4098
            timeout_secs = 30

            [logging]
            level = "debug"
        "#;

        let config: TomlConfig = toml::from_str(toml_str).unwrap();
        assert_eq!(config.server.bind, "0.0.0.0");
        assert_eq!(config.server.backlog, 16);
        assert_eq!(config.server.target_file, PathBuf::from("/srv/inbox.txt"));
        assert_eq!(config.transfer.chunk_size, 4098);
        assert_eq!(config.transfer.timeout_secs, 30);
        assert_eq!(config.logging.level, "debug");
    }

    #[test]
    fn test_server_args() {
        let config = parse(&["text-ferry", "server", "12345"]).unwrap();
        match config.role {
            Role::Server(server) => {
                assert_eq!(server.port, 12345);
                assert_eq!(server.bind, "127.0.0.1");
                assert_eq!(server.backlog, 5);
                assert_eq!(server.target_file, PathBuf::from("output.txt"));
                assert_eq!(server.chunk_size, 4096);
                assert!(server.timeout.is_none());
            }
            other => panic!("unexpected: {:?}", other),
        }
        assert_eq!(config.log_level, "info");
    }

    #[test]
    fn test_client_args_default_to_send() {
        let config = parse(&["text-ferry", "client", "localhost", "12345", "local.txt"]).unwrap();
        match config.role {
            Role::Client {
                settings,
                command,
                filepath,
            } => {
                assert_eq!(settings.host, "localhost");
                assert_eq!(settings.port, 12345);
                assert_eq!(command, "send");
                assert_eq!(filepath, PathBuf::from("local.txt"));
            }
            other => panic!("unexpected: {:?}", other),
        }
    }

    #[test]
    fn test_client_download_with_timeout() {
        let config = parse(&[
            "text-ferry",
            "--timeout",
            "5",
            "client",
            "example.org",
            "9000",
            "copy.txt",
            "--command",
            "download",
        ])
        .unwrap();
        match config.role {
            Role::Client {
                settings, command, ..
            } => {
                assert_eq!(command, "download");
                assert_eq!(settings.timeout, Some(Duration::from_secs(5)));
            }
            other => panic!("unexpected: {:?}", other),
        }
    }

    #[test]
    fn test_cli_overrides_toml() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("ferry.toml");
        std::fs::write(
            &path,
            r#"
            [server]
            bind = "0.0.0.0"
            target_file = "from-file.txt"

            [transfer]
            chunk_size = 1024

            [logging]
            level = "warn"
            "#,
        )
        .unwrap();

        let config = parse(&[
            "text-ferry",
            "--config",
            path.to_str().unwrap(),
            "--chunk-size",
            "512",
            "server",
            "7000",
            "--target-file",
            "from-cli.txt",
        ])
        .unwrap();

        assert_eq!(config.log_level, "warn");
        match config.role {
            Role::Server(server) => {
                assert_eq!(server.bind, "0.0.0.0");
                assert_eq!(server.target_file, PathBuf::from("from-cli.txt"));
                assert_eq!(server.chunk_size, 512);
            }
            other => panic!("unexpected: {:?}", other),
        }
    }

    #[test]
    fn test_zero_chunk_size_rejected() {
        let result = parse(&["text-ferry", "--chunk-size", "0", "server", "7000"]);
        assert!(matches!(result, Err(ConfigError::Invalid(_))));
    }

    #[test]
    fn test_zero_backlog_rejected() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("ferry.toml");
        std::fs::write(&path, "[server]\nbacklog = 0\n").unwrap();

        let result = parse(&[
            "text-ferry",
            "--config",
            path.to_str().unwrap(),
            "server",
            "7000",
        ]);
        assert!(matches!(result, Err(ConfigError::Invalid(_))));
    }

    #[test]
    fn test_missing_config_file() {
        let result = parse(&[
            "text-ferry",
            "--config",
            "/nonexistent/text-ferry.toml",
            "server",
            "7000",
        ]);
        assert!(matches!(result, Err(ConfigError::FileRead(_, _))));
    }

    #[test]
    fn test_server_requires_port() {
        assert!(CliArgs::try_parse_from(["text-ferry", "server"]).is_err());
        assert!(CliArgs::try_parse_from(["text-ferry", "server", "not-a-port"]).is_err());
    }
}
