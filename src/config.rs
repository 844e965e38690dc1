//! Configuration module for the burrow server.
//!
//! Supports both command-line arguments and TOML configuration file.
//! CLI arguments take precedence over config file values.

use clap::Parser;
use serde::Deserialize;
use std::path::PathBuf;

/// Command-line arguments for the Gopher server
#[derive(Parser, Debug)]
#[command(name = "burrow")]
#[command(author = "burrow authors")]
#[command(version = "0.1.0")]
#[command(about = "A Gopher protocol file server", long_about = None)]
pub struct CliArgs {
    /// Path to TOML configuration file
    #[arg(short, long)]
    pub config: Option<PathBuf>,

    /// Address to bind to (e.g., 0.0.0.0)
    #[arg(short = 'H', long)]
    pub host: Option<String>,

    /// Port to listen on (well-known Gopher port is 70)
    #[arg(short, long)]
    pub port: Option<u16>,

    /// Directory subtree to serve
    #[arg(short, long)]
    pub root: Option<PathBuf>,

    /// Name of the root listing file served for empty selectors
    #[arg(long)]
    pub listing_file: Option<String>,

    /// Maximum selector length in bytes
    #[arg(long)]
    pub max_selector_len: Option<usize>,

    /// Number of worker threads (each runs its own event loop)
    #[arg(short = 'w', long)]
    pub workers: Option<usize>,

    /// Maximum concurrent connections per worker
    #[arg(long)]
    pub max_connections: Option<usize>,

    /// Log level (trace, debug, info, warn, error)
    #[arg(long, default_value = "info")]
    pub log_level: String,

    /// Hexdump each framed request line at debug level
    #[arg(long)]
    pub hexdump: bool,
}

/// TOML configuration file structure
#[derive(Debug, Deserialize, Default)]
pub struct TomlConfig {
    #[serde(default)]
    pub server: ServerConfig,
    #[serde(default)]
    pub content: ContentConfig,
    #[serde(default)]
    pub logging: LoggingConfig,
}

/// Server-related configuration
#[derive(Debug, Deserialize)]
pub struct ServerConfig {
    /// Address to bind to
    #[serde(default = "default_host")]
    pub host: String,
    /// Port to listen on
    #[serde(default = "default_port")]
    pub port: u16,
    /// Number of worker threads
    #[serde(default = "default_workers")]
    pub workers: usize,
    /// Maximum concurrent connections per worker
    #[serde(default = "default_max_connections")]
    pub max_connections: usize,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: default_host(),
            port: default_port(),
            workers: default_workers(),
            max_connections: default_max_connections(),
        }
    }
}

/// Served-content configuration
#[derive(Debug, Deserialize)]
pub struct ContentConfig {
    /// Directory subtree to serve
    #[serde(default = "default_root")]
    pub root: PathBuf,
    /// Name of the root listing file
    #[serde(default = "default_listing_file")]
    pub listing_file: String,
    /// Maximum selector length in bytes
    #[serde(default = "default_max_selector_len")]
    pub max_selector_len: usize,
}

impl Default for ContentConfig {
    fn default() -> Self {
        Self {
            root: default_root(),
            listing_file: default_listing_file(),
            max_selector_len: default_max_selector_len(),
        }
    }
}

/// Logging configuration
#[derive(Debug, Deserialize)]
pub struct LoggingConfig {
    /// Log level
    #[serde(default = "default_log_level")]
    pub level: String,
    /// Hexdump framed request lines at debug level
    #[serde(default)]
    pub hexdump: bool,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
            hexdump: false,
        }
    }
}

fn default_host() -> String {
    "0.0.0.0".to_string()
}

fn default_port() -> u16 {
    70 // well-known Gopher port
}

fn default_workers() -> usize {
    1
}

fn default_max_connections() -> usize {
    1024
}

fn default_root() -> PathBuf {
    PathBuf::from(".")
}

fn default_listing_file() -> String {
    ".selectors".to_string()
}

fn default_max_selector_len() -> usize {
    4096
}

fn default_log_level() -> String {
    "info".to_string()
}

/// Final resolved configuration
#[derive(Debug, Clone)]
pub struct Config {
    pub host: String,
    pub port: u16,
    pub root: PathBuf,
    pub listing_file: String,
    pub max_selector_len: usize,
    pub workers: usize,
    pub max_connections: usize,
    pub log_level: String,
    pub hexdump: bool,
}

impl Config {
    /// Load configuration from CLI args and optional TOML file.
    /// CLI arguments take precedence over TOML file values.
    pub fn load() -> Result<Self, ConfigError> {
        Self::merge(CliArgs::parse())
    }

    fn merge(cli: CliArgs) -> Result<Self, ConfigError> {
        // Load TOML config if specified
        let toml_config = if let Some(ref config_path) = cli.config {
            let contents = std::fs::read_to_string(config_path)
                .map_err(|e| ConfigError::FileRead(config_path.clone(), e))?;
            toml::from_str(&contents)
                .map_err(|e| ConfigError::TomlParse(config_path.clone(), e))?
        } else {
            TomlConfig::default()
        };

        // Merge CLI args with TOML config (CLI takes precedence)
        Ok(Config {
            host: cli.host.unwrap_or(toml_config.server.host),
            port: cli.port.unwrap_or(toml_config.server.port),
            root: cli.root.unwrap_or(toml_config.content.root),
            listing_file: cli
                .listing_file
                .unwrap_or(toml_config.content.listing_file),
            max_selector_len: cli
                .max_selector_len
                .unwrap_or(toml_config.content.max_selector_len),
            workers: cli.workers.unwrap_or(toml_config.server.workers),
            max_connections: cli
                .max_connections
                .unwrap_or(toml_config.server.max_connections),
            log_level: if cli.log_level != "info" {
                cli.log_level
            } else {
                toml_config.logging.level
            },
            hexdump: cli.hexdump || toml_config.logging.hexdump,
        })
    }
}

/// Configuration loading errors
#[derive(Debug)]
pub enum ConfigError {
    FileRead(PathBuf, std::io::Error),
    TomlParse(PathBuf, toml::de::Error),
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
        }
    }
}

impl std::error::Error for ConfigError {}
