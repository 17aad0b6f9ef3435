// Runtime configuration: TOML file with CLI overrides
//
// Every key has a default, so an empty or missing file is a valid config.

use anyhow::{Context, Result};
use clap::Args;
use serde::Deserialize;
use std::net::SocketAddr;
use std::path::{Path, PathBuf};

/// Flags shared by the CLI and the server binary
#[derive(Args, Debug, Clone, Default)]
pub struct ConfigOverrides {
    /// Path to config file
    #[arg(short, long, global = true, default_value = "cashrec.toml")]
    pub config: PathBuf,

    /// SQLite database file (overrides config file)
    #[arg(short, long, global = true)]
    pub database: Option<PathBuf>,

    /// Port to listen on (overrides config file)
    #[arg(short, long, global = true)]
    pub port: Option<u16>,

    /// Log level (overrides config file)
    #[arg(short, long, global = true)]
    pub log_level: Option<String>,
}

#[derive(Debug, Deserialize, Clone, Default, PartialEq)]
pub struct Config {
    #[serde(default)]
    pub server: ServerConfig,

    #[serde(default)]
    pub database: DatabaseConfig,

    #[serde(default)]
    pub logging: LoggingConfig,

    #[serde(default)]
    pub api: ApiConfig,

    #[serde(default)]
    pub rules: RulesConfig,
}

#[derive(Debug, Deserialize, Clone, PartialEq)]
pub struct ServerConfig {
    #[serde(default = "default_host")]
    pub host: String,

    #[serde(default = "default_port")]
    pub port: u16,
}

#[derive(Debug, Deserialize, Clone, PartialEq)]
pub struct DatabaseConfig {
    #[serde(default = "default_database_path")]
    pub path: PathBuf,
}

#[derive(Debug, Deserialize, Clone, PartialEq)]
pub struct LoggingConfig {
    #[serde(default = "default_log_level")]
    pub level: String,

    /// One JSON object per line instead of human-readable output
    #[serde(default)]
    pub json: bool,
}

#[derive(Debug, Deserialize, Clone, PartialEq)]
pub struct ApiConfig {
    #[serde(default = "default_page_size")]
    pub default_page_size: u32,

    #[serde(default = "default_max_page_size")]
    pub max_page_size: u32,
}

#[derive(Debug, Deserialize, Clone, PartialEq)]
pub struct RulesConfig {
    /// Reject status changes outside the per-entity transition tables
    #[serde(default = "default_true")]
    pub enforce_status_transitions: bool,
}

fn default_host() -> String {
    "0.0.0.0".to_string()
}

fn default_port() -> u16 {
    3333
}

fn default_database_path() -> PathBuf {
    PathBuf::from("cashrec.db")
}

fn default_log_level() -> String {
    "info".to_string()
}

fn default_page_size() -> u32 {
    50
}

fn default_max_page_size() -> u32 {
    500
}

fn default_true() -> bool {
    true
}

impl Default for ServerConfig {
    fn default() -> Self {
        ServerConfig {
            host: default_host(),
            port: default_port(),
        }
    }
}

impl Default for DatabaseConfig {
    fn default() -> Self {
        DatabaseConfig {
            path: default_database_path(),
        }
    }
}

impl Default for LoggingConfig {
    fn default() -> Self {
        LoggingConfig {
            level: default_log_level(),
            json: false,
        }
    }
}

impl Default for ApiConfig {
    fn default() -> Self {
        ApiConfig {
            default_page_size: default_page_size(),
            max_page_size: default_max_page_size(),
        }
    }
}

impl Default for RulesConfig {
    fn default() -> Self {
        RulesConfig {
            enforce_status_transitions: default_true(),
        }
    }
}

impl Config {
    /// Read the config file named by `cli`, then apply CLI overrides.
    /// A missing file falls back to defaults; a malformed one is an error.
    pub fn load(cli: &ConfigOverrides) -> Result<Self> {
        let mut config = if cli.config.exists() {
            Self::from_file(&cli.config)?
        } else {
            Config::default()
        };

        // CLI overrides
        if let Some(ref path) = cli.database {
            config.database.path = path.clone();
        }
        if let Some(port) = cli.port {
            config.server.port = port;
        }
        if let Some(ref level) = cli.log_level {
            config.logging.level = level.clone();
        }

        Ok(config)
    }

    pub fn from_file(path: &Path) -> Result<Self> {
        let contents = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file {}", path.display()))?;
        Self::from_toml(&contents)
            .with_context(|| format!("Failed to parse config file {}", path.display()))
    }

    pub fn from_toml(contents: &str) -> Result<Self> {
        let config: Config = toml::from_str(contents)?;
        anyhow::ensure!(
            config.api.default_page_size >= 1
                && config.api.default_page_size <= config.api.max_page_size,
            "api.default_page_size must be between 1 and api.max_page_size"
        );
        Ok(config)
    }

    pub fn listen_addr(&self) -> Result<SocketAddr> {
        format!("{}:{}", self.server.host, self.server.port)
            .parse()
            .with_context(|| {
                format!(
                    "Invalid listen address {}:{}",
                    self.server.host, self.server.port
                )
            })
    }
}
