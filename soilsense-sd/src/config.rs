//! Configuration management for the session daemon
//!
//! A single TOML bootstrap file covers everything the daemon needs at
//! startup: bind address, port, bus capacity, classifier artifact path,
//! topic names, log level. There is no runtime-mutable configuration.
//!
//! # Settings sources priority
//!
//! 1. Command-line arguments (`--port`, `--bind`, ...)
//! 2. Environment variables (`SOILSENSE_PORT`, ...)
//! 3. TOML configuration file
//! 4. Built-in defaults (code constants)
//!
//! Clap resolves tiers 1 and 2; `Config::resolve` layers them over the
//! file. A missing config file is a warning and falls through to defaults;
//! a file named explicitly with `--config` must exist.

use crate::error::{Error, Result};
use clap::Parser;
use serde::Deserialize;
use soilsense_common::TopicMap;
use std::net::{IpAddr, SocketAddr};
use std::path::{Path, PathBuf};

/// Config file probed in the working directory when `--config` is not given
pub const DEFAULT_CONFIG_PATH: &str = "soilsense.toml";

/// Command-line arguments for soilsense-sd
#[derive(Parser, Debug, Default)]
#[command(name = "soilsense-sd")]
#[command(about = "Soil telemetry session daemon")]
#[command(version)]
pub struct Args {
    /// Path to TOML configuration file
    #[arg(short, long, env = "SOILSENSE_CONFIG")]
    pub config: Option<PathBuf>,

    /// Address to bind the HTTP server to
    #[arg(long, env = "SOILSENSE_BIND")]
    pub bind: Option<IpAddr>,

    /// Port to listen on
    #[arg(short, long, env = "SOILSENSE_PORT")]
    pub port: Option<u16>,

    /// Message and event bus channel capacity
    #[arg(long, env = "SOILSENSE_BUS_CAPACITY")]
    pub bus_capacity: Option<usize>,

    /// Path to a classifier artifact (TOML); built-in profiles if omitted
    #[arg(short, long, env = "SOILSENSE_MODEL")]
    pub model: Option<PathBuf>,

    /// Log level used when RUST_LOG is not set (trace, debug, info, warn, error)
    #[arg(long, env = "SOILSENSE_LOG")]
    pub log_level: Option<String>,
}

/// Bootstrap configuration loaded from the TOML file
///
/// These settings cannot change during runtime; restart to pick up edits.
#[derive(Debug, Clone, Deserialize)]
pub struct TomlConfig {
    /// Address the HTTP server binds to
    #[serde(default = "default_bind")]
    pub bind: IpAddr,

    /// HTTP server port
    #[serde(default = "default_port")]
    pub port: u16,

    /// Channel capacity shared by the message bus and the event bus
    #[serde(default = "default_bus_capacity")]
    pub bus_capacity: usize,

    /// Path to a classifier artifact; built-in profile table when absent
    #[serde(default)]
    pub model_path: Option<PathBuf>,

    /// Channel topic names (defaults are the external contract)
    #[serde(default)]
    pub topics: TopicMap,

    /// Logging configuration
    #[serde(default)]
    pub logging: LoggingConfig,
}

/// Logging configuration
#[derive(Debug, Clone, Deserialize)]
pub struct LoggingConfig {
    /// Log level (trace, debug, info, warn, error)
    #[serde(default = "default_log_level")]
    pub level: String,
}

fn default_bind() -> IpAddr {
    IpAddr::from([0, 0, 0, 0])
}

fn default_port() -> u16 {
    5750
}

fn default_bus_capacity() -> usize {
    1024
}

fn default_log_level() -> String {
    "info".to_string()
}

impl Default for TomlConfig {
    fn default() -> Self {
        Self {
            bind: default_bind(),
            port: default_port(),
            bus_capacity: default_bus_capacity(),
            model_path: None,
            topics: TopicMap::default(),
            logging: LoggingConfig::default(),
        }
    }
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
        }
    }
}

impl TomlConfig {
    /// Load and parse a TOML config file
    pub fn load(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .map_err(|e| Error::Config(format!("failed to read {}: {}", path.display(), e)))?;
        toml::from_str(&content)
            .map_err(|e| Error::Config(format!("failed to parse {}: {}", path.display(), e)))
    }
}

/// Where the resolved configuration came from, for startup logging
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ConfigSource {
    /// Loaded from this TOML file
    File(PathBuf),
    /// No config file found; compiled defaults plus CLI/env overrides
    Defaults,
}

/// Fully resolved daemon configuration
#[derive(Debug, Clone)]
pub struct Config {
    pub bind: IpAddr,
    pub port: u16,
    pub bus_capacity: usize,
    pub model_path: Option<PathBuf>,
    pub topics: TopicMap,
    pub log_level: String,
    pub source: ConfigSource,
}

impl Config {
    /// Resolve the effective configuration from arguments, environment,
    /// config file, and built-in defaults
    ///
    /// Resolution happens before tracing is initialized, so this function
    /// does not log; `source` records what main should report afterwards.
    pub fn resolve(args: &Args) -> Result<Self> {
        let (file, source) = match &args.config {
            Some(path) => (TomlConfig::load(path)?, ConfigSource::File(path.clone())),
            None => {
                let probe = PathBuf::from(DEFAULT_CONFIG_PATH);
                if probe.exists() {
                    (TomlConfig::load(&probe)?, ConfigSource::File(probe))
                } else {
                    (TomlConfig::default(), ConfigSource::Defaults)
                }
            }
        };

        let config = Config {
            bind: args.bind.unwrap_or(file.bind),
            port: args.port.unwrap_or(file.port),
            bus_capacity: args.bus_capacity.unwrap_or(file.bus_capacity),
            model_path: args.model.clone().or(file.model_path),
            topics: file.topics,
            log_level: args.log_level.clone().unwrap_or(file.logging.level),
            source,
        };

        if config.bus_capacity == 0 {
            return Err(Error::Config("bus_capacity must be at least 1".to_string()));
        }

        Ok(config)
    }

    /// Socket address the HTTP server binds to
    pub fn socket_addr(&self) -> SocketAddr {
        SocketAddr::new(self.bind, self.port)
    }

    /// Default EnvFilter directive when RUST_LOG is not set
    pub fn log_directive(&self) -> String {
        format!(
            "soilsense_sd={0},soilsense_common={0},tower_http=info",
            self.log_level
        )
    }
}
