//! Configuration file for the Parvati CLI.

use crate::games::GameInfo;
use parvati_api::ApiConfig;
use parvati_iface::InterfaceConfig;
use parvati_iface::probe::{DEFAULT_PROBE_TIMEOUT, DEFAULT_STUN_SERVERS};
use parvati_iface::trace::{DEFAULT_HOP_TIMEOUT, DEFAULT_MAX_HOPS};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

/// Parvati client configuration
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct Config {
    /// Backend connection
    #[serde(default)]
    pub parvati: ApiConfig,
    /// Interface preferences
    #[serde(default)]
    pub interfaces: InterfaceConfig,
    /// Public IP probing and path tracing
    #[serde(default)]
    pub probe: ProbeConfig,
    /// Logging configuration
    #[serde(default)]
    pub logging: LoggingConfig,
    /// Per-game settings keyed by config section name
    #[serde(default)]
    pub game: BTreeMap<String, GameInfo>,
}

/// Probe configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProbeConfig {
    /// STUN servers as `host:port`
    #[serde(default = "default_stun_servers")]
    pub stun_servers: Vec<String>,
    /// STUN answer timeout in milliseconds
    #[serde(default = "default_timeout_ms")]
    pub timeout_ms: u64,
    /// Per-hop trace timeout in milliseconds
    #[serde(default = "default_trace_timeout_ms")]
    pub trace_timeout_ms: u64,
    /// Path tracer hop limit
    #[serde(default = "default_max_hops")]
    pub max_hops: u8,
}

/// Logging configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoggingConfig {
    /// Log level
    #[serde(default = "default_log_level")]
    pub level: String,
}

// Default values

fn default_stun_servers() -> Vec<String> {
    DEFAULT_STUN_SERVERS.iter().map(|s| (*s).to_string()).collect()
}

fn default_timeout_ms() -> u64 {
    DEFAULT_PROBE_TIMEOUT.as_millis() as u64
}

fn default_trace_timeout_ms() -> u64 {
    DEFAULT_HOP_TIMEOUT.as_millis() as u64
}

fn default_max_hops() -> u8 {
    DEFAULT_MAX_HOPS
}

fn default_log_level() -> String {
    "info".to_string()
}

impl Default for ProbeConfig {
    fn default() -> Self {
        Self {
            stun_servers: default_stun_servers(),
            timeout_ms: default_timeout_ms(),
            trace_timeout_ms: default_trace_timeout_ms(),
            max_hops: default_max_hops(),
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

impl ProbeConfig {
    /// STUN answer timeout
    #[must_use]
    pub fn timeout(&self) -> Duration {
        Duration::from_millis(self.timeout_ms)
    }

    /// Per-hop trace timeout
    #[must_use]
    pub fn trace_timeout(&self) -> Duration {
        Duration::from_millis(self.trace_timeout_ms)
    }
}

impl Config {
    /// Load configuration from file
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be read or parsed.
    pub fn load<P: AsRef<Path>>(path: P) -> anyhow::Result<Self> {
        let path = path.as_ref();
        let contents = fs::read_to_string(path)
            .map_err(|e| anyhow::anyhow!("Unable to read config '{}': {e}", path.display()))?;
        let config: Self = toml::from_str(&contents)
            .map_err(|e| anyhow::anyhow!("Unable to parse config '{}': {e}", path.display()))?;
        Ok(config)
    }

    /// Get default config path
    #[must_use]
    pub fn default_path() -> PathBuf {
        dirs::home_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join(".parvati.toml")
    }

    /// Load config from the default path, or defaults if it doesn't exist
    ///
    /// # Errors
    ///
    /// Returns an error if an existing file cannot be read or parsed.
    pub fn load_or_default() -> anyhow::Result<Self> {
        let path = Self::default_path();
        if path.exists() {
            Self::load(&path)
        } else {
            tracing::debug!("no config at {}, using defaults", path.display());
            Ok(Self::default())
        }
    }

    /// Validate configuration
    ///
    /// # Errors
    ///
    /// Returns an error if configuration is invalid.
    pub fn validate(&self) -> anyhow::Result<()> {
        let valid_log_levels = ["trace", "debug", "info", "warn", "error"];
        if !valid_log_levels.contains(&self.logging.level.to_lowercase().as_str()) {
            anyhow::bail!(
                "Invalid log level: {}. Must be one of: {}",
                self.logging.level,
                valid_log_levels.join(", ")
            );
        }

        if self.probe.stun_servers.is_empty() {
            anyhow::bail!("At least one STUN server must be configured");
        }
        for server in &self.probe.stun_servers {
            validate_host_port(server, "STUN server")?;
        }

        if self.probe.timeout_ms == 0 || self.probe.trace_timeout_ms == 0 {
            anyhow::bail!("Probe timeouts must be non-zero");
        }
        if self.probe.max_hops == 0 {
            anyhow::bail!("max_hops must be between 1 and 255");
        }

        for (section, game) in &self.game {
            if game.on_joined.first().is_some_and(String::is_empty) {
                anyhow::bail!("game.{section}.on_joined has an empty program name");
            }
        }

        Ok(())
    }
}

/// Validate host:port format
fn validate_host_port(addr: &str, name: &str) -> anyhow::Result<()> {
    let Some((host, port_str)) = addr.rsplit_once(':') else {
        anyhow::bail!("{name} '{addr}' missing port (expected format: host:port)");
    };

    let port: u16 = port_str
        .parse()
        .map_err(|_| anyhow::anyhow!("{name} '{addr}' has invalid port: {port_str}"))?;
    if port == 0 {
        anyhow::bail!("{name} '{addr}' has invalid port: 0");
    }

    let host = host.trim_start_matches('[').trim_end_matches(']');
    if host.is_empty() {
        anyhow::bail!("{name} '{addr}' has empty hostname");
    }
    if host.contains('/') || host.contains('\\') || host.contains(char::is_whitespace) {
        anyhow::bail!("{name} '{addr}' contains invalid characters");
    }

    Ok(())
}
