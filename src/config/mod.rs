//! Configuration loading and management.
//!
//! Loads configuration from `./geopothole.toml` (or `$GEOPOTHOLE_CONFIG_PATH`).
//! Environment variables override file values; file values override defaults.
//!
//! Precedence: env vars > config file > defaults.

use std::net::{IpAddr, SocketAddr};
use std::path::PathBuf;
use std::time::Duration;

use anyhow::{Context, Result};
use serde::Deserialize;

/// Longest accepted session lifetime (30 days).
const MAX_SESSION_TTL_SECONDS: u64 = 2_592_000;

// ── Top-level config ────────────────────────────────────────────

/// Top-level service configuration loaded from TOML.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct GeopotholeConfig {
    /// Listener and logging settings (`[server]`).
    pub server: ServerConfig,
    /// Filesystem locations for persisted state (`[paths]`).
    pub paths: PathsConfig,
    /// First-start operator account (`[bootstrap]`).
    pub bootstrap: BootstrapConfig,
    /// Login session settings (`[sessions]`).
    pub sessions: SessionsConfig,
}

impl GeopotholeConfig {
    /// Load configuration with precedence: env vars > TOML file > defaults.
    ///
    /// Config file path: `$GEOPOTHOLE_CONFIG_PATH` or `./geopothole.toml`.
    /// If the file does not exist, returns defaults.
    ///
    /// # Errors
    ///
    /// Returns an error if the file exists but cannot be read or parsed,
    /// or if the merged configuration fails [`validate`](Self::validate).
    pub fn load() -> Result<Self> {
        Self::load_with(|key| std::env::var(key).ok())
    }

    /// [`load`](Self::load) with a custom env resolver.
    ///
    /// # Errors
    ///
    /// Same as [`load`](Self::load).
    pub fn load_with(env: impl Fn(&str) -> Option<String>) -> Result<Self> {
        let mut config = Self::load_from_file(&env)?;
        config.apply_overrides(&env);
        config.validate()?;
        Ok(config)
    }

    /// Load from TOML file only, no env overrides.
    fn load_from_file(env: impl Fn(&str) -> Option<String>) -> Result<Self> {
        let path = Self::config_path_with(env);
        match std::fs::read_to_string(&path) {
            Ok(contents) => {
                tracing::info!(path = %path.display(), "loading config from file");
                Self::from_toml(&contents)
                    .with_context(|| format!("invalid config at {}", path.display()))
            }
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                tracing::info!("no config file found, using defaults");
                Ok(Self::default())
            }
            Err(e) => Err(anyhow::anyhow!(
                "failed to read config file {}: {e}",
                path.display()
            )),
        }
    }

    /// Resolve config path using a custom env resolver.
    fn config_path_with(env: impl Fn(&str) -> Option<String>) -> PathBuf {
        env("GEOPOTHOLE_CONFIG_PATH")
            .map(PathBuf::from)
            .unwrap_or_else(|| PathBuf::from("geopothole.toml"))
    }

    /// Apply environment variable overrides (env > config > defaults).
    ///
    /// Takes a resolver function so tests never touch the process environment.
    fn apply_overrides(&mut self, env: impl Fn(&str) -> Option<String>) {
        // Server.
        if let Some(v) = env("GEOPOTHOLE_BIND_ADDR") {
            self.server.bind_addr = v;
        }
        // `PORT` is the conventional launcher variable; the prefixed one wins.
        for key in ["PORT", "GEOPOTHOLE_PORT"] {
            if let Some(v) = env(key) {
                match v.parse() {
                    Ok(port) => self.server.port = port,
                    Err(_) => tracing::warn!(var = key, value = %v, "ignoring invalid env override"),
                }
            }
        }
        if let Some(v) = env("GEOPOTHOLE_LOG_LEVEL") {
            self.server.log_level = v;
        }

        // Paths.
        if let Some(v) = env("GEOPOTHOLE_DATA_DIR") {
            self.paths.data_dir = v;
        }

        // Bootstrap.
        if let Some(v) = env("GEOPOTHOLE_ADMIN_IDENTITY") {
            self.bootstrap.admin_identity = v;
        }
        if let Some(v) = env("GEOPOTHOLE_ADMIN_SECRET") {
            self.bootstrap.admin_secret = v;
        }

        // Sessions.
        if let Some(v) = env("GEOPOTHOLE_SESSION_TTL_SECS") {
            match v.parse() {
                Ok(n) => self.sessions.ttl_seconds = n,
                Err(_) => tracing::warn!(
                    var = "GEOPOTHOLE_SESSION_TTL_SECS",
                    value = %v,
                    "ignoring invalid env override"
                ),
            }
        }
    }

    /// Parse a TOML string into config.
    ///
    /// # Errors
    ///
    /// Returns an error if the TOML is malformed or has mistyped fields.
    pub fn from_toml(toml_str: &str) -> Result<Self> {
        toml::from_str(toml_str).context("failed to parse config TOML")
    }

    /// Validate that configuration values are within sane bounds.
    ///
    /// # Errors
    ///
    /// Returns an error naming the first offending field.
    pub fn validate(&self) -> Result<()> {
        anyhow::ensure!(self.server.port != 0, "server.port must be non-zero");
        anyhow::ensure!(
            self.server.bind_addr.parse::<IpAddr>().is_ok(),
            "server.bind_addr must be an IP address, got '{}'",
            self.server.bind_addr
        );
        anyhow::ensure!(
            !self.paths.data_dir.trim().is_empty(),
            "paths.data_dir must not be empty"
        );
        anyhow::ensure!(
            !self.bootstrap.admin_identity.trim().is_empty(),
            "bootstrap.admin_identity must not be empty"
        );
        anyhow::ensure!(
            !self.bootstrap.admin_secret.is_empty(),
            "bootstrap.admin_secret must not be empty"
        );
        anyhow::ensure!(
            (1..=MAX_SESSION_TTL_SECONDS).contains(&self.sessions.ttl_seconds),
            "sessions.ttl_seconds must be in [1, {MAX_SESSION_TTL_SECONDS}]"
        );
        Ok(())
    }

    /// Listener address from `[server]`.
    ///
    /// # Errors
    ///
    /// Returns an error if `bind_addr` is not an IP address.
    pub fn socket_addr(&self) -> Result<SocketAddr> {
        let ip: IpAddr = self
            .server
            .bind_addr
            .parse()
            .with_context(|| format!("invalid bind_addr '{}'", self.server.bind_addr))?;
        Ok(SocketAddr::new(ip, self.server.port))
    }

    /// Data directory holding both snapshots.
    pub fn data_dir(&self) -> PathBuf {
        PathBuf::from(&self.paths.data_dir)
    }

    /// Marker snapshot file.
    pub fn markers_path(&self) -> PathBuf {
        self.data_dir().join(&self.paths.markers_file)
    }

    /// Account snapshot file.
    pub fn accounts_path(&self) -> PathBuf {
        self.data_dir().join(&self.paths.accounts_file)
    }

    /// Directory for rotated JSON logs.
    pub fn logs_dir(&self) -> PathBuf {
        self.paths
            .logs_dir
            .as_ref()
            .map(PathBuf::from)
            .unwrap_or_else(|| self.data_dir().join("logs"))
    }

    /// Session lifetime.
    pub fn session_ttl(&self) -> Duration {
        Duration::from_secs(self.sessions.ttl_seconds)
    }
}

// ── Server config ───────────────────────────────────────────────

/// Listener and logging settings.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    /// IP address to bind.
    pub bind_addr: String,
    /// TCP port to bind.
    pub port: u16,
    /// Tracing filter used when `RUST_LOG` is unset.
    pub log_level: String,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            bind_addr: "0.0.0.0".to_string(),
            port: 5000,
            log_level: "info".to_string(),
        }
    }
}

// ── Paths config ────────────────────────────────────────────────

/// Filesystem paths for persistent state.
///
/// File names are resolved relative to `data_dir`.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct PathsConfig {
    /// Directory holding the snapshots.
    pub data_dir: String,
    /// Marker snapshot file name.
    pub markers_file: String,
    /// Account snapshot file name.
    pub accounts_file: String,
    /// Log directory; defaults to `{data_dir}/logs`.
    pub logs_dir: Option<String>,
}

impl Default for PathsConfig {
    fn default() -> Self {
        Self {
            data_dir: "./data".to_string(),
            markers_file: "pothole_data.json".to_string(),
            accounts_file: "users.json".to_string(),
            logs_dir: None,
        }
    }
}

// ── Bootstrap config ────────────────────────────────────────────

/// Operator account created when the directory is empty at startup.
#[derive(Clone, Deserialize)]
#[serde(default)]
pub struct BootstrapConfig {
    /// Identity of the seeded operator.
    pub admin_identity: String,
    /// Initial secret of the seeded operator.
    pub admin_secret: String,
}

impl std::fmt::Debug for BootstrapConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("BootstrapConfig")
            .field("admin_identity", &self.admin_identity)
            .field("admin_secret", &"__REDACTED__")
            .finish()
    }
}

impl Default for BootstrapConfig {
    fn default() -> Self {
        Self {
            admin_identity: "admin".to_string(),
            admin_secret: "admin123".to_string(),
        }
    }
}

// ── Sessions config ─────────────────────────────────────────────

/// Login session settings.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct SessionsConfig {
    /// Seconds a login token stays valid.
    pub ttl_seconds: u64,
}

impl Default for SessionsConfig {
    fn default() -> Self {
        Self { ttl_seconds: 86_400 }
    }
}

// ── Tests ───────────────────────────────────────────────────────
