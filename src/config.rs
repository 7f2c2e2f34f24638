use anyhow::{Context, Result};
use serde::Deserialize;
use std::path::{Path, PathBuf};
use tracing::info;

use crate::store::WriteMode;

#[derive(Debug, Deserialize, Clone, Default)]
#[serde(default)]
pub struct EbbConfig {
    pub server: ServerConfig,
    pub storage: StorageConfig,
    pub rate_limit: RateLimitConfig,
}

#[derive(Debug, Deserialize, Clone)]
#[serde(default)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
    pub log_level: String,
    /// Take the caller identity from `X-Forwarded-For` instead of the socket peer.
    pub trust_forwarded_for: bool,
    /// Caller identity used for requests arriving over stdio.
    pub mcp_identity: String,
}

#[derive(Debug, Deserialize, Clone)]
#[serde(default)]
pub struct StorageConfig {
    /// `"sqlite"` or `"memory"`.
    pub backend: String,
    pub db_path: String,
    /// Key of the single graph document inside the key-value store.
    pub document_key: String,
    pub write_mode: WriteMode,
}

/// Fixed-window quotas per operation class.
#[derive(Debug, Deserialize, Clone)]
#[serde(default)]
pub struct RateLimitConfig {
    pub window_secs: u64,
    pub entities: u32,
    pub observations: u32,
    pub relations: u32,
    pub reads: u32,
    pub default: u32,
    /// The one caller that bypasses every quota.
    pub exempt_identity: Option<String>,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: "127.0.0.1".into(),
            port: 8787,
            log_level: "info".into(),
            trust_forwarded_for: false,
            mcp_identity: "stdio".into(),
        }
    }
}

impl Default for StorageConfig {
    fn default() -> Self {
        let db_path = default_ebb_dir()
            .join("graph.db")
            .to_string_lossy()
            .into_owned();
        Self {
            backend: "sqlite".into(),
            db_path,
            document_key: "graph".into(),
            write_mode: WriteMode::LastWriteWins,
        }
    }
}

impl Default for RateLimitConfig {
    fn default() -> Self {
        Self {
            window_secs: 3600,
            entities: 10,
            observations: 50,
            relations: 20,
            reads: 1000,
            default: 100,
            exempt_identity: None,
        }
    }
}

fn home_dir() -> PathBuf {
    dirs::home_dir().unwrap_or_else(|| PathBuf::from("."))
}

/// Returns `~/.ebb/`
pub fn default_ebb_dir() -> PathBuf {
    home_dir().join(".ebb")
}

/// Returns the default config file path: `~/.ebb/config.toml`
pub fn default_config_path() -> PathBuf {
    default_ebb_dir().join("config.toml")
}

impl EbbConfig {
    /// Load config from TOML file (if it exists) then apply env var overrides.
    pub fn load() -> Result<Self> {
        Self::load_from(default_config_path())
    }

    /// Load from a specific path, then apply env var overrides.
    pub fn load_from(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let mut config = if path.exists() {
            let contents =
                std::fs::read_to_string(path).context("failed to read config file")?;
            toml::from_str(&contents).context("failed to parse config TOML")?
        } else {
            info!("no config file at {}, using defaults", path.display());
            EbbConfig::default()
        };

        config.apply_env_overrides()?;
        Ok(config)
    }

    /// Apply environment variable overrides
    /// (EBB_DB, EBB_LOG_LEVEL, EBB_PORT, EBB_EXEMPT_IDENTITY).
    fn apply_env_overrides(&mut self) -> Result<()> {
        if let Ok(val) = std::env::var("EBB_DB") {
            self.storage.db_path = val;
        }
        if let Ok(val) = std::env::var("EBB_LOG_LEVEL") {
            self.server.log_level = val;
        }
        if let Ok(val) = std::env::var("EBB_PORT") {
            self.server.port = val
                .parse()
                .with_context(|| format!("EBB_PORT is not a valid port: {val}"))?;
        }
        if let Ok(val) = std::env::var("EBB_EXEMPT_IDENTITY") {
            self.rate_limit.exempt_identity = Some(val).filter(|v| !v.is_empty());
        }
        Ok(())
    }

    /// Resolve the database path, expanding `~` if needed.
    pub fn resolved_db_path(&self) -> PathBuf {
        expand_tilde(&self.storage.db_path)
    }
}

pub fn expand_tilde(path: &str) -> PathBuf {
    if let Some(rest) = path.strip_prefix("~/") {
        home_dir().join(rest)
    } else {
        PathBuf::from(path)
    }
}
