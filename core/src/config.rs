//! Configuration Module
//!
//! Handles loading configuration from:
//! 1. ~/.veilvote/config.toml (if exists)
//! 2. Environment variables (override TOML values)
//!
//! Environment variables take precedence over TOML config.

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::{env, fs};

const CONFIG_FILE_NAME: &str = "config.toml";
const CONFIG_DIR_NAME: &str = ".veilvote";

/// Root configuration structure (matches TOML layout)
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct VeilvoteConfig {
    #[serde(default)]
    pub api: ApiConfig,
    #[serde(default)]
    pub database: DatabaseConfig,
    #[serde(default)]
    pub ledger: LedgerConfig,
    #[serde(default)]
    pub protocol: ProtocolConfig,
}

/// API configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ApiConfig {
    #[serde(default = "default_api_host")]
    pub host: String,
    #[serde(default = "default_api_port")]
    pub port: u16,
}

impl Default for ApiConfig {
    fn default() -> Self {
        Self {
            host: default_api_host(),
            port: default_api_port(),
        }
    }
}

fn default_api_host() -> String {
    "127.0.0.1".to_string()
}

fn default_api_port() -> u16 {
    8080
}

/// Database configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DatabaseConfig {
    #[serde(default = "default_db_path")]
    pub path: String,
}

impl Default for DatabaseConfig {
    fn default() -> Self {
        Self {
            path: default_db_path(),
        }
    }
}

fn default_db_path() -> String {
    "./veilvote-db".to_string()
}

/// External ledger connection configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LedgerConfig {
    /// Ledger mode: "http" talks to a real ledger, "mock" runs in-process
    #[serde(default)]
    pub mode: LedgerModeToml,
    #[serde(default = "default_ledger_url")]
    pub url: String,
    #[serde(default = "default_ledger_timeout")]
    pub timeout_secs: u64,
}

impl Default for LedgerConfig {
    fn default() -> Self {
        Self {
            mode: LedgerModeToml::default(),
            url: default_ledger_url(),
            timeout_secs: default_ledger_timeout(),
        }
    }
}

fn default_ledger_url() -> String {
    "http://127.0.0.1:8899".to_string()
}

fn default_ledger_timeout() -> u64 {
    30
}

/// Ledger mode for TOML config (string-based for easier config)
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum LedgerModeToml {
    #[default]
    Http,
    Mock,
}

/// Protocol configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProtocolConfig {
    /// Uniqueness scope for nullifiers
    #[serde(default)]
    pub nullifier_scope: NullifierScope,
    /// Roster tree cache time-to-live in seconds
    #[serde(default = "default_tree_cache_ttl")]
    pub tree_cache_ttl_secs: u64,
}

impl Default for ProtocolConfig {
    fn default() -> Self {
        Self {
            nullifier_scope: NullifierScope::default(),
            tree_cache_ttl_secs: default_tree_cache_ttl(),
        }
    }
}

fn default_tree_cache_ttl() -> u64 {
    3600
}

/// Where a nullifier must be unique
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum NullifierScope {
    /// Unique across every election in the system
    #[default]
    Global,
    /// Unique only within the election it was used in
    PerElection,
}

impl VeilvoteConfig {
    /// Load configuration from ~/.veilvote/config.toml with env var overrides
    pub fn load() -> Result<Self> {
        // Start with defaults
        let mut config = Self::default();

        // Try to load from config file
        if let Some(config_path) = Self::find_config_file() {
            log::info!("Loading config from: {}", config_path.display());
            let contents = fs::read_to_string(&config_path).with_context(|| {
                format!("Failed to read config file: {}", config_path.display())
            })?;
            config = toml::from_str(&contents).with_context(|| {
                format!("Failed to parse config file: {}", config_path.display())
            })?;
        } else {
            log::info!("No config file found, using defaults and environment variables");
        }

        // Apply environment variable overrides
        config.apply_env_overrides();

        Ok(config)
    }

    /// Find the config file path
    fn find_config_file() -> Option<PathBuf> {
        // 1. Check VV_CONFIG env var
        if let Ok(path) = env::var("VV_CONFIG") {
            let path = PathBuf::from(path);
            if path.exists() {
                return Some(path);
            }
        }

        // 2. Check ~/.veilvote/config.toml
        if let Some(home_dir) = dirs::home_dir() {
            let config_path = home_dir.join(CONFIG_DIR_NAME).join(CONFIG_FILE_NAME);
            if config_path.exists() {
                return Some(config_path);
            }
        }

        // 3. Check ./config.toml (current directory)
        let local_path = PathBuf::from(CONFIG_FILE_NAME);
        if local_path.exists() {
            return Some(local_path);
        }

        None
    }

    /// Apply environment variable overrides
    fn apply_env_overrides(&mut self) {
        // Database
        if let Ok(v) = env::var("VV_DB_PATH") {
            self.database.path = v;
        }

        // API
        if let Ok(v) = env::var("VV_API_HOST") {
            self.api.host = v;
        }
        if let Ok(v) = env::var("VV_API_PORT") {
            if let Ok(port) = v.parse() {
                self.api.port = port;
            }
        }

        // Ledger
        if let Ok(v) = env::var("VV_LEDGER_MODE") {
            match v.to_lowercase().as_str() {
                "http" => self.ledger.mode = LedgerModeToml::Http,
                "mock" => self.ledger.mode = LedgerModeToml::Mock,
                _ => {} // ignore invalid values
            }
        }
        if let Ok(v) = env::var("VV_LEDGER_URL") {
            self.ledger.url = v;
        }
        if let Ok(v) = env::var("VV_LEDGER_TIMEOUT_SECS") {
            if let Ok(n) = v.parse() {
                self.ledger.timeout_secs = n;
            }
        }

        // Protocol
        if let Ok(v) = env::var("VV_NULLIFIER_SCOPE") {
            match v.to_lowercase().as_str() {
                "global" => self.protocol.nullifier_scope = NullifierScope::Global,
                "per_election" => self.protocol.nullifier_scope = NullifierScope::PerElection,
                _ => {} // ignore invalid values
            }
        }
        if let Ok(v) = env::var("VV_TREE_CACHE_TTL_SECS") {
            if let Ok(n) = v.parse() {
                self.protocol.tree_cache_ttl_secs = n;
            }
        }
    }
}
