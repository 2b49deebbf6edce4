//! Server configuration.
//!
//! Loaded from a TOML file (path in `CARTSTOCK_CONFIG`, default
//! `cartstock.toml`), with environment variable overrides on top. Every
//! setting the process needs is carried in one explicit [`AppConfig`]
//! value; nothing reads configuration globals after startup.
//!
//! ## Environment Overrides
//! ```text
//! CARTSTOCK_DB_PATH     path to the SQLite database file
//! CARTSTOCK_BIND_ADDR   listen address for the scan endpoint
//! CARTSTOCK_SCAN_KEY    16-byte pre-shared key for the device channel
//! ```

use serde::Deserialize;
use std::env;
use std::path::{Path, PathBuf};

use cartstock_gateway::codec::KEY_LEN;

/// Server configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct AppConfig {
    /// Path to the SQLite database file.
    #[serde(default = "default_database_path")]
    pub database_path: PathBuf,

    /// Listen address for the scan endpoint.
    #[serde(default = "default_bind_addr")]
    pub bind_addr: String,

    /// Pre-shared key for the device channel, exactly 16 bytes.
    ///
    /// Shared with the terminal fleet out of band; there is no default.
    pub scan_key: String,
}

fn default_database_path() -> PathBuf {
    PathBuf::from("cartstock.db")
}

fn default_bind_addr() -> String {
    "0.0.0.0:8080".to_string()
}

impl AppConfig {
    /// Loads configuration from the TOML file, then applies environment
    /// overrides.
    ///
    /// A missing config file is fine as long as `CARTSTOCK_SCAN_KEY` is
    /// set; defaults cover everything else.
    pub fn load() -> Result<Self, ConfigError> {
        let path = env::var("CARTSTOCK_CONFIG").unwrap_or_else(|_| "cartstock.toml".to_string());
        let mut config = Self::from_file_or_defaults(Path::new(&path))?;

        if let Ok(db_path) = env::var("CARTSTOCK_DB_PATH") {
            config.database_path = PathBuf::from(db_path);
        }
        if let Ok(bind_addr) = env::var("CARTSTOCK_BIND_ADDR") {
            config.bind_addr = bind_addr;
        }
        if let Ok(scan_key) = env::var("CARTSTOCK_SCAN_KEY") {
            config.scan_key = scan_key;
        }

        config.validate()?;
        Ok(config)
    }

    fn from_file_or_defaults(path: &Path) -> Result<Self, ConfigError> {
        match std::fs::read_to_string(path) {
            Ok(raw) => Ok(toml::from_str(&raw)?),
            Err(err) if err.kind() == std::io::ErrorKind::NotFound => {
                // The scan key has no default; the env override must fill
                // it in before validate() runs.
                Ok(AppConfig {
                    database_path: default_database_path(),
                    bind_addr: default_bind_addr(),
                    scan_key: String::new(),
                })
            }
            Err(err) => Err(ConfigError::Io {
                path: path.to_path_buf(),
                source: err,
            }),
        }
    }

    fn validate(&self) -> Result<(), ConfigError> {
        if self.scan_key.is_empty() {
            return Err(ConfigError::MissingRequired("scan_key".to_string()));
        }
        if self.scan_key.len() != KEY_LEN {
            return Err(ConfigError::BadKeyLength(self.scan_key.len()));
        }
        Ok(())
    }

    /// The pre-shared key as raw bytes for the codec.
    pub fn scan_key_bytes(&self) -> [u8; KEY_LEN] {
        // Length was checked in validate(); the conversion cannot fail.
        let mut key = [0u8; KEY_LEN];
        key.copy_from_slice(self.scan_key.as_bytes());
        key
    }
}

/// Configuration error types.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("failed to read config file {path}: {source}")]
    Io {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("failed to parse config file: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("missing required configuration: {0}")]
    MissingRequired(String),

    #[error("scan_key must be exactly 16 bytes, got {0}")]
    BadKeyLength(usize),
}

// =============================================================================
// Unit Tests
// =============================================================================
