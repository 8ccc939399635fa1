//! # Configuration Utilities
//!
//! Configuration structures for the ingestion service and the generic TOML
//! loader. Every section and key is optional; anything left out falls back
//! to the defaults below.
//!
//! ```toml
//! [server]
//! address = "0.0.0.0:8080"
//!
//! [storage]
//! root = "."
//!
//! [upload]
//! memory_limit_bytes = 104857600
//! max_body_bytes = 1073741824
//! ```

use anyhow::Result;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::PathBuf;

/// File parts are buffered in memory up to 100 MiB per request; the rest
/// spills to temporary files.
pub const DEFAULT_MEMORY_LIMIT_BYTES: usize = 100 * 1024 * 1024;

/// Hard cap on a request body (1 GiB). Larger uploads are rejected.
pub const DEFAULT_MAX_BODY_BYTES: usize = 1024 * 1024 * 1024;

/// Load a TOML configuration file and deserialize it into the specified type.
///
/// # Arguments
/// - `path`: Path to the TOML configuration file
///
/// # Returns
/// - `Ok(T)`: Successfully loaded and parsed configuration
/// - `Err`: File I/O or parsing error
///
/// # Example
/// ```ignore
/// let config: ServiceConfig = load_config("config/server.toml")?;
/// ```
pub fn load_config<T>(path: &str) -> Result<T>
where
    T: for<'de> Deserialize<'de>,
{
    let content = fs::read_to_string(path)?;
    let config: T = toml::from_str(&content)?;
    Ok(config)
}

/// Complete ingestion service configuration.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ServiceConfig {
    /// Listener settings
    pub server: ServerSection,
    /// Where run directories are created
    pub storage: StorageSection,
    /// Multi-part upload limits
    pub upload: UploadSection,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerSection {
    /// Socket address the HTTP listener binds to (e.g., "0.0.0.0:8080")
    pub address: String,
}

impl Default for ServerSection {
    fn default() -> Self {
        Self {
            address: "0.0.0.0:8080".to_string(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct StorageSection {
    /// Parent directory of the per-run timestamped directories
    pub root: PathBuf,
}

impl Default for StorageSection {
    fn default() -> Self {
        Self {
            root: PathBuf::from("."),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct UploadSection {
    /// File bytes kept in memory per request before spilling to disk
    pub memory_limit_bytes: usize,
    /// Maximum accepted request body size in bytes
    pub max_body_bytes: usize,
}

impl Default for UploadSection {
    fn default() -> Self {
        Self {
            memory_limit_bytes: DEFAULT_MEMORY_LIMIT_BYTES,
            max_body_bytes: DEFAULT_MAX_BODY_BYTES,
        }
    }
}
