//! scotch-ffi Configuration System
//!
//! Provides configuration for the native bridge:
//! - Which library variant to select by default (index width, concurrency)
//! - Where the native shared objects live
//! - Where the file-compat shim lives
//!
//! # Configuration Hierarchy
//!
//! Configuration is loaded and merged in the following order (later overrides earlier):
//! 1. Global config (~/.scotch-ffi/config.toml)
//! 2. Project config (./scotch-ffi.toml)
//! 3. Environment variables (SCOTCH_FFI_*)
//!
//! Variant selection is per-process: it must be settled before any resource of
//! that variant is allocated, which is why it lives in configuration rather
//! than per-call parameters.
//!
//! # Example
//!
//! ```no_run
//! use scotch_config::ConfigLoader;
//! use std::path::Path;
//!
//! let loader = ConfigLoader::new();
//! let config = loader.load_from_directory(Path::new(".")).unwrap();
//! assert!(config.variant.int_size == 32 || config.variant.int_size == 64);
//! ```

pub mod loader;
pub mod settings;

use std::path::PathBuf;
use thiserror::Error;

/// Configuration errors
#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Failed to read configuration file: {0}")]
    IoError(#[from] std::io::Error),

    #[error("Invalid TOML syntax in {file}: {error}")]
    TomlParseError {
        file: PathBuf,
        error: toml::de::Error,
    },

    #[error("Invalid value for '{field}': {reason}")]
    InvalidValue { field: String, reason: String },

    #[error("Home directory not found")]
    HomeNotFound,
}

/// Result type for configuration operations
pub type ConfigResult<T> = Result<T, ConfigError>;

pub use loader::ConfigLoader;
pub use settings::{BridgeConfig, FileConfig, LibraryConfig, VariantSelection};
