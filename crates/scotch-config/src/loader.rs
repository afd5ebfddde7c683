//! Configuration Loader
//!
//! Loads and merges configuration from multiple sources with proper precedence:
//! 1. Global config (~/.scotch-ffi/config.toml) - lowest priority
//! 2. Project config (./scotch-ffi.toml) - overrides global
//! 3. Environment variables (SCOTCH_FFI_*) - highest priority

use crate::settings::{FileConfig, LibraryConfig, VariantSelection};
use crate::{BridgeConfig, ConfigError, ConfigResult};
use std::env;
use std::path::{Path, PathBuf};

/// Project configuration file name
const PROJECT_CONFIG_FILE: &str = "scotch-ffi.toml";

/// Environment variable selecting the index width (32 or 64)
pub const ENV_INT_SIZE: &str = "SCOTCH_FFI_INT_SIZE";
/// Environment variable selecting the parallel build (0 or 1)
pub const ENV_PARALLEL: &str = "SCOTCH_FFI_PARALLEL";
/// Environment variable pointing at the native build root
pub const ENV_LIB_DIR: &str = "SCOTCH_FFI_LIB_DIR";
/// Environment variable pointing at the file-compat shim
pub const ENV_COMPAT_LIB: &str = "SCOTCH_FFI_COMPAT_LIB";

/// Configuration loader
pub struct ConfigLoader {
    /// Override for the global config path, used by tests
    global_config_path: Option<PathBuf>,
}

impl ConfigLoader {
    /// Create a new configuration loader
    pub fn new() -> Self {
        Self {
            global_config_path: None,
        }
    }

    /// Use an explicit global config path instead of ~/.scotch-ffi/config.toml
    pub fn with_global_config_path(mut self, path: PathBuf) -> Self {
        self.global_config_path = Some(path);
        self
    }

    /// Load configuration starting from the given directory.
    ///
    /// Walks up the directory tree to find scotch-ffi.toml, merges it over the
    /// global config, then applies environment overrides.
    pub fn load_from_directory(&self, start_dir: &Path) -> ConfigResult<BridgeConfig> {
        let global = self.load_global_config()?.unwrap_or_default();
        let project = self.find_project_config(start_dir)?.unwrap_or_default();

        let merged = global.merged_with(project);
        let merged = Self::apply_env_overrides(merged)?;
        Ok(merged.resolve())
    }

    /// Load configuration from environment variables only.
    ///
    /// This is the path the bridge takes when no configuration file exists.
    pub fn load_from_env() -> ConfigResult<BridgeConfig> {
        Ok(Self::apply_env_overrides(FileConfig::default())?.resolve())
    }

    fn global_config_path(&self) -> ConfigResult<PathBuf> {
        if let Some(path) = &self.global_config_path {
            return Ok(path.clone());
        }
        let home = dirs::home_dir().ok_or(ConfigError::HomeNotFound)?;
        Ok(home.join(".scotch-ffi").join("config.toml"))
    }

    fn load_global_config(&self) -> ConfigResult<Option<FileConfig>> {
        let path = match self.global_config_path() {
            Ok(path) => path,
            // No home directory is not fatal; fall through to defaults.
            Err(ConfigError::HomeNotFound) => return Ok(None),
            Err(e) => return Err(e),
        };
        if !path.exists() {
            return Ok(None);
        }
        Self::parse_file(&path).map(Some)
    }

    /// Walk up from `start_dir` looking for scotch-ffi.toml
    fn find_project_config(&self, start_dir: &Path) -> ConfigResult<Option<FileConfig>> {
        let mut dir = Some(start_dir);
        while let Some(current) = dir {
            let candidate = current.join(PROJECT_CONFIG_FILE);
            if candidate.exists() {
                return Self::parse_file(&candidate).map(Some);
            }
            dir = current.parent();
        }
        Ok(None)
    }

    fn parse_file(path: &Path) -> ConfigResult<FileConfig> {
        let contents = std::fs::read_to_string(path)?;
        toml::from_str(&contents).map_err(|error| ConfigError::TomlParseError {
            file: path.to_path_buf(),
            error,
        })
    }

    /// Apply SCOTCH_FFI_* environment overrides on top of file configuration
    fn apply_env_overrides(mut config: FileConfig) -> ConfigResult<FileConfig> {
        let mut variant = config.variant.clone().unwrap_or_default();
        let mut variant_touched = false;

        if let Ok(value) = env::var(ENV_INT_SIZE) {
            variant.int_size = match value.trim() {
                "32" => 32,
                "64" => 64,
                other => {
                    return Err(ConfigError::InvalidValue {
                        field: ENV_INT_SIZE.to_string(),
                        reason: format!("expected 32 or 64, got '{}'", other),
                    })
                }
            };
            variant_touched = true;
        }

        if let Ok(value) = env::var(ENV_PARALLEL) {
            variant.parallel = match value.trim() {
                "0" | "false" => false,
                "1" | "true" => true,
                other => {
                    return Err(ConfigError::InvalidValue {
                        field: ENV_PARALLEL.to_string(),
                        reason: format!("expected 0/1 or true/false, got '{}'", other),
                    })
                }
            };
            variant_touched = true;
        }

        if variant_touched || config.variant.is_some() {
            config.variant = Some(variant);
        }

        let mut libraries = config.libraries.clone().unwrap_or_default();
        let mut libraries_touched = false;

        if let Ok(value) = env::var(ENV_LIB_DIR) {
            libraries.lib_dir = Some(PathBuf::from(value));
            libraries_touched = true;
        }
        if let Ok(value) = env::var(ENV_COMPAT_LIB) {
            libraries.compat_lib = Some(PathBuf::from(value));
            libraries_touched = true;
        }

        if libraries_touched || config.libraries.is_some() {
            config.libraries = Some(libraries);
        }

        Ok(config)
    }
}

impl Default for ConfigLoader {
    fn default() -> Self {
        Self::new()
    }
}

/// Convenience helper mirroring [`VariantSelection`] as a tuple, used by
/// callers that only need the variant choice.
pub fn selected_variant(config: &BridgeConfig) -> (u32, bool) {
    (config.variant.int_size, config.variant.parallel)
}
