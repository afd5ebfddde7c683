//! Configuration schema for the native bridge.
//!
//! The settings here deliberately stay at the primitive level (integer width
//! as a number, parallelism as a bool) so this crate does not depend on the
//! bridge's own types. The bridge converts a [`VariantSelection`] into its
//! variant descriptor at startup.

use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// On-disk configuration file contents. Every section is optional so that a
/// project file can override only part of the global file.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Default)]
#[serde(deny_unknown_fields)]
pub struct FileConfig {
    /// Default variant selection
    #[serde(skip_serializing_if = "Option::is_none")]
    pub variant: Option<VariantSelection>,

    /// Native library locations
    #[serde(skip_serializing_if = "Option::is_none")]
    pub libraries: Option<LibraryConfig>,
}

impl FileConfig {
    /// Merge `other` over `self`. Sections set in `other` win.
    pub fn merged_with(mut self, other: FileConfig) -> FileConfig {
        if other.variant.is_some() {
            self.variant = other.variant;
        }
        if let Some(theirs) = other.libraries {
            let mut ours = self.libraries.unwrap_or_default();
            if theirs.lib_dir.is_some() {
                ours.lib_dir = theirs.lib_dir;
            }
            if theirs.compat_lib.is_some() {
                ours.compat_lib = theirs.compat_lib;
            }
            if !theirs.search_paths.is_empty() {
                ours.search_paths = theirs.search_paths;
            }
            self.libraries = Some(ours);
        }
        self
    }

    /// Resolve into the final merged configuration, filling defaults.
    pub fn resolve(self) -> BridgeConfig {
        BridgeConfig {
            variant: self.variant.unwrap_or_default(),
            libraries: self.libraries.unwrap_or_default(),
        }
    }
}

/// Fully merged bridge configuration.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Default)]
pub struct BridgeConfig {
    /// Default variant selection
    pub variant: VariantSelection,

    /// Native library locations
    pub libraries: LibraryConfig,
}

/// Which native library variant the process uses by default.
///
/// Selection is per-process, not per-call: every resource allocated against
/// the default variant after startup uses this choice.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(deny_unknown_fields)]
pub struct VariantSelection {
    /// Index width of the native integer type: 32 or 64
    pub int_size: u32,

    /// Use the parallel (distributed) build of the native library
    pub parallel: bool,
}

impl Default for VariantSelection {
    fn default() -> Self {
        Self {
            int_size: 32,
            parallel: false,
        }
    }
}

/// Where the native shared objects live.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Default)]
#[serde(deny_unknown_fields)]
pub struct LibraryConfig {
    /// Root directory of the native library builds. Width-specific
    /// subdirectories (lib32/, lib64/) are searched beneath it.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub lib_dir: Option<PathBuf>,

    /// Explicit path to the file-compat shim shared object. When unset the
    /// shim is searched next to the variant libraries.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub compat_lib: Option<PathBuf>,

    /// Additional library search paths, highest priority first.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub search_paths: Vec<PathBuf>,
}
