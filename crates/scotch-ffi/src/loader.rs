//! Dynamic library loading for the native variants.
//!
//! Handles platform library naming, search paths, and the native build's
//! load protocol:
//! - width-specific build directories (lib32/, lib64/) are searched first;
//! - the parallel build links against the sequential library, so that one is
//!   loaded (and kept resident) before libptscotch;
//! - the shared error library is loaded at most once per process, since it is
//!   identical for every variant.
//!
//! Libraries are opened RTLD_GLOBAL on Unix: the width suffixes keep the
//! variants' namespaces apart, and the parallel build needs the sequential
//! symbols visible.

use crate::error::{BridgeError, BridgeResult};
use crate::variant::VariantDescriptor;
use libloading::Library;
use scotch_config::BridgeConfig;
use std::path::{Path, PathBuf};
use std::sync::OnceLock;

/// Base name of the shared error library.
const ERROR_LIBRARY: &str = "scotcherr";

/// Base name of the file-compat shim shared object.
const COMPAT_LIBRARY: &str = "scotchffi_compat";

/// Loaded at most once, shared by all variants.
static ERROR_LIB: OnceLock<Option<Library>> = OnceLock::new();

/// Library handles owned by one loaded variant.
#[derive(Debug)]
pub(crate) struct VariantHandles {
    /// The variant's main library (libscotch or libptscotch).
    pub main: Library,
    /// The sequential library a parallel variant links against. Kept
    /// resident for the lifetime of the variant.
    pub sequential: Option<Library>,
}

/// Locates and opens the native shared objects.
pub struct LibraryLoader {
    /// Search roots, highest priority first.
    search_paths: Vec<PathBuf>,
    /// Explicit compat shim location from configuration.
    compat_override: Option<PathBuf>,
}

impl LibraryLoader {
    /// Create a loader from bridge configuration.
    ///
    /// Configured paths take priority over platform defaults.
    pub fn new(config: &BridgeConfig) -> Self {
        let mut search_paths = Vec::new();
        search_paths.extend(config.libraries.search_paths.iter().cloned());
        if let Some(lib_dir) = &config.libraries.lib_dir {
            search_paths.push(lib_dir.clone());
        }
        search_paths.extend(Self::default_search_paths());
        Self {
            search_paths,
            compat_override: config.libraries.compat_lib.clone(),
        }
    }

    /// Platform-specific default library search paths.
    ///
    /// - Linux: /usr/lib, /usr/local/lib, /lib (plus lib64 twins)
    /// - macOS: /usr/lib, /usr/local/lib, /opt/homebrew/lib
    /// - Windows: System32
    /// - All platforms: current working directory (highest priority)
    fn default_search_paths() -> Vec<PathBuf> {
        let mut paths = Vec::new();

        #[cfg(target_os = "linux")]
        {
            paths.push(PathBuf::from("/usr/lib"));
            paths.push(PathBuf::from("/usr/local/lib"));
            paths.push(PathBuf::from("/lib"));

            if cfg!(target_pointer_width = "64") {
                paths.push(PathBuf::from("/usr/lib64"));
                paths.push(PathBuf::from("/lib64"));
            }
        }

        #[cfg(target_os = "macos")]
        {
            paths.push(PathBuf::from("/usr/lib"));
            paths.push(PathBuf::from("/usr/local/lib"));
            paths.push(PathBuf::from("/opt/homebrew/lib"));
        }

        #[cfg(target_os = "windows")]
        {
            paths.push(PathBuf::from("C:\\Windows\\System32"));
            if let Ok(system_root) = std::env::var("SystemRoot") {
                paths.push(PathBuf::from(format!("{}\\System32", system_root)));
            }
        }

        if let Ok(cwd) = std::env::current_dir() {
            paths.insert(0, cwd);
        }

        paths
    }

    /// Platform-specific file name candidates for a library base name.
    fn library_filenames(name: &str) -> Vec<String> {
        let extensions: &[&str] = if cfg!(target_os = "windows") {
            &["dll"]
        } else if cfg!(target_os = "macos") {
            &["dylib", "so"]
        } else {
            &["so"]
        };
        let prefixes: &[&str] = if cfg!(target_os = "windows") {
            &["", "lib"]
        } else {
            &["lib", ""]
        };

        let mut names = Vec::new();
        for prefix in prefixes {
            for ext in extensions {
                names.push(format!("{prefix}{name}.{ext}"));
            }
        }
        names
    }

    /// Resolve a library base name to a full path.
    ///
    /// When `subdir` is given (the width-specific build directory), it is
    /// tried under each search root before the root itself.
    fn resolve(&self, subdir: Option<&str>, name: &str) -> Option<PathBuf> {
        let filenames = Self::library_filenames(name);
        for root in &self.search_paths {
            let mut dirs = Vec::with_capacity(2);
            if let Some(subdir) = subdir {
                dirs.push(root.join(subdir));
            }
            dirs.push(root.clone());
            for dir in dirs {
                for filename in &filenames {
                    let candidate = dir.join(filename);
                    if candidate.exists() {
                        return Some(candidate);
                    }
                }
            }
        }
        None
    }

    /// Open the libraries backing one variant.
    ///
    /// Fails with `VariantUnavailable` when a required shared object is
    /// missing or cannot be loaded; other variants are unaffected.
    pub(crate) fn open_variant(&self, descriptor: VariantDescriptor) -> BridgeResult<VariantHandles> {
        let subdir = descriptor.library_subdir();

        // The error library is identical across variants; load it once and
        // keep it for the life of the process. Absence is fine: some builds
        // link error handling into the main library.
        ERROR_LIB.get_or_init(|| {
            self.resolve(Some(&subdir), ERROR_LIBRARY)
                .and_then(|path| open_global(&path).ok())
        });

        // PT builds resolve their plain graph symbols out of the sequential
        // library, so it must be resident first.
        let sequential = if descriptor.is_parallel() {
            let seq_name = "scotch";
            let path = self.resolve(Some(&subdir), seq_name).ok_or_else(|| {
                BridgeError::VariantUnavailable {
                    variant: descriptor,
                    reason: format!(
                        "sequential library '{seq_name}' required by the parallel build was not found"
                    ),
                }
            })?;
            Some(open_global(&path).map_err(|e| BridgeError::VariantUnavailable {
                variant: descriptor,
                reason: e.to_string(),
            })?)
        } else {
            None
        };

        let name = descriptor.library_name();
        let path = match self.resolve(Some(&subdir), name) {
            Some(path) => path,
            None => {
                keep_resident(sequential);
                return Err(BridgeError::VariantUnavailable {
                    variant: descriptor,
                    reason: format!("library '{name}' not found in search paths"),
                });
            }
        };
        let main = match open_global(&path) {
            Ok(main) => main,
            Err(e) => {
                keep_resident(sequential);
                return Err(BridgeError::VariantUnavailable {
                    variant: descriptor,
                    reason: format!("{}: {e}", path.display()),
                });
            }
        };

        Ok(VariantHandles { main, sequential })
    }

    /// Open the file-compat shim shared object.
    pub(crate) fn open_compat(&self) -> BridgeResult<Library> {
        let path = match &self.compat_override {
            Some(path) => path.clone(),
            None => self.resolve(None, COMPAT_LIBRARY).ok_or_else(|| {
                BridgeError::StreamBridgeFailure {
                    operation: "load shim",
                    errno: 0,
                }
            })?,
        };
        open_global(&path).map_err(|_| BridgeError::StreamBridgeFailure {
            operation: "load shim",
            errno: 0,
        })
    }
}

/// Keep an already-opened sibling library mapped when the rest of its
/// variant fails to load. It was opened RTLD_GLOBAL and other loaded code
/// may already resolve against it; dropping the handle would dlclose it
/// mid-process.
fn keep_resident(library: Option<Library>) {
    if let Some(library) = library {
        std::mem::forget(library);
    }
}

/// Open a library with its symbols visible process-wide.
fn open_global(path: &Path) -> Result<Library, libloading::Error> {
    #[cfg(unix)]
    unsafe {
        use libloading::os::unix::{Library as UnixLibrary, RTLD_GLOBAL, RTLD_NOW};
        UnixLibrary::open(Some(path), RTLD_NOW | RTLD_GLOBAL).map(Library::from)
    }
    #[cfg(not(unix))]
    unsafe {
        Library::new(path)
    }
}
