//! File handle bridge.
//!
//! Native load/save entry points take `FILE*` arguments. A `FILE` built by a
//! different C runtime than the one the native library links against is a
//! latent corruption, not a visible error, so stream handles are brokered
//! through a small compat shim (`native/file_compat.c`) compiled by the same
//! toolchain and flags as the native library and loaded as its own shared
//! object. The shim also exposes errno retrieval, because the host runtime's
//! own errno inspection cannot be trusted to observe the shim runtime's
//! error state.

use crate::error::{BridgeError, BridgeResult};
use crate::loader::LibraryLoader;
use crate::symbols::SymbolSource;
use std::ffi::CString;
use std::os::raw::{c_char, c_int, c_void};
use std::path::Path;

type OpenFn = unsafe extern "C" fn(*const c_char, *const c_char) -> *mut c_void;
type CloseFn = unsafe extern "C" fn(*mut c_void) -> c_int;
type ErrnoFn = unsafe extern "C" fn() -> c_int;

const SHIM_OPEN: &str = "scotchffi_fopen";
const SHIM_CLOSE: &str = "scotchffi_fclose";
const SHIM_ERRNO: &str = "scotchffi_errno";

/// fopen mode for a brokered stream.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StreamMode {
    Read,
    Write,
    Append,
}

impl StreamMode {
    fn as_mode_str(self) -> &'static str {
        match self {
            StreamMode::Read => "r",
            StreamMode::Write => "w",
            StreamMode::Append => "a",
        }
    }
}

/// An opaque native file-stream reference.
///
/// Owned by whichever side opened it and released exactly once: explicitly
/// through [`FileBridge::close`], or as a last resort on drop.
pub struct StreamHandle {
    ptr: *mut c_void,
    close_fn: CloseFn,
    released: bool,
}

// Safety: the handle is an owned FILE*; the shim entry points are plain
// function addresses valid for the life of the process.
unsafe impl Send for StreamHandle {}

impl StreamHandle {
    /// Raw `FILE*` to pass to native operations taking a stream argument.
    pub fn as_ptr(&self) -> *mut c_void {
        self.ptr
    }

    pub fn is_null(&self) -> bool {
        self.ptr.is_null()
    }
}

impl Drop for StreamHandle {
    fn drop(&mut self) {
        if !self.released && !self.ptr.is_null() {
            // Best-effort release; errors here have nowhere to go.
            unsafe { (self.close_fn)(self.ptr) };
        }
    }
}

impl std::fmt::Debug for StreamHandle {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("StreamHandle")
            .field("ptr", &self.ptr)
            .field("released", &self.released)
            .finish()
    }
}

/// Brokers `FILE*` handles through the ABI-matched compat shim.
pub struct FileBridge {
    _library: Option<libloading::Library>,
    open_fn: OpenFn,
    close_fn: CloseFn,
    errno_fn: ErrnoFn,
}

impl FileBridge {
    /// Load the compat shim shared object and resolve its entry points.
    pub fn load(loader: &LibraryLoader) -> BridgeResult<Self> {
        let library = loader.open_compat()?;
        let resolve = |name: &str| {
            library
                .lookup(name)
                .ok_or(BridgeError::StreamBridgeFailure {
                    operation: "load shim",
                    errno: 0,
                })
        };
        let open_fn: OpenFn = unsafe { resolve(SHIM_OPEN)?.cast() };
        let close_fn: CloseFn = unsafe { resolve(SHIM_CLOSE)?.cast() };
        let errno_fn: ErrnoFn = unsafe { resolve(SHIM_ERRNO)?.cast() };
        Ok(Self {
            _library: Some(library),
            open_fn,
            close_fn,
            errno_fn,
        })
    }

    /// Build a bridge from explicit entry points, for deployments that link
    /// the compat shim statically into the native build.
    ///
    /// # Safety
    ///
    /// The entry points must follow the shim contract: `open` returns a
    /// `FILE*` or null with errno set, `close` accepts any pointer including
    /// null and returns 0 on success, and all three must outlive the bridge.
    pub unsafe fn from_parts(open_fn: OpenFn, close_fn: CloseFn, errno_fn: ErrnoFn) -> Self {
        Self {
            _library: None,
            open_fn,
            close_fn,
            errno_fn,
        }
    }

    /// Open a native stream.
    pub fn open(&self, path: &Path, mode: StreamMode) -> BridgeResult<StreamHandle> {
        let path = CString::new(path.to_string_lossy().as_bytes()).map_err(|_| {
            // Interior NUL cannot reach fopen; report as EINVAL.
            BridgeError::StreamBridgeFailure {
                operation: "open",
                errno: 22,
            }
        })?;
        let mode = CString::new(mode.as_mode_str()).expect("static mode string");

        let ptr = unsafe { (self.open_fn)(path.as_ptr(), mode.as_ptr()) };
        if ptr.is_null() {
            return Err(BridgeError::StreamBridgeFailure {
                operation: "open",
                errno: self.last_errno(),
            });
        }
        Ok(StreamHandle {
            ptr,
            close_fn: self.close_fn,
            released: false,
        })
    }

    /// Release a stream.
    ///
    /// A null handle reports failure (the shim returns EOF) rather than
    /// crashing, and a handle may only be released once: after this call the
    /// stream is gone even when the underlying fclose reported an error.
    pub fn close(&self, handle: &mut StreamHandle) -> BridgeResult<()> {
        if handle.released {
            // EBADF: the stream is already gone.
            return Err(BridgeError::StreamBridgeFailure {
                operation: "close",
                errno: 9,
            });
        }
        handle.released = true;

        let code = unsafe { (self.close_fn)(handle.ptr) };
        if code != 0 {
            return Err(BridgeError::StreamBridgeFailure {
                operation: "close",
                errno: self.last_errno(),
            });
        }
        Ok(())
    }

    /// A null stream handle, as handed back by native code paths that can
    /// produce no stream. Closing it reports failure.
    pub fn null_handle(&self) -> StreamHandle {
        StreamHandle {
            ptr: std::ptr::null_mut(),
            close_fn: self.close_fn,
            released: false,
        }
    }

    /// Errno as observed by the shim's own runtime.
    pub fn last_errno(&self) -> i32 {
        unsafe { (self.errno_fn)() }
    }
}

impl std::fmt::Debug for FileBridge {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FileBridge")
            .field("loaded", &self._library.is_some())
            .finish()
    }
}
