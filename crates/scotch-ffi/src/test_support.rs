//! Shared helpers for unit tests.
//!
//! The bridge's native-facing paths are exercised against in-memory symbol
//! sources and `extern "C"` Rust shims, so the state machine and registry
//! logic are testable without a real native library on the build host.

use crate::registry::LoadedVariant;
use crate::symbols::{RawSymbol, SymbolSource, SymbolTable};
use crate::variant::VariantDescriptor;
use std::collections::HashMap;

/// In-memory symbol source with explicit addresses.
pub(crate) struct FakeSource {
    symbols: HashMap<String, RawSymbol>,
}

impl FakeSource {
    pub(crate) fn new() -> Self {
        Self {
            symbols: HashMap::new(),
        }
    }

    pub(crate) fn with(mut self, symbol: &str, addr: usize) -> Self {
        self.symbols
            .insert(symbol.to_string(), RawSymbol::new(addr as *const ()));
        self
    }

}

impl SymbolSource for FakeSource {
    fn lookup(&self, symbol: &str) -> Option<RawSymbol> {
        self.symbols.get(symbol).copied()
    }
}

/// A loaded-variant stand-in with no backing library.
pub(crate) fn stub_variant(descriptor: VariantDescriptor, source: &FakeSource) -> LoadedVariant {
    LoadedVariant::stub(descriptor, SymbolTable::resolve_from(descriptor, source))
}

/// In-process stand-in for the file compat shim, following the same contract
/// as `native/file_compat.c`: open returns a stream pointer or null with
/// errno set, close accepts null and reports EOF for it.
pub(crate) mod shim {
    use std::ffi::CStr;
    use std::fs::File;
    use std::os::raw::{c_char, c_int, c_void};
    use std::path::Path;
    use std::sync::atomic::{AtomicI32, Ordering};

    static ERRNO: AtomicI32 = AtomicI32::new(0);

    pub(crate) unsafe extern "C" fn open(path: *const c_char, mode: *const c_char) -> *mut c_void {
        let path = CStr::from_ptr(path).to_string_lossy().into_owned();
        let mode = CStr::from_ptr(mode).to_string_lossy().into_owned();
        let result = match mode.as_str() {
            "r" => File::open(Path::new(&path)),
            _ => File::create(Path::new(&path)),
        };
        match result {
            Ok(file) => {
                ERRNO.store(0, Ordering::SeqCst);
                Box::into_raw(Box::new(file)) as *mut c_void
            }
            Err(e) => {
                ERRNO.store(e.raw_os_error().unwrap_or(5), Ordering::SeqCst);
                std::ptr::null_mut()
            }
        }
    }

    pub(crate) unsafe extern "C" fn close(stream: *mut c_void) -> c_int {
        if stream.is_null() {
            ERRNO.store(9, Ordering::SeqCst);
            return -1;
        }
        drop(Box::from_raw(stream as *mut File));
        0
    }

    pub(crate) unsafe extern "C" fn errno() -> c_int {
        ERRNO.load(Ordering::SeqCst)
    }
}
