//! Opaque structure sizing and allocation.
//!
//! The native structures are ABI-opaque: their byte layout varies across
//! variants and library versions, so the only safe source of truth for their
//! size is the native sizing query itself, asked at allocation time. A fixed
//! compile-time constant is exactly the bug this module exists to prevent
//! (an older binding hardcoded 256 bytes and overflowed the heap by 40 bytes
//! when a new library version grew its graph structure).
//!
//! The native queries report sizes as a count of double-precision words, a
//! convention the library uses to keep its opaque types 8-aligned; the
//! bridge converts to bytes here and nowhere else.

use crate::error::{BridgeError, BridgeResult};
use crate::registry::LoadedVariant;
use std::os::raw::{c_int, c_void};

/// Kinds of opaque native structures the bridge can allocate.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum OpaqueKind {
    Graph,
    Mesh,
    Strat,
    Arch,
    Mapping,
    Ordering,
    Geom,
    Context,
}

impl OpaqueKind {
    pub const ALL: [OpaqueKind; 8] = [
        OpaqueKind::Graph,
        OpaqueKind::Mesh,
        OpaqueKind::Strat,
        OpaqueKind::Arch,
        OpaqueKind::Mapping,
        OpaqueKind::Ordering,
        OpaqueKind::Geom,
        OpaqueKind::Context,
    ];

    /// Abstract name of the native sizing query for this kind.
    pub fn sizing_operation(self) -> &'static str {
        match self {
            OpaqueKind::Graph => "graphSizeof",
            OpaqueKind::Mesh => "meshSizeof",
            OpaqueKind::Strat => "stratSizeof",
            OpaqueKind::Arch => "archSizeof",
            OpaqueKind::Mapping => "mapSizeof",
            OpaqueKind::Ordering => "orderSizeof",
            OpaqueKind::Geom => "geomSizeof",
            OpaqueKind::Context => "contextSizeof",
        }
    }
}

/// Query the native byte size of an opaque structure kind for one variant.
///
/// Always asks the native library; results are never cached across variants
/// or versions. The returned value is in bytes (double-word count times 8).
pub fn size_for(variant: &LoadedVariant, kind: OpaqueKind) -> BridgeResult<usize> {
    let symbol = variant
        .resolve(kind.sizing_operation())
        .map_err(|e| BridgeError::SizeQueryFailed {
            variant: variant.descriptor(),
            kind,
            reason: e.to_string(),
        })?;

    // Safety: the sizing queries take no arguments and return int; the
    // owning library stays resident in the registry.
    let query: unsafe extern "C" fn() -> c_int = unsafe { symbol.cast() };
    let dwords = unsafe { query() };
    if dwords <= 0 {
        return Err(BridgeError::SizeQueryFailed {
            variant: variant.descriptor(),
            kind,
            reason: format!("native query returned {dwords}"),
        });
    }
    Ok(dwords as usize * std::mem::size_of::<f64>())
}

/// A zero-initialized, 8-aligned buffer backing one opaque native structure.
///
/// Backed by `u64` words so the alignment the native layout expects holds by
/// construction.
#[derive(Debug)]
pub struct OpaqueBuffer {
    words: Vec<u64>,
    len_bytes: usize,
}

impl OpaqueBuffer {
    /// Allocate a zero-filled buffer of at least `len_bytes` bytes.
    pub fn zeroed(len_bytes: usize) -> Self {
        Self {
            words: vec![0u64; (len_bytes + 7) / 8],
            len_bytes,
        }
    }

    /// Requested length in bytes. The backing allocation may round up to
    /// the next word boundary.
    pub fn len_bytes(&self) -> usize {
        self.len_bytes
    }

    /// Zero the buffer again, as required before reusing it for a retried
    /// initialization.
    pub fn rezero(&mut self) {
        self.words.fill(0);
    }

    pub fn as_ptr(&self) -> *const c_void {
        self.words.as_ptr() as *const c_void
    }

    pub fn as_mut_ptr(&mut self) -> *mut c_void {
        self.words.as_mut_ptr() as *mut c_void
    }

    #[cfg(test)]
    pub(crate) fn words(&self) -> &[u64] {
        &self.words
    }

    #[cfg(test)]
    pub(crate) fn words_mut(&mut self) -> &mut [u64] {
        &mut self.words
    }
}
