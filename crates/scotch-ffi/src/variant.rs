//! ABI variant descriptors.
//!
//! The native library ships in four incompatible ABI variants: 32-bit or
//! 64-bit index width, crossed with sequential or parallel build. All four may
//! coexist in one process because every public symbol carries a width suffix
//! (`SCOTCH_graphInit` becomes `SCOTCH_graphInit_64`). A [`VariantDescriptor`]
//! identifies one such build and is the lookup key throughout the bridge.

use scotch_config::VariantSelection;
use std::fmt;

/// Width of the native index integer type.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum IndexWidth {
    /// 32-bit indices (`int`)
    W32,
    /// 64-bit indices (`int64_t`)
    W64,
}

impl IndexWidth {
    /// Width in bits, as used in symbol suffixes and directory names.
    pub fn bits(self) -> u32 {
        match self {
            IndexWidth::W32 => 32,
            IndexWidth::W64 => 64,
        }
    }
}

/// Sequential or parallel (distributed) build of the native library.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Concurrency {
    Sequential,
    Parallel,
}

/// Identifies one ABI build of the native library.
///
/// Immutable; exactly four valid values. Created at process configuration
/// time and used as a key everywhere a variant matters.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct VariantDescriptor {
    pub width: IndexWidth,
    pub concurrency: Concurrency,
}

impl VariantDescriptor {
    /// All four valid descriptors.
    pub const ALL: [VariantDescriptor; 4] = [
        VariantDescriptor::new(IndexWidth::W32, Concurrency::Sequential),
        VariantDescriptor::new(IndexWidth::W32, Concurrency::Parallel),
        VariantDescriptor::new(IndexWidth::W64, Concurrency::Sequential),
        VariantDescriptor::new(IndexWidth::W64, Concurrency::Parallel),
    ];

    pub const fn new(width: IndexWidth, concurrency: Concurrency) -> Self {
        Self { width, concurrency }
    }

    /// The suffix the native build appends to every public symbol.
    ///
    /// Only the index width participates; the parallel build reuses the
    /// sequential suffix for the symbols it shares.
    pub fn symbol_suffix(&self) -> &'static str {
        match self.width {
            IndexWidth::W32 => "_32",
            IndexWidth::W64 => "_64",
        }
    }

    /// Base name of this variant's shared object (without lib prefix or
    /// platform extension).
    pub fn library_name(&self) -> &'static str {
        match self.concurrency {
            Concurrency::Sequential => "scotch",
            Concurrency::Parallel => "ptscotch",
        }
    }

    /// Width-specific build subdirectory (lib32/ or lib64/).
    pub fn library_subdir(&self) -> String {
        format!("lib{}", self.width.bits())
    }

    /// Whether this is a parallel (distributed) build.
    pub fn is_parallel(&self) -> bool {
        self.concurrency == Concurrency::Parallel
    }

    /// Build a descriptor from a configuration selection.
    ///
    /// `int_size` values other than 32/64 are rejected by scotch-config
    /// before they reach this point; treat them as 32-bit defensively.
    pub fn from_selection(selection: &VariantSelection) -> Self {
        let width = if selection.int_size == 64 {
            IndexWidth::W64
        } else {
            IndexWidth::W32
        };
        let concurrency = if selection.parallel {
            Concurrency::Parallel
        } else {
            Concurrency::Sequential
        };
        Self::new(width, concurrency)
    }
}

impl fmt::Display for VariantDescriptor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mode = match self.concurrency {
            Concurrency::Sequential => "sequential",
            Concurrency::Parallel => "parallel",
        };
        write!(f, "{}-bit {}", self.width.bits(), mode)
    }
}
