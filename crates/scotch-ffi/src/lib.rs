//! scotch-ffi - Safe multi-variant bridge to the SCOTCH partitioning library
//!
//! This library provides the complete native bridge including:
//! - Variant registry for the four ABI builds (32/64-bit, sequential/parallel)
//! - Width-suffixed symbol resolution with a cross-variant collision self-check
//! - Runtime-sized opaque structure allocation and lifecycle tracking
//! - ABI-matched file stream brokering and explicit random-state control

/// Bridge version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

// Public API modules
pub mod alloc;
pub mod api;
pub mod error;
pub mod lifecycle;
pub mod loader;
pub mod random;
pub mod registry;
pub mod stream;
pub mod symbols;
pub mod variant;

// Test utilities (only available in test builds)
#[cfg(test)]
pub mod test_support;

// Re-export commonly used types
pub use alloc::{OpaqueBuffer, OpaqueKind};
pub use api::{ArchApi, GraphApi, MapApi, RandomApi, ScotchNum, SizeofApi, StratApi};
pub use error::{BridgeError, BridgeResult};
pub use lifecycle::{LifecycleController, OpaqueResource, Outcome, ResourceState};
pub use loader::LibraryLoader;
pub use random::RandomControl;
pub use registry::{LoadedVariant, VariantRegistry};
pub use stream::{FileBridge, StreamHandle, StreamMode};
pub use symbols::{RawSymbol, SymbolTable};
pub use variant::{Concurrency, IndexWidth, VariantDescriptor};

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_smoke() {
        // Smoke test to verify the crate builds and tests run
        assert_eq!(VERSION, "0.1.0");
    }
}
