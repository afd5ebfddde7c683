//! Symbol resolution for loaded variants.
//!
//! The native build appends a width suffix to every public symbol, so the
//! abstract operation `graphInit` resolves to `SCOTCH_graphInit_32` or
//! `SCOTCH_graphInit_64` depending on the variant. Resolution is
//! deterministic: a miss is reported as [`BridgeError::SymbolNotFound`],
//! never papered over by guessing an alternate name.
//!
//! The suffix convention is treated as a hypothesis, not an invariant:
//! historically a few symbols shipped unsuffixed, so a 32-bit call could
//! silently land in the 64-bit build's global state. [`SymbolTable::
//! verify_disjoint`] re-checks the convention whenever a second variant is
//! loaded.

use crate::error::{BridgeError, BridgeResult};
use crate::variant::VariantDescriptor;
use std::collections::HashMap;

/// Abstract operation names bound eagerly at variant load time.
///
/// Mirrors the native public surface the bridge exposes; operations absent
/// from a particular build (for instance mesh support in a trimmed library)
/// simply stay out of the table and fail at resolve time.
pub const OPERATIONS: &[&str] = &[
    // Graph lifecycle and queries
    "graphInit",
    "graphExit",
    "graphCheck",
    "graphSize",
    "graphBuild",
    "graphLoad",
    "graphSave",
    "graphPart",
    "graphOrder",
    "graphMap",
    "graphCoarsen",
    "graphCoarsenMatch",
    "graphCoarsenBuild",
    // Mapping
    "graphMapInit",
    "graphMapCompute",
    "graphMapExit",
    // Strategy
    "stratInit",
    "stratExit",
    "stratGraphMap",
    "stratGraphOrder",
    // Target architecture
    "archInit",
    "archExit",
    "archCmplt",
    // Mesh
    "meshInit",
    "meshExit",
    "meshCheck",
    "meshLoad",
    "meshSave",
    // Global pseudo-random state
    "randomReset",
    "randomSeed",
    "randomVal",
    "randomSave",
    "randomLoad",
    // Opaque structure sizing queries
    "graphSizeof",
    "meshSizeof",
    "stratSizeof",
    "archSizeof",
    "mapSizeof",
    "orderSizeof",
    "geomSizeof",
    "contextSizeof",
];

/// Operations that live in the shared error library, which is identical for
/// all variants and carries no width suffix. These are the only symbols
/// declared equivalent across variants of different widths.
pub const SHARED_OPERATIONS: &[&str] = &["errorPrint", "errorPrintW", "errorProg"];

/// Concrete symbol name for an operation under a variant's suffix convention.
pub fn symbol_name(descriptor: VariantDescriptor, operation: &str) -> String {
    if SHARED_OPERATIONS.contains(&operation) {
        format!("SCOTCH_{operation}")
    } else {
        format!("SCOTCH_{operation}{}", descriptor.symbol_suffix())
    }
}

/// A resolved symbol address.
///
/// Holds the raw function address; callers cast it to the concrete signature
/// at the point of use.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RawSymbol(*const ());

// Safety: a symbol address is an immutable pointer into a library that is
// never unloaded before process teardown.
unsafe impl Send for RawSymbol {}
unsafe impl Sync for RawSymbol {}

impl RawSymbol {
    pub(crate) fn new(ptr: *const ()) -> Self {
        Self(ptr)
    }

    /// Numeric address, used by the collision self-check.
    pub fn addr(self) -> usize {
        self.0 as usize
    }

    /// Reinterpret the address as a concrete function pointer type.
    ///
    /// # Safety
    ///
    /// `F` must be a function pointer type whose signature matches the
    /// native symbol, and the owning library must remain loaded for the
    /// lifetime of the returned pointer (the registry guarantees the latter).
    pub unsafe fn cast<F: Copy>(self) -> F {
        assert_eq!(
            std::mem::size_of::<F>(),
            std::mem::size_of::<*const ()>(),
            "cast target must be a plain function pointer"
        );
        std::mem::transmute_copy(&self.0)
    }
}

/// Source of concrete symbol addresses, implemented by loaded libraries and
/// by in-memory fakes in tests.
pub(crate) trait SymbolSource {
    fn lookup(&self, symbol: &str) -> Option<RawSymbol>;
}

impl SymbolSource for libloading::Library {
    fn lookup(&self, symbol: &str) -> Option<RawSymbol> {
        // The concrete signature is applied later via RawSymbol::cast; here
        // the symbol is only an address.
        unsafe {
            self.get::<unsafe extern "C" fn()>(symbol.as_bytes())
                .ok()
                .map(|sym| RawSymbol(*sym as *const ()))
        }
    }
}

/// Resolved operation-name → address map for one loaded variant.
#[derive(Debug)]
pub struct SymbolTable {
    descriptor: VariantDescriptor,
    entries: HashMap<&'static str, RawSymbol>,
}

impl SymbolTable {
    /// Resolve the full operation set against a symbol source.
    ///
    /// Absent symbols are not an error here; they surface as
    /// `SymbolNotFound` when the operation is actually requested.
    pub(crate) fn resolve_from(
        descriptor: VariantDescriptor,
        source: &dyn SymbolSource,
    ) -> Self {
        let mut entries = HashMap::new();
        for &operation in OPERATIONS.iter().chain(SHARED_OPERATIONS) {
            if let Some(symbol) = source.lookup(&symbol_name(descriptor, operation)) {
                entries.insert(operation, symbol);
            }
        }
        Self {
            descriptor,
            entries,
        }
    }

    pub fn descriptor(&self) -> VariantDescriptor {
        self.descriptor
    }

    /// Number of operations resolved for this variant.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Look up an operation. Fails with `SymbolNotFound` when the variant's
    /// library does not export the suffixed symbol; no alternate name is
    /// tried.
    pub fn resolve(&self, operation: &str) -> BridgeResult<RawSymbol> {
        self.entries
            .get(operation)
            .copied()
            .ok_or_else(|| BridgeError::SymbolNotFound {
                variant: self.descriptor,
                symbol: symbol_name(self.descriptor, operation),
            })
    }

    /// Self-check that two variants do not alias each other's symbols.
    ///
    /// Variants of the same index width legitimately share addresses: the
    /// parallel build layers on top of the sequential library, so its plain
    /// graph operations resolve into the sequential build. Across different
    /// widths, any shared address (outside the common error library) means an
    /// unsuffixed native symbol, which is exactly the corruption vector this
    /// check exists to catch.
    pub fn verify_disjoint(&self, other: &SymbolTable) -> BridgeResult<()> {
        if self.descriptor.width == other.descriptor.width {
            return Ok(());
        }
        for (&operation, symbol) in &self.entries {
            if SHARED_OPERATIONS.contains(&operation) {
                continue;
            }
            for (&other_operation, other_symbol) in &other.entries {
                if SHARED_OPERATIONS.contains(&other_operation) {
                    continue;
                }
                if symbol.addr() == other_symbol.addr() {
                    return Err(BridgeError::SymbolCollision {
                        operation: if operation == other_operation {
                            operation.to_string()
                        } else {
                            format!("{operation}/{other_operation}")
                        },
                        first_variant: self.descriptor,
                        second_variant: other.descriptor,
                    });
                }
            }
        }
        Ok(())
    }
}
