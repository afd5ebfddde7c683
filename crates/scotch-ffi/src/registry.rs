//! Variant registry: the root of the bridge.
//!
//! Tracks which ABI variants are resident, routes callers to their variant's
//! symbol table, and runs the cross-variant collision self-check whenever a
//! new variant joins a process that already has others loaded.
//!
//! Variants are loaded on first acquisition and never unloaded before
//! process teardown: the native libraries hold global state (notably the
//! pseudo-random generator) that is not safe to tear down mid-process.

use crate::error::BridgeResult;
use crate::loader::{LibraryLoader, VariantHandles};
use crate::symbols::{RawSymbol, SymbolTable};
use crate::variant::VariantDescriptor;
use libloading::Library;
use scotch_config::{BridgeConfig, ConfigLoader};
use std::collections::HashMap;
use std::sync::{Arc, Mutex, OnceLock};

/// One resident ABI variant: its live library handles plus resolved symbols.
///
/// The library handles are held for the lifetime of the value and the value
/// itself lives in the registry until process teardown, so resolved symbol
/// addresses stay valid.
pub struct LoadedVariant {
    descriptor: VariantDescriptor,
    symbols: SymbolTable,
    _main: Option<Library>,
    _sequential: Option<Library>,
}

impl LoadedVariant {
    pub(crate) fn from_handles(descriptor: VariantDescriptor, handles: VariantHandles) -> Self {
        let symbols = SymbolTable::resolve_from(descriptor, &handles.main);
        Self {
            descriptor,
            symbols,
            _main: Some(handles.main),
            _sequential: handles.sequential,
        }
    }

    /// Variant stand-in with no backing library, for exercising registry and
    /// lifecycle logic without a native library present.
    #[cfg(test)]
    pub(crate) fn stub(descriptor: VariantDescriptor, symbols: SymbolTable) -> Self {
        Self {
            descriptor,
            symbols,
            _main: None,
            _sequential: None,
        }
    }

    pub fn descriptor(&self) -> VariantDescriptor {
        self.descriptor
    }

    pub fn symbols(&self) -> &SymbolTable {
        &self.symbols
    }

    /// Resolve an abstract operation name against this variant.
    pub fn resolve(&self, operation: &str) -> BridgeResult<RawSymbol> {
        self.symbols.resolve(operation)
    }
}

impl std::fmt::Debug for LoadedVariant {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("LoadedVariant")
            .field("descriptor", &self.descriptor)
            .field("symbols", &self.symbols.len())
            .finish()
    }
}

/// Registry of resident variants.
pub struct VariantRegistry {
    loader: LibraryLoader,
    default_variant: VariantDescriptor,
    variants: Mutex<HashMap<VariantDescriptor, Arc<LoadedVariant>>>,
    /// Variants that failed the collision self-check. Parked here so their
    /// library handles stay mapped (dropping them would dlclose mid-process)
    /// while keeping them out of callers' hands.
    quarantined: Mutex<Vec<LoadedVariant>>,
}

static GLOBAL: OnceLock<VariantRegistry> = OnceLock::new();

impl VariantRegistry {
    /// Create a registry from bridge configuration.
    pub fn new(config: &BridgeConfig) -> Self {
        Self {
            loader: LibraryLoader::new(config),
            default_variant: VariantDescriptor::from_selection(&config.variant),
            variants: Mutex::new(HashMap::new()),
            quarantined: Mutex::new(Vec::new()),
        }
    }

    /// Process-wide registry, configured from scotch-ffi.toml / SCOTCH_FFI_*
    /// on first use. Missing or unreadable configuration falls back to the
    /// built-in defaults (32-bit sequential, platform search paths).
    pub fn global() -> &'static VariantRegistry {
        GLOBAL.get_or_init(|| {
            let config = std::env::current_dir()
                .map_err(|_| ())
                .and_then(|cwd| {
                    ConfigLoader::new()
                        .load_from_directory(&cwd)
                        .map_err(|_| ())
                })
                .unwrap_or_default();
            VariantRegistry::new(&config)
        })
    }

    /// The per-process default variant from configuration.
    pub fn default_variant(&self) -> VariantDescriptor {
        self.default_variant
    }

    /// Acquire a variant, loading it on first use.
    ///
    /// Idempotent: repeated acquisition of the same descriptor returns the
    /// same loaded instance (identical symbol-table identity), without
    /// reloading. A failed acquisition leaves other variants untouched and
    /// may be retried (for instance after fixing the search path).
    pub fn acquire(&self, descriptor: VariantDescriptor) -> BridgeResult<Arc<LoadedVariant>> {
        let mut variants = self.lock();
        if let Some(loaded) = variants.get(&descriptor) {
            return Ok(Arc::clone(loaded));
        }

        let handles = self.loader.open_variant(descriptor)?;
        let loaded = LoadedVariant::from_handles(descriptor, handles);
        self.register(&mut variants, loaded)
    }

    /// Acquire the configured default variant.
    pub fn acquire_default(&self) -> BridgeResult<Arc<LoadedVariant>> {
        self.acquire(self.default_variant)
    }

    /// Descriptors currently resident, in no particular order.
    pub fn loaded(&self) -> Vec<VariantDescriptor> {
        self.lock().keys().copied().collect()
    }

    /// Run the collision self-check against every resident variant, then
    /// insert. A collision aborts the registration: the colliding variant is
    /// moved to the quarantine list so its library stays mapped (a drop here
    /// would dlclose it mid-process, and native global state does not survive
    /// that) but it is never handed to callers.
    fn register(
        &self,
        variants: &mut HashMap<VariantDescriptor, Arc<LoadedVariant>>,
        loaded: LoadedVariant,
    ) -> BridgeResult<Arc<LoadedVariant>> {
        for existing in variants.values() {
            if let Err(collision) = loaded.symbols().verify_disjoint(existing.symbols()) {
                self.quarantine_lock().push(loaded);
                return Err(collision);
            }
        }
        let loaded = Arc::new(loaded);
        variants.insert(loaded.descriptor(), Arc::clone(&loaded));
        Ok(loaded)
    }

    #[cfg(test)]
    pub(crate) fn register_stub(&self, loaded: LoadedVariant) -> BridgeResult<Arc<LoadedVariant>> {
        let mut variants = self.lock();
        self.register(&mut variants, loaded)
    }

    /// Descriptors of variants parked by a failed collision self-check.
    pub fn quarantined(&self) -> Vec<VariantDescriptor> {
        self.quarantine_lock()
            .iter()
            .map(LoadedVariant::descriptor)
            .collect()
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, HashMap<VariantDescriptor, Arc<LoadedVariant>>> {
        // A poisoned lock only means another thread panicked mid-insert;
        // the map itself is still consistent.
        self.variants
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    fn quarantine_lock(&self) -> std::sync::MutexGuard<'_, Vec<LoadedVariant>> {
        self.quarantined
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::BridgeError;
    use crate::test_support;
    use crate::variant::{Concurrency, IndexWidth};
    use pretty_assertions::assert_eq;
    use scotch_config::{LibraryConfig, VariantSelection};
    use tempfile::TempDir;

    fn empty_registry() -> (VariantRegistry, TempDir) {
        let tmp = TempDir::new().unwrap();
        let config = BridgeConfig {
            variant: VariantSelection {
                int_size: 64,
                parallel: false,
            },
            libraries: LibraryConfig {
                lib_dir: Some(tmp.path().to_path_buf()),
                search_paths: vec![tmp.path().to_path_buf()],
                ..Default::default()
            },
        };
        (VariantRegistry::new(&config), tmp)
    }

    fn d(width: IndexWidth) -> VariantDescriptor {
        VariantDescriptor::new(width, Concurrency::Sequential)
    }

    #[test]
    fn test_acquire_is_idempotent_for_registered_variant() {
        let (registry, _tmp) = empty_registry();
        let source = test_support::FakeSource::new().with("SCOTCH_graphInit_64", 0x4000);
        registry
            .register_stub(test_support::stub_variant(d(IndexWidth::W64), &source))
            .unwrap();

        let first = registry.acquire(d(IndexWidth::W64)).unwrap();
        let second = registry.acquire(d(IndexWidth::W64)).unwrap();

        // Same instance, hence identical symbol-table identity.
        assert!(Arc::ptr_eq(&first, &second));
        assert!(std::ptr::eq(first.symbols(), second.symbols()));
    }

    #[test]
    fn test_unavailable_variant_does_not_poison_registry() {
        let (registry, _tmp) = empty_registry();
        let err = registry.acquire(d(IndexWidth::W32)).unwrap_err();
        assert!(matches!(err, BridgeError::VariantUnavailable { .. }));
        assert!(registry.loaded().is_empty());

        // Other variants remain registrable afterwards.
        let source = test_support::FakeSource::new().with("SCOTCH_graphInit_64", 0x4000);
        registry
            .register_stub(test_support::stub_variant(d(IndexWidth::W64), &source))
            .unwrap();
        assert_eq!(registry.loaded(), vec![d(IndexWidth::W64)]);
    }

    #[test]
    fn test_collision_detected_at_registration_time() {
        let (registry, _tmp) = empty_registry();
        let first = test_support::FakeSource::new().with("SCOTCH_graphOrder_32", 0xbad0);
        let second = test_support::FakeSource::new().with("SCOTCH_graphOrder_64", 0xbad0);

        registry
            .register_stub(test_support::stub_variant(d(IndexWidth::W32), &first))
            .unwrap();
        let err = registry
            .register_stub(test_support::stub_variant(d(IndexWidth::W64), &second))
            .unwrap_err();

        assert!(matches!(err, BridgeError::SymbolCollision { .. }));
        // The colliding variant must never be handed to callers.
        assert_eq!(registry.loaded(), vec![d(IndexWidth::W32)]);
    }

    #[test]
    fn test_colliding_variant_is_quarantined_not_dropped() {
        let (registry, _tmp) = empty_registry();
        let first = test_support::FakeSource::new().with("SCOTCH_graphPart_32", 0xcafe);
        let second = test_support::FakeSource::new().with("SCOTCH_graphPart_64", 0xcafe);

        registry
            .register_stub(test_support::stub_variant(d(IndexWidth::W32), &first))
            .unwrap();
        registry
            .register_stub(test_support::stub_variant(d(IndexWidth::W64), &second))
            .unwrap_err();

        // The rejected variant stays owned by the registry (its library
        // handles must not be dropped, which would unload the library) but
        // is invisible to acquire.
        assert_eq!(registry.quarantined(), vec![d(IndexWidth::W64)]);
        assert_eq!(registry.loaded(), vec![d(IndexWidth::W32)]);
    }

    #[test]
    fn test_default_variant_comes_from_config() {
        let (registry, _tmp) = empty_registry();
        assert_eq!(registry.default_variant(), d(IndexWidth::W64));
    }

    #[test]
    fn test_resolve_routes_through_owning_variant() {
        let (registry, _tmp) = empty_registry();
        let source = test_support::FakeSource::new().with("SCOTCH_graphCheck_64", 0x7777);
        let loaded = registry
            .register_stub(test_support::stub_variant(d(IndexWidth::W64), &source))
            .unwrap();
        assert_eq!(loaded.resolve("graphCheck").unwrap().addr(), 0x7777);
        assert!(matches!(
            loaded.resolve("graphBuild"),
            Err(BridgeError::SymbolNotFound { .. })
        ));
    }
}
