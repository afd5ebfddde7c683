//! Typed entry-point tables.
//!
//! [`crate::symbols`] resolves operations to raw addresses; this module puts
//! concrete C signatures on them, one table per native structure family.
//! Width-dependent signatures are monomorphized over [`ScotchNum`], so a
//! table bound as `GraphApi<i32>` can only come from a 32-bit variant and the
//! index type mismatch that once silently truncated vertex counts is a type
//! error instead.
//!
//! The tables expose the raw unsafe calls; state tracking belongs to
//! [`crate::lifecycle::LifecycleController`], which callers route the calls
//! through.

use crate::error::{BridgeError, BridgeResult};
use crate::registry::LoadedVariant;
use crate::variant::{IndexWidth, VariantDescriptor};
use std::os::raw::{c_char, c_int, c_void};

mod sealed {
    pub trait Sealed {}
    impl Sealed for i32 {}
    impl Sealed for i64 {}
}

/// Native index integer type of one ABI width.
pub trait ScotchNum: sealed::Sealed + Copy + Default + 'static {
    const WIDTH: IndexWidth;
}

impl ScotchNum for i32 {
    const WIDTH: IndexWidth = IndexWidth::W32;
}

impl ScotchNum for i64 {
    const WIDTH: IndexWidth = IndexWidth::W64;
}

fn check_width<N: ScotchNum>(variant: &LoadedVariant) -> BridgeResult<()> {
    let descriptor = variant.descriptor();
    if descriptor.width != N::WIDTH {
        return Err(BridgeError::VariantMismatch {
            resource: VariantDescriptor::new(N::WIDTH, descriptor.concurrency),
            variant: descriptor,
        });
    }
    Ok(())
}

/// Graph operations. Opaque structure and `FILE*` arguments are `c_void`
/// pointers; index-typed arguments carry the variant's `N`.
#[derive(Clone, Copy)]
pub struct GraphApi<N: ScotchNum> {
    pub init: unsafe extern "C" fn(*mut c_void) -> c_int,
    pub exit: unsafe extern "C" fn(*mut c_void),
    pub check: unsafe extern "C" fn(*const c_void) -> c_int,
    pub size: unsafe extern "C" fn(*const c_void, *mut N, *mut N),
    #[allow(clippy::type_complexity)]
    pub build: unsafe extern "C" fn(
        *mut c_void,
        N,
        N,
        *const N,
        *const N,
        *const N,
        *const N,
        N,
        *const N,
        *const N,
    ) -> c_int,
    pub load: unsafe extern "C" fn(*mut c_void, *mut c_void, N, N) -> c_int,
    pub save: unsafe extern "C" fn(*const c_void, *mut c_void) -> c_int,
    pub part: unsafe extern "C" fn(*mut c_void, N, *const c_void, *mut N) -> c_int,
    #[allow(clippy::type_complexity)]
    pub order: unsafe extern "C" fn(
        *mut c_void,
        *const c_void,
        *mut N,
        *mut N,
        *mut N,
        *mut N,
        *mut N,
    ) -> c_int,
    pub map: unsafe extern "C" fn(*mut c_void, *const c_void, *const c_void, *mut N) -> c_int,
    pub coarsen: unsafe extern "C" fn(*mut c_void, N, f64, N, *mut c_void, *mut N) -> c_int,
}

impl<N: ScotchNum> GraphApi<N> {
    /// Bind the graph table against a loaded variant of matching width.
    pub fn bind(variant: &LoadedVariant) -> BridgeResult<Self> {
        check_width::<N>(variant)?;
        unsafe {
            Ok(Self {
                init: variant.resolve("graphInit")?.cast(),
                exit: variant.resolve("graphExit")?.cast(),
                check: variant.resolve("graphCheck")?.cast(),
                size: variant.resolve("graphSize")?.cast(),
                build: variant.resolve("graphBuild")?.cast(),
                load: variant.resolve("graphLoad")?.cast(),
                save: variant.resolve("graphSave")?.cast(),
                part: variant.resolve("graphPart")?.cast(),
                order: variant.resolve("graphOrder")?.cast(),
                map: variant.resolve("graphMap")?.cast(),
                coarsen: variant.resolve("graphCoarsen")?.cast(),
            })
        }
    }
}

/// Strategy operations. Strategy strings are plain C strings; no
/// index-typed arguments, so the table is width-independent.
#[derive(Clone, Copy)]
pub struct StratApi {
    pub init: unsafe extern "C" fn(*mut c_void) -> c_int,
    pub exit: unsafe extern "C" fn(*mut c_void),
    pub graph_map: unsafe extern "C" fn(*mut c_void, *const c_char) -> c_int,
    pub graph_order: unsafe extern "C" fn(*mut c_void, *const c_char) -> c_int,
}

impl StratApi {
    pub fn bind(variant: &LoadedVariant) -> BridgeResult<Self> {
        unsafe {
            Ok(Self {
                init: variant.resolve("stratInit")?.cast(),
                exit: variant.resolve("stratExit")?.cast(),
                graph_map: variant.resolve("stratGraphMap")?.cast(),
                graph_order: variant.resolve("stratGraphOrder")?.cast(),
            })
        }
    }
}

/// Target architecture operations.
#[derive(Clone, Copy)]
pub struct ArchApi<N: ScotchNum> {
    pub init: unsafe extern "C" fn(*mut c_void) -> c_int,
    pub exit: unsafe extern "C" fn(*mut c_void),
    /// Complete graph of `N` vertices.
    pub cmplt: unsafe extern "C" fn(*mut c_void, N) -> c_int,
}

impl<N: ScotchNum> ArchApi<N> {
    pub fn bind(variant: &LoadedVariant) -> BridgeResult<Self> {
        check_width::<N>(variant)?;
        unsafe {
            Ok(Self {
                init: variant.resolve("archInit")?.cast(),
                exit: variant.resolve("archExit")?.cast(),
                cmplt: variant.resolve("archCmplt")?.cast(),
            })
        }
    }
}

/// Mapping computed over a graph and a target architecture.
#[derive(Clone, Copy)]
pub struct MapApi<N: ScotchNum> {
    pub init: unsafe extern "C" fn(*mut c_void, *mut c_void, *const c_void, *mut N) -> c_int,
    pub compute: unsafe extern "C" fn(*mut c_void, *mut c_void, *const c_void) -> c_int,
    pub exit: unsafe extern "C" fn(*mut c_void, *mut c_void),
}

impl<N: ScotchNum> MapApi<N> {
    pub fn bind(variant: &LoadedVariant) -> BridgeResult<Self> {
        check_width::<N>(variant)?;
        unsafe {
            Ok(Self {
                init: variant.resolve("graphMapInit")?.cast(),
                compute: variant.resolve("graphMapCompute")?.cast(),
                exit: variant.resolve("graphMapExit")?.cast(),
            })
        }
    }
}

/// Global pseudo-random state of one variant's library.
///
/// Each variant keeps its own generator; these entry points only touch the
/// state of the library they were resolved from.
#[derive(Clone, Copy, Debug)]
pub struct RandomApi<N: ScotchNum> {
    pub reset: unsafe extern "C" fn(),
    pub seed: unsafe extern "C" fn(N),
    pub val: unsafe extern "C" fn(N) -> N,
    pub save: unsafe extern "C" fn(*mut c_void) -> c_int,
    pub load: unsafe extern "C" fn(*mut c_void) -> c_int,
}

impl<N: ScotchNum> RandomApi<N> {
    pub fn bind(variant: &LoadedVariant) -> BridgeResult<Self> {
        check_width::<N>(variant)?;
        unsafe {
            Ok(Self {
                reset: variant.resolve("randomReset")?.cast(),
                seed: variant.resolve("randomSeed")?.cast(),
                val: variant.resolve("randomVal")?.cast(),
                save: variant.resolve("randomSave")?.cast(),
                load: variant.resolve("randomLoad")?.cast(),
            })
        }
    }
}

/// Sizing queries for every opaque kind. Width-independent: all variants
/// report double-word counts through the same signature.
#[derive(Clone, Copy)]
pub struct SizeofApi {
    pub graph: unsafe extern "C" fn() -> c_int,
    pub mesh: unsafe extern "C" fn() -> c_int,
    pub strat: unsafe extern "C" fn() -> c_int,
    pub arch: unsafe extern "C" fn() -> c_int,
    pub mapping: unsafe extern "C" fn() -> c_int,
    pub ordering: unsafe extern "C" fn() -> c_int,
    pub geom: unsafe extern "C" fn() -> c_int,
    pub context: unsafe extern "C" fn() -> c_int,
}

impl SizeofApi {
    pub fn bind(variant: &LoadedVariant) -> BridgeResult<Self> {
        unsafe {
            Ok(Self {
                graph: variant.resolve("graphSizeof")?.cast(),
                mesh: variant.resolve("meshSizeof")?.cast(),
                strat: variant.resolve("stratSizeof")?.cast(),
                arch: variant.resolve("archSizeof")?.cast(),
                mapping: variant.resolve("mapSizeof")?.cast(),
                ordering: variant.resolve("orderSizeof")?.cast(),
                geom: variant.resolve("geomSizeof")?.cast(),
                context: variant.resolve("contextSizeof")?.cast(),
            })
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::{stub_variant, FakeSource};
    use crate::variant::Concurrency;

    fn d(width: IndexWidth) -> VariantDescriptor {
        VariantDescriptor::new(width, Concurrency::Sequential)
    }

    unsafe extern "C" fn random_reset_noop() {}

    unsafe extern "C" fn random_seed_noop(_seed: i64) {}

    unsafe extern "C" fn random_val_half(max: i64) -> i64 {
        max / 2
    }

    unsafe extern "C" fn stream_ok(_stream: *mut c_void) -> c_int {
        0
    }

    fn random_source_64() -> FakeSource {
        FakeSource::new()
            .with("SCOTCH_randomReset_64", random_reset_noop as usize)
            .with("SCOTCH_randomSeed_64", random_seed_noop as usize)
            .with("SCOTCH_randomVal_64", random_val_half as usize)
            .with(
                "SCOTCH_randomSave_64",
                stream_ok as unsafe extern "C" fn(*mut c_void) -> c_int as usize,
            )
            .with(
                "SCOTCH_randomLoad_64",
                stream_ok as unsafe extern "C" fn(*mut c_void) -> c_int as usize,
            )
    }

    #[test]
    fn test_bind_rejects_width_mismatch() {
        let variant = stub_variant(d(IndexWidth::W64), &random_source_64());
        let err = RandomApi::<i32>::bind(&variant).unwrap_err();
        assert!(matches!(err, BridgeError::VariantMismatch { .. }));
    }

    #[test]
    fn test_bind_reports_missing_symbol() {
        let source = FakeSource::new().with("SCOTCH_randomReset_64", random_reset_noop as usize);
        let variant = stub_variant(d(IndexWidth::W64), &source);
        let err = RandomApi::<i64>::bind(&variant).unwrap_err();
        assert!(matches!(
            err,
            BridgeError::SymbolNotFound { ref symbol, .. } if symbol == "SCOTCH_randomSeed_64"
        ));
    }

    #[test]
    fn test_bound_entry_points_are_callable() {
        let variant = stub_variant(d(IndexWidth::W64), &random_source_64());
        let api = RandomApi::<i64>::bind(&variant).unwrap();
        unsafe {
            (api.reset)();
            (api.seed)(42);
            assert_eq!((api.val)(100), 50);
        }
    }

    #[test]
    fn test_strat_table_is_width_independent() {
        unsafe extern "C" fn init_ok(_s: *mut c_void) -> c_int {
            0
        }
        unsafe extern "C" fn exit_noop(_s: *mut c_void) {}
        unsafe extern "C" fn parse_ok(_s: *mut c_void, _d: *const c_char) -> c_int {
            0
        }
        let source = FakeSource::new()
            .with("SCOTCH_stratInit_32", init_ok as usize)
            .with("SCOTCH_stratExit_32", exit_noop as usize)
            .with("SCOTCH_stratGraphMap_32", parse_ok as usize)
            .with("SCOTCH_stratGraphOrder_32", parse_ok as usize);
        let variant = stub_variant(d(IndexWidth::W32), &source);
        let api = StratApi::bind(&variant).unwrap();
        let mut slot = 0u64;
        unsafe {
            assert_eq!((api.init)(&mut slot as *mut u64 as *mut c_void), 0);
        }
    }
}
