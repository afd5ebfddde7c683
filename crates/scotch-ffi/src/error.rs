//! Bridge error taxonomy.
//!
//! Declined native operations are deliberately absent from this enum: a
//! return code of 1 means the operation declined gracefully and surfaces as
//! [`crate::lifecycle::Outcome::Declined`], a value the caller must branch on,
//! never an error.

use crate::alloc::OpaqueKind;
use crate::lifecycle::ResourceState;
use crate::variant::VariantDescriptor;
use thiserror::Error;

pub type BridgeResult<T> = Result<T, BridgeError>;

#[derive(Debug, Error)]
pub enum BridgeError {
    /// The shared object for a variant could not be located or loaded.
    /// Fatal for that variant only; other variants are unaffected.
    #[error("variant {variant} unavailable: {reason}")]
    VariantUnavailable {
        variant: VariantDescriptor,
        reason: String,
    },

    /// An operation has no symbol in the loaded variant. Fatal for that
    /// operation; never retried with a guessed alternate name.
    #[error("symbol '{symbol}' not found in {variant} library")]
    SymbolNotFound {
        variant: VariantDescriptor,
        symbol: String,
    },

    /// Two operations resolved to the same address across distinct variants.
    /// Indicates an unsuffixed native symbol; calls through it would execute
    /// against the wrong variant's global state.
    #[error(
        "symbol collision between {first_variant} and {second_variant}: \
         '{operation}' resolves to the same address in both"
    )]
    SymbolCollision {
        operation: String,
        first_variant: VariantDescriptor,
        second_variant: VariantDescriptor,
    },

    /// The native sizing query failed. Fatal: allocation must never fall
    /// back to a guessed constant.
    #[error("size query for {kind:?} failed on {variant}: {reason}")]
    SizeQueryFailed {
        variant: VariantDescriptor,
        kind: OpaqueKind,
        reason: String,
    },

    /// Native init returned non-zero. Recoverable: the buffer has been
    /// re-zeroed and the caller may retry with different parameters.
    #[error("failed to initialize {kind:?} resource (native code {code})")]
    InitFailed { kind: OpaqueKind, code: i32 },

    /// A native operation returned a code >= 2. The numeric code carries
    /// diagnostic meaning and is preserved verbatim.
    #[error("operation '{operation}' failed with native code {code}")]
    OperationError { operation: String, code: i32 },

    /// A resource was used with a variant other than the one it was
    /// allocated against.
    #[error("resource allocated for {resource} cannot be used with {variant}")]
    VariantMismatch {
        resource: VariantDescriptor,
        variant: VariantDescriptor,
    },

    /// An invalid lifecycle transition was attempted. This is a
    /// programming-error class: it flags the exact misuse (finalizing a
    /// faulted resource, re-initializing a live one) that corrupts native
    /// memory, so it is reported immediately and never downgraded.
    #[error("lifecycle violation: cannot {attempted} a {kind:?} resource in state {state:?}")]
    LifecycleViolation {
        kind: OpaqueKind,
        state: ResourceState,
        attempted: &'static str,
    },

    /// open/close failure on the ABI-matched file bridge, with the native
    /// errno observed through the bridge's own side channel.
    #[error("file bridge {operation} failed (errno {errno})")]
    StreamBridgeFailure {
        operation: &'static str,
        errno: i32,
    },
}
