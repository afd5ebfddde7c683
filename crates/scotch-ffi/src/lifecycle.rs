//! Resource lifecycle control.
//!
//! Every opaque native structure moves through an explicit state machine:
//!
//! ```text
//! Allocated --init--> Initialized
//! Initialized --operate--> Initialized   (outcome Success)
//! Initialized --operate--> Degraded      (outcome Declined)
//! Initialized --operate--> Faulted       (outcome Error)
//! Initialized --finalize--> Finalized
//! Degraded --finalize--> Finalized       (only if the declined operation's
//!                                         policy permits it)
//! ```
//!
//! The native teardown entry points assume a fully constructed structure, so
//! calling them on a resource whose initializing call failed (or whose last
//! operation errored) is a double-free or heap corruption, not a no-op. The
//! controller therefore gates `finalize` on the recorded outcome rather than
//! on the caller's intuition, and reports misuse as
//! [`BridgeError::LifecycleViolation`] immediately.
//!
//! Whether a *declined* operation leaves the structure finalizable is not
//! uniform across the native surface; it is tracked per operation in
//! [`decline_policy`], and operations without confirmed data default to
//! forbidding finalize.

use crate::alloc::{self, OpaqueBuffer, OpaqueKind};
use crate::error::{BridgeError, BridgeResult};
use crate::registry::LoadedVariant;
use crate::variant::VariantDescriptor;
use std::os::raw::{c_int, c_void};

/// Tri-valued result of a native call.
///
/// The native return-code contract is bit-exact: 0 is success, 1 means the
/// operation declined gracefully (for example a graph too small to coarsen
/// further), and anything at or above 2 is an error whose numeric value
/// carries diagnostic meaning.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Outcome {
    Success,
    Declined,
    Error(i32),
}

impl Outcome {
    /// Classify a raw native return code.
    pub fn from_code(code: c_int) -> Self {
        match code {
            0 => Outcome::Success,
            1 => Outcome::Declined,
            code => Outcome::Error(code),
        }
    }

    pub fn is_success(self) -> bool {
        self == Outcome::Success
    }
}

/// Lifecycle state of one opaque resource.
///
/// `Degraded` and `Faulted` are deliberately distinct states rather than a
/// shared "don't finalize" bucket: a degraded resource may still be
/// finalizable depending on the declined operation, a faulted one never is.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ResourceState {
    Allocated,
    Initialized,
    Degraded,
    Faulted,
    Finalized,
}

/// Whether a declined operation leaves its subject structure finalizable.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DeclinePolicy {
    AllowsFinalize,
    ForbidsFinalize,
}

/// Per-operation decline policies, enumerated empirically.
///
/// A matching decline leaves the subject graph untouched, so it stays
/// finalizable. A declined coarsening means the coarse structure was never
/// built, so tearing it down would walk uninitialized memory.
const DECLINE_POLICIES: &[(&str, DeclinePolicy)] = &[
    ("graphCoarsenMatch", DeclinePolicy::AllowsFinalize),
    ("graphCoarsen", DeclinePolicy::ForbidsFinalize),
    ("graphCoarsenBuild", DeclinePolicy::ForbidsFinalize),
];

/// Decline policy for an operation. Operations without a confirmed table
/// entry default to forbidding finalize (fail safe).
pub fn decline_policy(operation: &str) -> DeclinePolicy {
    DECLINE_POLICIES
        .iter()
        .find(|(name, _)| *name == operation)
        .map(|&(_, policy)| policy)
        .unwrap_or(DeclinePolicy::ForbidsFinalize)
}

/// One opaque native structure: a runtime-sized buffer tagged with its
/// owning variant, kind, and lifecycle state.
///
/// The buffer stays owned by the caller; the controller only validates
/// transitions around native calls.
#[derive(Debug)]
pub struct OpaqueResource {
    kind: OpaqueKind,
    descriptor: VariantDescriptor,
    buffer: OpaqueBuffer,
    state: ResourceState,
    last_outcome: Option<Outcome>,
    declined_operation: Option<String>,
}

impl OpaqueResource {
    /// Allocate a resource for `kind` under `variant`.
    ///
    /// The buffer length comes from the native sizing query for this exact
    /// variant, performed now; the buffer is zero-filled before any native
    /// call sees it. Allocation failure is fatal for the resource: there is
    /// no way to proceed without correctly sized memory.
    pub fn allocate(variant: &LoadedVariant, kind: OpaqueKind) -> BridgeResult<Self> {
        let len_bytes = alloc::size_for(variant, kind)?;
        Ok(Self {
            kind,
            descriptor: variant.descriptor(),
            buffer: OpaqueBuffer::zeroed(len_bytes),
            state: ResourceState::Allocated,
            last_outcome: None,
            declined_operation: None,
        })
    }

    pub fn kind(&self) -> OpaqueKind {
        self.kind
    }

    pub fn descriptor(&self) -> VariantDescriptor {
        self.descriptor
    }

    pub fn state(&self) -> ResourceState {
        self.state
    }

    /// Outcome of the most recent native call through the controller.
    pub fn last_outcome(&self) -> Option<Outcome> {
        self.last_outcome
    }

    /// Length of the backing buffer in bytes.
    pub fn len_bytes(&self) -> usize {
        self.buffer.len_bytes()
    }

    /// Raw pointer handed to native calls.
    pub fn as_mut_ptr(&mut self) -> *mut c_void {
        self.buffer.as_mut_ptr()
    }

    fn violation(&self, attempted: &'static str) -> BridgeError {
        BridgeError::LifecycleViolation {
            kind: self.kind,
            state: self.state,
            attempted,
        }
    }
}

/// Validates lifecycle transitions for resources of one variant.
///
/// The controller never owns resources; it checks that each native call is
/// legal for the resource's state and variant, performs it, and records the
/// outcome.
#[derive(Debug, Clone, Copy)]
pub struct LifecycleController {
    descriptor: VariantDescriptor,
}

impl LifecycleController {
    pub fn new(descriptor: VariantDescriptor) -> Self {
        Self { descriptor }
    }

    pub fn for_variant(variant: &LoadedVariant) -> Self {
        Self::new(variant.descriptor())
    }

    pub fn descriptor(&self) -> VariantDescriptor {
        self.descriptor
    }

    /// A resource may only be passed to symbols of the variant it was
    /// allocated against; the 32-bit and 64-bit layouts differ.
    fn check_variant(&self, resource: &OpaqueResource) -> BridgeResult<()> {
        if resource.descriptor != self.descriptor {
            return Err(BridgeError::VariantMismatch {
                resource: resource.descriptor,
                variant: self.descriptor,
            });
        }
        Ok(())
    }

    /// Run the native initializing call for a resource.
    ///
    /// On failure the resource stays `Allocated` and its buffer is re-zeroed,
    /// so the caller may retry with different parameters; reusing a dirty
    /// buffer for a second init is undefined behavior on the native side.
    pub fn init<F>(&self, resource: &mut OpaqueResource, call: F) -> BridgeResult<()>
    where
        F: FnOnce(*mut c_void) -> c_int,
    {
        self.check_variant(resource)?;
        if resource.state != ResourceState::Allocated {
            return Err(resource.violation("initialize"));
        }

        let outcome = Outcome::from_code(call(resource.buffer.as_mut_ptr()));
        resource.last_outcome = Some(outcome);
        match outcome {
            Outcome::Success => {
                resource.state = ResourceState::Initialized;
                Ok(())
            }
            Outcome::Declined | Outcome::Error(_) => {
                resource.buffer.rezero();
                let code = match outcome {
                    Outcome::Declined => 1,
                    Outcome::Error(code) => code,
                    Outcome::Success => unreachable!(),
                };
                Err(BridgeError::InitFailed {
                    kind: resource.kind,
                    code,
                })
            }
        }
    }

    /// Run a native operation against an initialized resource.
    ///
    /// `Declined` is an expected outcome, not an error: it is returned for
    /// the caller to branch on, and moves the resource to `Degraded` with
    /// the declining operation recorded for the finalize policy check. An
    /// error code faults the resource and is propagated with the native
    /// code attached.
    pub fn operate<F>(
        &self,
        operation: &str,
        resource: &mut OpaqueResource,
        call: F,
    ) -> BridgeResult<Outcome>
    where
        F: FnOnce(*mut c_void) -> c_int,
    {
        self.check_variant(resource)?;
        if resource.state != ResourceState::Initialized {
            return Err(resource.violation("operate on"));
        }

        let outcome = Outcome::from_code(call(resource.buffer.as_mut_ptr()));
        resource.last_outcome = Some(outcome);
        match outcome {
            Outcome::Success => Ok(outcome),
            Outcome::Declined => {
                resource.state = ResourceState::Degraded;
                resource.declined_operation = Some(operation.to_string());
                Ok(outcome)
            }
            Outcome::Error(code) => {
                resource.state = ResourceState::Faulted;
                Err(BridgeError::OperationError {
                    operation: operation.to_string(),
                    code,
                })
            }
        }
    }

    /// Run the native teardown call for a resource.
    ///
    /// Permitted from `Initialized`, or from `Degraded` when the declining
    /// operation's policy confirms the structure was left untouched.
    /// Finalizing a `Faulted` or already-`Finalized` resource is a
    /// programming error reported immediately: it is precisely the
    /// double-free this controller exists to prevent.
    pub fn finalize<F>(&self, resource: &mut OpaqueResource, call: F) -> BridgeResult<()>
    where
        F: FnOnce(*mut c_void),
    {
        self.check_variant(resource)?;
        match resource.state {
            ResourceState::Initialized => {}
            ResourceState::Degraded => {
                let operation = resource.declined_operation.as_deref().unwrap_or("");
                if decline_policy(operation) == DeclinePolicy::ForbidsFinalize {
                    return Err(resource.violation("finalize"));
                }
            }
            ResourceState::Allocated | ResourceState::Faulted | ResourceState::Finalized => {
                return Err(resource.violation("finalize"));
            }
        }

        call(resource.buffer.as_mut_ptr());
        resource.state = ResourceState::Finalized;
        Ok(())
    }
}
