//! Error types for the event-structure engine.
//!
//! Two categories, per the driver's error-handling design: [`EngineError`] is
//! a fatal internal-invariant violation (a bug in the engine or its caller —
//! the run aborts), while [`Inconsistency`] is data describing a violation
//! found in the *program under test* and is reported up rather than panicked
//! on.

use thiserror::Error;

use crate::event::{EventId, ThreadId};
use crate::registry::ObjectId;

/// Fatal internal-invariant violation. The engine aborts the run when one of
/// these is produced; callers should treat it like a panic-adjacent bug
/// report rather than something to retry.
#[derive(Debug, Error)]
pub enum EngineError {
    #[error("event {child} has thread position {child_pos} but its parent {parent} has position {parent_pos}")]
    ParentPositionMismatch {
        parent: EventId,
        parent_pos: u64,
        child: EventId,
        child_pos: u64,
    },

    #[error("dependency {dep} of a new event is causality-ordered after its parent, which would create a cycle")]
    CausalityCycle { event: EventId, dep: EventId },

    #[error("exclusive write {write} has no exclusive-read-response parent on the same location")]
    ExclusiveWriteWithoutReadParent { write: EventId },

    #[error("object {0:?} is already registered")]
    DuplicateRegistration(ObjectId),

    #[error("event {0} references an unknown dependency {1}")]
    MissingDependency(EventId, EventId),

    #[error("no such event {0}")]
    UnknownEvent(EventId),

    #[error("thread {0:?} has no recorded root event")]
    UnknownThread(ThreadId),

    #[error("vector clock update for part {0:?} would go backwards: {1} -> {2}")]
    NonMonotoneClockUpdate(u64, u64, u64),

    #[error("label does not synchronize into the expected response shape")]
    InvalidSynchronization,

    #[error("more than one outstanding actor span on thread {0:?}")]
    NestedActorSpan(ThreadId),
}

/// A consistency violation found in the program under test. This is data,
/// not a control-flow exception: checkers return it, the driver records it
/// and moves on to the next branch.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum Inconsistency {
    #[error("atomicity violation: exclusive writes {0} and {1} both read-from the same source")]
    AtomicityViolation(EventId, EventId),

    #[error("release/acquire inconsistency: the writes-before relation is cyclic")]
    ReleaseAcquireInconsistency,

    #[error("lock consistency violation on mutex {0:?}")]
    LockConsistencyViolation(ObjectId),

    #[error("coherence violation on location {0:?}")]
    CoherenceViolation(ObjectId),

    #[error("sequential-consistency approximation is inconsistent (causal order plus writes-before is cyclic)")]
    SequentialConsistencyApproximationInconsistency,

    #[error("sequential-consistency replay violation at event {0}")]
    SequentialConsistencyReplayViolation(EventId),
}

/// Errors surfaced to the driver's runtime-facing API: a superset of the two
/// categories above, plus the (non-error, but exceptional) case of a request
/// that cannot yet synchronize into a response.
#[derive(Debug, Error)]
pub enum DriverError {
    #[error(transparent)]
    Engine(#[from] EngineError),

    #[error("inconsistent execution: {0}")]
    Inconsistent(#[from] Inconsistency),

    #[error("event {0} is a blocked dangling request awaiting a synchronizing partner")]
    Blocked(EventId),
}
