//! Consistency checkers (component 8).
//!
//! New code grounded in spec §4.7, with the lock-replay state machine
//! additionally grounded in the pack's loom-style `other_examples/
//! 16d7ca53...thread.rs` `State` transitions. Each checker works against the
//! arena plus the indices built up in `src/index.rs`/`src/registry.rs`
//! rather than re-deriving them, matching the driver's "indices are updated
//! incrementally, checkers consult them" design.

pub mod atomicity;
pub mod lock;
pub mod release_acquire;
pub mod sc;

use crate::error::Inconsistency;
use crate::event::EventId;

/// A checker's verdict: either the execution observed so far is consistent,
/// or it violates the criterion, with the offending event(s) recorded in the
/// `Inconsistency` payload.
pub type Verdict = Result<(), Inconsistency>;

/// Run on every new event, using only the state touched by that event (the
/// memory-access index, the lock state machine). Cheap enough to call after
/// every `append_event`.
pub trait IncrementalChecker {
    fn check_incremental(&mut self, event: EventId) -> Verdict;
}

/// Run once an execution is judged otherwise complete (or on demand): walks
/// the whole execution and is allowed to be expensive (matrix closures,
/// linearization enumeration, replay).
pub trait FullChecker {
    fn check_full(&self) -> Verdict;
}
