//! Synchronization algebras (component 4's `⊕` operation).
//!
//! New code grounded directly in spec §4.4's algebra rules; the
//! composite-dispatcher shape follows the spec's own guidance to keep the
//! full table in one place (§9) rather than scatter label-shape matching
//! across the driver.

pub mod fork_join;
pub mod lock;
pub mod memory;
pub mod park;
pub mod wait_notify;

use crate::label::Label;

/// Whether a request label synchronizes with exactly one sender (`Binary`,
/// e.g. a read pairing with the one write it reads from) or with however
/// many senders are needed to discharge a standing obligation (`Barrier`,
/// e.g. a join waiting on every forked thread to finish).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SyncKind {
    Binary,
    Barrier,
}

/// The synchronization algebra: given a request label and the sender
/// label(s) proposed to satisfy it, produces the response label, or `None`
/// if the combination is not a valid pairing.
pub trait SynchronizationAlgebra {
    fn sync_kind(&self, request: &Label) -> Option<SyncKind>;

    /// Attempts `request ⊕ sources`. For `Binary` requests only
    /// `sources[0]` is consulted; for `Barrier` requests every source in
    /// `sources` is folded in turn.
    fn synchronize(&self, request: &Label, sources: &[Label]) -> Option<Label>;

    /// Whether `response` is a shape `request` could synchronize into — a
    /// structural existence check, distinct from actually performing the
    /// synchronization against a concrete source (spec §4.4:
    /// `synchronizesInto`).
    fn synchronizes_into(&self, request: &Label, response: &Label) -> bool;

    /// Whether `response` is a valid response to `request` (spec §4.4:
    /// `isValidResponse`). Defaults to `synchronizes_into`, since this
    /// algebra has no response shape that synchronizes without also being
    /// valid.
    fn is_valid_response(&self, request: &Label, response: &Label) -> bool {
        self.synchronizes_into(request, response)
    }
}

/// The engine's single synchronization algebra, dispatching to the
/// per-concern submodules by the request label's shape.
#[derive(Debug, Default, Clone, Copy)]
pub struct AtomicSynchronizationAlgebra;

impl SynchronizationAlgebra for AtomicSynchronizationAlgebra {
    fn sync_kind(&self, request: &Label) -> Option<SyncKind> {
        match request {
            Label::ThreadStart(..) => fork_join::START_KIND,
            Label::ThreadJoin(..) => fork_join::JOIN_KIND,
            Label::Read(..) => memory::KIND,
            Label::Lock(..) => lock::KIND,
            Label::Wait(..) => wait_notify::KIND,
            Label::Park(..) => park::KIND,
            _ => None,
        }
    }

    fn synchronize(&self, request: &Label, sources: &[Label]) -> Option<Label> {
        match request {
            Label::ThreadStart(..) => sources.first().and_then(|s| fork_join::synchronize_start(request, s)),
            Label::ThreadJoin(..) => fork_join::synchronize_join(request, sources),
            Label::Read(..) => sources.first().and_then(|s| memory::synchronize(request, s)),
            Label::Lock(..) => sources.first().and_then(|s| lock::synchronize(request, s)),
            Label::Wait(..) => sources.first().and_then(|s| wait_notify::synchronize(request, s)),
            Label::Park(..) => sources.first().and_then(|s| park::synchronize(request, s)),
            _ => None,
        }
    }

    fn synchronizes_into(&self, request: &Label, response: &Label) -> bool {
        match request {
            Label::ThreadStart(..) => fork_join::response_matches_start(request, response),
            Label::ThreadJoin(..) => fork_join::response_matches_join(request, response),
            Label::Read(..) => memory::response_matches(request, response),
            Label::Lock(..) => lock::response_matches(request, response),
            Label::Wait(..) => wait_notify::response_matches(request, response),
            Label::Park(..) => park::response_matches(request, response),
            _ => false,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::event::ThreadId;
    use crate::label::{Phase, Value};
    use crate::registry::ObjectId;

    #[test]
    fn dispatch_routes_read_to_memory_module() {
        let algebra = AtomicSynchronizationAlgebra;
        let request = Label::Read(ObjectId(1), false, crate::label::ReadPhase::Request);
        let write = Label::Write(ObjectId(1), Value::I64(7), false);
        let response = algebra.synchronize(&request, std::slice::from_ref(&write)).unwrap();
        assert_eq!(
            response,
            Label::Read(ObjectId(1), false, crate::label::ReadPhase::Response(Value::I64(7)))
        );
    }

    #[test]
    fn unrelated_source_does_not_synchronize() {
        let algebra = AtomicSynchronizationAlgebra;
        let request = Label::Park(ThreadId(0), Phase::Request);
        let write = Label::Write(ObjectId(1), Value::I64(7), false);
        assert!(algebra.synchronize(&request, std::slice::from_ref(&write)).is_none());
    }

    #[test]
    fn synchronizes_into_validates_lock_response_shape() {
        let algebra = AtomicSynchronizationAlgebra;
        let request = Label::Lock(ObjectId(2), crate::label::Phase::Request, false);
        let response = Label::Lock(ObjectId(2), crate::label::Phase::Response(()), false);
        assert!(algebra.synchronizes_into(&request, &response));
        assert!(algebra.is_valid_response(&request, &response));
        let wrong_loc = Label::Lock(ObjectId(3), crate::label::Phase::Response(()), false);
        assert!(!algebra.synchronizes_into(&request, &wrong_loc));
    }

    #[test]
    fn synchronizes_into_validates_wait_response_shape() {
        let algebra = AtomicSynchronizationAlgebra;
        let request = Label::Wait(ObjectId(1), crate::label::Phase::Request, false, false);
        let response = Label::Wait(ObjectId(1), crate::label::Phase::Response(()), false, false);
        assert!(algebra.synchronizes_into(&request, &response));
    }

    #[test]
    fn synchronizes_into_validates_read_response_shape() {
        let algebra = AtomicSynchronizationAlgebra;
        let request = Label::Read(ObjectId(1), false, crate::label::ReadPhase::Request);
        let response = Label::Read(ObjectId(1), false, crate::label::ReadPhase::Response(Value::I64(3)));
        assert!(algebra.synchronizes_into(&request, &response));
    }
}
