//! Label algebra (part of component 4).
//!
//! Generalizes the teacher's `event::Operation` tagged union (`Put`,
//! `Delete`, `Merge`, `Genesis`) into the much richer label variants this
//! engine needs: memory accesses, thread lifecycle, locks, wait/notify,
//! park/unpark, actor spans.

use std::collections::BTreeSet;

use crate::event::ThreadId;
use crate::registry::ObjectId;

/// A runtime value observed by a read or produced by a write. Kept small and
/// concrete (no generic payload) since the engine only needs to compare
/// values for equality when checking reads-from and replaying writes.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum Value {
    I64(i64),
    Bool(bool),
    Object(ObjectId),
}

impl Default for Value {
    /// The default value observed by a read from a fresh allocation or the
    /// initialization event.
    fn default() -> Self {
        Value::I64(0)
    }
}

/// A two-phase (request/response) operation, parameterized over the
/// response's payload.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Phase<T> {
    Request,
    Response(T),
}

impl<T> Phase<T> {
    pub fn is_request(&self) -> bool {
        matches!(self, Phase::Request)
    }

    pub fn is_response(&self) -> bool {
        matches!(self, Phase::Response(_))
    }
}

/// The three phases a memory read can be in: a bare request, a synthesized
/// response carrying the observed value, or (after aggregation) a receive.
#[derive(Debug, Clone, PartialEq)]
pub enum ReadPhase {
    Request,
    Response(Value),
    Receive(Value),
}

/// The accumulating state of a thread-join barrier: still waiting on a
/// non-empty set of threads, or completed (at which point a response event
/// may be synthesized).
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum JoinState {
    Pending(BTreeSet<ThreadId>),
    Completed,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ActorSpanKind {
    Start,
    End,
    Span,
}

/// The tagged union of atomic actions an event can carry. Immutable once an
/// event is constructed.
#[derive(Debug, Clone, PartialEq)]
pub enum Label {
    Initialization,
    ObjectAllocation(ObjectId),
    ThreadStart(ThreadId, bool, Phase<()>),
    ThreadFinish(ThreadId),
    ThreadFork(ThreadId, Vec<ThreadId>),
    ThreadJoin(ThreadId, Vec<ThreadId>, JoinState),
    Read(ObjectId, bool, ReadPhase),
    Write(ObjectId, Value, bool),
    ReadModifyWrite(ObjectId, Value, Value),
    Lock(ObjectId, Phase<()>, bool),
    Unlock(ObjectId, bool),
    Wait(ObjectId, Phase<()>, bool, bool),
    Notify(ObjectId, bool),
    Park(ThreadId, Phase<()>),
    Unpark(ThreadId),
    ActorSpan(ThreadId, ObjectId, ActorSpanKind),
    Random,
    CoroutineSuspend,
}

/// The key an event is indexed under in the secondary event index
/// (component 6): a coarse category plus, where applicable, the object the
/// event concerns.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum Category {
    Init,
    Alloc,
    ThreadLifecycle(ThreadId),
    Memory(ObjectId),
    Mutex(ObjectId),
    ParkUnpark(ThreadId),
    Actor(ObjectId),
    Random,
    Coroutine,
}

impl Label {
    pub fn is_request(&self) -> bool {
        matches!(
            self,
            Label::ThreadStart(_, _, Phase::Request)
                | Label::ThreadJoin(_, _, JoinState::Pending(_))
                | Label::Read(_, _, ReadPhase::Request)
                | Label::Lock(_, Phase::Request, _)
                | Label::Wait(_, Phase::Request, _, _)
                | Label::Park(_, Phase::Request)
        )
    }

    pub fn is_response(&self) -> bool {
        matches!(
            self,
            Label::ThreadStart(_, _, Phase::Response(_))
                | Label::ThreadJoin(_, _, JoinState::Completed)
                | Label::Read(_, _, ReadPhase::Response(_))
                | Label::Lock(_, Phase::Response(_), _)
                | Label::Wait(_, Phase::Response(_), _, _)
                | Label::Park(_, Phase::Response(_))
        )
    }

    pub fn is_receive(&self) -> bool {
        matches!(self, Label::Read(_, _, ReadPhase::Receive(_)))
    }

    /// Labels that act as a synchronization *source* for some request.
    pub fn is_send(&self) -> bool {
        matches!(
            self,
            Label::Write(..)
                | Label::ThreadFinish(_)
                | Label::ThreadFork(..)
                | Label::Notify(..)
                | Label::Unpark(_)
                | Label::Unlock(..)
                | Label::Initialization
                | Label::ObjectAllocation(_)
        )
    }

    /// Labels that never participate in a request/response pairing: they are
    /// total actions complete in themselves.
    pub fn is_total(&self) -> bool {
        matches!(
            self,
            Label::Initialization
                | Label::ObjectAllocation(_)
                | Label::ThreadFork(..)
                | Label::ThreadFinish(_)
                | Label::Write(..)
                | Label::ReadModifyWrite(..)
                | Label::Unlock(..)
                | Label::Notify(..)
                | Label::Unpark(_)
                | Label::Random
                | Label::CoroutineSuspend
        )
    }

    pub fn is_blocking(&self) -> bool {
        self.is_request()
    }

    pub fn is_write(&self) -> bool {
        matches!(self, Label::Write(..) | Label::ReadModifyWrite(..))
    }

    pub fn is_read(&self) -> bool {
        matches!(self, Label::Read(..) | Label::ReadModifyWrite(..))
    }

    pub fn is_exclusive(&self) -> bool {
        matches!(
            self,
            Label::Read(_, true, _) | Label::Write(_, _, true) | Label::ReadModifyWrite(..)
        )
    }

    /// The object a memory/lock/actor label concerns, if any.
    pub fn location(&self) -> Option<ObjectId> {
        match self {
            Label::ObjectAllocation(loc)
            | Label::Read(loc, ..)
            | Label::Write(loc, ..)
            | Label::ReadModifyWrite(loc, ..)
            | Label::Lock(loc, ..)
            | Label::Unlock(loc, ..)
            | Label::Wait(loc, ..)
            | Label::Notify(loc, ..)
            | Label::ActorSpan(_, loc, _) => Some(*loc),
            _ => None,
        }
    }

    /// The coarse-grained category used to key the secondary event index.
    pub fn category(&self) -> Category {
        match self {
            Label::Initialization => Category::Init,
            Label::ObjectAllocation(_) => Category::Alloc,
            Label::ThreadStart(t, ..) | Label::ThreadFinish(t) | Label::ThreadFork(t, ..) | Label::ThreadJoin(t, ..) => {
                Category::ThreadLifecycle(*t)
            }
            Label::Read(loc, ..) | Label::Write(loc, ..) | Label::ReadModifyWrite(loc, ..) => Category::Memory(*loc),
            Label::Lock(loc, ..) | Label::Unlock(loc, ..) | Label::Wait(loc, ..) | Label::Notify(loc, ..) => {
                Category::Mutex(*loc)
            }
            Label::Park(t, _) | Label::Unpark(t) => Category::ParkUnpark(*t),
            Label::ActorSpan(_, actor, _) => Category::Actor(*actor),
            Label::Random => Category::Random,
            Label::CoroutineSuspend => Category::Coroutine,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn request_and_response_are_disjoint() {
        let req = Label::Read(ObjectId(2), false, ReadPhase::Request);
        let resp = Label::Read(ObjectId(2), false, ReadPhase::Response(Value::I64(0)));
        assert!(req.is_request() && !req.is_response());
        assert!(resp.is_response() && !resp.is_request());
    }

    #[test]
    fn total_labels_are_never_requests() {
        for label in [
            Label::Initialization,
            Label::Write(ObjectId(1), Value::I64(1), false),
            Label::ThreadFinish(ThreadId(0)),
        ] {
            assert!(!label.is_request());
        }
    }
}
