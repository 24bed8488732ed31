//! External trait seams (component 6): the surface the instrumented
//! runtime under test calls into, and the surface the driver calls out to
//! when it needs to pick which thread runs next.
//!
//! New code directly transcribing spec §6's interface list; shaped after
//! the teacher's `node.rs` request/response call pattern (`create_event`
//! returning a result the caller awaits on) generalized to the engine's
//! synchronous request/response event pairs.

use crate::error::DriverError;
use crate::event::ThreadId;
use crate::label::Value;
use crate::registry::ObjectIdentityKey;

/// Every hook the instrumented program under test calls into. Each method
/// corresponds to one or more `Label` variants; a call either returns once a
/// response event has been synthesized, or reports `DriverError::Blocked`
/// if the calling runtime must suspend the thread until some other thread's
/// action discharges it.
pub trait RuntimeEvents {
    fn on_thread_fork(&mut self, parent: ThreadId, children: &[ThreadId]) -> Result<(), DriverError>;
    fn on_thread_start(&mut self, thread: ThreadId, is_main: bool) -> Result<(), DriverError>;
    fn on_thread_finish(&mut self, thread: ThreadId) -> Result<(), DriverError>;
    fn on_thread_join(&mut self, thread: ThreadId, joined: &[ThreadId]) -> Result<(), DriverError>;

    fn on_object_allocation(&mut self, thread: ThreadId, key: ObjectIdentityKey) -> Result<crate::registry::ObjectId, DriverError>;

    fn on_read(
        &mut self,
        thread: ThreadId,
        loc: crate::registry::ObjectId,
        exclusive: bool,
    ) -> Result<Value, DriverError>;
    fn on_write(
        &mut self,
        thread: ThreadId,
        loc: crate::registry::ObjectId,
        value: Value,
        exclusive: bool,
    ) -> Result<(), DriverError>;
    fn on_read_modify_write(
        &mut self,
        thread: ThreadId,
        loc: crate::registry::ObjectId,
        expected: Value,
        new_value: Value,
    ) -> Result<(), DriverError>;

    fn on_lock(&mut self, thread: ThreadId, loc: crate::registry::ObjectId, reentrant: bool) -> Result<(), DriverError>;
    fn on_unlock(&mut self, thread: ThreadId, loc: crate::registry::ObjectId, reentrant: bool) -> Result<(), DriverError>;
    fn on_wait(
        &mut self,
        thread: ThreadId,
        loc: crate::registry::ObjectId,
        reentrant: bool,
    ) -> Result<(), DriverError>;
    fn on_notify(&mut self, thread: ThreadId, loc: crate::registry::ObjectId, broadcast: bool) -> Result<(), DriverError>;

    fn on_park(&mut self, thread: ThreadId) -> Result<(), DriverError>;
    fn on_unpark(&mut self, thread: ThreadId, target: ThreadId) -> Result<(), DriverError>;

    fn on_actor_span_start(&mut self, thread: ThreadId, actor: crate::registry::ObjectId) -> Result<(), DriverError>;
    fn on_actor_span_end(&mut self, thread: ThreadId, actor: crate::registry::ObjectId) -> Result<(), DriverError>;

    fn on_random(&mut self, thread: ThreadId) -> Result<(), DriverError>;
    fn on_coroutine_suspend(&mut self, thread: ThreadId) -> Result<(), DriverError>;
}

/// The exploration-side seam (spec §6): which runnable thread should the
/// runtime schedule next, and how the driver's replay/live phases interact
/// with that choice. The default strategy is exhaustive enumeration (the
/// driver tries each runnable thread as a new branch), but a `Scheduler`
/// lets a caller plug in a fixed or randomized strategy for a single
/// concrete replay.
pub trait Scheduler {
    /// Whether the scheduler wants to preempt `thread` right now rather than
    /// let it keep running until its next blocking call.
    fn should_switch(&mut self, thread: ThreadId) -> bool;

    /// Picks the next thread to run, given an optional hint (e.g. the
    /// thread the driver would otherwise pick), or `None` if the scheduler
    /// has no preference (the driver falls back to exhaustive branching).
    fn choose_thread(&mut self, hint: Option<ThreadId>) -> Option<ThreadId>;

    /// Whether `thread` is still eligible to be scheduled at all.
    fn is_active(&mut self, thread: ThreadId) -> bool;

    /// Whether the scheduler is currently replaying a previously recorded
    /// decision rather than making a fresh one.
    fn in_replay_phase(&mut self) -> bool;

    /// Whether the next scheduling decision for `thread` can be served from
    /// the replay log rather than requiring a fresh choice.
    fn can_replay_next(&mut self, thread: ThreadId) -> bool;
}

/// A scheduler with no preference; used when the driver is doing full
/// exhaustive exploration rather than a guided run.
#[derive(Debug, Default, Clone, Copy)]
pub struct ExhaustiveScheduler;

impl Scheduler for ExhaustiveScheduler {
    fn should_switch(&mut self, _thread: ThreadId) -> bool {
        false
    }

    fn choose_thread(&mut self, _hint: Option<ThreadId>) -> Option<ThreadId> {
        None
    }

    fn is_active(&mut self, _thread: ThreadId) -> bool {
        true
    }

    fn in_replay_phase(&mut self) -> bool {
        false
    }

    fn can_replay_next(&mut self, _thread: ThreadId) -> bool {
        false
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn exhaustive_scheduler_has_no_preference_and_accepts_every_thread() {
        let mut s = ExhaustiveScheduler;
        assert!(!s.should_switch(ThreadId(0)));
        assert_eq!(s.choose_thread(Some(ThreadId(1))), None);
        assert!(s.is_active(ThreadId(0)));
        assert!(!s.in_replay_phase());
        assert!(!s.can_replay_next(ThreadId(0)));
    }
}
