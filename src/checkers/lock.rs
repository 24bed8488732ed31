//! Lock well-bracketing checker: replays lock/unlock/wait/notify events
//! against a per-mutex state machine (unheld, held-by-thread-with-depth, or
//! released-pending-wait), grounded in the pack's loom-style
//! `other_examples/16d7ca53...thread.rs` `State` transitions, extended to the
//! three-state monitor machine spec §4.7 requires: a `Wait` releases the
//! mutex it was holding, and only a matching `Notify`'s wake-up credit lets
//! the waiter's `Wait`-response reacquire it.

use std::collections::HashMap;

use crate::checkers::{FullChecker, IncrementalChecker, Verdict};
use crate::error::Inconsistency;
use crate::event::{Event, EventId, ThreadId};
use crate::execution::Execution;
use crate::label::{Label, Phase};
use crate::registry::ObjectId;

#[derive(Debug, Clone, Copy)]
struct Held {
    owner: ThreadId,
    depth: u32,
}

/// Wake-up credits banked by `Notify` on a mutex: a broadcast credit never
/// expires (any number of waiters may reacquire against it), while a
/// single-wake credit is consumed by exactly one waiter's reacquire.
#[derive(Debug, Clone, Copy, Default)]
struct PendingNotifies {
    broadcast: bool,
    single: u32,
}

#[derive(Debug, Default)]
pub struct LockChecker {
    held: HashMap<ObjectId, Held>,
    /// Threads that released `loc` via a `Wait` request and have not yet
    /// reacquired it, FIFO per mutex, with the reentrancy depth to restore.
    waiting: HashMap<ObjectId, Vec<(ThreadId, u32)>>,
    pending: HashMap<ObjectId, PendingNotifies>,
}

impl LockChecker {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn observe(&mut self, arena: &[Event], event: EventId) -> Verdict {
        let ev = &arena[event.0 as usize];
        match &ev.label {
            Label::Lock(loc, Phase::Response(()), reentrant) => self.acquire(*loc, ev.thread, *reentrant),
            Label::Unlock(loc, _) => self.release(*loc, ev.thread),
            Label::Wait(loc, Phase::Request, ..) => self.wait_release(*loc, ev.thread),
            Label::Wait(loc, Phase::Response(()), ..) => self.wait_reacquire(*loc, ev.thread),
            Label::Notify(loc, broadcast) => self.notify(*loc, *broadcast),
            _ => Ok(()),
        }
    }

    fn acquire(&mut self, loc: ObjectId, thread: ThreadId, reentrant: bool) -> Verdict {
        match self.held.get(&loc).copied() {
            None => {
                self.held.insert(loc, Held { owner: thread, depth: 1 });
                Ok(())
            }
            Some(held) if held.owner == thread && reentrant => {
                self.held.insert(
                    loc,
                    Held {
                        owner: thread,
                        depth: held.depth + 1,
                    },
                );
                Ok(())
            }
            Some(_) => Err(Inconsistency::LockConsistencyViolation(loc)),
        }
    }

    fn release(&mut self, loc: ObjectId, thread: ThreadId) -> Verdict {
        match self.held.get(&loc).copied() {
            Some(held) if held.owner == thread && held.depth > 1 => {
                self.held.insert(
                    loc,
                    Held {
                        owner: thread,
                        depth: held.depth - 1,
                    },
                );
                Ok(())
            }
            Some(held) if held.owner == thread => {
                self.held.remove(&loc);
                Ok(())
            }
            _ => Err(Inconsistency::LockConsistencyViolation(loc)),
        }
    }

    /// `Wait`'s request implicitly releases the mutex it holds (the monitor
    /// contract: a thread must hold the lock to wait on it), parking the
    /// thread as a waiter until a `Notify` credit lets it reacquire.
    fn wait_release(&mut self, loc: ObjectId, thread: ThreadId) -> Verdict {
        match self.held.get(&loc).copied() {
            Some(held) if held.owner == thread => {
                self.held.remove(&loc);
                self.waiting.entry(loc).or_default().push((thread, held.depth));
                Ok(())
            }
            _ => Err(Inconsistency::LockConsistencyViolation(loc)),
        }
    }

    fn notify(&mut self, loc: ObjectId, broadcast: bool) -> Verdict {
        let entry = self.pending.entry(loc).or_default();
        if broadcast {
            entry.broadcast = true;
        } else {
            entry.single += 1;
        }
        Ok(())
    }

    /// `Wait`'s response reacquires the mutex, but only once a bank credit
    /// (from a prior or later `Notify` — this engine pairs requests against
    /// already-existing sources, so `Notify` always precedes the `Wait` it
    /// resolves) is available: a broadcast credit is never exhausted, a
    /// single-wake credit is consumed by the first waiter to claim it.
    fn wait_reacquire(&mut self, loc: ObjectId, thread: ThreadId) -> Verdict {
        if self.held.contains_key(&loc) {
            return Err(Inconsistency::LockConsistencyViolation(loc));
        }
        let Some(waiters) = self.waiting.get_mut(&loc) else {
            return Err(Inconsistency::LockConsistencyViolation(loc));
        };
        let Some(pos) = waiters.iter().position(|&(t, _)| t == thread) else {
            return Err(Inconsistency::LockConsistencyViolation(loc));
        };
        let has_credit = match self.pending.get_mut(&loc) {
            Some(p) if p.broadcast => true,
            Some(p) if p.single > 0 => {
                p.single -= 1;
                true
            }
            _ => false,
        };
        if !has_credit {
            return Err(Inconsistency::LockConsistencyViolation(loc));
        }
        let (_, depth) = waiters.remove(pos);
        self.held.insert(loc, Held { owner: thread, depth });
        Ok(())
    }
}

pub struct LockIncremental<'a> {
    pub checker: &'a mut LockChecker,
    pub arena: &'a [Event],
}

impl<'a> IncrementalChecker for LockIncremental<'a> {
    fn check_incremental(&mut self, event: EventId) -> Verdict {
        self.checker.observe(self.arena, event)
    }
}

/// The standalone full-checker form (spec §4.7 "Lock checker (full)"):
/// replays every lock/unlock event of a whole execution, in enumeration
/// order, against a fresh per-mutex state machine.
pub struct LockFullChecker<'a> {
    pub arena: &'a [Event],
    pub execution: &'a Execution,
}

impl<'a> LockFullChecker<'a> {
    pub fn new(arena: &'a [Event], execution: &'a Execution) -> Self {
        Self { arena, execution }
    }
}

impl<'a> FullChecker for LockFullChecker<'a> {
    fn check_full(&self) -> Verdict {
        let mut ordered: Vec<EventId> = self.execution.iter().collect();
        ordered.sort_by_key(|e| e.0);
        let mut checker = LockChecker::new();
        for id in ordered {
            checker.observe(self.arena, id)?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::event::{CausalityClock, Frontier};

    fn push(arena: &mut Vec<Event>, thread: ThreadId, pos: u64, parent: Option<EventId>, label: Label) -> EventId {
        let id = EventId(arena.len() as u64);
        let jumps = Event::build_jumps(arena, parent);
        let mut clock = parent.map(|p| arena[p.0 as usize].causality.clone()).unwrap_or_default();
        clock.update(thread, pos).unwrap();
        arena.push(Event::new(id, label, thread, pos, parent, vec![], clock, Frontier::new(), jumps));
        id
    }

    #[test]
    fn well_bracketed_lock_unlock_is_consistent() {
        let mut arena = Vec::new();
        let loc = ObjectId(1);
        let t0 = ThreadId(0);
        let lock = push(&mut arena, t0, 0, None, Label::Lock(loc, Phase::Response(()), false));
        let unlock = push(&mut arena, t0, 1, Some(lock), Label::Unlock(loc, false));
        let mut checker = LockChecker::new();
        checker.observe(&arena, lock).unwrap();
        checker.observe(&arena, unlock).unwrap();
    }

    #[test]
    fn unlock_without_holding_is_a_violation() {
        let mut arena = Vec::new();
        let loc = ObjectId(1);
        let t0 = ThreadId(0);
        let unlock = push(&mut arena, t0, 0, None, Label::Unlock(loc, false));
        let mut checker = LockChecker::new();
        assert!(checker.observe(&arena, unlock).is_err());
    }

    #[test]
    fn acquiring_a_lock_held_by_another_thread_is_a_violation() {
        let mut arena = Vec::new();
        let loc = ObjectId(1);
        let lock1 = push(&mut arena, ThreadId(0), 0, None, Label::Lock(loc, Phase::Response(()), false));
        let lock2 = push(&mut arena, ThreadId(1), 0, None, Label::Lock(loc, Phase::Response(()), false));
        let mut checker = LockChecker::new();
        checker.observe(&arena, lock1).unwrap();
        assert!(checker.observe(&arena, lock2).is_err());
    }

    #[test]
    fn full_checker_replays_a_whole_execution_in_enumeration_order() {
        let mut arena = Vec::new();
        let loc = ObjectId(1);
        let t0 = ThreadId(0);
        let lock = push(&mut arena, t0, 0, None, Label::Lock(loc, Phase::Response(()), false));
        let unlock = push(&mut arena, t0, 1, Some(lock), Label::Unlock(loc, false));
        let mut exec = Execution::empty();
        exec.insert(&arena, lock);
        exec.insert(&arena, unlock);
        let checker = LockFullChecker::new(&arena, &exec);
        assert!(checker.check_full().is_ok());
    }

    /// T0 locks, then wait-releases (parking as a waiter); T1 locks the now
    /// free mutex, unlocks, and broadcasts; T0's wait-response reacquires
    /// against the broadcast credit; T0 unlocks. No overlap, all consistent.
    #[test]
    fn wait_release_lets_another_thread_contend_and_notify_lets_the_waiter_back_in() {
        let mut arena = Vec::new();
        let loc = ObjectId(1);
        let t0 = ThreadId(0);
        let t1 = ThreadId(1);
        let mut checker = LockChecker::new();

        let lock0 = push(&mut arena, t0, 0, None, Label::Lock(loc, Phase::Response(()), false));
        checker.observe(&arena, lock0).unwrap();
        let wait_req = push(&mut arena, t0, 1, Some(lock0), Label::Wait(loc, Phase::Request, false, false));
        checker.observe(&arena, wait_req).unwrap();

        let lock1 = push(&mut arena, t1, 0, None, Label::Lock(loc, Phase::Response(()), false));
        checker.observe(&arena, lock1).unwrap();
        let unlock1 = push(&mut arena, t1, 1, Some(lock1), Label::Unlock(loc, false));
        checker.observe(&arena, unlock1).unwrap();
        let notify = push(&mut arena, t1, 2, Some(unlock1), Label::Notify(loc, true));
        checker.observe(&arena, notify).unwrap();

        let wait_resp = push(&mut arena, t0, 2, Some(wait_req), Label::Wait(loc, Phase::Response(()), false, false));
        checker.observe(&arena, wait_resp).unwrap();
        let unlock0 = push(&mut arena, t0, 3, Some(wait_resp), Label::Unlock(loc, false));
        checker.observe(&arena, unlock0).unwrap();
    }

    /// T0 wait-releases; T1 locks but never unlocks before T0's wait-response
    /// tries to reacquire — the mutex is still held, so the reacquire must be
    /// rejected even though a notify credit is available.
    #[test]
    fn wait_reacquire_is_rejected_while_another_thread_still_holds_the_lock() {
        let mut arena = Vec::new();
        let loc = ObjectId(1);
        let t0 = ThreadId(0);
        let t1 = ThreadId(1);
        let mut checker = LockChecker::new();

        let lock0 = push(&mut arena, t0, 0, None, Label::Lock(loc, Phase::Response(()), false));
        checker.observe(&arena, lock0).unwrap();
        let wait_req = push(&mut arena, t0, 1, Some(lock0), Label::Wait(loc, Phase::Request, false, false));
        checker.observe(&arena, wait_req).unwrap();

        let lock1 = push(&mut arena, t1, 0, None, Label::Lock(loc, Phase::Response(()), false));
        checker.observe(&arena, lock1).unwrap();
        let notify = push(&mut arena, t1, 1, Some(lock1), Label::Notify(loc, true));
        checker.observe(&arena, notify).unwrap();

        let wait_resp = push(&mut arena, t0, 2, Some(wait_req), Label::Wait(loc, Phase::Response(()), false, false));
        assert!(checker.observe(&arena, wait_resp).is_err());
    }

    /// A single (non-broadcast) notify wakes at most one waiter: two threads
    /// wait on the same mutex, one `notify(false)` banks one credit, only the
    /// first reacquire to claim it succeeds.
    #[test]
    fn single_notify_wakes_only_one_of_two_waiters() {
        let mut arena = Vec::new();
        let loc = ObjectId(1);
        let t0 = ThreadId(0);
        let t1 = ThreadId(1);
        let t2 = ThreadId(2);
        let mut checker = LockChecker::new();

        let lock0 = push(&mut arena, t0, 0, None, Label::Lock(loc, Phase::Response(()), false));
        checker.observe(&arena, lock0).unwrap();
        let wait0 = push(&mut arena, t0, 1, Some(lock0), Label::Wait(loc, Phase::Request, false, false));
        checker.observe(&arena, wait0).unwrap();

        let lock1 = push(&mut arena, t1, 0, None, Label::Lock(loc, Phase::Response(()), false));
        checker.observe(&arena, lock1).unwrap();
        let wait1 = push(&mut arena, t1, 1, Some(lock1), Label::Wait(loc, Phase::Request, false, false));
        checker.observe(&arena, wait1).unwrap();

        let notify = push(&mut arena, t2, 0, None, Label::Notify(loc, false));
        checker.observe(&arena, notify).unwrap();

        let resp0 = push(&mut arena, t0, 2, Some(wait0), Label::Wait(loc, Phase::Response(()), false, false));
        checker.observe(&arena, resp0).unwrap();

        let resp1 = push(&mut arena, t1, 2, Some(wait1), Label::Wait(loc, Phase::Response(()), false, false));
        assert!(checker.observe(&arena, resp1).is_err());
    }

    #[test]
    fn full_checker_rejects_overlapping_ownership() {
        let mut arena = Vec::new();
        let loc = ObjectId(1);
        let lock1 = push(&mut arena, ThreadId(0), 0, None, Label::Lock(loc, Phase::Response(()), false));
        let lock2 = push(&mut arena, ThreadId(1), 0, None, Label::Lock(loc, Phase::Response(()), false));
        let mut exec = Execution::empty();
        exec.insert(&arena, lock1);
        exec.insert(&arena, lock2);
        let checker = LockFullChecker::new(&arena, &exec);
        assert!(checker.check_full().is_err());
    }
}
