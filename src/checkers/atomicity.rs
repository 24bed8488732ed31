//! Atomicity checker: no two distinct read-modify-writes (or exclusive
//! writes) may read from the same source event — if they did, both
//! "succeeded" against the same prior state, which is not atomic.

use std::collections::HashMap;

use crate::checkers::{IncrementalChecker, Verdict};
use crate::error::Inconsistency;
use crate::event::{Event, EventId};
use crate::label::Label;
use crate::registry::ObjectId;

#[derive(Debug, Default)]
pub struct AtomicityChecker {
    /// `(location, source event the RMW/exclusive-write read from) -> the
    /// first event claiming that source`.
    claims: HashMap<(ObjectId, EventId), EventId>,
}

impl AtomicityChecker {
    pub fn new() -> Self {
        Self::default()
    }

    fn source_of(arena: &[Event], event: EventId) -> Option<(ObjectId, EventId)> {
        let ev = &arena[event.0 as usize];
        if !ev.label.is_exclusive() {
            return None;
        }
        let loc = ev.label.location()?;
        let source = *ev.dependencies.first()?;
        Some((loc, source))
    }

    pub fn observe(&mut self, arena: &[Event], event: EventId) -> Verdict {
        let Some(key) = Self::source_of(arena, event) else {
            return Ok(());
        };
        match self.claims.get(&key) {
            Some(&existing) if existing != event => Err(Inconsistency::AtomicityViolation(existing, event)),
            _ => {
                self.claims.insert(key, event);
                Ok(())
            }
        }
    }
}

/// Adapter so [`AtomicityChecker`] can be driven generically; the arena must
/// be threaded in separately since the checker itself stores no reference
/// to it (events are immutable once constructed, but the arena keeps
/// growing).
pub struct AtomicityIncremental<'a> {
    pub checker: &'a mut AtomicityChecker,
    pub arena: &'a [Event],
}

impl<'a> IncrementalChecker for AtomicityIncremental<'a> {
    fn check_incremental(&mut self, event: EventId) -> Verdict {
        self.checker.observe(self.arena, event)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::event::{CausalityClock, Frontier, ThreadId};
    use crate::label::Value;

    fn push(arena: &mut Vec<Event>, thread: ThreadId, pos: u64, parent: Option<EventId>, deps: Vec<EventId>, label: Label) -> EventId {
        let id = EventId(arena.len() as u64);
        let jumps = Event::build_jumps(arena, parent);
        let mut clock = parent.map(|p| arena[p.0 as usize].causality.clone()).unwrap_or_default();
        clock.update(thread, pos).unwrap();
        arena.push(Event::new(id, label, thread, pos, parent, deps, clock, Frontier::new(), jumps));
        id
    }

    #[test]
    fn two_rmws_from_the_same_source_violate_atomicity() {
        let mut arena = Vec::new();
        let loc = ObjectId(1);
        let init = push(&mut arena, ThreadId(0), 0, None, vec![], Label::ObjectAllocation(loc));
        let rmw1 = push(
            &mut arena,
            ThreadId(0),
            1,
            Some(init),
            vec![init],
            Label::ReadModifyWrite(loc, Value::I64(0), Value::I64(1)),
        );
        let rmw2 = push(
            &mut arena,
            ThreadId(1),
            0,
            None,
            vec![init],
            Label::ReadModifyWrite(loc, Value::I64(0), Value::I64(2)),
        );
        let mut checker = AtomicityChecker::new();
        checker.observe(&arena, rmw1).unwrap();
        assert!(checker.observe(&arena, rmw2).is_err());
    }

    #[test]
    fn rmws_from_distinct_sources_are_fine() {
        let mut arena = Vec::new();
        let loc = ObjectId(1);
        let init = push(&mut arena, ThreadId(0), 0, None, vec![], Label::ObjectAllocation(loc));
        let rmw1 = push(
            &mut arena,
            ThreadId(0),
            1,
            Some(init),
            vec![init],
            Label::ReadModifyWrite(loc, Value::I64(0), Value::I64(1)),
        );
        let rmw2 = push(
            &mut arena,
            ThreadId(0),
            2,
            Some(rmw1),
            vec![rmw1],
            Label::ReadModifyWrite(loc, Value::I64(1), Value::I64(2)),
        );
        let mut checker = AtomicityChecker::new();
        checker.observe(&arena, rmw1).unwrap();
        assert!(checker.observe(&arena, rmw2).is_ok());
    }
}
