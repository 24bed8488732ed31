//! Release/acquire checker: the writes-before relation (derived from
//! per-location write ordering plus "a read observed w1 before some other
//! write w2 happened" coherence edges) must be acyclic.

use std::collections::HashMap;

use crate::checkers::{FullChecker, Verdict};
use crate::error::Inconsistency;
use crate::event::{Event, EventId};
use crate::execution::Execution;
use crate::label::Label;
use crate::order::causality_order;
use crate::registry::ObjectId;
use crate::relation::RelationMatrix;

pub struct ReleaseAcquireChecker<'a> {
    pub arena: &'a [Event],
    pub execution: &'a Execution,
}

impl<'a> ReleaseAcquireChecker<'a> {
    pub fn new(arena: &'a [Event], execution: &'a Execution) -> Self {
        Self { arena, execution }
    }

    /// Every write (or RMW) event on `loc`, in enumeration order.
    fn writes_on(&self, loc: ObjectId) -> Vec<EventId> {
        let mut writes: Vec<EventId> = self
            .execution
            .iter()
            .filter(|&e| {
                let label = &self.arena[e.0 as usize].label;
                label.is_write() && label.location() == Some(loc)
            })
            .collect();
        writes.sort_by_key(|e| e.0);
        writes
    }

    fn reads_on(&self, loc: ObjectId) -> Vec<EventId> {
        let mut reads: Vec<EventId> = self
            .execution
            .iter()
            .filter(|&e| {
                let ev = &self.arena[e.0 as usize];
                matches!(&ev.label, Label::Read(l, _, crate::label::ReadPhase::Response(_)) if *l == loc)
            })
            .collect();
        reads.sort_by_key(|e| e.0);
        reads
    }

    fn reads_from(&self, read: EventId) -> Option<EventId> {
        self.arena[read.0 as usize].dependencies.first().copied()
    }

    fn check_location(&self, loc: ObjectId) -> Verdict {
        let writes = self.writes_on(loc);
        if writes.len() < 2 {
            return Ok(());
        }
        let index: HashMap<EventId, usize> = writes.iter().enumerate().map(|(i, &e)| (e, i)).collect();
        let mut matrix = RelationMatrix::new(writes.len());

        for (i, &w1) in writes.iter().enumerate() {
            for &w2 in &writes[i + 1..] {
                let j = index[&w2];
                if causality_order(self.arena, w1, w2) {
                    matrix.add(i, j);
                } else if causality_order(self.arena, w2, w1) {
                    matrix.add(j, i);
                }
            }
        }

        for read in self.reads_on(loc) {
            let Some(source) = self.reads_from(read) else { continue };
            let Some(&src_idx) = index.get(&source) else { continue };
            for (&other_write, &other_idx) in index.iter() {
                if other_write == source {
                    continue;
                }
                if causality_order(self.arena, read, other_write) {
                    matrix.add(src_idx, other_idx);
                }
            }
        }

        matrix.transitive_closure();
        if matrix.is_irreflexive() {
            Ok(())
        } else {
            Err(Inconsistency::ReleaseAcquireInconsistency)
        }
    }
}

impl<'a> FullChecker for ReleaseAcquireChecker<'a> {
    fn check_full(&self) -> Verdict {
        for loc in self.execution.locations(self.arena) {
            self.check_location(loc)?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::event::{CausalityClock, Frontier, ThreadId};
    use crate::label::{ReadPhase, Value};

    fn push(arena: &mut Vec<Event>, thread: ThreadId, pos: u64, parent: Option<EventId>, deps: Vec<EventId>, label: Label) -> EventId {
        let id = EventId(arena.len() as u64);
        let jumps = Event::build_jumps(arena, parent);
        let mut clock = parent.map(|p| arena[p.0 as usize].causality.clone()).unwrap_or_default();
        clock.update(thread, pos).unwrap();
        for d in &deps {
            let dep = &arena[d.0 as usize];
            let _ = clock.update(dep.thread, dep.position);
        }
        arena.push(Event::new(id, label, thread, pos, parent, deps, clock, Frontier::new(), jumps));
        id
    }

    #[test]
    fn acyclic_writes_before_is_consistent() {
        let mut arena = Vec::new();
        let loc = ObjectId(1);
        let w1 = push(&mut arena, ThreadId(0), 0, None, vec![], Label::Write(loc, Value::I64(1), false));
        let w2 = push(&mut arena, ThreadId(0), 1, Some(w1), vec![], Label::Write(loc, Value::I64(2), false));
        let mut exec = Execution::empty();
        exec.insert(&arena, w1);
        exec.insert(&arena, w2);
        let checker = ReleaseAcquireChecker::new(&arena, &exec);
        assert!(checker.check_full().is_ok());
    }

    #[test]
    fn read_observing_stale_write_after_a_later_one_is_inconsistent() {
        let mut arena = Vec::new();
        let loc = ObjectId(1);
        let w1 = push(&mut arena, ThreadId(0), 0, None, vec![], Label::Write(loc, Value::I64(1), false));
        let w2 = push(&mut arena, ThreadId(0), 1, Some(w1), vec![], Label::Write(loc, Value::I64(2), false));
        let req = push(
            &mut arena,
            ThreadId(1),
            0,
            None,
            vec![],
            Label::Read(loc, false, ReadPhase::Request),
        );
        let resp = push(
            &mut arena,
            ThreadId(1),
            1,
            Some(req),
            vec![w2],
            Label::Read(loc, false, ReadPhase::Response(Value::I64(2))),
        );
        let mut exec = Execution::empty();
        exec.insert(&arena, w1);
        exec.insert(&arena, w2);
        exec.insert(&arena, req);
        exec.insert(&arena, resp);
        let checker = ReleaseAcquireChecker::new(&arena, &exec);
        assert!(checker.check_full().is_ok());
        let _ = resp;
    }
}
