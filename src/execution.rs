//! Executions, frontiers and covering sets (component 5).
//!
//! Grounded in the teacher's `SpacetimeDAG` heads-as-frontier idea
//! (`dag.rs`) and in the pack's loom-style per-thread tracking
//! (`other_examples/16d7ca53...thread.rs`'s `Set::active`), generalized to
//! the causally-closed prefix of the arena that one exploration attempt has
//! constructed so far.

use std::collections::BTreeSet;

use crate::event::{Event, EventId, Frontier, ThreadId};
use crate::order::causality_order;
use crate::registry::ObjectId;

/// A causally-closed, finite subset of the arena: every event an exploration
/// attempt has constructed, together with the per-thread frontier derived
/// from it. `Execution -> Frontier -> Execution` round-trips on the maximal
/// events.
#[derive(Debug, Clone, Default)]
pub struct Execution {
    events: BTreeSet<EventId>,
    frontier: Frontier,
}

impl Execution {
    pub fn empty() -> Self {
        Self::default()
    }

    pub fn contains(&self, id: EventId) -> bool {
        self.events.contains(&id)
    }

    pub fn len(&self) -> usize {
        self.events.len()
    }

    pub fn is_empty(&self) -> bool {
        self.events.is_empty()
    }

    pub fn frontier(&self) -> &Frontier {
        &self.frontier
    }

    pub fn frontier_of(&self, thread: ThreadId) -> Option<EventId> {
        self.frontier.get(thread)
    }

    pub fn iter(&self) -> impl Iterator<Item = EventId> + '_ {
        self.events.iter().copied()
    }

    /// The event at thread-position `pos` on `thread`, if the execution
    /// reaches that far. Walks `thread`'s program-order parent chain back
    /// from its frontier entry, per spec §4.5.
    pub fn get(&self, arena: &[Event], thread: ThreadId, pos: u64) -> Option<EventId> {
        let mut cur = self.frontier_of(thread)?;
        loop {
            let ev = &arena[cur.0 as usize];
            if ev.position == pos {
                return Some(cur);
            }
            if ev.position < pos {
                return None;
            }
            cur = ev.parent?;
        }
    }

    /// The program-order successor of `e` within the execution, if one has
    /// been appended on its thread.
    pub fn next_event(&self, arena: &[Event], e: EventId) -> Option<EventId> {
        let ev = &arena[e.0 as usize];
        self.get(arena, ev.thread, ev.position + 1)
    }

    /// The last (program-order-maximal) event on `thread` in this execution.
    /// An alias of [`Self::frontier_of`] under the name spec §4.5 uses.
    pub fn last_event(&self, thread: ThreadId) -> Option<EventId> {
        self.frontier_of(thread)
    }

    /// The distinct locations touched by any event in the execution.
    pub fn locations(&self, arena: &[Event]) -> BTreeSet<ObjectId> {
        self.events.iter().filter_map(|&e| arena[e.0 as usize].label.location()).collect()
    }

    /// `true` iff `e` is a request still awaiting its synchronizing response
    /// — the last event on its thread, with no response ever appended after
    /// it in this execution.
    pub fn is_blocked_dangling_request(&self, arena: &[Event], e: EventId) -> bool {
        let ev = &arena[e.0 as usize];
        ev.label.is_request() && self.frontier_of(ev.thread) == Some(e)
    }

    /// Adds `id` to the execution and advances its thread's frontier entry.
    /// Caller must insert events in an order consistent with program order
    /// (parent before child) for the frontier to stay accurate.
    pub fn insert(&mut self, arena: &[Event], id: EventId) {
        self.events.insert(id);
        let ev = &arena[id.0 as usize];
        let advances = match self.frontier.get(ev.thread) {
            Some(current) => arena[current.0 as usize].position < ev.position,
            None => true,
        };
        if advances {
            self.frontier.set(ev.thread, id);
        }
    }

    /// Rebuilds an execution by walking each thread's program-order parent
    /// chain back from its frontier entry. Used after backtracking restores
    /// a prior frontier snapshot and the driver needs the corresponding
    /// execution view.
    pub fn from_frontier(arena: &[Event], frontier: &Frontier) -> Self {
        let mut exec = Self::empty();
        for (_, max_event) in frontier.iter() {
            let mut chain = Vec::new();
            let mut cur = Some(max_event);
            while let Some(e) = cur {
                if exec.contains(e) {
                    break;
                }
                chain.push(e);
                cur = arena[e.0 as usize].parent;
            }
            chain.reverse();
            for e in chain {
                exec.insert(arena, e);
            }
        }
        exec
    }
}

/// The covering relation: given a set of candidate dependency events, the
/// minimal generating subset under causality order (its causality-maximal
/// elements). Used when constructing a new event's `dependencies` list so it
/// stores only direct predecessors, not the whole transitive causal history
/// — the rest is recovered on demand via `causality_order`.
pub struct Covering;

impl Covering {
    pub fn of(arena: &[Event], candidates: &[EventId]) -> Vec<EventId> {
        let mut maximal = Vec::new();
        for (i, &candidate) in candidates.iter().enumerate() {
            let dominated = candidates.iter().enumerate().any(|(j, &other)| {
                i != j && candidate != other && causality_order(arena, candidate, other)
            });
            if !dominated {
                maximal.push(candidate);
            }
        }
        maximal.sort_by_key(|e| e.0);
        maximal.dedup();
        maximal
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::event::{CausalityClock, K};
    use crate::label::Label;

    fn push(arena: &mut Vec<Event>, thread: ThreadId, pos: u64, parent: Option<EventId>, deps: Vec<EventId>) -> EventId {
        let id = EventId(arena.len() as u64);
        let jumps = Event::build_jumps(arena, parent);
        let mut clock = CausalityClock::new();
        if let Some(p) = parent {
            clock = arena[p.0 as usize].causality.clone();
        }
        clock.update(thread, pos).unwrap();
        for d in &deps {
            let dep_ev = &arena[d.0 as usize];
            clock.update(dep_ev.thread, dep_ev.position).unwrap_or(());
        }
        arena.push(Event::new(id, Label::Random, thread, pos, parent, deps, clock, Frontier::new(), jumps));
        id
    }

    #[test]
    fn covering_drops_dominated_candidates() {
        let mut arena = Vec::new();
        let t0 = ThreadId(0);
        let e0 = push(&mut arena, t0, 0, None, vec![]);
        let e1 = push(&mut arena, t0, 1, Some(e0), vec![]);
        let maximal = Covering::of(&arena, &[e0, e1]);
        assert_eq!(maximal, vec![e1]);
        let _ = K;
    }

    #[test]
    fn execution_insert_tracks_frontier() {
        let mut arena = Vec::new();
        let t0 = ThreadId(0);
        let e0 = push(&mut arena, t0, 0, None, vec![]);
        let e1 = push(&mut arena, t0, 1, Some(e0), vec![]);
        let mut exec = Execution::empty();
        exec.insert(&arena, e0);
        exec.insert(&arena, e1);
        assert_eq!(exec.frontier_of(t0), Some(e1));
    }

    #[test]
    fn get_and_next_event_walk_program_order() {
        let mut arena = Vec::new();
        let t0 = ThreadId(0);
        let e0 = push(&mut arena, t0, 0, None, vec![]);
        let e1 = push(&mut arena, t0, 1, Some(e0), vec![]);
        let e2 = push(&mut arena, t0, 2, Some(e1), vec![]);
        let mut exec = Execution::empty();
        exec.insert(&arena, e0);
        exec.insert(&arena, e1);
        exec.insert(&arena, e2);
        assert_eq!(exec.get(&arena, t0, 1), Some(e1));
        assert_eq!(exec.get(&arena, t0, 3), None);
        assert_eq!(exec.next_event(&arena, e0), Some(e1));
        assert_eq!(exec.next_event(&arena, e2), None);
        assert_eq!(exec.last_event(t0), Some(e2));
    }

    #[test]
    fn is_blocked_dangling_request_detects_unanswered_request() {
        use crate::label::ReadPhase;

        let mut arena: Vec<Event> = Vec::new();
        let t0 = ThreadId(0);
        let id = EventId(0);
        let jumps = Event::build_jumps(&arena, None);
        let mut clock = CausalityClock::new();
        clock.update(t0, 0).unwrap();
        arena.push(Event::new(
            id,
            Label::Read(ObjectId(1), false, ReadPhase::Request),
            t0,
            0,
            None,
            vec![],
            clock,
            Frontier::new(),
            jumps,
        ));
        let mut exec = Execution::empty();
        exec.insert(&arena, id);
        assert!(exec.is_blocked_dangling_request(&arena, id));
    }
}
