//! Secondary event indexing and memory-access race-status tracking
//! (component 6).
//!
//! Grounded in the teacher's `DashMap<EventHash, NodeIndex>` secondary index
//! (`dag.rs`) for the by-category lookup, and in the pack's
//! `other_examples/6cbbe112...race_detector.rs` per-location bookkeeping
//! shape for the race-free flags.

use dashmap::DashMap;

use crate::event::{Event, EventId};
use crate::label::Category;
use crate::order::causality_order;
use crate::registry::ObjectId;

/// Maps a label's `Category` to every event recorded under it, in
/// enumeration order. Lets checkers and the aggregator fetch "every read on
/// this location" or "every lifecycle event of this thread" without
/// scanning the whole arena.
#[derive(Debug, Default)]
pub struct EventIndex {
    by_category: DashMap<Category, Vec<EventId>>,
}

impl EventIndex {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn record(&self, category: Category, event: EventId) {
        self.by_category.entry(category).or_default().push(event);
    }

    pub fn events_for(&self, category: &Category) -> Vec<EventId> {
        self.by_category.get(category).map(|v| v.clone()).unwrap_or_default()
    }

    /// Rebuilds the index from scratch by replaying every event of an
    /// execution in enumeration order. Used after a backtrack truncates the
    /// arena, since the index has no notion of removal.
    pub fn rebuild(arena: &[Event], events: impl Iterator<Item = EventId>) -> Self {
        let index = Self::new();
        let mut events: Vec<EventId> = events.collect();
        events.sort_by_key(|e| e.0);
        for event in events {
            let label = &arena[event.0 as usize].label;
            index.record(label.category(), event);
        }
        index
    }
}

/// Per-location access bookkeeping: every write and read seen so far, and
/// whether the location has remained race-free under each of the two
/// criteria a memory-consistency checker cares about.
#[derive(Debug, Clone)]
pub struct LocationAccesses {
    pub writes: Vec<EventId>,
    pub reads: Vec<EventId>,
    /// `true` iff every pair of exclusive writes observed so far is
    /// causality-ordered (no two concurrent writes raced).
    pub ww_race_free: bool,
    /// `true` iff every write is causality-ordered with respect to every
    /// concurrently recorded read (no read/write race).
    pub rw_race_free: bool,
}

impl Default for LocationAccesses {
    fn default() -> Self {
        Self {
            writes: Vec::new(),
            reads: Vec::new(),
            ww_race_free: true,
            rw_race_free: true,
        }
    }
}

fn concurrent(arena: &[Event], a: EventId, b: EventId) -> bool {
    a != b && !causality_order(arena, a, b) && !causality_order(arena, b, a)
}

/// Tracks, per `ObjectId`, the accesses made to that location and whether it
/// has stayed race-free so far. Updated incrementally as each new event is
/// constructed (component 6's "updated as events are added" requirement).
#[derive(Debug, Default)]
pub struct MemoryAccessIndex {
    locations: DashMap<ObjectId, LocationAccesses>,
}

impl MemoryAccessIndex {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn record_write(&self, arena: &[Event], loc: ObjectId, event: EventId) {
        let mut entry = self.locations.entry(loc).or_default();
        for &other in entry.writes.iter() {
            if concurrent(arena, other, event) {
                entry.ww_race_free = false;
            }
        }
        for &other in entry.reads.iter() {
            if concurrent(arena, other, event) {
                entry.rw_race_free = false;
            }
        }
        entry.writes.push(event);
    }

    pub fn record_read(&self, arena: &[Event], loc: ObjectId, event: EventId) {
        let mut entry = self.locations.entry(loc).or_default();
        for &other in entry.writes.iter() {
            if concurrent(arena, other, event) {
                entry.rw_race_free = false;
            }
        }
        entry.reads.push(event);
    }

    pub fn is_race_free(&self, loc: ObjectId) -> (bool, bool) {
        self.locations
            .get(&loc)
            .map(|e| (e.ww_race_free, e.rw_race_free))
            .unwrap_or((true, true))
    }

    pub fn rebuild(arena: &[Event], writes_and_reads: impl Iterator<Item = (ObjectId, EventId, bool)>) -> Self {
        let index = Self::new();
        let mut ordered: Vec<_> = writes_and_reads.collect();
        ordered.sort_by_key(|&(_, e, _)| e.0);
        for (loc, event, is_write) in ordered {
            if is_write {
                index.record_write(arena, loc, event);
            } else {
                index.record_read(arena, loc, event);
            }
        }
        index
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::event::{CausalityClock, Frontier, ThreadId};
    use crate::label::Label;

    fn push(arena: &mut Vec<Event>, thread: ThreadId, pos: u64, parent: Option<EventId>) -> EventId {
        let id = EventId(arena.len() as u64);
        let jumps = Event::build_jumps(arena, parent);
        let mut clock = parent.map(|p| arena[p.0 as usize].causality.clone()).unwrap_or_default();
        clock.update(thread, pos).unwrap();
        arena.push(Event::new(id, Label::Random, thread, pos, parent, vec![], clock, Frontier::new(), jumps));
        id
    }

    #[test]
    fn concurrent_writes_mark_not_race_free() {
        let mut arena = Vec::new();
        let e0 = push(&mut arena, ThreadId(0), 0, None);
        let e1 = push(&mut arena, ThreadId(1), 0, None);
        let idx = MemoryAccessIndex::new();
        idx.record_write(&arena, ObjectId(5), e0);
        idx.record_write(&arena, ObjectId(5), e1);
        let (ww, _) = idx.is_race_free(ObjectId(5));
        assert!(!ww);
    }

    #[test]
    fn ordered_writes_stay_race_free() {
        let mut arena = Vec::new();
        let e0 = push(&mut arena, ThreadId(0), 0, None);
        let e1 = push(&mut arena, ThreadId(0), 1, Some(e0));
        let idx = MemoryAccessIndex::new();
        idx.record_write(&arena, ObjectId(5), e0);
        idx.record_write(&arena, ObjectId(5), e1);
        let (ww, _) = idx.is_race_free(ObjectId(5));
        assert!(ww);
    }

    #[test]
    fn event_index_groups_by_category() {
        let mut arena = Vec::new();
        let e0 = push(&mut arena, ThreadId(0), 0, None);
        let index = EventIndex::new();
        index.record(arena[e0.0 as usize].label.category(), e0);
        assert_eq!(index.events_for(&Category::Random), vec![e0]);
    }
}
