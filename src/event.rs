//! Event identity and the binary-lifted ancestor structure (component 4).
//!
//! Grounded in the teacher's `event::Event` (immutable, constructed once via
//! `Event::new`) generalized from a content-addressed CRDT record to an
//! enumeration-ordered atomic action with explicit causality bookkeeping.

use std::fmt;

use crate::label::Label;
use crate::order::VectorClock;

/// Max binary-lifting jump table size: `jumps[k]` is the `2^k`-th ancestor,
/// giving a maximum single stride of `2^9 = 512`.
pub const K: usize = 10;

/// A thread identifier. Threads are never reused within a run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct ThreadId(pub u32);

/// A monotonically assigned identifier respecting the total enumeration
/// order: `program_order(x, y) => x.id < y.id`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct EventId(pub u64);

impl fmt::Display for EventId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "e{}", self.0)
    }
}

pub type ThreadPosition = u64;

/// A thread's causality clock: the vector clock over thread positions used
/// to decide `causalityOrder`.
pub type CausalityClock = VectorClock<ThreadId, ThreadPosition>;

/// Per-thread program-order-maximal event of an execution, frozen at the
/// moment an event is constructed (component 5). Stored inside the event so
/// rolling back to it is `O(threads)`.
#[derive(Debug, Clone, Default)]
pub struct Frontier {
    last: std::collections::BTreeMap<ThreadId, EventId>,
}

impl Frontier {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, thread: ThreadId) -> Option<EventId> {
        self.last.get(&thread).copied()
    }

    pub fn set(&mut self, thread: ThreadId, event: EventId) {
        self.last.insert(thread, event);
    }

    pub fn threads(&self) -> impl Iterator<Item = ThreadId> + '_ {
        self.last.keys().copied()
    }

    pub fn iter(&self) -> impl Iterator<Item = (ThreadId, EventId)> + '_ {
        self.last.iter().map(|(&t, &e)| (t, e))
    }
}

/// An atomic action: a unique `EventID`, an immutable `Label`, its position
/// within its thread, a link to its program-order predecessor, explicit
/// dependencies (reads-from / synchronization senders / allocator), a
/// derived causality clock, and — for the driver's bookkeeping — a frozen
/// frontier snapshot.
#[derive(Debug, Clone)]
pub struct Event {
    pub id: EventId,
    pub label: Label,
    pub thread: ThreadId,
    pub position: ThreadPosition,
    pub parent: Option<EventId>,
    pub dependencies: Vec<EventId>,
    pub causality: CausalityClock,
    pub frontier: Frontier,
    jumps: [Option<EventId>; K],
}

impl Event {
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        id: EventId,
        label: Label,
        thread: ThreadId,
        position: ThreadPosition,
        parent: Option<EventId>,
        dependencies: Vec<EventId>,
        causality: CausalityClock,
        frontier: Frontier,
        jumps: [Option<EventId>; K],
    ) -> Self {
        Self {
            id,
            label,
            thread,
            position,
            parent,
            dependencies,
            causality,
            frontier,
            jumps,
        }
    }

    /// Builds the jump table for a new event given the arena built so far
    /// and the event's chosen parent.
    pub fn build_jumps(arena: &[Event], parent: Option<EventId>) -> [Option<EventId>; K] {
        let mut jumps = [None; K];
        jumps[0] = parent;
        for k in 1..K {
            jumps[k] = match jumps[k - 1] {
                Some(p) => arena[p.0 as usize].jumps[k - 1],
                None => None,
            };
        }
        jumps
    }

    /// The `n`-th predecessor in program order (`n = 0` is `self`, `n = 1` is
    /// the parent), computed in `O(log n)` via the binary-lifting jump
    /// table. Equals the naive parent-walk for all `0 <= n <= position`.
    pub fn pred_nth(&self, arena: &[Event], n: u64) -> Option<EventId> {
        if n == 0 {
            return Some(self.id);
        }
        let mut cur = self.id;
        let mut remaining = n;
        for k in (0..K).rev() {
            let stride = 1u64 << k;
            if remaining & stride != 0 {
                cur = arena[cur.0 as usize].jumps[k]?;
                remaining -= stride;
            }
        }
        if remaining == 0 {
            Some(cur)
        } else {
            None
        }
    }
}
