//! Sequential-consistency checker.
//!
//! A full checker in two stages, per spec §4.7's SC algorithm: first an
//! approximation (causality order unioned with writes-before must already
//! be acyclic — a cheap necessary condition), then a coherence decision
//! that enumerates candidate per-location write orders (bounded, since the
//! full set of linear extensions is exponential), saturates each candidate
//! into a full event order and replays it against an abstract
//! last-write-wins/lock-respecting machine. Grounded in spec §4.7; the
//! per-location enumeration reuses `src/graph.rs`'s bounded linear-extension
//! search and `src/checkers/lock.rs`'s lock state machine for the replay.

use std::collections::HashMap;

use crate::checkers::lock::LockChecker;
use crate::checkers::{FullChecker, Verdict};
use crate::config::ExplorationConfig;
use crate::error::Inconsistency;
use crate::event::{Event, EventId};
use crate::execution::Execution;
use crate::graph::{all_linear_extensions_bounded, kahn_toposort};
use crate::label::{Label, ReadPhase, Value};
use crate::order::causality_order;
use crate::registry::ObjectId;
use crate::relation::RelationMatrix;

pub struct SequentialConsistencyChecker<'a> {
    pub arena: &'a [Event],
    pub execution: &'a Execution,
    pub config: &'a ExplorationConfig,
}

impl<'a> SequentialConsistencyChecker<'a> {
    pub fn new(arena: &'a [Event], execution: &'a Execution, config: &'a ExplorationConfig) -> Self {
        Self { arena, execution, config }
    }

    fn ordered_events(&self) -> Vec<EventId> {
        let mut ids: Vec<EventId> = self.execution.iter().collect();
        ids.sort_by_key(|e| e.0);
        ids
    }

    fn writes_on(&self, ids: &[EventId], loc: ObjectId) -> Vec<EventId> {
        ids.iter()
            .copied()
            .filter(|&e| {
                let label = &self.arena[e.0 as usize].label;
                label.is_write() && label.location() == Some(loc)
            })
            .collect()
    }

    /// Causality order unioned with a coherence-closure-saturated
    /// writes-before approximation. Returns `None` (approximation
    /// inconsistent) if the result is cyclic.
    fn approximation(&self, ids: &[EventId]) -> Option<(RelationMatrix, HashMap<EventId, usize>)> {
        let index: HashMap<EventId, usize> = ids.iter().enumerate().map(|(i, &e)| (e, i)).collect();
        let mut matrix = RelationMatrix::new(ids.len());

        for (i, &x) in ids.iter().enumerate() {
            for &y in &ids[i + 1..] {
                let j = index[&y];
                if causality_order(self.arena, x, y) {
                    matrix.add(i, j);
                } else if causality_order(self.arena, y, x) {
                    matrix.add(j, i);
                }
            }
        }

        // `reads_from`: each read-response's index, the index of the write
        // it reads from, and the shared location — the triples the
        // coherence-closure rule below propagates edges across.
        let mut reads_from: Vec<(usize, usize, ObjectId)> = Vec::new();
        for &read in ids {
            let ev = &self.arena[read.0 as usize];
            let Label::Read(loc, _, ReadPhase::Response(_)) = &ev.label else {
                continue;
            };
            let Some(&source) = ev.dependencies.first() else { continue };
            let Some(&src_idx) = index.get(&source) else { continue };
            for &other in ids {
                if other == source {
                    continue;
                }
                let other_label = &self.arena[other.0 as usize].label;
                if !other_label.is_write() || other_label.location() != Some(*loc) {
                    continue;
                }
                if causality_order(self.arena, read, other) {
                    matrix.add(src_idx, index[&other]);
                }
            }
            reads_from.push((index[&read], src_idx, *loc));
        }

        // Stage-1 coherence closure (spec §4.7): a read R reading from W'
        // forces (a) any write W already ordered before R to also be
        // ordered before W' (`W <sc R => W <sc W'`), and (b) any
        // same-location write W already ordered after W' to also be ordered
        // after R (`W' <sc W => R <sc W`). Iterated to a fixpoint, since
        // either direction can create a new edge the other can act on; not
        // expressible as plain transitivity since it relates a read to
        // events via its reads-from source rather than via an existing edge
        // out of the read itself.
        loop {
            let mut additions: Vec<(usize, usize)> = Vec::new();
            for &(r, s, loc) in &reads_from {
                for (w_idx, &w) in ids.iter().enumerate() {
                    if w_idx == r || w_idx == s {
                        continue;
                    }
                    let label = &self.arena[w.0 as usize].label;
                    if !label.is_write() || label.location() != Some(loc) {
                        continue;
                    }
                    if matrix.get(w_idx, r) && !matrix.get(w_idx, s) {
                        additions.push((w_idx, s));
                    }
                    if matrix.get(s, w_idx) && !matrix.get(r, w_idx) {
                        additions.push((r, w_idx));
                    }
                }
            }
            if additions.is_empty() {
                break;
            }
            for (i, j) in additions {
                matrix.add(i, j);
            }
        }

        matrix.transitive_closure();
        if matrix.is_irreflexive() {
            Some((matrix, index))
        } else {
            None
        }
    }

    /// Tries every candidate combination of per-location write orders (up to
    /// `config.linearization_bound` each), checking whether augmenting the
    /// approximation with that candidate stays acyclic and whether the
    /// resulting total order replays cleanly.
    fn coherence_decision(&self, ids: &[EventId], approx: &RelationMatrix, index: &HashMap<EventId, usize>) -> Verdict {
        let locations: Vec<ObjectId> = self.execution.locations(self.arena).into_iter().collect();

        let mut per_location_candidates: Vec<Vec<Vec<EventId>>> = Vec::new();
        for &loc in &locations {
            let writes = self.writes_on(ids, loc);
            if writes.len() < 2 {
                per_location_candidates.push(vec![writes]);
                continue;
            }
            let mut local = RelationMatrix::new(writes.len());
            for (i, &w1) in writes.iter().enumerate() {
                for &w2 in &writes[i + 1..] {
                    let j = writes.iter().position(|&w| w == w2).unwrap();
                    if causality_order(self.arena, w1, w2) {
                        local.add(i, j);
                    } else if causality_order(self.arena, w2, w1) {
                        local.add(j, i);
                    }
                }
            }
            let extensions = all_linear_extensions_bounded(&local, self.config.linearization_bound);
            let candidates: Vec<Vec<EventId>> = extensions
                .extensions
                .into_iter()
                .map(|perm| perm.into_iter().map(|i| writes[i]).collect())
                .collect();
            per_location_candidates.push(candidates);
        }

        let mut last_failure: Option<Inconsistency> = None;
        for combo in cartesian_product(&per_location_candidates) {
            let mut candidate = approx.clone();
            for order in &combo {
                let indices: Vec<usize> = order.iter().map(|e| index[e]).collect();
                candidate.add_total_ordering(&indices);
            }
            candidate.transitive_closure();
            if !candidate.is_irreflexive() {
                continue;
            }
            let Some(topo) = kahn_toposort(&candidate) else { continue };
            let event_order: Vec<EventId> = topo.into_iter().map(|i| ids[i]).collect();
            match self.replay(&event_order) {
                Ok(()) => return Ok(()),
                // Replay found a coherence or ordering violation under this
                // candidate total order; keep trying the remaining
                // candidates before concluding the execution is
                // inconsistent, since another candidate may still replay
                // cleanly.
                Err(failure @ Inconsistency::CoherenceViolation(_))
                | Err(failure @ Inconsistency::SequentialConsistencyReplayViolation(_)) => {
                    last_failure = Some(failure);
                }
                Err(other) => return Err(other),
            }
        }

        Err(last_failure.unwrap_or_else(|| {
            Inconsistency::SequentialConsistencyReplayViolation(ids.first().copied().unwrap_or(EventId(0)))
        }))
    }

    /// Replays `order` through an abstract last-write-wins machine (each
    /// read must observe the value of the causally-latest prior write on
    /// its location within the candidate order) and the lock state machine.
    fn replay(&self, order: &[EventId]) -> Verdict {
        let mut last_value: HashMap<ObjectId, Value> = HashMap::new();
        let mut lock_checker = LockChecker::new();
        for &id in order {
            let ev = &self.arena[id.0 as usize];
            match &ev.label {
                Label::Write(loc, value, _) => {
                    last_value.insert(*loc, value.clone());
                }
                Label::ReadModifyWrite(loc, _, new_value) => {
                    last_value.insert(*loc, new_value.clone());
                }
                Label::ObjectAllocation(loc) => {
                    last_value.entry(*loc).or_insert_with(Value::default);
                }
                Label::Read(loc, _, ReadPhase::Response(observed)) => {
                    let expected = last_value.get(loc).cloned().unwrap_or_default();
                    if *observed != expected {
                        return Err(Inconsistency::CoherenceViolation(*loc));
                    }
                }
                Label::Lock(..) | Label::Unlock(..) | Label::Wait(..) | Label::Notify(..) => {
                    if lock_checker.observe(self.arena, id).is_err() {
                        return Err(Inconsistency::SequentialConsistencyReplayViolation(id));
                    }
                }
                _ => {}
            }
        }
        Ok(())
    }
}

fn cartesian_product<T: Clone>(groups: &[Vec<T>]) -> Vec<Vec<T>> {
    groups.iter().fold(vec![Vec::new()], |acc, group| {
        let mut out = Vec::new();
        for prefix in &acc {
            for item in group {
                let mut next = prefix.clone();
                next.push(item.clone());
                out.push(next);
            }
        }
        out
    })
}

impl<'a> FullChecker for SequentialConsistencyChecker<'a> {
    fn check_full(&self) -> Verdict {
        let ids = self.ordered_events();
        let Some((approx, index)) = self.approximation(&ids) else {
            return Err(Inconsistency::SequentialConsistencyApproximationInconsistency);
        };
        self.coherence_decision(&ids, &approx, &index)
    }
}
