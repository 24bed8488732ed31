//! The event-structure exploration driver (component 9): owns the
//! append-only arena, drives request/response synchronization, checks
//! consistency incrementally and on demand, and backtracks between
//! explorations by restoring a prior frontier rather than truncating the
//! arena.
//!
//! Grounded in the teacher's `node.rs::create_event`/`handle_gossip`
//! (append-then-notify loop), generalized with backtracking modeled on the
//! pack's loom-style `Set::clear` reset-on-iteration
//! (`other_examples/16d7ca53...thread.rs`).

use std::time::Instant;

use tracing::{debug, instrument, trace, warn};

use crate::aggregate::{aggregate, Aggregation};
use crate::checkers::atomicity::AtomicityChecker;
use crate::checkers::lock::{LockChecker, LockFullChecker};
use crate::checkers::release_acquire::ReleaseAcquireChecker;
use crate::checkers::sc::SequentialConsistencyChecker;
use crate::checkers::FullChecker;
use crate::config::ExplorationConfig;
use crate::error::{DriverError, EngineError, Inconsistency};
use crate::event::{CausalityClock, Event, EventId, Frontier, ThreadId};
use crate::execution::{Covering, Execution};
use crate::index::{EventIndex, MemoryAccessIndex};
use crate::interfaces::RuntimeEvents;
use crate::label::{ActorSpanKind, JoinState, Label, Phase, ReadPhase, Value};
use crate::order::causality_order_strict;
use crate::registry::{ObjectId, ObjectIdentityKey, ObjectRegistry};
use crate::sync::wait_notify;
use crate::sync::{AtomicSynchronizationAlgebra, SynchronizationAlgebra};

/// What a choice point still has left to try. `Threads` is the caller-driven
/// scheduling alternative (`record_choice_point`): which runnable thread
/// runs next. `Synchronize` is the driver's own synchronization-expansion
/// alternative (spec §4.8): a request paired with every candidate source
/// that can discharge it, one of which was already elected — the rest are
/// the unvisited branches.
#[derive(Debug, Clone)]
enum Branch {
    Threads(Vec<ThreadId>),
    Synchronize {
        thread: ThreadId,
        request: Label,
        /// Remaining candidate sources, least-recently-created first (so
        /// `pop` tries the next most-recently-created one, matching the
        /// "default picks the most recently created" tie-break already used
        /// for the elected response).
        candidates: Vec<EventId>,
    },
    /// A `Wait` request's alternative sources, plus whether a spurious
    /// wake-up (no source at all) is still untried once every `Notify`
    /// candidate is exhausted.
    Wait {
        thread: ThreadId,
        request: Label,
        candidates: Vec<EventId>,
        spurious_available: bool,
    },
}

/// A recorded choice point: the execution frontier immediately before a
/// branching decision, plus what's left to try from it.
#[derive(Debug, Clone)]
struct ChoicePoint {
    frontier: Frontier,
    remaining: Branch,
}

/// Owns the whole exploration: the append-only event arena (never shrinks,
/// even across backtracking — `EventId`s remain valid forever), the derived
/// indices and registry (rebuilt/pruned on each new exploration), the
/// incremental checkers, and the backtracking stack.
pub struct EventStructureDriver {
    arena: Vec<Event>,
    registry: ObjectRegistry,
    event_index: EventIndex,
    memory_index: MemoryAccessIndex,
    atomicity: AtomicityChecker,
    lock_checker: LockChecker,
    algebra: AtomicSynchronizationAlgebra,
    config: ExplorationConfig,

    /// The recorded ground truth: every event belonging to the execution
    /// this exploration attempt has built (or, after a backtrack, replayed
    /// back up to).
    current_execution: Execution,
    /// How far replay has actually progressed this attempt. Strictly
    /// behind `current_execution`'s frontier means the runtime must
    /// replay-match the next recorded request/response rather than create
    /// new events.
    live_frontier: Frontier,
    choice_stack: Vec<ChoicePoint>,

    /// Wall-clock start of the current exploration, checked against
    /// `config.wall_clock_budget` (§5 "Cancellation & timeouts").
    exploration_started: Instant,
    /// Events appended since the last full-consistency pass; a periodic
    /// full check runs every `config.full_check_interval` events (§2 "A full
    /// check runs periodically and at exploration-end").
    events_since_full_check: usize,
}

impl EventStructureDriver {
    pub fn new(config: ExplorationConfig) -> Self {
        let mut driver = Self {
            arena: Vec::new(),
            registry: ObjectRegistry::new(),
            event_index: EventIndex::new(),
            memory_index: MemoryAccessIndex::new(),
            atomicity: AtomicityChecker::new(),
            lock_checker: LockChecker::new(),
            algebra: AtomicSynchronizationAlgebra,
            config,
            current_execution: Execution::empty(),
            live_frontier: Frontier::new(),
            choice_stack: Vec::new(),
            exploration_started: Instant::now(),
            events_since_full_check: 0,
        };
        driver.initialize_exploration();
        driver
    }

    /// `true` once the current exploration has run past its configured
    /// wall-clock budget. The driver never checks this on its own inside
    /// `append_event` (§5: "Engine operations never block"); callers poll it
    /// between runtime calls and, if set, stop driving new events and fall
    /// back to `start_next_exploration` to wind back to the last branch
    /// point rather than continuing the current invocation.
    pub fn is_over_budget(&self) -> bool {
        self.exploration_started.elapsed() >= self.config.wall_clock_budget
    }

    /// Constructs and appends the initialization event, the one event every
    /// execution starts from.
    #[instrument(skip(self))]
    pub fn initialize_exploration(&mut self) {
        if !self.arena.is_empty() {
            return;
        }
        let id = EventId(0);
        let jumps = Event::build_jumps(&self.arena, None);
        let clock = CausalityClock::new();
        self.arena.push(Event::new(
            id,
            Label::Initialization,
            ThreadId(0),
            0,
            None,
            vec![],
            clock,
            Frontier::new(),
            jumps,
        ));
        self.current_execution.insert(&self.arena, id);
        self.event_index.record(Label::Initialization.category(), id);
        debug!(event = %id, "initialization event constructed");
    }

    pub fn arena(&self) -> &[Event] {
        &self.arena
    }

    pub fn execution(&self) -> &Execution {
        &self.current_execution
    }

    /// `true` iff `thread`'s live replay pointer is strictly behind the
    /// recorded execution's frontier for that thread: the caller must
    /// reproduce the next recorded event rather than create a new one.
    pub fn in_replay_mode(&self, thread: ThreadId) -> bool {
        match (self.live_frontier.get(thread), self.current_execution.frontier_of(thread)) {
            (Some(live), Some(recorded)) => self.arena[live.0 as usize].position < self.arena[recorded.0 as usize].position,
            (None, Some(_)) => true,
            _ => false,
        }
    }

    fn parent_of(&self, thread: ThreadId) -> Option<EventId> {
        self.current_execution.frontier_of(thread)
    }

    /// Appends one new atomic event on `thread` with the given label and
    /// extra (non-parent) dependencies, updating every incremental
    /// structure. The low-level primitive every `RuntimeEvents` method
    /// builds on.
    #[instrument(skip(self, extra_deps), fields(thread = ?thread))]
    fn append_event(&mut self, thread: ThreadId, label: Label, extra_deps: Vec<EventId>) -> Result<EventId, DriverError> {
        let parent = self.parent_of(thread);
        let position = match parent {
            Some(p) => self.arena[p.0 as usize].position + 1,
            None => 0,
        };

        let id = EventId(self.arena.len() as u64);
        if let Some(p) = parent {
            for &dep in &extra_deps {
                if causality_order_strict(&self.arena, p, dep) {
                    return Err(EngineError::CausalityCycle { event: id, dep }.into());
                }
            }
        }

        // Invariant 4: an exclusive write must be parented directly on the
        // exclusive-read-response that claimed the same location (the RMW
        // "read" half of a read-modify-write pair modeled as two events).
        if let Label::Write(loc, _, true) = &label {
            let parented_on_read = parent
                .map(|p| matches!(&self.arena[p.0 as usize].label, Label::Read(ploc, true, ReadPhase::Response(_)) if ploc == loc))
                .unwrap_or(false);
            if !parented_on_read {
                return Err(EngineError::ExclusiveWriteWithoutReadParent { write: id }.into());
            }
        }

        // Covering::of trims `extra_deps` down to its causality-maximal
        // subset (redundant predecessors already implied by a kept one are
        // dropped). The parent is deliberately NOT folded into this
        // computation: checkers identify an event's reads-from/synchronizes-
        // with source as `dependencies.first()`, and a same-thread
        // read-after-write's source is routinely dominated by (or equal to)
        // the parent itself — folding the parent in would silently drop
        // that source instead of just excluding the parent. Invariant 3
        // (`e.parent ∉ e.dependencies`) holds anyway since `parent` is never
        // a member of `extra_deps` at any call site.
        let dependencies = Covering::of(&self.arena, &extra_deps);

        let mut clock = parent.map(|p| self.arena[p.0 as usize].causality.clone()).unwrap_or_default();
        for &dep in &dependencies {
            let dep_ev = &self.arena[dep.0 as usize];
            clock.merge(&dep_ev.causality.clone());
        }
        clock
            .update(thread, position)
            .map_err(|(prev, next)| EngineError::NonMonotoneClockUpdate(thread.0 as u64, prev, next))?;

        let jumps = Event::build_jumps(&self.arena, parent);
        let frontier_snapshot = self.current_execution.frontier().clone();
        let event = Event::new(id, label, thread, position, parent, dependencies, clock, frontier_snapshot, jumps);
        self.arena.push(event);
        self.current_execution.insert(&self.arena, id);
        self.live_frontier.set(thread, id);

        let label = &self.arena[id.0 as usize].label;
        self.event_index.record(label.category(), id);
        if let Some(loc) = label.location() {
            if label.is_write() {
                self.memory_index.record_write(&self.arena, loc, id);
            }
            if label.is_read() {
                self.memory_index.record_read(&self.arena, loc, id);
            }
        }
        if self.arena[id.0 as usize].label.is_exclusive() {
            self.atomicity.observe(&self.arena, id)?;
        }
        if matches!(
            self.arena[id.0 as usize].label,
            Label::Lock(..) | Label::Unlock(..) | Label::Wait(..) | Label::Notify(..)
        ) {
            self.lock_checker.observe(&self.arena, id)?;
        }
        trace!(event = %id, "event appended");

        self.events_since_full_check += 1;
        if self.events_since_full_check >= self.config.full_check_interval.max(1) {
            self.events_since_full_check = 0;
            self.run_full_checkers()?;
        }
        Ok(id)
    }

    /// Runs every full checker over `current_execution`, short-circuiting on
    /// the first violation found (§7: "the aggregate checker returns the
    /// first encountered inconsistency; later checkers are not run").
    fn run_full_checkers(&self) -> Result<(), Inconsistency> {
        let ra = ReleaseAcquireChecker::new(&self.arena, &self.current_execution);
        ra.check_full()?;
        let lock = LockFullChecker::new(&self.arena, &self.current_execution);
        lock.check_full()?;
        let sc = SequentialConsistencyChecker::new(&self.arena, &self.current_execution, &self.config);
        sc.check_full()?;
        Ok(())
    }

    /// Finds events matching `pred` within the current execution, in
    /// enumeration order — the search every request/response pairing scans
    /// for a synchronizing source.
    fn matching_events(&self, pred: impl Fn(&Label) -> bool) -> Vec<EventId> {
        let mut out: Vec<EventId> = self.current_execution.iter().filter(|&e| pred(&self.arena[e.0 as usize].label)).collect();
        out.sort_by_key(|e| e.0);
        out
    }

    /// The most recently created write-like event on `loc` in the current
    /// execution: the source a read-modify-write reads from and must record
    /// as `dependencies.first()` so the atomicity checker can see it.
    fn latest_write_source(&self, loc: ObjectId) -> Option<EventId> {
        self.matching_events(move |l| {
            l.location() == Some(loc)
                && (matches!(l, Label::Write(..)) || matches!(l, Label::ReadModifyWrite(..)) || matches!(l, Label::ObjectAllocation(_)) || matches!(l, Label::Initialization))
        })
        .pop()
    }

    /// Appends a request event, finds every candidate source matching
    /// `pred` that actually synchronizes with it, elects the most recently
    /// created one for this exploration (spec §4.8: "tie-breaking is not
    /// observable; the default picks the most recently created"), and
    /// records the rest as a choice point so a later
    /// `start_next_exploration` can come back and try each alternative
    /// source in turn. Returns `DriverError::Blocked` if no source
    /// synchronizes yet.
    fn request_response(
        &mut self,
        thread: ThreadId,
        request: Label,
        source_pred: impl Fn(&Label) -> bool,
    ) -> Result<EventId, DriverError> {
        let request_id = self.append_event(thread, request.clone(), vec![])?;
        let candidates = self.matching_events(source_pred);
        let mut synchronizable: Vec<EventId> = Vec::new();
        for source in candidates {
            if source == request_id {
                continue;
            }
            let source_label = self.arena[source.0 as usize].label.clone();
            if self.algebra.synchronize(&request, std::slice::from_ref(&source_label)).is_some() {
                synchronizable.push(source);
            }
        }
        let Some(chosen) = synchronizable.pop() else {
            return Err(DriverError::Blocked(request_id));
        };
        if !synchronizable.is_empty() {
            self.choice_stack.push(ChoicePoint {
                frontier: self.current_execution.frontier().clone(),
                remaining: Branch::Synchronize {
                    thread,
                    request,
                    candidates: synchronizable,
                },
            });
        }
        let chosen_label = self.arena[chosen.0 as usize].label.clone();
        let response_label = self
            .algebra
            .synchronize(&self.arena[request_id.0 as usize].label.clone(), std::slice::from_ref(&chosen_label))
            .ok_or(EngineError::InvalidSynchronization)?;
        self.append_event(thread, response_label, vec![chosen])
    }

    /// Like [`Self::request_response`] but folds every matching source into
    /// a barrier request (thread join), re-appending the (possibly still
    /// pending) updated request label each time a new finisher is folded
    /// in, until it completes.
    fn request_barrier(
        &mut self,
        thread: ThreadId,
        mut request: Label,
        source_pred: impl Fn(&Label) -> bool,
    ) -> Result<EventId, DriverError> {
        let mut request_id = self.append_event(thread, request.clone(), vec![])?;
        loop {
            let candidates = self.matching_events(&source_pred);
            let sources: Vec<Label> = candidates
                .iter()
                .filter(|&&e| e != request_id)
                .map(|&e| self.arena[e.0 as usize].label.clone())
                .collect();
            let Some(next) = self.algebra.synchronize(&request, &sources) else {
                return Err(DriverError::Blocked(request_id));
            };
            if next.is_response() {
                let deps: Vec<EventId> = candidates.into_iter().filter(|&e| e != request_id).collect();
                let response_id = self.append_event(thread, next, deps)?;
                return Ok(response_id);
            }
            if next == request {
                return Err(DriverError::Blocked(request_id));
            }
            request = next;
            request_id = self.append_event(thread, request.clone(), vec![])?;
        }
    }

    pub fn add_compare_and_swap(
        &mut self,
        thread: ThreadId,
        loc: ObjectId,
        expected: Value,
        new_value: Value,
    ) -> Result<(), DriverError> {
        self.on_read_modify_write(thread, loc, expected, new_value)
    }

    pub fn add_fetch_and_add(&mut self, thread: ThreadId, loc: ObjectId, delta: i64) -> Result<Value, DriverError> {
        let current = self.on_read(thread, loc, true)?;
        let Value::I64(n) = current else {
            return Err(DriverError::Engine(EngineError::InvalidSynchronization));
        };
        self.on_read_modify_write(thread, loc, Value::I64(n), Value::I64(n + delta))?;
        Ok(Value::I64(n))
    }

    /// Runs every full checker over the current execution and reports the
    /// first violation found, if any. Also called automatically from
    /// `append_event` every `config.full_check_interval` events and from
    /// `start_next_exploration` at exploration-end.
    pub fn check_consistency(&self) -> Result<(), Inconsistency> {
        self.run_full_checkers()
    }

    pub fn aggregate(&self) -> Result<Aggregation, EngineError> {
        aggregate(&self.arena, &self.current_execution)
    }

    /// Records a branch point before a scheduling decision among
    /// `runnable`, so that a later `start_next_exploration` can come back
    /// and try an alternative.
    pub fn record_choice_point(&mut self, runnable: Vec<ThreadId>) {
        if runnable.len() > 1 {
            self.choice_stack.push(ChoicePoint {
                frontier: self.current_execution.frontier().clone(),
                remaining: Branch::Threads(runnable),
            });
        }
    }

    /// Rebuilds every derived structure (indices, matrices, checkers) from
    /// scratch by replaying `current_execution`. Unlike the registry, these
    /// have no stable identity to prune by, so a full rebuild is simplest.
    fn reset_derived_state(&mut self) {
        self.event_index = EventIndex::rebuild(&self.arena, self.current_execution.iter());
        let accesses = self.current_execution.iter().filter_map(|e| {
            let label = &self.arena[e.0 as usize].label;
            let loc = label.location()?;
            if label.is_write() {
                Some((loc, e, true))
            } else if label.is_read() {
                Some((loc, e, false))
            } else {
                None
            }
        });
        self.memory_index = MemoryAccessIndex::rebuild(&self.arena, accesses);
        self.atomicity = AtomicityChecker::new();
        self.lock_checker = LockChecker::new();
        let mut ordered: Vec<EventId> = self.current_execution.iter().collect();
        ordered.sort_by_key(|e| e.0);
        for id in ordered {
            let label = self.arena[id.0 as usize].label.clone();
            if label.is_exclusive() {
                let _ = self.atomicity.observe(&self.arena, id);
            }
            if matches!(label, Label::Lock(..) | Label::Unlock(..) | Label::Wait(..) | Label::Notify(..)) {
                let _ = self.lock_checker.observe(&self.arena, id);
            }
        }
    }

    /// Removes registry entries whose allocation event is no longer part of
    /// `current_execution`.
    fn prune_registry(&mut self) {
        let execution = &self.current_execution;
        self.registry.prune(|e| execution.contains(e));
    }

    /// Backtracks to the most recent choice point with an untried
    /// alternative, restores the execution to that point, and rebuilds
    /// derived state. Returns the thread chosen for the new branch, or
    /// `None` if every choice point is exhausted (exploration is complete).
    pub fn start_next_exploration(&mut self) -> Option<ThreadId> {
        if let Err(inconsistency) = self.run_full_checkers() {
            debug!(%inconsistency, "inconsistency found at exploration-end");
        }
        if self.is_over_budget() {
            warn!(budget = ?self.config.wall_clock_budget, "exploration wall-clock budget exceeded, aborting");
            return None;
        }
        while let Some(mut point) = self.choice_stack.pop() {
            match &mut point.remaining {
                Branch::Threads(threads) => {
                    let Some(next_thread) = threads.pop() else {
                        continue;
                    };
                    let has_more = !threads.is_empty();
                    self.rewind_to(&point.frontier);
                    if has_more {
                        self.choice_stack.push(point);
                    }
                    return Some(next_thread);
                }
                Branch::Synchronize { thread, request, candidates } => {
                    let Some(source) = candidates.pop() else {
                        continue;
                    };
                    let thread = *thread;
                    let request = request.clone();
                    let has_more = !candidates.is_empty();
                    self.rewind_to(&point.frontier);
                    if has_more {
                        self.choice_stack.push(point);
                    }
                    let source_label = self.arena[source.0 as usize].label.clone();
                    let Some(response_label) = self.algebra.synchronize(&request, std::slice::from_ref(&source_label)) else {
                        debug!(?source, "alternative source no longer synchronizes, trying the next choice point");
                        continue;
                    };
                    match self.append_event(thread, response_label, vec![source]) {
                        Ok(_) => return Some(thread),
                        Err(err) => {
                            debug!(%err, "alternative branch is inconsistent, trying the next choice point");
                            continue;
                        }
                    }
                }
                Branch::Wait {
                    thread,
                    request,
                    candidates,
                    spurious_available,
                } => {
                    let thread = *thread;
                    let request = request.clone();
                    if let Some(source) = candidates.pop() {
                        let has_more = !candidates.is_empty() || *spurious_available;
                        self.rewind_to(&point.frontier);
                        if has_more {
                            self.choice_stack.push(point);
                        }
                        let source_label = self.arena[source.0 as usize].label.clone();
                        let Some(response_label) = self.algebra.synchronize(&request, std::slice::from_ref(&source_label)) else {
                            debug!(?source, "alternative wait source no longer synchronizes, trying the next choice point");
                            continue;
                        };
                        match self.append_event(thread, response_label, vec![source]) {
                            Ok(_) => return Some(thread),
                            Err(err) => {
                                debug!(%err, "alternative wait branch is inconsistent, trying the next choice point");
                                continue;
                            }
                        }
                    } else if *spurious_available {
                        self.rewind_to(&point.frontier);
                        let Some(response_label) = wait_notify::synchronize_spurious(&request) else {
                            continue;
                        };
                        match self.append_event(thread, response_label, vec![]) {
                            Ok(_) => return Some(thread),
                            Err(err) => {
                                debug!(%err, "spurious wake-up branch is inconsistent, trying the next choice point");
                                continue;
                            }
                        }
                    } else {
                        continue;
                    }
                }
            }
        }
        None
    }

    /// Restores `current_execution`/`live_frontier` to a recorded frontier
    /// snapshot and rebuilds every derived structure from it, resetting the
    /// per-exploration budget and full-check counters. Shared by both
    /// `Branch` variants of `start_next_exploration`.
    fn rewind_to(&mut self, frontier: &Frontier) {
        self.current_execution = Execution::from_frontier(&self.arena, frontier);
        self.live_frontier = Frontier::new();
        self.reset_derived_state();
        self.prune_registry();
        self.exploration_started = Instant::now();
        self.events_since_full_check = 0;
    }
}

impl RuntimeEvents for EventStructureDriver {
    fn on_thread_fork(&mut self, parent: ThreadId, children: &[ThreadId]) -> Result<(), DriverError> {
        self.append_event(parent, Label::ThreadFork(parent, children.to_vec()), vec![])?;
        Ok(())
    }

    fn on_thread_start(&mut self, thread: ThreadId, is_main: bool) -> Result<(), DriverError> {
        let request = Label::ThreadStart(thread, is_main, Phase::Request);
        self.request_response(thread, request, |l| matches!(l, Label::ThreadFork(..) | Label::Initialization))?;
        Ok(())
    }

    fn on_thread_finish(&mut self, thread: ThreadId) -> Result<(), DriverError> {
        self.append_event(thread, Label::ThreadFinish(thread), vec![])?;
        Ok(())
    }

    fn on_thread_join(&mut self, thread: ThreadId, joined: &[ThreadId]) -> Result<(), DriverError> {
        let pending = joined.iter().copied().collect();
        let request = Label::ThreadJoin(thread, joined.to_vec(), JoinState::Pending(pending));
        let joined = joined.to_vec();
        self.request_barrier(thread, request, move |l| {
            matches!(l, Label::ThreadFinish(tid) if joined.contains(tid))
        })?;
        Ok(())
    }

    fn on_object_allocation(&mut self, thread: ThreadId, key: ObjectIdentityKey) -> Result<ObjectId, DriverError> {
        if let Some(existing) = self.registry.lookup(&key) {
            return Ok(existing);
        }
        let placeholder = EventId(self.arena.len() as u64);
        let id = self.registry.register(key, placeholder)?;
        self.append_event(thread, Label::ObjectAllocation(id), vec![])?;
        Ok(id)
    }

    fn on_read(&mut self, thread: ThreadId, loc: ObjectId, exclusive: bool) -> Result<Value, DriverError> {
        let request = Label::Read(loc, exclusive, ReadPhase::Request);
        let response_id = self.request_response(thread, request, move |l| {
            l.location() == Some(loc) && (matches!(l, Label::Write(..)) || matches!(l, Label::ReadModifyWrite(..)) || matches!(l, Label::ObjectAllocation(_)) || matches!(l, Label::Initialization))
        })?;
        match &self.arena[response_id.0 as usize].label {
            Label::Read(_, _, ReadPhase::Response(value)) => Ok(value.clone()),
            _ => Err(DriverError::Engine(EngineError::InvalidSynchronization)),
        }
    }

    fn on_write(&mut self, thread: ThreadId, loc: ObjectId, value: Value, exclusive: bool) -> Result<(), DriverError> {
        self.append_event(thread, Label::Write(loc, value, exclusive), vec![])?;
        Ok(())
    }

    fn on_read_modify_write(&mut self, thread: ThreadId, loc: ObjectId, expected: Value, new_value: Value) -> Result<(), DriverError> {
        let source = self
            .latest_write_source(loc)
            .ok_or_else(|| DriverError::Blocked(self.parent_of(thread).unwrap_or(EventId(0))))?;
        self.append_event(thread, Label::ReadModifyWrite(loc, expected, new_value), vec![source])?;
        Ok(())
    }

    fn on_lock(&mut self, thread: ThreadId, loc: ObjectId, reentrant: bool) -> Result<(), DriverError> {
        let request = Label::Lock(loc, Phase::Request, reentrant);
        self.request_response(thread, request, move |l| {
            (matches!(l, Label::Unlock(uloc, _) if *uloc == loc)) || matches!(l, Label::ObjectAllocation(aloc) if *aloc == loc) || matches!(l, Label::Initialization)
        })?;
        Ok(())
    }

    fn on_unlock(&mut self, thread: ThreadId, loc: ObjectId, reentrant: bool) -> Result<(), DriverError> {
        self.append_event(thread, Label::Unlock(loc, reentrant), vec![])?;
        Ok(())
    }

    /// Unlike the other request/response operations, a `Wait` may resolve
    /// with no synchronizing source at all (a spurious wake-up, gated by
    /// `ExplorationConfig::allow_spurious_wakeups`), so it can't reuse
    /// `request_response`'s "block if nothing synchronizes" fallback as-is.
    fn on_wait(&mut self, thread: ThreadId, loc: ObjectId, reentrant: bool) -> Result<(), DriverError> {
        let spurious = self.config.allow_spurious_wakeups;
        let request = Label::Wait(loc, Phase::Request, reentrant, spurious);
        let request_id = self.append_event(thread, request.clone(), vec![])?;

        let candidates = self.matching_events(move |l| matches!(l, Label::Notify(nloc, _) if *nloc == loc));
        let mut synchronizable: Vec<EventId> = Vec::new();
        for source in candidates {
            if source == request_id {
                continue;
            }
            let source_label = self.arena[source.0 as usize].label.clone();
            if self.algebra.synchronize(&request, std::slice::from_ref(&source_label)).is_some() {
                synchronizable.push(source);
            }
        }

        let elected = synchronizable.pop();
        let (response, deps, remaining_spurious) = match elected {
            Some(source) => {
                let source_label = self.arena[source.0 as usize].label.clone();
                let response = self
                    .algebra
                    .synchronize(&request, std::slice::from_ref(&source_label))
                    .ok_or(EngineError::InvalidSynchronization)?;
                (response, vec![source], spurious)
            }
            None if spurious => {
                let response = wait_notify::synchronize_spurious(&request).ok_or(EngineError::InvalidSynchronization)?;
                (response, vec![], false)
            }
            None => return Err(DriverError::Blocked(request_id)),
        };

        if !synchronizable.is_empty() || remaining_spurious {
            self.choice_stack.push(ChoicePoint {
                frontier: self.current_execution.frontier().clone(),
                remaining: Branch::Wait {
                    thread,
                    request,
                    candidates: synchronizable,
                    spurious_available: remaining_spurious,
                },
            });
        }

        self.append_event(thread, response, deps)?;
        Ok(())
    }

    fn on_notify(&mut self, thread: ThreadId, loc: ObjectId, broadcast: bool) -> Result<(), DriverError> {
        self.append_event(thread, Label::Notify(loc, broadcast), vec![])?;
        Ok(())
    }

    fn on_park(&mut self, thread: ThreadId) -> Result<(), DriverError> {
        let request = Label::Park(thread, Phase::Request);
        self.request_response(thread, request, move |l| matches!(l, Label::Unpark(tid) if *tid == thread))?;
        Ok(())
    }

    fn on_unpark(&mut self, thread: ThreadId, target: ThreadId) -> Result<(), DriverError> {
        self.append_event(thread, Label::Unpark(target), vec![])?;
        Ok(())
    }

    fn on_actor_span_start(&mut self, thread: ThreadId, actor: ObjectId) -> Result<(), DriverError> {
        self.append_event(thread, Label::ActorSpan(thread, actor, ActorSpanKind::Start), vec![])?;
        Ok(())
    }

    fn on_actor_span_end(&mut self, thread: ThreadId, actor: ObjectId) -> Result<(), DriverError> {
        self.append_event(thread, Label::ActorSpan(thread, actor, ActorSpanKind::End), vec![])?;
        Ok(())
    }

    fn on_random(&mut self, thread: ThreadId) -> Result<(), DriverError> {
        self.append_event(thread, Label::Random, vec![])?;
        Ok(())
    }

    fn on_coroutine_suspend(&mut self, thread: ThreadId) -> Result<(), DriverError> {
        self.append_event(thread, Label::CoroutineSuspend, vec![])?;
        Ok(())
    }
}
