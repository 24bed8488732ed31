//! Exploration configuration (ambient stack).
//!
//! The teacher configures its simulation through plain struct fields
//! threaded in at construction (`simulation.rs`); this crate follows the
//! same shape rather than introducing a config-file/env-var layer the spec
//! has no use for.

use std::time::Duration;

/// Tunables governing one exploration run. None of these affect
/// correctness of a single execution's consistency check — they bound how
/// much work the driver and the sequential-consistency checker are willing
/// to do before giving up or taking a shortcut.
#[derive(Debug, Clone)]
pub struct ExplorationConfig {
    /// Hard wall-clock budget for one `explore` call. The driver stops
    /// starting new branches once exceeded, even if branches remain.
    pub wall_clock_budget: Duration,

    /// Per-location bound on how many linear extensions the
    /// sequential-consistency checker's coherence decision will enumerate
    /// before giving up and reporting a replay violation rather than
    /// continuing to search.
    pub linearization_bound: usize,

    /// Whether `Park`/`Wait` requests are allowed to resolve without a
    /// matching `Unpark`/`Notify` (a spurious wake-up). Resolved as an open
    /// question (see `DESIGN.md`): off by default, since most model-checked
    /// programs assume spurious wake-ups don't happen unless the test
    /// explicitly exercises them.
    pub allow_spurious_wakeups: bool,

    /// How many incrementally-checked events to allow between full checker
    /// passes (sequential consistency, release/acquire). `1` means after
    /// every event.
    pub full_check_interval: usize,
}

impl Default for ExplorationConfig {
    fn default() -> Self {
        Self {
            wall_clock_budget: Duration::from_secs(60),
            linearization_bound: 10_000,
            allow_spurious_wakeups: false,
            full_check_interval: 1,
        }
    }
}
