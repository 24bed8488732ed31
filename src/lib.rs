//! An event-structure exploration engine for model checking concurrent
//! programs against memory-consistency criteria (atomicity, release/acquire,
//! sequential consistency).
//!
//! The engine builds a labelled prime event structure from the atomic
//! actions an instrumented runtime reports (`interfaces::RuntimeEvents`),
//! synchronizing request events against the senders that can discharge them
//! (`sync`), and checks the resulting execution against each consistency
//! criterion (`checkers`) both incrementally and on demand. Exploring more
//! than one interleaving is driven by backtracking to a previously recorded
//! frontier rather than re-running the program under test from scratch
//! (`driver`).

pub mod aggregate;
pub mod checkers;
pub mod config;
pub mod driver;
pub mod error;
pub mod event;
pub mod execution;
pub mod graph;
pub mod index;
pub mod interfaces;
pub mod label;
pub mod order;
pub mod registry;
pub mod relation;
pub mod sync;

pub use config::ExplorationConfig;
pub use driver::EventStructureDriver;
pub use error::{DriverError, EngineError, Inconsistency};
pub use event::{Event, EventId, ThreadId};
pub use interfaces::{ExhaustiveScheduler, RuntimeEvents, Scheduler};
pub use label::{Label, Value};
pub use registry::{ObjectId, ObjectIdentityKey};
