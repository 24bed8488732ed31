//! Demo binary: runs the engine over a small racy write/read program and
//! backtracks through every alternative it finds, the way the teacher's
//! `main.rs` drove a demo simulation instead of exposing a real CLI.

use tracing_subscriber::EnvFilter;

use event_structure::label::ReadPhase;
use event_structure::{EventStructureDriver, ExplorationConfig, Label, ObjectIdentityKey, RuntimeEvents, ThreadId, Value};

fn main() {
    tracing_subscriber::fmt().with_env_filter(EnvFilter::from_default_env()).init();

    let t0 = ThreadId(0);
    let t1 = ThreadId(1);
    let mut driver = EventStructureDriver::new(ExplorationConfig::default());

    driver.on_thread_fork(t0, &[t1]).expect("fork");
    let loc = driver
        .on_object_allocation(t0, ObjectIdentityKey::Named("x".into()))
        .expect("allocate x");
    driver.on_write(t0, loc, Value::I64(1), false).expect("write x=1");
    driver.on_thread_start(t1, false).expect("start t1");

    driver.record_choice_point(vec![t0, t1]);
    let observed = driver.on_read(t1, loc, false).expect("read x");
    report(&mut driver, observed);

    let mut explorations = 1usize;
    while let Some(thread) = driver.start_next_exploration() {
        explorations += 1;
        // `Threads` branches leave it to the caller to redrive the thread;
        // `Synchronize` branches already replayed the alternative response
        // themselves, so the caller only needs to read the outcome back.
        let observed = if driver.in_replay_mode(thread) {
            driver.on_read(thread, loc, false).expect("read x (alternate branch)")
        } else {
            last_read_response(&driver, loc).expect("a read response was just appended")
        };
        report(&mut driver, observed);
    }

    println!("explored {explorations} interleaving(s) of the write/read race");
}

fn report(driver: &mut EventStructureDriver, observed: Value) {
    match driver.check_consistency() {
        Ok(()) => println!("execution consistent, read observed {observed:?}"),
        Err(inconsistency) => tracing::warn!(%inconsistency, "execution rejected"),
    }
}

fn last_read_response(driver: &EventStructureDriver, loc: event_structure::ObjectId) -> Option<Value> {
    driver.arena().iter().rev().find_map(|e| match &e.label {
        Label::Read(l, _, ReadPhase::Response(v)) if *l == loc => Some(v.clone()),
        _ => None,
    })
}
