//! Thread lifecycle synchronization: `ThreadStart` pairs with the
//! `ThreadFork` that spawned it; `ThreadJoin` is a barrier discharged by
//! every forked thread's `ThreadFinish`.

use crate::label::{JoinState, Label, Phase};

use super::SyncKind;

pub const START_KIND: Option<SyncKind> = Some(SyncKind::Binary);
pub const JOIN_KIND: Option<SyncKind> = Some(SyncKind::Barrier);

/// `ThreadStart(tid, _, Request) ⊕ ThreadFork(_, children)`, when `tid` is
/// among `children`, produces the response. The main thread has no fork
/// event to pair with; its start pairs with `Initialization` instead (spec
/// §4.4: `Initialization ⊕ ThreadStart^req(main) → ThreadStart^resp(main)`).
pub fn synchronize_start(request: &Label, source: &Label) -> Option<Label> {
    let Label::ThreadStart(tid, is_main, Phase::Request) = request else {
        return None;
    };
    match source {
        Label::ThreadFork(_, children) if children.contains(tid) => {
            Some(Label::ThreadStart(*tid, *is_main, Phase::Response(())))
        }
        Label::Initialization if *is_main => Some(Label::ThreadStart(*tid, *is_main, Phase::Response(()))),
        _ => None,
    }
}

/// Structural compatibility check for `SynchronizationAlgebra::synchronizes_into`:
/// whether `response` is the shape `synchronize_start` would have produced
/// for `request`, without needing the actual source label in hand.
pub fn response_matches_start(request: &Label, response: &Label) -> bool {
    let Label::ThreadStart(tid, is_main, Phase::Request) = request else {
        return false;
    };
    matches!(response, Label::ThreadStart(rtid, ris_main, Phase::Response(())) if rtid == tid && ris_main == is_main)
}

/// Structural compatibility check for a join response: every thread in
/// `response`'s remaining pending set must already have been pending in
/// `request` (a join only ever shrinks its pending set, never grows it).
pub fn response_matches_join(request: &Label, response: &Label) -> bool {
    let Label::ThreadJoin(joiner, children, JoinState::Pending(pending)) = request else {
        return false;
    };
    match response {
        Label::ThreadJoin(rjoiner, rchildren, JoinState::Completed) => rjoiner == joiner && rchildren == children,
        Label::ThreadJoin(rjoiner, rchildren, JoinState::Pending(rpending)) => {
            rjoiner == joiner && rchildren == children && rpending.is_subset(pending)
        }
        _ => false,
    }
}

/// Folds every `ThreadFinish` source into a join's pending set, completing
/// it once every forked thread has finished.
pub fn synchronize_join(request: &Label, sources: &[Label]) -> Option<Label> {
    let Label::ThreadJoin(joiner, children, JoinState::Pending(pending)) = request else {
        return None;
    };
    let mut remaining = pending.clone();
    for source in sources {
        if let Label::ThreadFinish(tid) = source {
            remaining.remove(tid);
        }
    }
    let state = if remaining.is_empty() {
        JoinState::Completed
    } else {
        JoinState::Pending(remaining)
    };
    Some(Label::ThreadJoin(*joiner, children.clone(), state))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::event::ThreadId;
    use std::collections::BTreeSet;

    #[test]
    fn start_pairs_with_matching_fork() {
        let request = Label::ThreadStart(ThreadId(1), false, Phase::Request);
        let fork = Label::ThreadFork(ThreadId(0), vec![ThreadId(1), ThreadId(2)]);
        assert!(synchronize_start(&request, &fork).is_some());
    }

    #[test]
    fn main_thread_start_pairs_with_initialization() {
        let request = Label::ThreadStart(ThreadId(0), true, Phase::Request);
        assert!(synchronize_start(&request, &Label::Initialization).is_some());
    }

    #[test]
    fn non_main_thread_start_does_not_pair_with_initialization() {
        let request = Label::ThreadStart(ThreadId(1), false, Phase::Request);
        assert!(synchronize_start(&request, &Label::Initialization).is_none());
    }

    #[test]
    fn response_matches_start_checks_tid_and_is_main() {
        let request = Label::ThreadStart(ThreadId(0), true, Phase::Request);
        let response = Label::ThreadStart(ThreadId(0), true, Phase::Response(()));
        assert!(response_matches_start(&request, &response));
        let wrong = Label::ThreadStart(ThreadId(1), true, Phase::Response(()));
        assert!(!response_matches_start(&request, &wrong));
    }

    #[test]
    fn join_completes_once_every_child_finishes() {
        let pending: BTreeSet<ThreadId> = [ThreadId(1), ThreadId(2)].into_iter().collect();
        let request = Label::ThreadJoin(ThreadId(0), vec![ThreadId(1), ThreadId(2)], JoinState::Pending(pending));
        let sources = vec![Label::ThreadFinish(ThreadId(1)), Label::ThreadFinish(ThreadId(2))];
        let response = synchronize_join(&request, &sources).unwrap();
        assert_eq!(
            response,
            Label::ThreadJoin(ThreadId(0), vec![ThreadId(1), ThreadId(2)], JoinState::Completed)
        );
    }

    #[test]
    fn join_stays_pending_with_one_child_outstanding() {
        let pending: BTreeSet<ThreadId> = [ThreadId(1), ThreadId(2)].into_iter().collect();
        let request = Label::ThreadJoin(ThreadId(0), vec![ThreadId(1), ThreadId(2)], JoinState::Pending(pending));
        let sources = vec![Label::ThreadFinish(ThreadId(1))];
        let response = synchronize_join(&request, &sources).unwrap();
        assert!(matches!(response, Label::ThreadJoin(_, _, JoinState::Pending(_))));
    }
}
