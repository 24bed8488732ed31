//! Thread park/unpark synchronization: a park request pairs with an unpark
//! targeted at the same thread.

use crate::label::{Label, Phase};

use super::SyncKind;

pub const KIND: Option<SyncKind> = Some(SyncKind::Binary);

pub fn synchronize(request: &Label, source: &Label) -> Option<Label> {
    let Label::Park(tid, Phase::Request) = request else {
        return None;
    };
    let Label::Unpark(utid) = source else {
        return None;
    };
    if utid != tid {
        return None;
    }
    Some(Label::Park(*tid, Phase::Response(())))
}

/// Structural compatibility check for `SynchronizationAlgebra::synchronizes_into`:
/// whether `response` is shaped like a park response to `request`.
pub fn response_matches(request: &Label, response: &Label) -> bool {
    let Label::Park(tid, Phase::Request) = request else {
        return false;
    };
    matches!(response, Label::Park(rtid, Phase::Response(())) if rtid == tid)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::event::ThreadId;

    #[test]
    fn park_pairs_with_matching_unpark() {
        let request = Label::Park(ThreadId(1), Phase::Request);
        let unpark = Label::Unpark(ThreadId(1));
        assert!(synchronize(&request, &unpark).is_some());
    }

    #[test]
    fn park_ignores_unpark_of_other_thread() {
        let request = Label::Park(ThreadId(1), Phase::Request);
        let unpark = Label::Unpark(ThreadId(2));
        assert!(synchronize(&request, &unpark).is_none());
    }
}
