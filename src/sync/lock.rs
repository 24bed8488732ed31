//! Mutex lock/unlock synchronization: a lock request pairs with either the
//! prior unlock of the same mutex, or (for the first acquisition) the
//! mutex's allocation event.

use crate::label::{Label, Phase};

use super::SyncKind;

pub const KIND: Option<SyncKind> = Some(SyncKind::Binary);

pub fn synchronize(request: &Label, source: &Label) -> Option<Label> {
    let Label::Lock(loc, Phase::Request, reentrant) = request else {
        return None;
    };
    let pairs = match source {
        Label::Unlock(uloc, _) => uloc == loc,
        Label::ObjectAllocation(aloc) => aloc == loc,
        Label::Initialization => true,
        _ => false,
    };
    if !pairs {
        return None;
    }
    Some(Label::Lock(*loc, Phase::Response(()), *reentrant))
}

/// Structural compatibility check for `SynchronizationAlgebra::synchronizes_into`:
/// whether `response` is shaped like a lock response to `request`.
pub fn response_matches(request: &Label, response: &Label) -> bool {
    let Label::Lock(loc, Phase::Request, reentrant) = request else {
        return false;
    };
    matches!(response, Label::Lock(rloc, Phase::Response(()), rreentrant) if rloc == loc && rreentrant == reentrant)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::registry::ObjectId;

    #[test]
    fn lock_pairs_with_prior_unlock() {
        let request = Label::Lock(ObjectId(2), Phase::Request, false);
        let unlock = Label::Unlock(ObjectId(2), false);
        assert!(synchronize(&request, &unlock).is_some());
    }

    #[test]
    fn lock_pairs_with_allocation_on_first_acquire() {
        let request = Label::Lock(ObjectId(2), Phase::Request, false);
        let alloc = Label::ObjectAllocation(ObjectId(2));
        assert!(synchronize(&request, &alloc).is_some());
    }

    #[test]
    fn lock_ignores_unlock_of_other_mutex() {
        let request = Label::Lock(ObjectId(2), Phase::Request, false);
        let unlock = Label::Unlock(ObjectId(3), false);
        assert!(synchronize(&request, &unlock).is_none());
    }
}
