//! Monitor wait/notify synchronization: a wait request pairs with a notify
//! (or notify-all) on the same monitor.

use crate::label::{Label, Phase};

use super::SyncKind;

pub const KIND: Option<SyncKind> = Some(SyncKind::Binary);

pub fn synchronize(request: &Label, source: &Label) -> Option<Label> {
    let Label::Wait(loc, Phase::Request, reentrant, spurious) = request else {
        return None;
    };
    let Label::Notify(nloc, _broadcast) = source else {
        return None;
    };
    if nloc != loc {
        return None;
    }
    Some(Label::Wait(*loc, Phase::Response(()), *reentrant, *spurious))
}

/// A spurious wake-up: `request` resolves with no synchronizing `Notify`
/// source at all, permitted only when the request's own `spurious` flag is
/// set (`ExplorationConfig::allow_spurious_wakeups`).
pub fn synchronize_spurious(request: &Label) -> Option<Label> {
    let Label::Wait(loc, Phase::Request, reentrant, true) = request else {
        return None;
    };
    Some(Label::Wait(*loc, Phase::Response(()), *reentrant, true))
}

/// Structural compatibility check for `SynchronizationAlgebra::synchronizes_into`:
/// either a matching notify-backed response, or (when the request allows it)
/// a spurious one.
pub fn response_matches(request: &Label, response: &Label) -> bool {
    let Label::Wait(loc, Phase::Request, reentrant, spurious) = request else {
        return false;
    };
    matches!(response, Label::Wait(rloc, Phase::Response(()), rreentrant, rspurious) if rloc == loc && rreentrant == reentrant && (rspurious == spurious || *spurious))
}
