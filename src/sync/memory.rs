//! Memory-access synchronization: a read request pairs with the write (or
//! read-modify-write) it reads its value from.

use crate::label::{Label, ReadPhase};

use super::SyncKind;

pub const KIND: Option<SyncKind> = Some(SyncKind::Binary);

/// `Read(loc, excl, Request) ⊕ Write(loc, value, _)` or
/// `⊕ ReadModifyWrite(loc, _, new_value)` produces the read's response
/// carrying the observed value. The initialization event counts as a write
/// of the location's default value.
pub fn synchronize(request: &Label, source: &Label) -> Option<Label> {
    let Label::Read(loc, excl, ReadPhase::Request) = request else {
        return None;
    };
    let value = match source {
        Label::Write(wloc, value, _) if wloc == loc => value.clone(),
        Label::ReadModifyWrite(wloc, _, new_value) if wloc == loc => new_value.clone(),
        Label::ObjectAllocation(aloc) if aloc == loc => crate::label::Value::default(),
        Label::Initialization => crate::label::Value::default(),
        _ => return None,
    };
    Some(Label::Read(*loc, *excl, ReadPhase::Response(value)))
}

/// Structural compatibility check for `SynchronizationAlgebra::synchronizes_into`:
/// whether `response` is shaped like a read response to `request`, without
/// needing the actual source label in hand.
pub fn response_matches(request: &Label, response: &Label) -> bool {
    let Label::Read(loc, excl, ReadPhase::Request) = request else {
        return false;
    };
    matches!(response, Label::Read(rloc, rexcl, ReadPhase::Response(_)) if rloc == loc && rexcl == excl)
}
