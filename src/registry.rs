//! Object registry (component 7).
//!
//! Grounded in the teacher's `index_map: DashMap<EventHash, NodeIndex>`
//! secondary-index pattern (`dag.rs`), generalized from event-hash lookup to
//! object identity: every allocated memory location, lock, thread-join
//! barrier and actor gets a stable `ObjectId` the first time it is observed.

use dashmap::DashMap;

use crate::event::EventId;

/// A runtime object identifier. `NULL_OBJECT` and `STATIC_OBJECT` are
/// reserved so labels can reference "no location" and "a statically known,
/// pre-registered location" without an `Option` at every call site.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct ObjectId(pub u64);

pub const NULL_OBJECT: ObjectId = ObjectId(0);
pub const STATIC_OBJECT: ObjectId = ObjectId(1);

/// How an object is identified when it is first observed: by reference
/// (pointer) equality, for heap allocations the runtime hands back the same
/// address for, or by a value key, for statically named objects (e.g. a
/// named static mutex) that may be "allocated" more than once across
/// threads but denote the same object.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum ObjectIdentityKey {
    Pointer(u64),
    Named(String),
}

#[derive(Debug, Clone)]
pub struct ObjectEntry {
    pub id: ObjectId,
    pub allocation_event: EventId,
}

/// Maps runtime-observed object identities to stable `ObjectId`s, and back
/// to the allocation event that introduced them.
#[derive(Debug, Default)]
pub struct ObjectRegistry {
    by_key: DashMap<ObjectIdentityKey, ObjectEntry>,
    by_id: DashMap<ObjectId, ObjectIdentityKey>,
    next_id: u64,
}

impl ObjectRegistry {
    pub fn new() -> Self {
        Self {
            by_key: DashMap::new(),
            by_id: DashMap::new(),
            next_id: STATIC_OBJECT.0 + 1,
        }
    }

    /// Registers a freshly allocated object, returning its new `ObjectId`.
    /// Errors if the same identity key is registered twice.
    pub fn register(
        &mut self,
        key: ObjectIdentityKey,
        allocation_event: EventId,
    ) -> Result<ObjectId, crate::error::EngineError> {
        if self.by_key.contains_key(&key) {
            let existing = self.by_key.get(&key).unwrap().id;
            return Err(crate::error::EngineError::DuplicateRegistration(existing));
        }
        let id = ObjectId(self.next_id);
        self.next_id += 1;
        self.by_key.insert(key.clone(), ObjectEntry { id, allocation_event });
        self.by_id.insert(id, key);
        Ok(id)
    }

    pub fn lookup(&self, key: &ObjectIdentityKey) -> Option<ObjectId> {
        self.by_key.get(key).map(|e| e.id)
    }

    pub fn entry(&self, id: ObjectId) -> Option<ObjectEntry> {
        let key = self.by_id.get(&id)?;
        self.by_key.get(&*key).map(|e| e.clone())
    }

    /// Drops every entry whose allocation event is no longer present in
    /// `still_present` (i.e. was truncated by a backtrack). Unlike the event
    /// index, the registry is pruned rather than rebuilt from scratch: the
    /// original `ObjectIdentityKey`s are not recoverable from the arena
    /// alone, since labels carry only the assigned `ObjectId`.
    pub fn prune(&mut self, still_present: impl Fn(EventId) -> bool) {
        let stale: Vec<ObjectId> = self
            .by_key
            .iter()
            .filter(|e| !still_present(e.allocation_event))
            .map(|e| e.id)
            .collect();
        for id in stale {
            if let Some((_, key)) = self.by_id.remove(&id) {
                self.by_key.remove(&key);
            }
        }
    }

    pub fn len(&self) -> usize {
        self.by_key.len()
    }
}
