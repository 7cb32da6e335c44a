use std::collections::BTreeMap;
use std::collections::btree_map::Entry;
use std::sync::Arc;

use gsp_protocol::Oid;

use crate::error::ProtocolError;
use crate::object::{self, ManagedObject as _, ObjectHandle};

/// Mapping from object identifier to live instance.
///
/// One registry per session, never shared across processes. Cleared as
/// a whole by [`reset`](Registry::reset); objects are never removed
/// individually, as the protocol has no delete primitive.
#[derive(Default)]
pub struct Registry {
    objects: BTreeMap<Oid, ObjectHandle>,
}

impl Registry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Bind an identifier to an instance.
    ///
    /// Re-inserting the same instance under the same id is a no-op;
    /// binding an id already held by a different instance fails with
    /// [`ProtocolError::DuplicateIdentifier`].
    pub fn insert(&mut self, oid: Oid, handle: ObjectHandle) -> Result<(), ProtocolError> {
        match self.objects.entry(oid) {
            Entry::Occupied(slot) => {
                if Arc::ptr_eq(slot.get(), &handle) {
                    Ok(())
                } else {
                    Err(ProtocolError::DuplicateIdentifier(oid))
                }
            }
            Entry::Vacant(slot) => {
                slot.insert(handle);
                Ok(())
            }
        }
    }

    pub fn lookup(&self, oid: Oid) -> Result<ObjectHandle, ProtocolError> {
        self.objects
            .get(&oid)
            .cloned()
            .ok_or(ProtocolError::UnknownObject(oid))
    }

    pub fn get(&self, oid: Oid) -> Option<ObjectHandle> {
        self.objects.get(&oid).cloned()
    }

    pub fn contains(&self, oid: Oid) -> bool {
        self.objects.contains_key(&oid)
    }

    pub fn len(&self) -> usize {
        self.objects.len()
    }

    pub fn is_empty(&self) -> bool {
        self.objects.is_empty()
    }

    /// Drop every entry. Previously issued ids become unresolvable;
    /// the session resets its allocators alongside so ids are never
    /// reused within one lifetime.
    pub fn reset(&mut self) {
        self.objects.clear();
    }

    /// Entries in ascending id order.
    pub fn iter(&self) -> impl Iterator<Item = (Oid, &ObjectHandle)> {
        self.objects.iter().map(|(oid, handle)| (*oid, handle))
    }

    pub fn oids(&self) -> impl Iterator<Item = Oid> + '_ {
        self.objects.keys().copied()
    }

    /// Replay-equivalence check: identical id sets, and the objects
    /// bound to each id are pairwise structurally equal.
    pub fn matches(&self, other: &Registry) -> bool {
        if self.objects.len() != other.objects.len() {
            return false;
        }
        self.objects.iter().all(|(oid, mine)| {
            other
                .objects
                .get(oid)
                .is_some_and(|theirs| handles_state_eq(mine, theirs))
        })
    }

    /// Looser equivalence for callers that exclude identity from
    /// comparison: same object count, pairwise structural equality in
    /// id order, ids themselves not required to coincide.
    pub fn matches_ignoring_ids(&self, other: &Registry) -> bool {
        if self.objects.len() != other.objects.len() {
            return false;
        }
        self.objects
            .values()
            .zip(other.objects.values())
            .all(|(mine, theirs)| handles_state_eq(mine, theirs))
    }
}

fn handles_state_eq(a: &ObjectHandle, b: &ObjectHandle) -> bool {
    if Arc::ptr_eq(a, b) {
        return true;
    }
    let a = object::lock(a);
    let b = object::lock(b);
    a.state_eq(&*b)
}
