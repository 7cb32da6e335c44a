use std::fmt;

use serde::{Deserialize, Serialize};

/// Object identifier.
///
/// Unique for the lifetime of a registry, totally ordered, compared and
/// hashed by numeric value only. Assigned at construction time by the
/// client's allocator; the replayer overwrites it with the id carried by
/// a construction envelope so that both processes agree on identity.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Oid(u64);

impl Oid {
    /// Placeholder id carried by an object between construction and
    /// registration. Never issued by an allocator.
    pub const UNSET: Oid = Oid(0);

    pub const fn new(raw: u64) -> Self {
        Self(raw)
    }

    pub const fn get(self) -> u64 {
        self.0
    }

    pub const fn is_unset(self) -> bool {
        self.0 == 0
    }
}

impl fmt::Display for Oid {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// Command identifier.
///
/// Assigned when an envelope is written (not when the underlying
/// operation runs), from a counter independent of the object ids.
/// Reflects write order; used for ordering and audit only, never for
/// object lookup.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Cid(u64);

impl Cid {
    pub const fn new(raw: u64) -> Self {
        Self(raw)
    }

    pub const fn get(self) -> u64 {
        self.0
    }
}

impl fmt::Display for Cid {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn ordering_by_value() {
        assert!(Oid::new(1) < Oid::new(2));
        assert!(Cid::new(9) < Cid::new(10));
    }

    #[test]
    fn transparent_serde() {
        let json = serde_json::to_string(&Oid::new(42)).unwrap();
        assert_eq!(json, "42");
        let oid: Oid = serde_json::from_str("42").unwrap();
        assert_eq!(oid, Oid::new(42));
    }

    #[test]
    fn unset_sentinel() {
        assert!(Oid::UNSET.is_unset());
        assert!(!Oid::new(1).is_unset());
    }
}
