//! 128-bit content-addressed external identity (§3.1), and the persisted
//! bijection between a [Guid] and a primitive's internal 34-bit [Id] (§3.2).

use uuid::Uuid;

use std::{collections::HashMap, convert::TryFrom, fmt};

use crate::{err_at, Error, Result};

/// 34-bit internal primitive id: dense, monotonic, insertion-ordered,
/// never reused (§3.1 invariant).
pub type Id = u64;

/// Mask applied to any raw integer claiming to be an [Id].
pub const ID_BITS: u32 = 34;

/// Validate that `raw` fits the 34-bit id space.
pub fn checked_id(raw: u64) -> Result<Id> {
    if raw >> ID_BITS != 0 {
        err_at!(InvalidInput, msg: "id {} exceeds {}-bit range", raw, ID_BITS)
    } else {
        Ok(raw)
    }
}

/// 128-bit globally unique, content-addressed primitive identity.
#[derive(Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Guid(u128);

impl fmt::Debug for Guid {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "{:032x}", self.0)
    }
}

impl fmt::Display for Guid {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        fmt::Debug::fmt(self, f)
    }
}

impl Guid {
    pub const ZERO: Guid = Guid(0);

    /// Construct from a raw 128-bit value (e.g. decoded off the wire).
    pub fn from_u128(v: u128) -> Guid {
        Guid(v)
    }

    /// Generate a fresh, content-addressed-by-randomness guid. Real
    /// deployments derive the guid from a hash of the write payload plus
    /// the writer's dateline; that derivation lives in the (out of scope)
    /// write-request collaborator. This constructor is what that
    /// collaborator, and tests, call.
    pub fn generate() -> Guid {
        Guid(Uuid::new_v4().as_u128())
    }

    pub fn as_u128(&self) -> u128 {
        self.0
    }

    /// Parse the canonical 32 hex-digit form used on the wire (§6).
    pub fn parse_hex(s: &str) -> Result<Guid> {
        if s.len() != 32 {
            return err_at!(Syntax, msg: "guid {:?} is not 32 hex digits", s);
        }
        let v = err_at!(Syntax, u128::from_str_radix(s, 16), "parsing guid {:?}", s)?;
        Ok(Guid(v))
    }
}

impl TryFrom<&str> for Guid {
    type Error = Error;

    fn try_from(s: &str) -> Result<Guid> {
        Guid::parse_hex(s)
    }
}

/// Persisted bijection between external [Guid] and internal [Id].
///
/// Lookup failures are reported as [Error::NoSuchId] (§3.2).
#[derive(Default)]
pub struct GuidMap {
    forward: HashMap<Guid, Id>,
    backward: HashMap<Id, Guid>,
}

impl GuidMap {
    pub fn new() -> GuidMap {
        GuidMap::default()
    }

    /// Insert a fresh `(guid, id)` pair. Both directions must be unused;
    /// a clash is a caller bug, since primitive ids are allocated by
    /// insertion order and guids are (assumed) content-addressed unique.
    pub fn insert(&mut self, guid: Guid, id: Id) -> Result<()> {
        if self.forward.contains_key(&guid) {
            return err_at!(Already, msg: "guid {:?} already mapped", guid);
        }
        if self.backward.contains_key(&id) {
            return err_at!(Already, msg: "id {} already mapped", id);
        }
        self.forward.insert(guid, id);
        self.backward.insert(id, guid);
        Ok(())
    }

    pub fn id_of(&self, guid: &Guid) -> Result<Id> {
        self.forward
            .get(guid)
            .copied()
            .ok_or_else(|| Error::NoSuchId("guid_map".into(), format!("no such guid {:?}", guid)))
    }

    pub fn guid_of(&self, id: Id) -> Result<Guid> {
        self.backward
            .get(&id)
            .copied()
            .ok_or_else(|| Error::NoSuchId("guid_map".into(), format!("no such id {}", id)))
    }

    pub fn len(&self) -> usize {
        self.forward.len()
    }

    pub fn is_empty(&self) -> bool {
        self.forward.is_empty()
    }
}

#[cfg(test)]
#[path = "guid_test.rs"]
mod guid_test;
