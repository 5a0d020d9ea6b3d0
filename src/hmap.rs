//! HMAP: a hash-map-variant GMAP keyed by byte string rather than source
//! id (GLOSSARY), used for the name/value indices an `hmap` iterator
//! reads and the `prefix` iterator is built on top of.
//!
//! Hashing uses the same city-hash-family hasher this engine's lineage
//! already reaches for when it needs a fast non-cryptographic string
//! hash (see [crate::hash::CityHasher]); the ordered-prefix index below
//! uses a `BTreeMap` ordered by the raw bytes so prefix range-scans are
//! a single `range()` call rather than the per-character decomposition
//! §4.3 sketches as one possible internal construction — the externally
//! observable contract ("all ids whose string has a given prefix") is
//! identical either way (see DESIGN.md).

use std::collections::{BTreeMap, HashMap};

use crate::{config::Config, gmap::Repr, guid::Id, hash::CityHasher};
use std::hash::{BuildHasher, Hasher};

fn hash_key(key: &[u8]) -> u64 {
    let mut h = CityHasher::new().build_hasher();
    h.write(key);
    h.finish()
}

/// Exact byte-string keyed index (name=, value= equality predicates).
pub struct Hmap {
    name: String,
    buckets: HashMap<u64, Vec<(Vec<u8>, Repr)>>,
    ordered: BTreeMap<Vec<u8>, Vec<Id>>,
}

impl Hmap {
    pub fn new(name: impl Into<String>) -> Hmap {
        Hmap {
            name: name.into(),
            buckets: HashMap::new(),
            ordered: BTreeMap::new(),
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn add(&mut self, key: &[u8], target: Id, duplicates_ok: bool, config: &Config) -> crate::Result<()> {
        let h = hash_key(key);
        let bucket = self.buckets.entry(h).or_default();
        let repr = match bucket.iter_mut().find(|(k, _)| k == key) {
            Some((_, repr)) => repr,
            None => {
                bucket.push((key.to_vec(), Repr::Empty));
                &mut bucket.last_mut().unwrap().1
            }
        };
        repr.add(target, duplicates_ok, config, target)?;
        let list = self.ordered.entry(key.to_vec()).or_default();
        if !list.contains(&target) {
            list.push(target);
            list.sort_unstable();
        }
        Ok(())
    }

    pub fn get(&self, key: &[u8]) -> Vec<Id> {
        let h = hash_key(key);
        self.buckets
            .get(&h)
            .and_then(|b| b.iter().find(|(k, _)| k == key))
            .map(|(_, repr)| repr.as_idarray().iter_forward().collect())
            .unwrap_or_default()
    }

    /// All ids whose key starts with `prefix`, ascending by id, deduped.
    pub fn prefix(&self, prefix: &[u8]) -> Vec<Id> {
        let mut out: Vec<Id> = self
            .ordered
            .range(prefix.to_vec()..)
            .take_while(|(k, _)| k.starts_with(prefix))
            .flat_map(|(_, ids)| ids.iter().copied())
            .collect();
        out.sort_unstable();
        out.dedup();
        out
    }
}

#[cfg(test)]
#[path = "hmap_test.rs"]
mod hmap_test;
