//! Index maps (§3.3, §4.2): a mapping from a source id to an ordered set
//! of target ids, physically realized by one of four (five, counting
//! empty) representations, chosen by size and promoted monotonically.

mod idarray;
mod repr;

pub use idarray::IdArray;
pub use repr::Repr;

use std::collections::{HashMap, HashSet};

use crate::{config::Config, guid::Id, Result};

/// One index map, e.g. "right→{primitives having this right}".
pub struct Gmap {
    name: String,
    slots: HashMap<Id, Repr>,
    opened_partitions: HashSet<u64>,
}

impl Gmap {
    pub fn new(name: impl Into<String>) -> Gmap {
        Gmap {
            name: name.into(),
            slots: HashMap::new(),
            opened_partitions: HashSet::new(),
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// `source / stride` selects a partition file; partitions are created
    /// (here: marked opened) lazily, on first touch (§4.2 step 1).
    pub fn partition_of(&mut self, source: Id, stride: u64) -> u64 {
        let p = source / stride.max(1);
        self.opened_partitions.insert(p);
        p
    }

    pub fn opened_partition_count(&self) -> usize {
        self.opened_partitions.len()
    }

    /// Append `target` to `source`'s ordered set (§4.2).
    pub fn add(
        &mut self,
        source: Id,
        target: Id,
        duplicates_ok: bool,
        config: &Config,
        max_id: Id,
    ) -> Result<()> {
        self.partition_of(source, config.partition_stride);
        let repr = self.slots.entry(source).or_insert(Repr::Empty);
        repr.add(target, duplicates_ok, config, max_id)
    }

    /// The ordered set for `source`, or the empty set if `source` has
    /// never been touched.
    pub fn get(&self, source: Id) -> IdArray<'_> {
        self.slots
            .get(&source)
            .map(Repr::as_idarray)
            .unwrap_or(IdArray::Empty)
    }

    pub fn contains(&self, source: Id, target: Id) -> bool {
        self.get(source).contains(target)
    }

    pub fn shape_of(&self, source: Id) -> &'static str {
        self.slots
            .get(&source)
            .map(Repr::shape_name)
            .unwrap_or("empty")
    }

    pub fn len_of(&self, source: Id) -> usize {
        self.get(source).len()
    }
}

#[cfg(test)]
#[path = "gmap_test.rs"]
mod gmap_test;
