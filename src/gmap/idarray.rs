//! Uniform sorted-sequence view over any GMAP backend (§3.3's "ID array"
//! component): callers that only need to iterate or probe a key's
//! associated set do not need to know which of the four representations
//! currently backs it.

use croaring::Bitmap;

use std::convert::TryFrom;

use crate::guid::Id;

/// A read-only, strictly-ascending view over one key's target-id set.
pub enum IdArray<'a> {
    Empty,
    Singleton(Id),
    Slice(&'a [Id]),
    Bitmap(&'a Bitmap),
}

impl<'a> IdArray<'a> {
    pub fn len(&self) -> usize {
        match self {
            IdArray::Empty => 0,
            IdArray::Singleton(_) => 1,
            IdArray::Slice(s) => s.len(),
            IdArray::Bitmap(b) => b.cardinality() as usize,
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn contains(&self, id: Id) -> bool {
        match self {
            IdArray::Empty => false,
            IdArray::Singleton(v) => *v == id,
            IdArray::Slice(s) => s.binary_search(&id).is_ok(),
            IdArray::Bitmap(b) => match u32::try_from(id) {
                Ok(v) => b.contains(v),
                Err(_) => false,
            },
        }
    }

    /// Smallest member `>= id`, if any (forward `find`).
    pub fn find_ge(&self, id: Id) -> Option<Id> {
        match self {
            IdArray::Empty => None,
            IdArray::Singleton(v) => (*v >= id).then_some(*v),
            IdArray::Slice(s) => match s.binary_search(&id) {
                Ok(i) => Some(s[i]),
                Err(i) if i < s.len() => Some(s[i]),
                Err(_) => None,
            },
            IdArray::Bitmap(b) => {
                let start = u32::try_from(id).unwrap_or(u32::MAX);
                b.iter().find(|v| *v >= start).map(|v| v as Id)
            }
        }
    }

    /// Largest member `<= id`, if any (reverse `find`).
    pub fn find_le(&self, id: Id) -> Option<Id> {
        match self {
            IdArray::Empty => None,
            IdArray::Singleton(v) => (*v <= id).then_some(*v),
            IdArray::Slice(s) => match s.binary_search(&id) {
                Ok(i) => Some(s[i]),
                Err(0) => None,
                Err(i) => Some(s[i - 1]),
            },
            IdArray::Bitmap(b) => {
                let end = u32::try_from(id).unwrap_or(u32::MAX);
                b.iter().take_while(|v| *v <= end).last().map(|v| v as Id)
            }
        }
    }

    pub fn iter_forward(&self) -> Box<dyn Iterator<Item = Id> + '_> {
        match self {
            IdArray::Empty => Box::new(std::iter::empty()),
            IdArray::Singleton(v) => Box::new(std::iter::once(*v)),
            IdArray::Slice(s) => Box::new(s.iter().copied()),
            IdArray::Bitmap(b) => Box::new(b.iter().map(|v| v as Id)),
        }
    }

    pub fn iter_reverse(&self) -> Box<dyn Iterator<Item = Id> + '_> {
        match self {
            IdArray::Empty => Box::new(std::iter::empty()),
            IdArray::Singleton(v) => Box::new(std::iter::once(*v)),
            IdArray::Slice(s) => Box::new(s.iter().rev().copied()),
            IdArray::Bitmap(b) => {
                let mut all: Vec<Id> = b.iter().map(|v| v as Id).collect();
                all.reverse();
                Box::new(all.into_iter())
            }
        }
    }
}

#[cfg(test)]
#[path = "idarray_test.rs"]
mod idarray_test;
