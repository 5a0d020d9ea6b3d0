//! One concrete shape — an immutable, shared, ascending id vector plus a
//! cursor position — backs most of the leaf iterator variants (`all`,
//! `null`, `gmap`, `bgmap`, `hmap`, `prefix`, `isa`, `linksto`, `fixed`).
//! They differ only in how the backing vector was produced and in the
//! wire prefix/cost profile they report, both captured in [Kind].

use std::sync::Arc;

use crate::{
    budget::{cost, Budget},
    guid::Id,
    iter::{CheckOutcome, Direction, FreezeWhich, GraphIterator, Outcome, Stats},
};

/// Which leaf variant a [SortedIdIter] is standing in for. Only affects
/// `type_prefix` and the cost profile reported by `stats`; the
/// find/next/check mechanics are identical across all of them because the
/// backing data is always a materialized sorted `Vec<Id>`.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Kind {
    All,
    Null,
    Gmap,
    Bgmap,
    Hmap,
    Prefix,
    Isa,
    Linksto,
    /// The intersection of a linkage probe with a typeguid probe — a
    /// dedicated composite index lookup (§4.3 planning step 4).
    Vip,
    /// Explicit literal id set, optionally reporting a masquerade type
    /// name to the planner instead of its own (§3.7 "fixed").
    Fixed,
}

impl Kind {
    fn prefix(self) -> &'static str {
        match self {
            Kind::All => "all",
            Kind::Null => "null",
            Kind::Gmap => "gmap",
            Kind::Bgmap => "bgmap",
            Kind::Hmap => "hmap",
            Kind::Prefix => "prefix",
            Kind::Isa => "isa",
            Kind::Linksto => "linksto",
            Kind::Vip => "vip",
            Kind::Fixed => "fixed",
        }
    }

    /// Bitmap-backed shapes (`bgmap`) are O(1) per probe; array-backed
    /// shapes pay binary-search cost.
    fn is_dense(self) -> bool {
        matches!(self, Kind::Bgmap)
    }
}

#[derive(Clone, Debug)]
pub struct SortedIdIter {
    kind: Kind,
    label: String,
    data: Arc<Vec<Id>>,
    direction: Direction,
    /// Index of the next value `next()` will yield, counted from the
    /// start in `Forward`, from the end in `Reverse`.
    cursor: usize,
    masquerade: Option<String>,
}

impl SortedIdIter {
    /// `data` must already be ascending and duplicate-free.
    pub fn new(kind: Kind, label: impl Into<String>, data: Vec<Id>, direction: Direction) -> SortedIdIter {
        SortedIdIter {
            kind,
            label: label.into(),
            data: Arc::new(data),
            direction,
            cursor: 0,
            masquerade: None,
        }
    }

    pub fn with_masquerade(mut self, name: impl Into<String>) -> SortedIdIter {
        self.masquerade = Some(name.into());
        self
    }

    fn remaining(&self) -> usize {
        self.data.len().saturating_sub(self.cursor)
    }

    fn index_for_forward(&self, i: usize) -> usize {
        i
    }

    fn index_for_reverse(&self, i: usize) -> usize {
        self.data.len() - 1 - i
    }

    fn peek_at(&self, i: usize) -> Option<Id> {
        let idx = match self.direction {
            Direction::Forward => self.index_for_forward(i),
            Direction::Reverse => self.index_for_reverse(i),
        };
        self.data.get(idx).copied()
    }
}

impl GraphIterator for SortedIdIter {
    fn type_prefix(&self) -> &'static str {
        self.kind.prefix()
    }

    fn next(&mut self, budget: &mut Budget) -> crate::Result<Outcome<Id>> {
        if !budget.charge(cost::NEXT_SORTED) {
            return Ok(Outcome::NeedsMore);
        }
        match self.peek_at(self.cursor) {
            Some(v) => {
                self.cursor += 1;
                Ok(Outcome::Value(v))
            }
            None => Ok(Outcome::Done),
        }
    }

    fn find(&mut self, budget: &mut Budget, id: Id) -> crate::Result<Outcome<Id>> {
        let charge = if self.kind.is_dense() { cost::FIND_BITMAP } else { cost::FIND_ARRAY };
        if !budget.charge(charge) {
            return Ok(Outcome::NeedsMore);
        }
        let found = match self.direction {
            Direction::Forward => {
                let start = self.cursor;
                match self.data[start..].binary_search(&id) {
                    Ok(off) => Some((start + off, self.data[start + off])),
                    Err(off) if start + off < self.data.len() => {
                        let idx = start + off;
                        Some((idx, self.data[idx]))
                    }
                    Err(_) => None,
                }
            }
            Direction::Reverse => {
                // not-yet-visited elements form the ascending prefix
                // data[..end]; want the largest member <= id within it.
                let end = self.data.len() - self.cursor;
                match self.data[..end].binary_search(&id) {
                    Ok(idx) => Some((idx, self.data[idx])),
                    Err(idx) if idx > 0 => Some((idx - 1, self.data[idx - 1])),
                    Err(_) => None,
                }
            }
        };
        match found {
            Some((idx, v)) => {
                self.cursor = match self.direction {
                    Direction::Forward => idx + 1,
                    Direction::Reverse => self.data.len() - idx,
                };
                Ok(Outcome::Value(v))
            }
            None => Ok(Outcome::Done),
        }
    }

    fn check(&mut self, budget: &mut Budget, id: Id) -> crate::Result<CheckOutcome> {
        let charge = if self.kind.is_dense() { cost::CHECK_BITMAP } else { cost::CHECK_ARRAY };
        if !budget.charge(charge) {
            return Ok(CheckOutcome::NeedsMore);
        }
        Ok(if self.data.binary_search(&id).is_ok() { CheckOutcome::Yes } else { CheckOutcome::No })
    }

    fn stats(&self) -> Stats {
        let dense = self.kind.is_dense();
        Stats {
            cardinality: Some(self.data.len() as u64),
            next_cost: cost::NEXT_SORTED,
            find_cost: if dense { cost::FIND_BITMAP } else { cost::FIND_ARRAY },
            check_cost: if dense { cost::CHECK_BITMAP } else { cost::CHECK_ARRAY },
            sorted: true,
            direction: self.direction,
        }
    }

    fn direction(&self) -> Direction {
        self.direction
    }

    fn clone_box(&self) -> Box<dyn GraphIterator> {
        Box::new(SortedIdIter {
            kind: self.kind,
            label: self.label.clone(),
            data: Arc::clone(&self.data),
            direction: self.direction,
            cursor: self.cursor,
            masquerade: self.masquerade.clone(),
        })
    }

    fn reset(&mut self) {
        self.cursor = 0;
    }

    fn beyond(&self, id: Id) -> bool {
        match self.peek_at(self.cursor.saturating_sub(1)) {
            Some(last) => match self.direction {
                Direction::Forward => last > id,
                Direction::Reverse => last < id,
            },
            None => false,
        }
    }

    fn primitive_summary(&self) -> crate::iter::PrimitiveSummary {
        crate::iter::PrimitiveSummary::default()
    }

    fn freeze(&self, which: FreezeWhich) -> String {
        match which {
            FreezeWhich::Set => format!("{}:{}", self.type_prefix(), self.label),
            FreezeWhich::Position => self.cursor.to_string(),
            FreezeWhich::State => self.masquerade.clone().unwrap_or_default(),
        }
    }
}

/// Parse a previously frozen `SortedIdIter`'s set/position/state components
/// back into a live iterator, given the resolver's freshly recomputed
/// backing data (the set identity is re-resolved, not the contents: a
/// `gmap` cursor thaw re-reads the live GMAP rather than trusting stale
/// bytes).
pub fn thaw_sorted(kind: Kind, label: &str, data: Vec<Id>, direction: Direction, position: Option<&str>, state: Option<&str>) -> SortedIdIter {
    let mut it = SortedIdIter::new(kind, label, data, direction);
    if let Some(p) = position {
        it.cursor = p.parse().unwrap_or(0);
    }
    if let Some(s) = state {
        if !s.is_empty() {
            it.masquerade = Some(s.to_string());
        }
    }
    it
}

pub use Kind as SortedKind;

#[cfg(test)]
#[path = "sorted_test.rs"]
mod sorted_test;
