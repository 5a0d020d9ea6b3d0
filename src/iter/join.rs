//! One-hop join iterators (§4.3): `isa` and `linksto` each re-express a
//! sub-iterator's member set as a different id set related to it by one
//! linkage hop, and `vip` intersects two already-known probes. All three
//! only ever appear where the spec allows a dedicated index read instead
//! of an `and` over two leaves, so each materializes the join into a
//! [super::SortedIdIter] rather than joining lazily per-candidate — the
//! same trade [super::SortIter] already makes for `sort`.

use std::sync::Arc;

use crate::{
    budget::{cost, Budget},
    gmap::Gmap,
    guid::{GuidMap, Id},
    iter::{sorted::Kind, CheckOutcome, Direction, FreezeWhich, GraphIterator, Outcome, Stats},
    primitive::{Linkage, PrimitiveStore},
    Result,
};

fn drain(inner: &mut dyn GraphIterator, budget: &mut Budget) -> Result<Option<Vec<Id>>> {
    let mut out = Vec::new();
    loop {
        match inner.next(budget)? {
            Outcome::Value(v) => out.push(v),
            Outcome::Done => return Ok(Some(out)),
            Outcome::NeedsMore => return Ok(None),
        }
    }
}

/// The intersection of a linkage probe with a typeguid probe (§4.3's `vip`
/// rewrite): both operands are already fully known arrays, so this is a
/// plain eager [crate::iter::intersect_sorted] rather than a lazy type.
pub fn build_vip(linkage_ids: &[Id], typeguid_ids: &[Id], direction: Direction) -> super::SortedIdIter {
    let ids = crate::iter::intersect_sorted(linkage_ids, typeguid_ids);
    super::SortedIdIter::new(Kind::Vip, super::freeze_ids(&ids), ids, direction)
}

/// `isa`: primitives that are the `linkage` of some primitive matching
/// `inner` (one `store.get` plus one `guid_map.id_of` per inner member).
pub struct IsaIter {
    inner: Option<Box<dyn GraphIterator>>,
    store: Arc<PrimitiveStore>,
    guids: Arc<GuidMap>,
    linkage: Linkage,
    direction: Direction,
    materialized: Option<super::SortedIdIter>,
}

impl std::fmt::Debug for IsaIter {
    fn fmt(&self, f: &mut std::fmt::Formatter) -> std::fmt::Result {
        f.debug_struct("IsaIter").field("linkage", &self.linkage).field("materialized", &self.materialized.is_some()).finish()
    }
}

impl IsaIter {
    pub fn new(inner: Box<dyn GraphIterator>, store: Arc<PrimitiveStore>, guids: Arc<GuidMap>, linkage: Linkage, direction: Direction) -> IsaIter {
        IsaIter { inner: Some(inner), store, guids, linkage, direction, materialized: None }
    }

    fn ensure_materialized(&mut self, budget: &mut Budget) -> Result<bool> {
        if self.materialized.is_some() {
            return Ok(true);
        }
        let inner = self.inner.as_mut().expect("materialize called once");
        let ids = match drain(inner.as_mut(), budget)? {
            Some(ids) => ids,
            None => return Ok(false),
        };
        let mut out = Vec::with_capacity(ids.len());
        for id in ids {
            let p = self.store.get(id)?;
            if let Some(guid) = p.linkage(self.linkage) {
                if let Ok(target) = self.guids.id_of(&guid) {
                    out.push(target);
                }
            }
        }
        out.sort_unstable();
        out.dedup();
        self.materialized = Some(super::SortedIdIter::new(Kind::Isa, super::freeze_ids(&out), out, self.direction));
        Ok(true)
    }
}

impl GraphIterator for IsaIter {
    fn type_prefix(&self) -> &'static str {
        "isa"
    }

    fn next(&mut self, budget: &mut Budget) -> Result<Outcome<Id>> {
        if !self.ensure_materialized(budget)? {
            return Ok(Outcome::NeedsMore);
        }
        self.materialized.as_mut().unwrap().next(budget)
    }

    fn find(&mut self, budget: &mut Budget, id: Id) -> Result<Outcome<Id>> {
        if !self.ensure_materialized(budget)? {
            return Ok(Outcome::NeedsMore);
        }
        self.materialized.as_mut().unwrap().find(budget, id)
    }

    fn check(&mut self, budget: &mut Budget, id: Id) -> Result<CheckOutcome> {
        if !self.ensure_materialized(budget)? {
            return Ok(CheckOutcome::NeedsMore);
        }
        self.materialized.as_mut().unwrap().check(budget, id)
    }

    fn stats(&self) -> Stats {
        match &self.materialized {
            Some(m) => m.stats(),
            None => Stats {
                cardinality: None,
                next_cost: cost::STATISTICS,
                find_cost: cost::STATISTICS,
                check_cost: cost::STATISTICS,
                sorted: true,
                direction: self.direction,
            },
        }
    }

    fn direction(&self) -> Direction {
        self.direction
    }

    fn clone_box(&self) -> Box<dyn GraphIterator> {
        match &self.materialized {
            Some(m) => Box::new(IsaIter {
                inner: None,
                store: Arc::clone(&self.store),
                guids: Arc::clone(&self.guids),
                linkage: self.linkage,
                direction: self.direction,
                materialized: Some(m.clone()),
            }),
            None => panic!("cannot clone an un-materialized isa iterator"),
        }
    }

    fn reset(&mut self) {
        if let Some(m) = self.materialized.as_mut() {
            m.reset();
        }
    }

    fn beyond(&self, id: Id) -> bool {
        self.materialized.as_ref().map(|m| m.beyond(id)).unwrap_or(false)
    }

    fn freeze(&self, which: FreezeWhich) -> String {
        self.materialized.as_ref().map(|m| m.freeze(which)).unwrap_or_default()
    }
}

/// `linksto`: primitives that have some member of `inner` as their
/// `linkage` — the reverse hop from `isa`, read directly off the `linkage`
/// field's GMAP rather than the primitive store.
pub struct LinksToIter {
    inner: Option<Box<dyn GraphIterator>>,
    gmap: Arc<Gmap>,
    direction: Direction,
    materialized: Option<super::SortedIdIter>,
}

impl std::fmt::Debug for LinksToIter {
    fn fmt(&self, f: &mut std::fmt::Formatter) -> std::fmt::Result {
        f.debug_struct("LinksToIter").field("gmap", &self.gmap.name()).field("materialized", &self.materialized.is_some()).finish()
    }
}

impl LinksToIter {
    pub fn new(inner: Box<dyn GraphIterator>, gmap: Arc<Gmap>, direction: Direction) -> LinksToIter {
        LinksToIter { inner: Some(inner), gmap, direction, materialized: None }
    }

    fn ensure_materialized(&mut self, budget: &mut Budget) -> Result<bool> {
        if self.materialized.is_some() {
            return Ok(true);
        }
        let inner = self.inner.as_mut().expect("materialize called once");
        let targets = match drain(inner.as_mut(), budget)? {
            Some(ids) => ids,
            None => return Ok(false),
        };
        let mut out = Vec::new();
        for target in targets {
            out.extend(self.gmap.get(target).iter_forward());
        }
        out.sort_unstable();
        out.dedup();
        self.materialized = Some(super::SortedIdIter::new(Kind::Linksto, super::freeze_ids(&out), out, self.direction));
        Ok(true)
    }
}

impl GraphIterator for LinksToIter {
    fn type_prefix(&self) -> &'static str {
        "linksto"
    }

    fn next(&mut self, budget: &mut Budget) -> Result<Outcome<Id>> {
        if !self.ensure_materialized(budget)? {
            return Ok(Outcome::NeedsMore);
        }
        self.materialized.as_mut().unwrap().next(budget)
    }

    fn find(&mut self, budget: &mut Budget, id: Id) -> Result<Outcome<Id>> {
        if !self.ensure_materialized(budget)? {
            return Ok(Outcome::NeedsMore);
        }
        self.materialized.as_mut().unwrap().find(budget, id)
    }

    fn check(&mut self, budget: &mut Budget, id: Id) -> Result<CheckOutcome> {
        if !self.ensure_materialized(budget)? {
            return Ok(CheckOutcome::NeedsMore);
        }
        self.materialized.as_mut().unwrap().check(budget, id)
    }

    fn stats(&self) -> Stats {
        match &self.materialized {
            Some(m) => m.stats(),
            None => Stats {
                cardinality: None,
                next_cost: cost::STATISTICS,
                find_cost: cost::STATISTICS,
                check_cost: cost::STATISTICS,
                sorted: true,
                direction: self.direction,
            },
        }
    }

    fn direction(&self) -> Direction {
        self.direction
    }

    fn clone_box(&self) -> Box<dyn GraphIterator> {
        match &self.materialized {
            Some(m) => Box::new(LinksToIter { inner: None, gmap: Arc::clone(&self.gmap), direction: self.direction, materialized: Some(m.clone()) }),
            None => panic!("cannot clone an un-materialized linksto iterator"),
        }
    }

    fn reset(&mut self) {
        if let Some(m) = self.materialized.as_mut() {
            m.reset();
        }
    }

    fn beyond(&self, id: Id) -> bool {
        self.materialized.as_ref().map(|m| m.beyond(id)).unwrap_or(false)
    }

    fn freeze(&self, which: FreezeWhich) -> String {
        self.materialized.as_ref().map(|m| m.freeze(which)).unwrap_or_default()
    }
}

#[cfg(test)]
#[path = "join_test.rs"]
mod join_test;
