//! `atomic`: a checker (and fallback full-scan producer) over one
//! constraint predicate (§3.4, §4.3 planning step 1 — "each atomic
//! predicate becomes a checker or a producer candidate"). Unlike the
//! array-backed leaves, this variant never has a precomputed id set: it
//! reads the primitive store directly, so its next/find cost is a full
//! scan and the planner should only pick it as producer when nothing
//! cheaper is available.

use std::sync::Arc;

use regex::bytes::Regex;

use crate::{
    budget::{cost, Budget},
    constraint::{AtomicField, AtomicPredicate, AtomicValue, CompareOp, Meta, Range},
    err_at,
    guid::Id,
    iter::{CheckOutcome, Direction, FreezeWhich, GraphIterator, Outcome, Stats},
    primitive::{Linkage, Primitive, PrimitiveStore},
    Result,
};

pub struct AtomicChecker {
    store: Arc<PrimitiveStore>,
    predicate: AtomicPredicate,
    cursor: Id,
}

impl std::fmt::Debug for AtomicChecker {
    fn fmt(&self, f: &mut std::fmt::Formatter) -> std::fmt::Result {
        f.debug_struct("AtomicChecker").field("predicate", &self.predicate).field("cursor", &self.cursor).finish()
    }
}

impl AtomicChecker {
    pub fn new(store: Arc<PrimitiveStore>, predicate: AtomicPredicate) -> AtomicChecker {
        AtomicChecker { store, predicate, cursor: 0 }
    }

    fn field_bytes<'a>(&self, p: &'a Primitive) -> Option<FieldValue<'a>> {
        match self.predicate.field {
            AtomicField::Name => p.name.as_deref().map(FieldValue::Bytes),
            AtomicField::Value => p.value.as_deref().map(FieldValue::Bytes),
            AtomicField::Guid => Some(FieldValue::Guid(p.guid)),
            AtomicField::Type | AtomicField::Typeguid => p.typeguid.map(FieldValue::Guid),
            AtomicField::Left => p.linkage(Linkage::Left).map(FieldValue::Guid),
            AtomicField::Right => p.linkage(Linkage::Right).map(FieldValue::Guid),
            AtomicField::Scope => p.linkage(Linkage::Scope).map(FieldValue::Guid),
        }
    }

    fn matches(&self, p: &Primitive) -> Result<bool> {
        let field = match self.field_bytes(p) {
            Some(f) => f,
            None => return Ok(false),
        };
        match self.predicate.op {
            CompareOp::Eq => Ok(self.predicate.values.iter().any(|v| field.eq_value(v))),
            CompareOp::Ne => Ok(self.predicate.values.iter().all(|v| !field.eq_value(v))),
            CompareOp::Match => {
                let bytes = match field {
                    FieldValue::Bytes(b) => b,
                    FieldValue::Guid(_) => return Ok(false),
                };
                for v in &self.predicate.values {
                    if let AtomicValue::Bytes(pattern) = v {
                        let pattern = err_at!(Syntax, std::str::from_utf8(pattern), "matching `~=` pattern")?;
                        let re = err_at!(Syntax, Regex::new(pattern), "compiling `~=` pattern {:?}", pattern)?;
                        if re.is_match(bytes) {
                            return Ok(true);
                        }
                    }
                }
                Ok(false)
            }
        }
    }
}

enum FieldValue<'a> {
    Bytes(&'a [u8]),
    Guid(crate::Guid),
}

impl<'a> FieldValue<'a> {
    fn eq_value(&self, v: &AtomicValue) -> bool {
        match (self, v) {
            (FieldValue::Bytes(b), AtomicValue::Bytes(ov)) => *b == ov.as_slice(),
            (FieldValue::Guid(g), AtomicValue::Guid(og)) => g == og,
            _ => false,
        }
    }
}

impl GraphIterator for AtomicChecker {
    fn type_prefix(&self) -> &'static str {
        "atomic"
    }

    fn next(&mut self, budget: &mut Budget) -> Result<Outcome<Id>> {
        loop {
            if !budget.charge(cost::CHECK_ARRAY) {
                return Ok(Outcome::NeedsMore);
            }
            if self.cursor >= self.store.high_id() {
                return Ok(Outcome::Done);
            }
            let id = self.cursor;
            self.cursor += 1;
            let p = self.store.get(id)?;
            if self.matches(p)? {
                return Ok(Outcome::Value(id));
            }
        }
    }

    fn find(&mut self, budget: &mut Budget, id: Id) -> Result<Outcome<Id>> {
        self.cursor = self.cursor.max(id);
        self.next(budget)
    }

    fn check(&mut self, budget: &mut Budget, id: Id) -> Result<CheckOutcome> {
        if !budget.charge(cost::CHECK_ARRAY) {
            return Ok(CheckOutcome::NeedsMore);
        }
        if id >= self.store.high_id() {
            return Ok(CheckOutcome::No);
        }
        let p = self.store.get(id)?;
        Ok(if self.matches(p)? { CheckOutcome::Yes } else { CheckOutcome::No })
    }

    fn stats(&self) -> Stats {
        Stats {
            cardinality: None,
            next_cost: self.store.high_id() as i64 * cost::CHECK_ARRAY,
            find_cost: self.store.high_id() as i64 * cost::CHECK_ARRAY,
            check_cost: cost::CHECK_ARRAY,
            sorted: true,
            direction: Direction::Forward,
        }
    }

    fn direction(&self) -> Direction {
        Direction::Forward
    }

    fn clone_box(&self) -> Box<dyn GraphIterator> {
        Box::new(AtomicChecker { store: Arc::clone(&self.store), predicate: self.predicate.clone(), cursor: self.cursor })
    }

    fn reset(&mut self) {
        self.cursor = 0;
    }

    fn beyond(&self, id: Id) -> bool {
        self.cursor > id
    }

    fn freeze(&self, which: FreezeWhich) -> String {
        match which {
            FreezeWhich::Set => format!("atomic:{:?}", self.predicate),
            FreezeWhich::Position => self.cursor.to_string(),
            FreezeWhich::State => String::new(),
        }
    }
}

/// `guard`: a checker evaluating a constraint's flag/range fields (`meta`,
/// `live`, `archival`, `valuetype`, the `timestamp`/`generation` ranges)
/// directly against the primitive store — the non-atomic half of planning
/// step 1's "each predicate becomes a checker or a producer candidate".
/// Always a checker, never a producer: none of these fields narrow to a
/// precomputed id set the way a literal atomic predicate can.
pub struct ConstraintGuard {
    store: Arc<PrimitiveStore>,
    meta: Option<Meta>,
    live: Option<bool>,
    archival: Option<bool>,
    valuetype: Option<u8>,
    timestamp_range: Range<u64>,
    generation_range: Range<u32>,
    cursor: Id,
}

impl std::fmt::Debug for ConstraintGuard {
    fn fmt(&self, f: &mut std::fmt::Formatter) -> std::fmt::Result {
        f.debug_struct("ConstraintGuard").field("cursor", &self.cursor).finish()
    }
}

impl ConstraintGuard {
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        store: Arc<PrimitiveStore>,
        meta: Option<Meta>,
        live: Option<bool>,
        archival: Option<bool>,
        valuetype: Option<u8>,
        timestamp_range: Range<u64>,
        generation_range: Range<u32>,
    ) -> ConstraintGuard {
        ConstraintGuard { store, meta, live, archival, valuetype, timestamp_range, generation_range, cursor: 0 }
    }

    /// `true` when every field is at its default, i.e. this guard would
    /// accept everything — the caller should skip adding it as a checker.
    pub fn is_noop(&self) -> bool {
        self.meta.is_none()
            && self.live.is_none()
            && self.archival.is_none()
            && self.valuetype.is_none()
            && self.timestamp_range.is_unbounded()
            && self.generation_range.is_unbounded()
    }

    fn matches(&self, p: &Primitive) -> bool {
        if let Some(m) = self.meta {
            let ok = match m {
                Meta::Any => true,
                Meta::Node => p.right.is_none(),
                Meta::EdgeTo => p.right.is_some(),
                Meta::EdgeFrom => p.left.is_some(),
            };
            if !ok {
                return false;
            }
        }
        if let Some(live) = self.live {
            if p.live != live {
                return false;
            }
        }
        if let Some(archival) = self.archival {
            if p.archival != archival {
                return false;
            }
        }
        if let Some(vt) = self.valuetype {
            if p.valuetype != vt {
                return false;
            }
        }
        self.timestamp_range.contains(p.timestamp) && self.generation_range.contains(p.generation)
    }
}

impl GraphIterator for ConstraintGuard {
    fn type_prefix(&self) -> &'static str {
        "guard"
    }

    fn next(&mut self, budget: &mut Budget) -> Result<Outcome<Id>> {
        loop {
            if !budget.charge(cost::CHECK_ARRAY) {
                return Ok(Outcome::NeedsMore);
            }
            if self.cursor >= self.store.high_id() {
                return Ok(Outcome::Done);
            }
            let id = self.cursor;
            self.cursor += 1;
            if self.matches(self.store.get(id)?) {
                return Ok(Outcome::Value(id));
            }
        }
    }

    fn find(&mut self, budget: &mut Budget, id: Id) -> Result<Outcome<Id>> {
        self.cursor = self.cursor.max(id);
        self.next(budget)
    }

    fn check(&mut self, budget: &mut Budget, id: Id) -> Result<CheckOutcome> {
        if !budget.charge(cost::CHECK_ARRAY) {
            return Ok(CheckOutcome::NeedsMore);
        }
        if id >= self.store.high_id() {
            return Ok(CheckOutcome::No);
        }
        Ok(if self.matches(self.store.get(id)?) { CheckOutcome::Yes } else { CheckOutcome::No })
    }

    fn stats(&self) -> Stats {
        Stats {
            cardinality: None,
            next_cost: self.store.high_id() as i64 * cost::CHECK_ARRAY,
            find_cost: self.store.high_id() as i64 * cost::CHECK_ARRAY,
            check_cost: cost::CHECK_ARRAY,
            sorted: true,
            direction: Direction::Forward,
        }
    }

    fn direction(&self) -> Direction {
        Direction::Forward
    }

    fn clone_box(&self) -> Box<dyn GraphIterator> {
        Box::new(ConstraintGuard {
            store: Arc::clone(&self.store),
            meta: self.meta,
            live: self.live,
            archival: self.archival,
            valuetype: self.valuetype,
            timestamp_range: self.timestamp_range,
            generation_range: self.generation_range,
            cursor: self.cursor,
        })
    }

    fn reset(&mut self) {
        self.cursor = 0;
    }

    fn beyond(&self, id: Id) -> bool {
        self.cursor > id
    }

    fn freeze(&self, which: FreezeWhich) -> String {
        match which {
            FreezeWhich::Set => "guard".to_string(),
            FreezeWhich::Position => self.cursor.to_string(),
            FreezeWhich::State => String::new(),
        }
    }
}

#[cfg(test)]
#[path = "predicate_test.rs"]
mod predicate_test;
