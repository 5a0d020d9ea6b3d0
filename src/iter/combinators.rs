//! Composite iterators built on top of sub-iterators rather than a
//! materialized array: `and` (intersection, one producer plus checkers),
//! `or` (union, cost-ordered), `without` (set difference), and `sort`
//! (stable reorder by an externally supplied key).

use crate::{
    budget::{cost, Budget},
    guid::Id,
    iter::{CheckOutcome, Direction, FreezeWhich, GraphIterator, Outcome, PrimitiveSummary, Stats},
    Result,
};

/// Intersection: one producer drives `next`, every checker must accept the
/// candidate before it is yielded (§4.3's producer/checker split). The
/// planner picks which sub-iterator is the producer — cheapest `next`,
/// usually smallest cardinality — before constructing this type.
#[derive(Debug)]
pub struct AndIter {
    producer: Box<dyn GraphIterator>,
    checkers: Vec<Box<dyn GraphIterator>>,
}

impl AndIter {
    pub fn new(producer: Box<dyn GraphIterator>, checkers: Vec<Box<dyn GraphIterator>>) -> AndIter {
        AndIter { producer, checkers }
    }
}

impl GraphIterator for AndIter {
    fn type_prefix(&self) -> &'static str {
        "and"
    }

    fn next(&mut self, budget: &mut Budget) -> Result<Outcome<Id>> {
        loop {
            if !budget.charge(cost::NEXT_COMPOSITE) {
                return Ok(Outcome::NeedsMore);
            }
            match self.producer.next(budget)? {
                Outcome::Done => return Ok(Outcome::Done),
                Outcome::NeedsMore => return Ok(Outcome::NeedsMore),
                Outcome::Value(candidate) => {
                    let mut all_yes = true;
                    for checker in self.checkers.iter_mut() {
                        match checker.check(budget, candidate)? {
                            CheckOutcome::Yes => {}
                            CheckOutcome::No => {
                                all_yes = false;
                                break;
                            }
                            CheckOutcome::NeedsMore => return Ok(Outcome::NeedsMore),
                        }
                    }
                    if all_yes {
                        return Ok(Outcome::Value(candidate));
                    }
                }
            }
        }
    }

    fn find(&mut self, budget: &mut Budget, id: Id) -> Result<Outcome<Id>> {
        match self.producer.find(budget, id)? {
            Outcome::Done => Ok(Outcome::Done),
            Outcome::NeedsMore => Ok(Outcome::NeedsMore),
            Outcome::Value(v) => {
                for checker in self.checkers.iter_mut() {
                    match checker.check(budget, v)? {
                        CheckOutcome::Yes => {}
                        CheckOutcome::No => return self.next(budget),
                        CheckOutcome::NeedsMore => return Ok(Outcome::NeedsMore),
                    }
                }
                Ok(Outcome::Value(v))
            }
        }
    }

    fn check(&mut self, budget: &mut Budget, id: Id) -> Result<CheckOutcome> {
        match self.producer.check(budget, id)? {
            CheckOutcome::No => return Ok(CheckOutcome::No),
            CheckOutcome::NeedsMore => return Ok(CheckOutcome::NeedsMore),
            CheckOutcome::Yes => {}
        }
        for checker in self.checkers.iter_mut() {
            match checker.check(budget, id)? {
                CheckOutcome::Yes => {}
                CheckOutcome::No => return Ok(CheckOutcome::No),
                CheckOutcome::NeedsMore => return Ok(CheckOutcome::NeedsMore),
            }
        }
        Ok(CheckOutcome::Yes)
    }

    fn stats(&self) -> Stats {
        let p = self.producer.stats();
        Stats {
            cardinality: p.cardinality,
            next_cost: cost::NEXT_COMPOSITE + self.checkers.iter().map(|c| c.stats().check_cost).sum::<i64>(),
            find_cost: p.find_cost,
            check_cost: p.check_cost + self.checkers.iter().map(|c| c.stats().check_cost).sum::<i64>(),
            sorted: p.sorted,
            direction: p.direction,
        }
    }

    fn direction(&self) -> Direction {
        self.producer.direction()
    }

    fn clone_box(&self) -> Box<dyn GraphIterator> {
        Box::new(AndIter {
            producer: self.producer.clone_box(),
            checkers: self.checkers.iter().map(|c| c.clone_box()).collect(),
        })
    }

    fn reset(&mut self) {
        self.producer.reset();
        for c in self.checkers.iter_mut() {
            c.reset();
        }
    }

    fn beyond(&self, id: Id) -> bool {
        self.producer.beyond(id)
    }

    fn primitive_summary(&self) -> PrimitiveSummary {
        let mut summary = self.producer.primitive_summary();
        for c in self.checkers.iter() {
            summary.locked.extend(c.primitive_summary().locked);
        }
        summary
    }

    fn freeze(&self, which: FreezeWhich) -> String {
        let mut parts = vec![self.producer.freeze(which)];
        parts.extend(self.checkers.iter().map(|c| c.freeze(which)));
        parts.join(",")
    }
}

/// Union of `branches`, merged by repeatedly advancing whichever branch
/// currently holds the smallest unreturned candidate (§4.3 "cost-ordered
/// subcheck": branches should already be ordered cheapest-first by the
/// planner before construction). Duplicate members across branches are
/// suppressed by skipping any candidate equal to the last value returned.
#[derive(Debug)]
pub struct OrIter {
    branches: Vec<Box<dyn GraphIterator>>,
    heads: Vec<Option<Id>>,
    direction: Direction,
    last_returned: Option<Id>,
}

impl OrIter {
    pub fn new(branches: Vec<Box<dyn GraphIterator>>) -> OrIter {
        let direction = branches.first().map(|b| b.direction()).unwrap_or(Direction::Forward);
        let heads = vec![None; branches.len()];
        OrIter { branches, heads, direction, last_returned: None }
    }

    fn fill_heads(&mut self, budget: &mut Budget) -> Result<Option<()>> {
        for (i, head) in self.heads.iter_mut().enumerate() {
            if head.is_none() {
                match self.branches[i].next(budget)? {
                    Outcome::Value(v) => *head = Some(v),
                    Outcome::Done => {}
                    Outcome::NeedsMore => return Ok(None),
                }
            }
        }
        Ok(Some(()))
    }

    fn pick_best(&self) -> Option<usize> {
        let better = |a: Id, b: Id| match self.direction {
            Direction::Forward => a < b,
            Direction::Reverse => a > b,
        };
        let mut best: Option<(usize, Id)> = None;
        for (i, head) in self.heads.iter().enumerate() {
            if let Some(v) = head {
                best = match best {
                    None => Some((i, *v)),
                    Some((_, bv)) if better(*v, bv) => Some((i, *v)),
                    Some(prev) => Some(prev),
                };
            }
        }
        best.map(|(i, _)| i)
    }
}

impl GraphIterator for OrIter {
    fn type_prefix(&self) -> &'static str {
        "or"
    }

    fn next(&mut self, budget: &mut Budget) -> Result<Outcome<Id>> {
        loop {
            if !budget.charge(cost::NEXT_COMPOSITE) {
                return Ok(Outcome::NeedsMore);
            }
            if self.fill_heads(budget)?.is_none() {
                return Ok(Outcome::NeedsMore);
            }
            match self.pick_best() {
                None => return Ok(Outcome::Done),
                Some(i) => {
                    let v = self.heads[i].take().unwrap();
                    if self.last_returned == Some(v) {
                        continue;
                    }
                    self.last_returned = Some(v);
                    return Ok(Outcome::Value(v));
                }
            }
        }
    }

    fn find(&mut self, budget: &mut Budget, id: Id) -> Result<Outcome<Id>> {
        for (i, branch) in self.branches.iter_mut().enumerate() {
            match branch.find(budget, id)? {
                Outcome::Value(v) => self.heads[i] = Some(v),
                Outcome::Done => self.heads[i] = None,
                Outcome::NeedsMore => return Ok(Outcome::NeedsMore),
            }
        }
        match self.pick_best() {
            None => Ok(Outcome::Done),
            Some(i) => {
                let v = self.heads[i].take().unwrap();
                self.last_returned = Some(v);
                Ok(Outcome::Value(v))
            }
        }
    }

    fn check(&mut self, budget: &mut Budget, id: Id) -> Result<CheckOutcome> {
        let mut any_needs_more = false;
        for branch in self.branches.iter_mut() {
            match branch.check(budget, id)? {
                CheckOutcome::Yes => return Ok(CheckOutcome::Yes),
                CheckOutcome::No => {}
                CheckOutcome::NeedsMore => any_needs_more = true,
            }
        }
        Ok(if any_needs_more { CheckOutcome::NeedsMore } else { CheckOutcome::No })
    }

    fn stats(&self) -> Stats {
        Stats {
            cardinality: self.branches.iter().map(|b| b.stats().cardinality.unwrap_or(0)).sum::<u64>().into(),
            next_cost: cost::NEXT_COMPOSITE * self.branches.len().max(1) as i64,
            find_cost: self.branches.iter().map(|b| b.stats().find_cost).sum(),
            check_cost: self.branches.iter().map(|b| b.stats().check_cost).sum(),
            sorted: true,
            direction: self.direction,
        }
    }

    fn direction(&self) -> Direction {
        self.direction
    }

    fn clone_box(&self) -> Box<dyn GraphIterator> {
        Box::new(OrIter {
            branches: self.branches.iter().map(|b| b.clone_box()).collect(),
            heads: self.heads.clone(),
            direction: self.direction,
            last_returned: self.last_returned,
        })
    }

    fn reset(&mut self) {
        for b in self.branches.iter_mut() {
            b.reset();
        }
        self.heads.iter_mut().for_each(|h| *h = None);
        self.last_returned = None;
    }

    fn beyond(&self, id: Id) -> bool {
        self.branches.iter().all(|b| b.beyond(id))
    }

    fn freeze(&self, which: FreezeWhich) -> String {
        self.branches.iter().map(|b| b.freeze(which)).collect::<Vec<_>>().join("|")
    }
}

/// Set difference: yields members of `base` not accepted by `exclude`.
#[derive(Debug)]
pub struct WithoutIter {
    base: Box<dyn GraphIterator>,
    exclude: Box<dyn GraphIterator>,
}

impl WithoutIter {
    pub fn new(base: Box<dyn GraphIterator>, exclude: Box<dyn GraphIterator>) -> WithoutIter {
        WithoutIter { base, exclude }
    }
}

impl GraphIterator for WithoutIter {
    fn type_prefix(&self) -> &'static str {
        "without"
    }

    fn next(&mut self, budget: &mut Budget) -> Result<Outcome<Id>> {
        loop {
            if !budget.charge(cost::NEXT_COMPOSITE) {
                return Ok(Outcome::NeedsMore);
            }
            match self.base.next(budget)? {
                Outcome::Done => return Ok(Outcome::Done),
                Outcome::NeedsMore => return Ok(Outcome::NeedsMore),
                Outcome::Value(v) => match self.exclude.check(budget, v)? {
                    CheckOutcome::No => return Ok(Outcome::Value(v)),
                    CheckOutcome::Yes => continue,
                    CheckOutcome::NeedsMore => return Ok(Outcome::NeedsMore),
                },
            }
        }
    }

    fn find(&mut self, budget: &mut Budget, id: Id) -> Result<Outcome<Id>> {
        match self.base.find(budget, id)? {
            Outcome::Value(v) => match self.exclude.check(budget, v)? {
                CheckOutcome::No => Ok(Outcome::Value(v)),
                CheckOutcome::Yes => self.next(budget),
                CheckOutcome::NeedsMore => Ok(Outcome::NeedsMore),
            },
            other => Ok(other),
        }
    }

    fn check(&mut self, budget: &mut Budget, id: Id) -> Result<CheckOutcome> {
        match self.base.check(budget, id)? {
            CheckOutcome::Yes => match self.exclude.check(budget, id)? {
                CheckOutcome::Yes => Ok(CheckOutcome::No),
                CheckOutcome::No => Ok(CheckOutcome::Yes),
                CheckOutcome::NeedsMore => Ok(CheckOutcome::NeedsMore),
            },
            other => Ok(other),
        }
    }

    fn stats(&self) -> Stats {
        self.base.stats()
    }

    fn direction(&self) -> Direction {
        self.base.direction()
    }

    fn clone_box(&self) -> Box<dyn GraphIterator> {
        Box::new(WithoutIter { base: self.base.clone_box(), exclude: self.exclude.clone_box() })
    }

    fn reset(&mut self) {
        self.base.reset();
        self.exclude.reset();
    }

    fn beyond(&self, id: Id) -> bool {
        self.base.beyond(id)
    }

    fn freeze(&self, which: FreezeWhich) -> String {
        format!("{}-{}", self.base.freeze(which), self.exclude.freeze(which))
    }
}

/// Reorders `inner`'s full output by an externally supplied key, paying
/// the cost up front on first `next`/`find` call (§3.7 "sort": breaks
/// laziness deliberately, one full materialization per request).
pub struct SortIter {
    inner: Option<Box<dyn GraphIterator>>,
    key_fn: std::sync::Arc<dyn Fn(Id) -> Vec<u8> + Send + Sync>,
    direction: Direction,
    materialized: Option<super::SortedIdIter>,
}

impl std::fmt::Debug for SortIter {
    fn fmt(&self, f: &mut std::fmt::Formatter) -> std::fmt::Result {
        f.debug_struct("SortIter").field("materialized", &self.materialized.is_some()).finish()
    }
}

impl SortIter {
    pub fn new(inner: Box<dyn GraphIterator>, direction: Direction, key_fn: std::sync::Arc<dyn Fn(Id) -> Vec<u8> + Send + Sync>) -> SortIter {
        SortIter { inner: Some(inner), key_fn, direction, materialized: None }
    }

    fn ensure_materialized(&mut self, budget: &mut Budget) -> Result<bool> {
        if self.materialized.is_some() {
            return Ok(true);
        }
        let inner = self.inner.as_mut().expect("materialize called once");
        let mut values = Vec::new();
        loop {
            match inner.next(budget)? {
                Outcome::Value(v) => values.push(v),
                Outcome::Done => break,
                Outcome::NeedsMore => return Ok(false),
            }
        }
        let key_fn = std::sync::Arc::clone(&self.key_fn);
        values.sort_by_key(|v| key_fn(*v));
        let label = super::freeze_ids(&values);
        self.materialized = Some(super::SortedIdIter::new(super::SortedKind::Fixed, label, values, self.direction));
        Ok(true)
    }
}

impl GraphIterator for SortIter {
    fn type_prefix(&self) -> &'static str {
        "sort"
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
            Some(m) => Box::new(SortIter {
                inner: None,
                key_fn: std::sync::Arc::clone(&self.key_fn),
                direction: self.direction,
                materialized: Some(m.clone()),
            }),
            None => panic!("cannot clone an un-materialized sort iterator"),
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
#[path = "combinators_test.rs"]
mod combinators_test;
