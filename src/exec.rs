//! Execution runloop (§4.6): drives a constraint's compiled iterator
//! pipeline to a page boundary or suspension, binds matched primitive
//! fields into result values, and accumulates the `cost=`/`heatmap=`
//! reply modifiers (§4.7) plus the read-suspend pressure signal (§5).

use std::collections::{HashSet, VecDeque};
use std::sync::Arc;

use crate::{
    budget::{cost, Budget},
    constraint::{Constraint, OrBranch},
    guid::Id,
    iter::{CheckOutcome, Direction, FreezeWhich, GraphIterator, Outcome, Stats},
    pattern::PrimitiveField,
    plan::{build_pattern_frame, compile, Collaborators, FrameKind, PatternFrame},
    primitive::{Linkage, Primitive, PrimitiveStore},
    value::Value,
    Guid, Result,
};

/// Rolling read-suspend pressure (§5): one sample per minute, combined
/// with exponential decay so recent minutes dominate the signal. The
/// caller drives the clock explicitly (`sample` is called once per
/// minute boundary) rather than this type reading a wall clock, so it
/// stays deterministic and test-friendly.
pub struct SuspendPressure {
    window_minutes: usize,
    decay: f64,
    samples: VecDeque<u64>,
}

impl SuspendPressure {
    pub fn new(window_minutes: usize, decay: f64) -> SuspendPressure {
        SuspendPressure { window_minutes, decay, samples: VecDeque::with_capacity(window_minutes) }
    }

    pub fn sample(&mut self, suspends_this_minute: u64) {
        self.samples.push_back(suspends_this_minute);
        while self.samples.len() > self.window_minutes {
            self.samples.pop_front();
        }
    }

    /// Exponentially weighted pressure: the most recently pushed sample
    /// carries weight 1, the one before it `decay`, the one before that
    /// `decay^2`, and so on.
    pub fn pressure(&self) -> f64 {
        let mut weight = 1.0;
        let mut total = 0.0;
        let mut weight_sum = 0.0;
        for sample in self.samples.iter().rev() {
            total += *sample as f64 * weight;
            weight_sum += weight;
            weight *= self.decay;
        }
        if weight_sum == 0.0 {
            0.0
        } else {
            total / weight_sum
        }
    }
}

/// Per-request stats accumulator rendered as the `cost="..."` reply
/// modifier (§4.7). Field names match the documented abbreviations.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct Cost {
    pub tu: u64, // budget units spent
    pub ts: u64, // statistics calls
    pub tr: u64, // tile reads
    pub te: u64, // tile evictions
    pub pr: u64, // primitives read
    pub pf: u64, // pattern-frames completed
    pub dw: u64, // disk writes
    pub dr: u64, // disk reads
    pub iw: u64, // index writes
    pub ir: u64, // index reads
    pub in_: u64, // index nodes visited
    pub va: u64, // variable-analysis steps run
}

impl Cost {
    pub fn render(&self) -> String {
        format!(
            "tu={} ts={} tr={} te={} pr={} pf={} dw={} dr={} in={} ir={} iw={} va={}",
            self.tu, self.ts, self.tr, self.te, self.pr, self.pf, self.dw, self.dr, self.in_, self.ir, self.iw, self.va
        )
    }
}

/// Planner trace rendered as `heatmap="..."` (§4.7): which iterator
/// variant was chosen per constraint, in planning order.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct Heatmap {
    entries: Vec<String>,
}

impl Heatmap {
    pub fn new() -> Heatmap {
        Heatmap::default()
    }

    pub fn record(&mut self, constraint_label: &str, iterator_shape: &str) {
        self.entries.push(format!("{}:{}", constraint_label, iterator_shape));
    }

    pub fn contains_shape(&self, shape: &str) -> bool {
        self.entries.iter().any(|e| e.ends_with(&format!(":{}", shape)))
    }

    pub fn render(&self) -> String {
        self.entries.join(",")
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum RunOutcome {
    /// Producer exhausted; nothing more to return at this level.
    Complete,
    /// Page limit reached before exhaustion; a cursor must be frozen.
    PageFull,
    /// Budget ran out mid-scan; a cursor must be frozen.
    Suspended,
}

/// Drives the §4.6 algorithm for one constraint level: pop a candidate
/// from the producer, reject it via `checkers`, remember rejects in a
/// bad-id cache so a re-`find` does not re-pay their `check` cost, and
/// stop at `page_size` accepted ids.
pub struct ConstraintRunner<'a> {
    producer: &'a mut dyn GraphIterator,
    checkers: &'a mut [Box<dyn GraphIterator>],
    bad_ids: HashSet<Id>,
    page_size: usize,
    pub results: Vec<Id>,
}

impl<'a> ConstraintRunner<'a> {
    pub fn new(producer: &'a mut dyn GraphIterator, checkers: &'a mut [Box<dyn GraphIterator>], page_size: usize) -> ConstraintRunner<'a> {
        ConstraintRunner { producer, checkers, bad_ids: HashSet::new(), page_size, results: Vec::new() }
    }

    pub fn run(&mut self, budget: &mut Budget, cost: &mut Cost) -> Result<RunOutcome> {
        loop {
            if self.results.len() >= self.page_size {
                return Ok(RunOutcome::PageFull);
            }
            cost.tu += 1;
            let id = match self.producer.next(budget)? {
                Outcome::Value(v) => v,
                Outcome::Done => return Ok(RunOutcome::Complete),
                Outcome::NeedsMore => {
                    log::debug!("constraint suspended on producer {} after {} accepted", self.producer.type_prefix(), self.results.len());
                    return Ok(RunOutcome::Suspended);
                }
            };
            if self.bad_ids.contains(&id) {
                continue;
            }
            let mut accepted = true;
            for checker in self.checkers.iter_mut() {
                match checker.check(budget, id)? {
                    CheckOutcome::Yes => {}
                    CheckOutcome::No => {
                        accepted = false;
                        self.bad_ids.insert(id);
                        break;
                    }
                    CheckOutcome::NeedsMore => {
                        log::debug!("constraint suspended on checker {} at id {}", checker.type_prefix(), id);
                        return Ok(RunOutcome::Suspended);
                    }
                }
            }
            if accepted {
                cost.pr += 1;
                self.results.push(id);
            }
        }
    }

    /// §4.6's suspend-triggered "freeze everything" walk: every live
    /// iterator (the producer plus every checker) contributes to the
    /// frozen cursor, combined the same way [crate::iter::AndIter] joins
    /// its own sub-iterators' freeze output.
    pub fn freeze(&self) -> String {
        let collect = |which: FreezeWhich| {
            let mut parts = vec![self.producer.freeze(which)];
            parts.extend(self.checkers.iter().map(|c| c.freeze(which)));
            parts.join(",")
        };
        format!("{}/{}/{}", collect(FreezeWhich::Set), collect(FreezeWhich::Position), collect(FreezeWhich::State))
    }
}

/// One `A | B` alternative, each side already compiled to a full iterator
/// tree (§4.4's or-groups, §4.6's "active or-branch bitmap" collapsed to a
/// per-id membership test against each alternative).
struct OrFeasibilityGroup {
    head: Box<dyn GraphIterator>,
    tail: Option<Box<dyn GraphIterator>>,
}

/// Checker that accepts an id only when every [OrBranch] group has at
/// least one alternative (`head` or `tail`) matching it. Never a producer
/// candidate — it only ever appears in [ConstraintRunner]'s checker list —
/// but [GraphIterator] requires a full-scan `next`/`find` regardless, so it
/// follows the same scan-the-store idiom as [crate::iter::ConstraintGuard].
pub struct OrFeasibilityChecker {
    store: Arc<PrimitiveStore>,
    groups: Vec<OrFeasibilityGroup>,
    cursor: Id,
}

impl std::fmt::Debug for OrFeasibilityChecker {
    fn fmt(&self, f: &mut std::fmt::Formatter) -> std::fmt::Result {
        f.debug_struct("OrFeasibilityChecker").field("groups", &self.groups.len()).field("cursor", &self.cursor).finish()
    }
}

impl OrFeasibilityChecker {
    pub fn new(or_branches: &[OrBranch], collab: &Collaborators) -> Result<OrFeasibilityChecker> {
        let mut groups = Vec::with_capacity(or_branches.len());
        for group in or_branches {
            let head = compile(&group.head, collab)?;
            let tail = match &group.tail {
                Some(t) => Some(compile(t, collab)?),
                None => None,
            };
            groups.push(OrFeasibilityGroup { head, tail });
        }
        Ok(OrFeasibilityChecker { store: Arc::clone(&collab.store), groups, cursor: 0 })
    }

    fn matches(&mut self, budget: &mut Budget, id: Id) -> Result<CheckOutcome> {
        for group in self.groups.iter_mut() {
            match group.head.check(budget, id)? {
                CheckOutcome::Yes => continue,
                CheckOutcome::NeedsMore => return Ok(CheckOutcome::NeedsMore),
                CheckOutcome::No => match group.tail.as_mut() {
                    Some(tail) => match tail.check(budget, id)? {
                        CheckOutcome::Yes => continue,
                        CheckOutcome::NeedsMore => return Ok(CheckOutcome::NeedsMore),
                        CheckOutcome::No => return Ok(CheckOutcome::No),
                    },
                    None => return Ok(CheckOutcome::No),
                },
            }
        }
        Ok(CheckOutcome::Yes)
    }
}

impl GraphIterator for OrFeasibilityChecker {
    fn type_prefix(&self) -> &'static str {
        "or"
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
            match self.matches(budget, id)? {
                CheckOutcome::Yes => return Ok(Outcome::Value(id)),
                CheckOutcome::No => continue,
                CheckOutcome::NeedsMore => return Ok(Outcome::NeedsMore),
            }
        }
    }

    fn find(&mut self, budget: &mut Budget, id: Id) -> Result<Outcome<Id>> {
        self.cursor = self.cursor.max(id);
        self.next(budget)
    }

    fn check(&mut self, budget: &mut Budget, id: Id) -> Result<CheckOutcome> {
        if id >= self.store.high_id() {
            return Ok(CheckOutcome::No);
        }
        self.matches(budget, id)
    }

    fn stats(&self) -> Stats {
        Stats {
            cardinality: None,
            next_cost: self.store.high_id() as i64 * cost::CHECK_ARRAY,
            find_cost: self.store.high_id() as i64 * cost::CHECK_ARRAY,
            check_cost: cost::CHECK_ARRAY * self.groups.len().max(1) as i64,
            sorted: true,
            direction: Direction::Forward,
        }
    }

    fn direction(&self) -> Direction {
        Direction::Forward
    }

    fn clone_box(&self) -> Box<dyn GraphIterator> {
        Box::new(OrFeasibilityChecker {
            store: Arc::clone(&self.store),
            groups: self
                .groups
                .iter()
                .map(|g| OrFeasibilityGroup { head: g.head.clone_box(), tail: g.tail.as_ref().map(|t| t.clone_box()) })
                .collect(),
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
            FreezeWhich::Set => "or-feasibility".to_string(),
            FreezeWhich::Position => self.cursor.to_string(),
            FreezeWhich::State => String::new(),
        }
    }
}

/// §4.6 "subrequest seeding": collapse `child`'s candidate set, for one
/// already-accepted `parent_id`, to the single GMAP entry (or the single
/// linkage-field read) relating it to the parent, then filter those
/// candidates through the child's own fully compiled iterator. `Ok(None)`
/// signals a mid-scan suspend.
fn children_of(parent_id: Id, child: &Constraint, compiled_child: &mut dyn GraphIterator, collab: &Collaborators, budget: &mut Budget) -> Result<Option<Vec<Id>>> {
    let linkage = match child.linkage {
        Some(l) => l,
        None => return Ok(Some(Vec::new())),
    };
    let mut candidates: Vec<Id> = if linkage.forward {
        collab.gmap_for(linkage.field).get(parent_id).iter_forward().collect()
    } else {
        match collab.store.get(parent_id)?.linkage(linkage.field) {
            Some(guid) => collab.guids.id_of(&guid).map(|id| vec![id]).unwrap_or_default(),
            None => Vec::new(),
        }
    };
    candidates.sort_unstable();
    candidates.dedup();
    let mut out = Vec::with_capacity(candidates.len());
    for cand in candidates {
        match compiled_child.check(budget, cand)? {
            CheckOutcome::Yes => out.push(cand),
            CheckOutcome::No => {}
            CheckOutcome::NeedsMore => return Ok(None),
        }
    }
    Ok(Some(out))
}

/// A bare `contents` aggregate (§4.7): every one of `c`'s declared
/// [Constraint::children], seeded from `id` via [children_of], unioned
/// into one list of guids. `Ok(None)` signals a mid-scan suspend.
fn bind_contents(c: &Constraint, id: Id, child_iters: &mut [Box<dyn GraphIterator>], collab: &Collaborators, budget: &mut Budget) -> Result<Option<Value>> {
    let mut all = Vec::new();
    for (idx, child) in c.children.iter().enumerate() {
        let matches = match children_of(id, child, child_iters[idx].as_mut(), collab, budget)? {
            Some(ids) => ids,
            None => return Ok(None),
        };
        for nested_id in matches {
            all.push(Value::Guid(collab.store.get(nested_id)?.guid));
        }
    }
    Ok(Some(Value::List(all)))
}

/// Recursively bind one matched primitive's result tree (§4.6: "bind
/// primitive fields into pattern-frame for id ... collect sub-results as
/// list / contents"). Per-primitive fields delegate to
/// [bind_primitive_fields]; a bare `PerSet` leaf with no inner fields is a
/// `contents` aggregate, delegated to [bind_contents]. `Ok(None)` signals a
/// mid-scan suspend.
fn bind_constraint_result(
    c: &Constraint,
    id: Id,
    frame: &PatternFrame,
    child_iters: &mut [Box<dyn GraphIterator>],
    collab: &Collaborators,
    budget: &mut Budget,
) -> Result<Option<Value>> {
    if !frame.fields.is_empty() {
        return Ok(Some(bind_primitive_fields(&collab.store, id, frame)?));
    }
    if frame.kind == FrameKind::PerSet && frame.children.is_empty() {
        return bind_contents(c, id, child_iters, collab, budget);
    }
    let mut out = Vec::with_capacity(frame.children.len());
    for child_frame in &frame.children {
        match bind_constraint_result(c, id, child_frame, child_iters, collab, budget)? {
            Some(v) => out.push(v),
            None => return Ok(None),
        }
    }
    Ok(Some(Value::List(out)))
}

/// Result of driving one constraint level to completion/page/suspend
/// (§4.6/§4.7): the accepted-id outcome, the bound result values in order,
/// and a cursor to resume from when not [RunOutcome::Complete].
pub struct ConstraintResult {
    pub outcome: RunOutcome,
    pub values: Vec<Value>,
    pub cursor: Option<String>,
}

/// Drive one constraint through the full §4.6 runloop: plan (`compile`),
/// apply the or-branch feasibility checker and the sort wrapper, pull a
/// page of accepted ids via [ConstraintRunner], then recursively bind each
/// one's result tree through its declared `children` (§4.6's "subrequest
/// seeding" — each child's candidate set is collapsed to the single GMAP
/// entry or linkage-field read relating it to the accepted id before being
/// checked against the child's own compiled iterator).
pub fn run_constraint(c: &Constraint, collab: &Collaborators, page_size: usize, budget: &mut Budget, cost: &mut Cost, heatmap: &mut Heatmap, label: &str) -> Result<ConstraintResult> {
    let producer = compile(c, collab)?;
    heatmap.record(label, producer.type_prefix());
    let direction = producer.direction();
    let mut producer = crate::plan::maybe_wrap_sort(producer, c, &collab.store, direction);

    let mut extra_checkers: Vec<Box<dyn GraphIterator>> = Vec::new();
    if !c.or_branches.is_empty() {
        extra_checkers.push(Box::new(OrFeasibilityChecker::new(&c.or_branches, collab)?));
    }

    let (outcome, accepted, cursor) = {
        let mut runner = ConstraintRunner::new(producer.as_mut(), &mut extra_checkers, page_size);
        let outcome = runner.run(budget, cost)?;
        let cursor = match outcome {
            RunOutcome::Complete => None,
            _ => Some(runner.freeze()),
        };
        (outcome, runner.results.clone(), cursor)
    };

    let mut values = Vec::with_capacity(accepted.len());
    if let Some(pattern) = &c.result_pattern {
        let frame = build_pattern_frame(pattern);
        let mut child_iters: Vec<Box<dyn GraphIterator>> = c.children.iter().map(|child| compile(child, collab)).collect::<Result<Vec<_>>>()?;
        for id in accepted {
            match bind_constraint_result(c, id, &frame, &mut child_iters, collab, budget)? {
                Some(v) => {
                    values.push(v);
                    cost.pf += 1;
                }
                None => {
                    let cursor = Some(format!("partial:{}", values.len()));
                    return Ok(ConstraintResult { outcome: RunOutcome::Suspended, values, cursor });
                }
            }
        }
    }

    Ok(ConstraintResult { outcome, values, cursor })
}

/// Byte-comparable key for one primitive field, used by
/// [crate::plan::maybe_wrap_sort]'s `sort` wrapper. A one-byte type tag
/// keeps keys comparable across the different [Value] variants a field can
/// produce (e.g. [Value::Null] sorts before everything).
pub fn sort_key_bytes(p: &Primitive, field: PrimitiveField) -> Vec<u8> {
    match field_value(p, field) {
        Value::Null => vec![0],
        Value::Boolean(b) => vec![1, b as u8],
        Value::Number(n) => {
            let mut key = vec![2];
            key.extend_from_slice(&n.to_be_bytes());
            key
        }
        Value::String(s) => {
            let mut key = vec![3];
            key.extend_from_slice(&s);
            key
        }
        Value::Atom(s) => {
            let mut key = vec![4];
            key.extend_from_slice(s.as_bytes());
            key
        }
        Value::Guid(g) => {
            let mut key = vec![5];
            key.extend_from_slice(&g.as_u128().to_be_bytes());
            key
        }
        Value::Datatype(d) => vec![6, d],
        Value::Timestamp(t) => {
            let mut key = vec![7];
            key.extend_from_slice(&t.to_be_bytes());
            key
        }
        Value::List(_) | Value::Sequence(_) | Value::Records { .. } | Value::Deferred(_) => vec![8],
    }
}

/// Materialize a [PatternFrame] against one primitive, producing the
/// result value tree the formatter consumes (§4.7). `PerSet` frames are
/// not resolvable from a single primitive; the caller is expected to have
/// already reduced those (count, contents, ...) before calling this.
pub fn bind_primitive_fields(store: &PrimitiveStore, id: Id, frame: &PatternFrame) -> Result<Value> {
    if !frame.fields.is_empty() {
        let p = store.get(id)?;
        let field = frame.fields[0];
        return Ok(field_value(p, field));
    }
    let mut out = Vec::with_capacity(frame.children.len());
    for child in &frame.children {
        out.push(match child.kind {
            FrameKind::PerPrimitive => bind_primitive_fields(store, id, child)?,
            FrameKind::PerSet => Value::Null,
        });
    }
    Ok(Value::List(out))
}

fn guid_or_null(g: Option<Guid>) -> Value {
    g.map(Value::Guid).unwrap_or(Value::Null)
}

fn field_value(p: &crate::primitive::Primitive, field: PrimitiveField) -> Value {
    match field {
        PrimitiveField::Guid => Value::Guid(p.guid),
        PrimitiveField::Name => p.name.clone().map(Value::String).unwrap_or(Value::Null),
        PrimitiveField::Value => p.value.clone().map(Value::String).unwrap_or(Value::Null),
        PrimitiveField::Type => guid_or_null(p.typeguid),
        PrimitiveField::Typeguid => guid_or_null(p.typeguid),
        PrimitiveField::Left => guid_or_null(p.linkage(Linkage::Left)),
        PrimitiveField::Right => guid_or_null(p.linkage(Linkage::Right)),
        PrimitiveField::Scope => guid_or_null(p.linkage(Linkage::Scope)),
        PrimitiveField::Live => Value::Boolean(p.live),
        PrimitiveField::Archival => Value::Boolean(p.archival),
        PrimitiveField::Datatype => Value::Datatype(p.valuetype),
        PrimitiveField::Valuetype => Value::Datatype(p.valuetype),
        PrimitiveField::Timestamp => Value::Timestamp(p.timestamp),
        PrimitiveField::Generation => Value::Number(p.generation as f64),
        PrimitiveField::Next => Value::Null,
        PrimitiveField::Previous => guid_or_null(p.previous_guid),
        PrimitiveField::Meta => Value::Atom(if p.txstart { "txstart".into() } else { "node".into() }),
    }
}

#[cfg(test)]
#[path = "exec_test.rs"]
mod exec_test;
