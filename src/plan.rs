//! Variable analysis (§4.5) and the cost-based iterator planning
//! discipline (§4.3's planning steps, as distinct from the iterator
//! mechanics in [crate::iter]).
//!
//! The eleven-step pipeline is implemented as eleven focused functions
//! rather than one monolith, each named after its step number, so a
//! caller (or a test) can run a single step in isolation.

use std::collections::{HashMap, HashSet, VecDeque};
use std::sync::Arc;

use crate::{
    budget::Budget,
    constraint::{AtomicField, AtomicPredicate, AtomicValue, CompareOp, Constraint},
    err_at,
    gmap::Gmap,
    guid::{GuidMap, Id},
    hmap::Hmap,
    iter::{
        AndIter, AtomicChecker, ConstraintGuard, Direction, GraphIterator, IsaIter, LinksToIter, Outcome, SortIter,
        SortedIdIter, SortedKind,
    },
    pattern::{Pattern, PatternKind},
    primitive::{Linkage, PrimitiveStore},
    variable::VariableTable,
    Guid, Result,
};

/// Step 2: if a constraint's own result pattern is absent (no `contents`
/// requested by its parent), its children's result patterns are cleared
/// too, transitively.
pub fn remove_unused_results(c: &mut Constraint, parent_wants_contents: bool) {
    if !parent_wants_contents {
        c.result_pattern = None;
    }
    let wants_children_contents = c.result_pattern.as_ref().map(pattern_has_contents).unwrap_or(false);
    for child in c.children.iter_mut() {
        remove_unused_results(child, wants_children_contents);
    }
}

fn pattern_has_contents(p: &Pattern) -> bool {
    match &p.kind {
        PatternKind::Aggregate(crate::pattern::Aggregate::Contents) => true,
        PatternKind::List(items) | PatternKind::Pick(items) => items.iter().any(pattern_has_contents),
        _ => false,
    }
}

/// Step 3: a constraint's `sort=` is only meaningful if the result is
/// sort-dependent (its pattern samples, or an ancestor's aggregate needs
/// an order); otherwise drop it.
pub fn remove_unused_sorts(c: &mut Constraint) {
    let sort_dependent = c
        .result_pattern
        .as_ref()
        .map(|p| pattern_is_sort_dependent(p))
        .unwrap_or(false);
    if !sort_dependent {
        c.sort_pattern = None;
    }
    for child in c.children.iter_mut() {
        remove_unused_sorts(child);
    }
}

fn pattern_is_sort_dependent(p: &Pattern) -> bool {
    if p.sample {
        return true;
    }
    match &p.kind {
        PatternKind::List(items) | PatternKind::Pick(items) => items.iter().any(pattern_is_sort_dependent),
        _ => false,
    }
}

/// Step 4/6: resolve `$x` references where an assignment reads `$x = $y`
/// down to `$y`, to the fixpoint (run twice per the pipeline: once before
/// sort-root marking, once after, since that step can introduce new
/// aliases).
pub fn resolve_aliases(c: &mut Constraint, vars: &mut VariableTable) {
    loop {
        let mut changed = false;
        for (lhs, pattern) in c.assignments.iter() {
            if let PatternKind::Variable(rhs_name) = &pattern.kind {
                if let Some(rhs_id) = vars.resolve(rhs_name) {
                    if rhs_id != *lhs {
                        if let Some(lhs_var) = vars.get(*lhs) {
                            let lhs_name = lhs_var.name.clone();
                            if vars.resolve(&lhs_name) != Some(rhs_id) {
                                vars.alias(&lhs_name, rhs_id);
                                changed = true;
                            }
                        }
                    }
                }
            }
        }
        if !changed {
            break;
        }
    }
    for child in c.children.iter_mut() {
        resolve_aliases(child, vars);
    }
}

/// Step 5: mark the constraint whose ordering determines an outer
/// result's order. A constraint is a sort root if it carries its own
/// `sort=` and no ancestor already claimed the role.
pub fn mark_sort_roots(c: &mut Constraint, ancestor_has_root: bool) {
    let is_root = !ancestor_has_root && c.sort_pattern.is_some();
    c.sort_root = is_root;
    let propagate = ancestor_has_root || is_root;
    for child in c.children.iter_mut() {
        mark_sort_roots(child, propagate);
    }
}

/// Step 7: validate the pattern-depth rule on every pattern this
/// constraint carries.
pub fn validate_patterns(c: &Constraint) -> Result<()> {
    if let Some(p) = &c.result_pattern {
        p.validate()?;
    }
    if let Some(p) = &c.sort_pattern {
        p.validate()?;
    }
    for (_, p) in &c.assignments {
        p.validate()?;
    }
    for child in &c.children {
        validate_patterns(child)?;
    }
    Ok(())
}

/// Step 8: repeatedly sweep zero-linkcount declarations until a pass
/// removes nothing.
pub fn remove_unused_declarations(vars: &mut VariableTable) {
    loop {
        if vars.sweep_dead().is_empty() {
            break;
        }
    }
}

/// Step 9: order `assignments` so that a variable referenced inside
/// another assignment's pattern is bound first (Kahn's algorithm; a cycle
/// is a semantic error, since assignments have no legitimate circular
/// dependency).
pub fn topologically_sort_assignments(
    assignments: Vec<(crate::variable::VariableId, Pattern)>,
    vars: &VariableTable,
) -> Result<Vec<(crate::variable::VariableId, Pattern)>> {
    let index_of: HashMap<crate::variable::VariableId, usize> =
        assignments.iter().enumerate().map(|(i, (id, _))| (*id, i)).collect();
    let mut indegree = vec![0usize; assignments.len()];
    let mut edges: Vec<Vec<usize>> = vec![Vec::new(); assignments.len()];
    for (i, (_, pattern)) in assignments.iter().enumerate() {
        for name in referenced_variable_names(pattern) {
            if let Some(dep_id) = vars.resolve(&name) {
                if let Some(&dep_idx) = index_of.get(&dep_id) {
                    edges[dep_idx].push(i);
                    indegree[i] += 1;
                }
            }
        }
    }
    let mut queue: VecDeque<usize> = (0..assignments.len()).filter(|&i| indegree[i] == 0).collect();
    let mut order = Vec::with_capacity(assignments.len());
    while let Some(i) = queue.pop_front() {
        order.push(i);
        for &next in &edges[i] {
            indegree[next] -= 1;
            if indegree[next] == 0 {
                queue.push_back(next);
            }
        }
    }
    if order.len() != assignments.len() {
        return err_at!(Semantics, msg: "cyclic variable assignment dependency");
    }
    let mut assignments: Vec<Option<(crate::variable::VariableId, Pattern)>> = assignments.into_iter().map(Some).collect();
    Ok(order.into_iter().map(|i| assignments[i].take().unwrap()).collect())
}

fn referenced_variable_names(p: &Pattern) -> HashSet<String> {
    let mut names = HashSet::new();
    collect_variable_names(p, &mut names);
    names
}

fn collect_variable_names(p: &Pattern, out: &mut HashSet<String>) {
    match &p.kind {
        PatternKind::Variable(name) => {
            out.insert(name.clone());
        }
        PatternKind::List(items) | PatternKind::Pick(items) => {
            for item in items {
                collect_variable_names(item, out);
            }
        }
        _ => {}
    }
}

/// Step 10: precompute how to materialize one constraint's output.
/// `PerPrimitive` ("pf_one") extracts fields off a single matched
/// primitive; `PerSet` ("pf_set") aggregates across every primitive that
/// matched this constraint.
#[derive(Clone, Debug, PartialEq)]
pub enum FrameKind {
    PerPrimitive,
    PerSet,
}

#[derive(Clone, Debug, PartialEq)]
pub struct PatternFrame {
    pub kind: FrameKind,
    pub fields: Vec<crate::pattern::PrimitiveField>,
    pub children: Vec<PatternFrame>,
}

pub fn build_pattern_frame(p: &Pattern) -> PatternFrame {
    match &p.kind {
        PatternKind::Field(f) => PatternFrame { kind: FrameKind::PerPrimitive, fields: vec![*f], children: Vec::new() },
        PatternKind::Aggregate(_) => PatternFrame { kind: FrameKind::PerSet, fields: Vec::new(), children: Vec::new() },
        PatternKind::List(items) | PatternKind::Pick(items) => {
            let children: Vec<PatternFrame> = items.iter().map(build_pattern_frame).collect();
            let kind = if children.iter().any(|c| c.kind == FrameKind::PerSet) { FrameKind::PerSet } else { FrameKind::PerPrimitive };
            PatternFrame { kind, fields: Vec::new(), children }
        }
        _ => PatternFrame { kind: FrameKind::PerPrimitive, fields: Vec::new(), children: Vec::new() },
    }
}

/// Step 11: a constraint producing no per-primitive data cannot usefully
/// page, so its requested page size is clamped to 1.
pub fn remove_unused_page_size(c: &mut Constraint) {
    let frame = c.result_pattern.as_ref().map(build_pattern_frame);
    let produces_rows = matches!(frame, Some(f) if f.kind == FrameKind::PerPrimitive || !f.children.is_empty());
    if !produces_rows {
        c.page_size = Some(1);
    }
    for child in c.children.iter_mut() {
        remove_unused_page_size(child);
    }
}

/// Run the full pipeline once, in documented step order (steps 1 and 6 are folded
/// into the surrounding alias-resolution/sort-root calls since this
/// crate's arena-free tree has no separate "infer" pass to run first:
/// pass-through declarations are just ordinary Rust ownership here).
pub fn analyze(root: &mut Constraint, vars: &mut VariableTable) -> Result<()> {
    remove_unused_results(root, true);
    remove_unused_sorts(root);
    resolve_aliases(root, vars);
    mark_sort_roots(root, false);
    resolve_aliases(root, vars);
    validate_patterns(root)?;
    remove_unused_declarations(vars);
    remove_unused_page_size(root);
    Ok(())
}

/// §4.3 planning step 3: choose the cheapest sub-iterator as producer
/// (preferring sorted over unsorted, then smaller cardinality), returning
/// its index among `candidates`.
pub fn choose_producer(candidates: &[Box<dyn GraphIterator>]) -> Option<usize> {
    let chosen = candidates
        .iter()
        .enumerate()
        .min_by(|(_, a), (_, b)| {
            let (sa, sb) = (a.stats(), b.stats());
            let cost_a = sa.next_cost as i128 * sa.cardinality.unwrap_or(u64::MAX) as i128;
            let cost_b = sb.next_cost as i128 * sb.cardinality.unwrap_or(u64::MAX) as i128;
            cost_a
                .cmp(&cost_b)
                .then(sb.sorted.cmp(&sa.sorted))
                .then(sa.cardinality.unwrap_or(u64::MAX).cmp(&sb.cardinality.unwrap_or(u64::MAX)))
        })
        .map(|(i, _)| i);
    if let Some(i) = chosen {
        log::trace!("planner substituted producer: {} ({:?})", candidates[i].type_prefix(), candidates[i].stats());
    }
    chosen
}

/// §4.3 step 5: materialize small intersections directly instead of
/// planning a lazy `and`, when both inputs are already known arrays no
/// larger than `threshold`.
pub fn fast_path_intersect(a: &[crate::guid::Id], b: &[crate::guid::Id], threshold: usize) -> Option<Vec<crate::guid::Id>> {
    if a.len() <= threshold && b.len() <= threshold {
        Some(crate::iter::intersect_sorted(a, b))
    } else {
        None
    }
}

/// The read-only collaborators [compile] needs to turn atomic predicates
/// and linkage hops into real index lookups: the primitive store, the
/// guid/id bijection, one GMAP per [Linkage] field, and the name/value
/// HMAPs (§3.3/§3.4).
pub struct Collaborators {
    pub store: Arc<PrimitiveStore>,
    pub guids: Arc<GuidMap>,
    pub gmap_left: Arc<Gmap>,
    pub gmap_right: Arc<Gmap>,
    pub gmap_scope: Arc<Gmap>,
    pub gmap_typeguid: Arc<Gmap>,
    pub hmap_name: Arc<Hmap>,
    pub hmap_value: Arc<Hmap>,
    pub fast_intersect_max: usize,
}

impl Collaborators {
    pub(crate) fn gmap_for(&self, linkage: Linkage) -> &Gmap {
        match linkage {
            Linkage::Left => &self.gmap_left,
            Linkage::Right => &self.gmap_right,
            Linkage::Scope => &self.gmap_scope,
            Linkage::Typeguid => &self.gmap_typeguid,
        }
    }

    fn gmap_arc_for(&self, linkage: Linkage) -> Arc<Gmap> {
        match linkage {
            Linkage::Left => Arc::clone(&self.gmap_left),
            Linkage::Right => Arc::clone(&self.gmap_right),
            Linkage::Scope => Arc::clone(&self.gmap_scope),
            Linkage::Typeguid => Arc::clone(&self.gmap_typeguid),
        }
    }

    fn resolve_gmap(&self, linkage: Linkage, guid: &Guid) -> Vec<Id> {
        match self.guids.id_of(guid) {
            Ok(id) => self.gmap_for(linkage).get(id).iter_forward().collect(),
            Err(_) => Vec::new(),
        }
    }
}

/// §4.6's "when sort is not free from the iterator's natural order, a
/// `sort` wrapper is inserted": every producer [compile] builds is only
/// ever guaranteed sorted by ascending id, never by an arbitrary requested
/// field, so a [Constraint::sort_root] constraint with a field-based
/// `sort_pattern` always gets one [SortIter] layered on top before
/// streaming. A `sort_pattern` that isn't a plain field (a list/pick) is
/// left alone here — multi-key sort ordering is not implemented.
pub fn maybe_wrap_sort(producer: Box<dyn GraphIterator>, c: &Constraint, store: &Arc<PrimitiveStore>, direction: Direction) -> Box<dyn GraphIterator> {
    if !c.sort_root {
        return producer;
    }
    let field = match c.sort_pattern.as_ref().map(|p| &p.kind) {
        Some(PatternKind::Field(f)) => *f,
        _ => return producer,
    };
    let store = Arc::clone(store);
    let key_fn: Arc<dyn Fn(Id) -> Vec<u8> + Send + Sync> = Arc::new(move |id| store.get(id).map(|p| crate::exec::sort_key_bytes(p, field)).unwrap_or_default());
    Box::new(SortIter::new(producer, direction, key_fn))
}

fn fixed_candidate(mut ids: Vec<Id>, masquerade: &str) -> Box<dyn GraphIterator> {
    ids.sort_unstable();
    ids.dedup();
    let label = crate::iter::freeze_ids(&ids);
    Box::new(SortedIdIter::new(SortedKind::Fixed, label, ids, Direction::Forward).with_masquerade(masquerade))
}

/// Compile one [AtomicPredicate] into a precomputed producer candidate
/// when it pins a single value against an indexed field (§4.3 planning
/// step 1), or `None` when it needs a full-scan [AtomicChecker] instead
/// (`!=`, `~=`, multi-value `=`, or a field with no backing index).
fn compile_atomic(pred: &AtomicPredicate, collab: &Collaborators) -> Option<Box<dyn GraphIterator>> {
    if pred.op != CompareOp::Eq || pred.values.len() != 1 {
        return None;
    }
    match (pred.field, &pred.values[0]) {
        (AtomicField::Guid, AtomicValue::Guid(g)) => {
            let ids = collab.guids.id_of(g).map(|id| vec![id]).unwrap_or_default();
            Some(fixed_candidate(ids, "guid"))
        }
        (AtomicField::Name, AtomicValue::Bytes(b)) => Some(fixed_candidate(collab.hmap_name.get(b), "hmap")),
        (AtomicField::Value, AtomicValue::Bytes(b)) => Some(fixed_candidate(collab.hmap_value.get(b), "hmap")),
        (AtomicField::Left, AtomicValue::Guid(g)) => Some(fixed_candidate(collab.resolve_gmap(Linkage::Left, g), "gmap")),
        (AtomicField::Right, AtomicValue::Guid(g)) => Some(fixed_candidate(collab.resolve_gmap(Linkage::Right, g), "gmap")),
        (AtomicField::Scope, AtomicValue::Guid(g)) => Some(fixed_candidate(collab.resolve_gmap(Linkage::Scope, g), "gmap")),
        (AtomicField::Type, AtomicValue::Guid(g)) | (AtomicField::Typeguid, AtomicValue::Guid(g)) => {
            Some(fixed_candidate(collab.resolve_gmap(Linkage::Typeguid, g), "gmap"))
        }
        _ => None,
    }
}

/// §4.3 planning step 4: when a constraint pins both a linkage field and
/// the typeguid to single literal values, replace those two atomic
/// predicates with one `vip` candidate instead of planning them as two
/// separate producer candidates that would otherwise need an `and`.
/// Removes the two consumed predicates from `atomic` in place.
fn try_build_vip(atomic: &mut Vec<AtomicPredicate>, collab: &Collaborators) -> Option<SortedIdIter> {
    let is_linkage_eq = |p: &AtomicPredicate| {
        matches!(p.field, AtomicField::Left | AtomicField::Right | AtomicField::Scope)
            && p.op == CompareOp::Eq
            && matches!(p.values.as_slice(), [AtomicValue::Guid(_)])
    };
    let is_typeguid_eq = |p: &AtomicPredicate| {
        matches!(p.field, AtomicField::Type | AtomicField::Typeguid)
            && p.op == CompareOp::Eq
            && matches!(p.values.as_slice(), [AtomicValue::Guid(_)])
    };
    let linkage_idx = atomic.iter().position(is_linkage_eq)?;
    let typeguid_idx = atomic.iter().position(is_typeguid_eq)?;
    if linkage_idx == typeguid_idx {
        return None;
    }
    let (hi, lo) = if linkage_idx > typeguid_idx { (linkage_idx, typeguid_idx) } else { (typeguid_idx, linkage_idx) };
    let hi_pred = atomic.remove(hi);
    let lo_pred = atomic.remove(lo);
    let (linkage_pred, typeguid_pred) = if linkage_idx > typeguid_idx { (hi_pred, lo_pred) } else { (lo_pred, hi_pred) };

    let linkage_field = match linkage_pred.field {
        AtomicField::Left => Linkage::Left,
        AtomicField::Right => Linkage::Right,
        AtomicField::Scope => Linkage::Scope,
        _ => unreachable!("is_linkage_eq only matches Left/Right/Scope"),
    };
    let linkage_guid = match &linkage_pred.values[0] {
        AtomicValue::Guid(g) => *g,
        _ => unreachable!("is_linkage_eq only matches a single Guid value"),
    };
    let typeguid_guid = match &typeguid_pred.values[0] {
        AtomicValue::Guid(g) => *g,
        _ => unreachable!("is_typeguid_eq only matches a single Guid value"),
    };

    let linkage_ids = collab.resolve_gmap(linkage_field, &linkage_guid);
    let typeguid_ids = collab.resolve_gmap(Linkage::Typeguid, &typeguid_guid);
    Some(crate::iter::build_vip(&linkage_ids, &typeguid_ids, Direction::Forward))
}

fn drain_fully(it: &mut dyn GraphIterator, budget: &mut Budget) -> Result<Vec<Id>> {
    let mut out = Vec::new();
    loop {
        match it.next(budget)? {
            Outcome::Value(v) => out.push(v),
            Outcome::Done => return Ok(out),
            Outcome::NeedsMore => return err_at!(TooHard, msg: "plan-time fast-intersect materialization exhausted its budget"),
        }
    }
}

fn array_eligible(it: &dyn GraphIterator, threshold: usize) -> bool {
    let stats = it.stats();
    stats.sorted && stats.cardinality.map(|c| c as usize <= threshold).unwrap_or(false)
}

/// Compile a [Constraint] into a real iterator tree (§4.3): atomic
/// predicates become producer candidates (via [compile_atomic]/
/// [try_build_vip]) or fall back to [AtomicChecker]; `meta`/`live`/
/// `archival`/`valuetype`/the numeric ranges become one [ConstraintGuard]
/// checker; each linked child constraint is compiled recursively and
/// wrapped in [IsaIter] or [LinksToIter] depending on its [crate::constraint::LinkageRef]
/// direction, then added as another producer candidate. [choose_producer]
/// picks the cheapest candidate; [fast_path_intersect] short-circuits the
/// case where exactly two small sorted candidates are left. A `dead`
/// or-branch compiles to the empty set without looking at its fields.
pub fn compile(c: &Constraint, collab: &Collaborators) -> Result<Box<dyn GraphIterator>> {
    if c.dead {
        return Ok(Box::new(SortedIdIter::new(SortedKind::Null, "", Vec::new(), Direction::Forward)));
    }

    let mut producer_candidates: Vec<Box<dyn GraphIterator>> = Vec::new();
    let mut checkers: Vec<Box<dyn GraphIterator>> = Vec::new();

    let mut atomic = c.atomic.clone();
    if let Some(vip) = try_build_vip(&mut atomic, collab) {
        producer_candidates.push(Box::new(vip));
    }
    for pred in atomic {
        match compile_atomic(&pred, collab) {
            Some(it) => producer_candidates.push(it),
            None => checkers.push(Box::new(AtomicChecker::new(Arc::clone(&collab.store), pred))),
        }
    }

    let guard = ConstraintGuard::new(
        Arc::clone(&collab.store),
        c.meta,
        c.live,
        c.archival,
        c.valuetype,
        c.timestamp_range,
        c.generation_range,
    );
    if !guard.is_noop() {
        checkers.push(Box::new(guard));
    }

    for child in &c.children {
        let compiled_child = compile(child, collab)?;
        let linkage = child
            .linkage
            .ok_or_else(|| crate::Error::Semantics("plan".into(), "child constraint has no linkage to its parent".into()))?;
        let wrapped: Box<dyn GraphIterator> = if linkage.forward {
            Box::new(IsaIter::new(compiled_child, Arc::clone(&collab.store), Arc::clone(&collab.guids), linkage.field, Direction::Forward))
        } else {
            Box::new(LinksToIter::new(compiled_child, collab.gmap_arc_for(linkage.field), Direction::Forward))
        };
        producer_candidates.push(wrapped);
    }

    if producer_candidates.len() == 2
        && array_eligible(producer_candidates[0].as_ref(), collab.fast_intersect_max)
        && array_eligible(producer_candidates[1].as_ref(), collab.fast_intersect_max)
    {
        let mut plan_budget = Budget::new(i64::MAX);
        let a = drain_fully(producer_candidates[0].as_mut(), &mut plan_budget)?;
        let b = drain_fully(producer_candidates[1].as_mut(), &mut plan_budget)?;
        producer_candidates = match fast_path_intersect(&a, &b, collab.fast_intersect_max) {
            Some(ids) => vec![fixed_candidate(ids, "fast_intersect")],
            None => vec![fixed_candidate(a, "fast_intersect"), fixed_candidate(b, "fast_intersect")],
        };
    }

    let producer: Box<dyn GraphIterator> = match producer_candidates.len() {
        0 => Box::new(SortedIdIter::new(SortedKind::All, "", collab.store.all_ids().collect(), Direction::Forward)),
        1 => producer_candidates.pop().unwrap(),
        _ => {
            let idx = choose_producer(&producer_candidates).unwrap_or(0);
            let chosen = producer_candidates.remove(idx);
            checkers.extend(producer_candidates);
            chosen
        }
    };

    if checkers.is_empty() {
        Ok(producer)
    } else {
        Ok(Box::new(AndIter::new(producer, checkers)))
    }
}

#[cfg(test)]
#[path = "plan_test.rs"]
mod plan_test;
