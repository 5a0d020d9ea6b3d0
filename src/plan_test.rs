use std::sync::Arc;

use super::*;
use crate::budget::Budget;
use crate::constraint::{AtomicField, AtomicPredicate, AtomicValue, CompareOp, Constraint, LinkageRef};
use crate::gmap::Gmap;
use crate::guid::GuidMap;
use crate::hmap::Hmap;
use crate::iter::{Direction, Outcome, SortedIdIter, SortedKind as Kind};
use crate::pattern::{Aggregate, Pattern, PatternKind, PrimitiveField};
use crate::primitive::{Linkage, Primitive, PrimitiveStore};
use crate::variable::VariableTable;
use crate::Guid;

fn drive_all(it: &mut dyn GraphIterator) -> Vec<Id> {
    let mut budget = Budget::new(100_000);
    let mut out = Vec::new();
    loop {
        match it.next(&mut budget).unwrap() {
            Outcome::Value(v) => out.push(v),
            Outcome::Done => break,
            Outcome::NeedsMore => panic!("unexpected suspend"),
        }
    }
    out
}

fn empty_collaborators(store: PrimitiveStore, guids: GuidMap) -> Collaborators {
    Collaborators {
        store: Arc::new(store),
        guids: Arc::new(guids),
        gmap_left: Arc::new(Gmap::new("left")),
        gmap_right: Arc::new(Gmap::new("right")),
        gmap_scope: Arc::new(Gmap::new("scope")),
        gmap_typeguid: Arc::new(Gmap::new("typeguid")),
        hmap_name: Arc::new(Hmap::new("name")),
        hmap_value: Arc::new(Hmap::new("value")),
        fast_intersect_max: 32 * 1024,
    }
}

#[test]
fn test_remove_unused_results_clears_children_without_contents() {
    let mut child = Constraint::new();
    child.result_pattern = Some(Pattern::new(PatternKind::Field(PrimitiveField::Name)));
    let mut root = Constraint::new();
    root.result_pattern = Some(Pattern::new(PatternKind::Field(PrimitiveField::Guid)));
    root.children.push(child);

    remove_unused_results(&mut root, true);
    assert!(root.children[0].result_pattern.is_none());
}

#[test]
fn test_remove_unused_results_keeps_children_when_contents_requested() {
    let mut child = Constraint::new();
    child.result_pattern = Some(Pattern::new(PatternKind::Field(PrimitiveField::Name)));
    let mut root = Constraint::new();
    root.result_pattern = Some(Pattern::new(PatternKind::Aggregate(Aggregate::Contents)));
    root.children.push(child);

    remove_unused_results(&mut root, true);
    assert!(root.children[0].result_pattern.is_some());
}

#[test]
fn test_resolve_aliases_redirects_references() {
    let mut vars = VariableTable::new();
    let x = vars.declare("x", 0);
    let y = vars.declare("y", 0);
    let mut c = Constraint::new();
    c.assignments.push((x, Pattern::new(PatternKind::Variable("y".into()))));
    resolve_aliases(&mut c, &mut vars);
    assert_eq!(vars.resolve("x"), Some(y));
}

#[test]
fn test_mark_sort_roots_only_outermost_claims_role() {
    let mut inner = Constraint::new();
    inner.sort_pattern = Some(Pattern::new(PatternKind::Field(PrimitiveField::Name)));
    let mut root = Constraint::new();
    root.sort_pattern = Some(Pattern::new(PatternKind::Field(PrimitiveField::Guid)));
    root.children.push(inner);
    mark_sort_roots(&mut root, false);
    assert!(root.sort_root);
    assert!(!root.children[0].sort_root);
}

#[test]
fn test_topological_sort_orders_dependencies_first() {
    let mut vars = VariableTable::new();
    let a = vars.declare("a", 0);
    let b = vars.declare("b", 0);
    let assignments = vec![
        (a, Pattern::new(PatternKind::Variable("b".into()))),
        (b, Pattern::new(PatternKind::Field(PrimitiveField::Name))),
    ];
    let sorted = topologically_sort_assignments(assignments, &vars).unwrap();
    assert_eq!(sorted[0].0, b);
    assert_eq!(sorted[1].0, a);
}

#[test]
fn test_topological_sort_rejects_cycle() {
    let mut vars = VariableTable::new();
    let a = vars.declare("a", 0);
    let b = vars.declare("b", 0);
    let assignments = vec![
        (a, Pattern::new(PatternKind::Variable("b".into()))),
        (b, Pattern::new(PatternKind::Variable("a".into()))),
    ];
    assert!(topologically_sort_assignments(assignments, &vars).is_err());
}

#[test]
fn test_remove_unused_page_size_clamps_when_no_rows_produced() {
    let mut c = Constraint::new();
    c.page_size = Some(100);
    c.result_pattern = Some(Pattern::new(PatternKind::Aggregate(Aggregate::Count)));
    remove_unused_page_size(&mut c);
    assert_eq!(c.page_size, Some(1));
}

#[test]
fn test_choose_producer_prefers_smaller_cardinality() {
    let small: Box<dyn GraphIterator> = Box::new(SortedIdIter::new(Kind::Gmap, "small", vec![1, 2], Direction::Forward));
    let large: Box<dyn GraphIterator> = Box::new(SortedIdIter::new(Kind::Gmap, "large", (0..1000).collect(), Direction::Forward));
    let idx = choose_producer(&[large, small]).unwrap();
    assert_eq!(idx, 1);
}

#[test]
fn test_fast_path_intersect_respects_threshold() {
    let a: Vec<u64> = (0..10).collect();
    let b: Vec<u64> = (5..15).collect();
    assert!(fast_path_intersect(&a, &b, 5).is_none());
    assert_eq!(fast_path_intersect(&a, &b, 20).unwrap(), vec![5, 6, 7, 8, 9]);
}

#[test]
fn test_choose_producer_budget_smoke() {
    let mut b = Budget::new(10);
    let mut it = SortedIdIter::new(Kind::All, "all", vec![1], Direction::Forward);
    assert!(it.next(&mut b).is_ok());
}

#[test]
fn test_compile_dead_branch_yields_empty_set() {
    let mut c = Constraint::new();
    c.dead = true;
    let collab = empty_collaborators(PrimitiveStore::new(), GuidMap::new());
    let mut it = compile(&c, &collab).unwrap();
    assert_eq!(drive_all(it.as_mut()), Vec::<Id>::new());
}

#[test]
fn test_compile_atomic_guid_eq_is_a_producer_not_a_full_scan() {
    let mut store = PrimitiveStore::new();
    let mut guids = GuidMap::new();
    let guid = Guid::generate();
    let id = store.append(Primitive::new(guid, 0));
    guids.insert(guid, id).unwrap();
    store.append(Primitive::new(Guid::generate(), 0));

    let collab = empty_collaborators(store, guids);
    let mut c = Constraint::new();
    c.atomic.push(AtomicPredicate { field: AtomicField::Guid, op: CompareOp::Eq, values: vec![AtomicValue::Guid(guid)] });

    let mut it = compile(&c, &collab).unwrap();
    assert_eq!(it.type_prefix(), "fixed");
    assert_eq!(drive_all(it.as_mut()), vec![id]);
}

#[test]
fn test_compile_multivalue_guid_falls_back_to_checker_over_full_scan() {
    let mut store = PrimitiveStore::new();
    let mut guids = GuidMap::new();
    let g0 = Guid::generate();
    let g1 = Guid::generate();
    let id0 = store.append(Primitive::new(g0, 0));
    let id1 = store.append(Primitive::new(g1, 0));
    guids.insert(g0, id0).unwrap();
    guids.insert(g1, id1).unwrap();

    let collab = empty_collaborators(store, guids);
    let mut c = Constraint::new();
    c.atomic.push(AtomicPredicate {
        field: AtomicField::Guid,
        op: CompareOp::Eq,
        values: vec![AtomicValue::Guid(g0), AtomicValue::Guid(g1)],
    });

    let mut it = compile(&c, &collab).unwrap();
    assert_eq!(it.type_prefix(), "and");
    let mut out = drive_all(it.as_mut());
    out.sort_unstable();
    assert_eq!(out, vec![id0, id1]);
}

#[test]
fn test_compile_builds_vip_from_linkage_and_typeguid_predicates() {
    let mut store = PrimitiveStore::new();
    let mut guids = GuidMap::new();
    let parent_guid = Guid::generate();
    let type_guid = Guid::generate();
    let parent_id = store.append(Primitive::new(parent_guid, 0));
    let type_id = store.append(Primitive::new(type_guid, 0));
    guids.insert(parent_guid, parent_id).unwrap();
    guids.insert(type_guid, type_id).unwrap();

    let matching_guid = Guid::generate();
    let matching_id = store.append(Primitive::new(matching_guid, 0).with_right(parent_guid).with_typeguid(type_guid));
    guids.insert(matching_guid, matching_id).unwrap();

    let config = crate::config::Config::default();
    let mut gmap_right = Gmap::new("right");
    gmap_right.add(parent_id, matching_id, false, &config, store.high_id()).unwrap();
    let mut gmap_typeguid = Gmap::new("typeguid");
    gmap_typeguid.add(type_id, matching_id, false, &config, store.high_id()).unwrap();

    let collab = Collaborators {
        store: Arc::new(store),
        guids: Arc::new(guids),
        gmap_left: Arc::new(Gmap::new("left")),
        gmap_right: Arc::new(gmap_right),
        gmap_scope: Arc::new(Gmap::new("scope")),
        gmap_typeguid: Arc::new(gmap_typeguid),
        hmap_name: Arc::new(Hmap::new("name")),
        hmap_value: Arc::new(Hmap::new("value")),
        fast_intersect_max: 32 * 1024,
    };

    let mut c = Constraint::new();
    c.atomic.push(AtomicPredicate { field: AtomicField::Right, op: CompareOp::Eq, values: vec![AtomicValue::Guid(parent_guid)] });
    c.atomic.push(AtomicPredicate { field: AtomicField::Typeguid, op: CompareOp::Eq, values: vec![AtomicValue::Guid(type_guid)] });

    let mut it = compile(&c, &collab).unwrap();
    assert_eq!(it.type_prefix(), "vip");
    assert_eq!(drive_all(it.as_mut()), vec![matching_id]);
}

#[test]
fn test_compile_recurses_into_forward_linked_child_via_isa() {
    let mut store = PrimitiveStore::new();
    let mut guids = GuidMap::new();
    let target_guid = Guid::generate();
    let target_id = store.append(Primitive::new(target_guid, 0));
    guids.insert(target_guid, target_id).unwrap();

    let edge_guid = Guid::generate();
    let edge_id = store.append(Primitive::new(edge_guid, 0).with_right(target_guid));
    guids.insert(edge_guid, edge_id).unwrap();

    let collab = empty_collaborators(store, guids);

    let mut child = Constraint::new();
    child.linkage = Some(LinkageRef { field: Linkage::Right, forward: true });
    child.atomic.push(AtomicPredicate { field: AtomicField::Guid, op: CompareOp::Eq, values: vec![AtomicValue::Guid(edge_guid)] });

    let mut root = Constraint::new();
    root.children.push(child);

    let mut it = compile(&root, &collab).unwrap();
    assert_eq!(drive_all(it.as_mut()), vec![target_id]);
}

#[test]
fn test_compile_applies_constraint_guard_for_meta_and_live() {
    let mut store = PrimitiveStore::new();
    let node = Primitive::new(Guid::generate(), 0);
    let mut dead_edge = Primitive::new(Guid::generate(), 0).with_right(Guid::generate());
    dead_edge.live = false;
    let node_id = store.append(node);
    store.append(dead_edge);

    let collab = empty_collaborators(store, GuidMap::new());
    let mut c = Constraint::new();
    c.meta = Some(crate::constraint::Meta::Node);
    c.live = Some(true);

    let mut it = compile(&c, &collab).unwrap();
    assert_eq!(drive_all(it.as_mut()), vec![node_id]);
}

#[test]
fn test_compile_fast_path_intersects_two_small_candidates() {
    let mut store = PrimitiveStore::new();
    let mut guids = GuidMap::new();
    let name_guid_owner = Guid::generate();
    let id0 = store.append(Primitive::new(name_guid_owner, 0).with_name(b"match".to_vec()));
    guids.insert(name_guid_owner, id0).unwrap();
    let other_guid = Guid::generate();
    let id1 = store.append(Primitive::new(other_guid, 0).with_name(b"match".to_vec()));
    guids.insert(other_guid, id1).unwrap();

    let config = crate::config::Config::default();
    let mut hmap_name = Hmap::new("name");
    hmap_name.add(b"match", id0, false, &config).unwrap();
    hmap_name.add(b"match", id1, false, &config).unwrap();

    let collab = Collaborators {
        store: Arc::new(store),
        guids: Arc::new(guids),
        gmap_left: Arc::new(Gmap::new("left")),
        gmap_right: Arc::new(Gmap::new("right")),
        gmap_scope: Arc::new(Gmap::new("scope")),
        gmap_typeguid: Arc::new(Gmap::new("typeguid")),
        hmap_name: Arc::new(hmap_name),
        hmap_value: Arc::new(Hmap::new("value")),
        fast_intersect_max: 32 * 1024,
    };

    let mut c = Constraint::new();
    c.atomic.push(AtomicPredicate { field: AtomicField::Name, op: CompareOp::Eq, values: vec![AtomicValue::Bytes(b"match".to_vec())] });
    c.atomic.push(AtomicPredicate { field: AtomicField::Guid, op: CompareOp::Eq, values: vec![AtomicValue::Guid(name_guid_owner)] });

    let mut it = compile(&c, &collab).unwrap();
    assert_eq!(it.type_prefix(), "fixed");
    assert_eq!(drive_all(it.as_mut()), vec![id0]);
}

#[test]
fn test_compile_ne_predicate_falls_back_to_full_scan_with_checker() {
    let mut store = PrimitiveStore::new();
    let alice = store.append(Primitive::new(Guid::generate(), 0).with_name(b"alice".to_vec()));
    store.append(Primitive::new(Guid::generate(), 0).with_name(b"bob".to_vec()));
    let collab = empty_collaborators(store, GuidMap::new());
    let mut c = Constraint::new();
    c.atomic.push(AtomicPredicate { field: AtomicField::Name, op: CompareOp::Ne, values: vec![AtomicValue::Bytes(b"bob".to_vec())] });

    let mut it = compile(&c, &collab).unwrap();
    assert_eq!(it.type_prefix(), "and");
    assert_eq!(drive_all(it.as_mut()), vec![alice]);
}
