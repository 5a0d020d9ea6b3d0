use std::sync::Arc;

use super::*;
use crate::{
    budget::Budget,
    gmap::Gmap,
    guid::GuidMap,
    iter::{Direction, GraphIterator, Outcome, SortedIdIter, SortedKind},
    primitive::{Linkage, Primitive, PrimitiveStore},
    Guid,
};

fn drive_all(it: &mut dyn GraphIterator, budget: &mut Budget) -> Vec<crate::guid::Id> {
    let mut out = Vec::new();
    loop {
        match it.next(budget).unwrap() {
            Outcome::Value(v) => out.push(v),
            Outcome::Done => break,
            Outcome::NeedsMore => panic!("unexpected suspend"),
        }
    }
    out
}

#[test]
fn test_isa_follows_linkage_from_matched_primitives() {
    let mut store = PrimitiveStore::new();
    let mut guids = GuidMap::new();

    let target = Guid::generate();
    let target_id = store.append(Primitive::new(target, 0));
    guids.insert(target, target_id).unwrap();

    let edge_guid = Guid::generate();
    let edge_id = store.append(Primitive::new(edge_guid, 0).with_right(target));
    guids.insert(edge_guid, edge_id).unwrap();

    let store = Arc::new(store);
    let guids = Arc::new(guids);

    let inner: Box<dyn GraphIterator> = Box::new(SortedIdIter::new(SortedKind::Fixed, "edges", vec![edge_id], Direction::Forward));
    let mut isa = IsaIter::new(inner, Arc::clone(&store), Arc::clone(&guids), Linkage::Right, Direction::Forward);

    let mut budget = Budget::new(10_000);
    assert_eq!(drive_all(&mut isa, &mut budget), vec![target_id]);
}

#[test]
fn test_linksto_reads_gmap_for_each_target() {
    let mut gmap = Gmap::new("right");
    let config = crate::config::Config::default();
    gmap.add(10, 1, false, &config, 100).unwrap();
    gmap.add(10, 2, false, &config, 100).unwrap();
    gmap.add(20, 3, false, &config, 100).unwrap();
    let gmap = Arc::new(gmap);

    let inner: Box<dyn GraphIterator> = Box::new(SortedIdIter::new(SortedKind::Fixed, "targets", vec![10, 20], Direction::Forward));
    let mut linksto = LinksToIter::new(inner, gmap, Direction::Forward);

    let mut budget = Budget::new(10_000);
    assert_eq!(drive_all(&mut linksto, &mut budget), vec![1, 2, 3]);
}

#[test]
fn test_build_vip_intersects_two_probes() {
    let it = build_vip(&[1, 2, 3, 5], &[2, 3, 4], Direction::Forward);
    let mut budget = Budget::new(10_000);
    let mut it: Box<dyn GraphIterator> = Box::new(it);
    assert_eq!(drive_all(it.as_mut(), &mut budget), vec![2, 3]);
}

#[test]
#[should_panic(expected = "cannot clone an un-materialized isa iterator")]
fn test_isa_clone_before_materializing_panics() {
    let store = Arc::new(PrimitiveStore::new());
    let guids = Arc::new(GuidMap::new());
    let inner: Box<dyn GraphIterator> = Box::new(SortedIdIter::new(SortedKind::Fixed, "empty", Vec::new(), Direction::Forward));
    let isa = IsaIter::new(inner, store, guids, Linkage::Left, Direction::Forward);
    let _ = isa.clone_box();
}
