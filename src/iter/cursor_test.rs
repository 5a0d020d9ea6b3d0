use super::*;
use crate::budget::Budget;
use crate::iter::{FreezeWhich, Outcome};

fn ctx<'a>(gmap_data: &'a [Id]) -> ThawContext<'a> {
    ThawContext {
        resolve_all: Box::new(|| vec![0, 1, 2]),
        resolve_gmap: Box::new(move |_set| gmap_data.to_vec()),
        resolve_bgmap: Box::new(|_set| Vec::new()),
        resolve_hmap: Box::new(|_set| Vec::new()),
        resolve_prefix: Box::new(|_set| Vec::new()),
    }
}

#[test]
fn test_thaw_gmap_round_trip_at_position() {
    let data = vec![1, 2, 3, 4];
    let mut budget = Budget::new(1_000);
    let mut it = SortedIdIter::new(Kind::Gmap, "right/5", data.clone(), Direction::Forward);
    it.next(&mut budget).unwrap();
    let frozen_set = it.freeze(FreezeWhich::Set);
    let frozen_pos = it.freeze(FreezeWhich::Position);
    let text = format!("{}/{}", frozen_set, frozen_pos);

    let c = ctx(&data);
    let mut resumed = thaw(&text, Direction::Forward, &c).unwrap();
    assert_eq!(resumed.next(&mut budget).unwrap(), Outcome::Value(2));
}

#[test]
fn test_thaw_fixed_ids_from_set_text() {
    let text = "fixed:10,20,30";
    let c = ctx(&[]);
    let mut budget = Budget::new(1_000);
    let mut resumed = thaw(text, Direction::Forward, &c).unwrap();
    assert_eq!(resumed.next(&mut budget).unwrap(), Outcome::Value(10));
}

#[test]
fn test_thaw_rejects_malformed_cursor() {
    let c = ctx(&[]);
    assert!(thaw("nocolonhere", Direction::Forward, &c).is_err());
    assert!(thaw("bogus:1,2", Direction::Forward, &c).is_err());
}
