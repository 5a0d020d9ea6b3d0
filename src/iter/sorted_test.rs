use super::*;
use crate::budget::Budget;

fn drain(it: &mut SortedIdIter) -> Vec<Id> {
    let mut b = Budget::new(1_000_000);
    let mut out = Vec::new();
    loop {
        match it.next(&mut b).unwrap() {
            Outcome::Value(v) => out.push(v),
            Outcome::Done => break,
            Outcome::NeedsMore => panic!("unexpected suspension"),
        }
    }
    out
}

#[test]
fn test_forward_next_yields_ascending() {
    let mut it = SortedIdIter::new(Kind::All, "all", vec![1, 3, 5, 7], Direction::Forward);
    assert_eq!(drain(&mut it), vec![1, 3, 5, 7]);
}

#[test]
fn test_reverse_next_yields_descending() {
    let mut it = SortedIdIter::new(Kind::All, "all", vec![1, 3, 5, 7], Direction::Reverse);
    assert_eq!(drain(&mut it), vec![7, 5, 3, 1]);
}

#[test]
fn test_forward_find_seeks_and_anchors() {
    let mut b = Budget::new(1_000);
    let mut it = SortedIdIter::new(Kind::Gmap, "g", vec![1, 3, 5, 7, 9], Direction::Forward);
    assert_eq!(it.find(&mut b, 4).unwrap(), Outcome::Value(5));
    assert_eq!(it.next(&mut b).unwrap(), Outcome::Value(7));
}

#[test]
fn test_reverse_find_seeks_and_anchors() {
    let mut b = Budget::new(1_000);
    let mut it = SortedIdIter::new(Kind::Gmap, "g", vec![1, 3, 5, 7, 9], Direction::Reverse);
    assert_eq!(it.find(&mut b, 6).unwrap(), Outcome::Value(5));
    assert_eq!(it.next(&mut b).unwrap(), Outcome::Value(3));
}

#[test]
fn test_check_does_not_move_cursor() {
    let mut b = Budget::new(1_000);
    let mut it = SortedIdIter::new(Kind::Gmap, "g", vec![2, 4, 6], Direction::Forward);
    assert_eq!(it.check(&mut b, 4).unwrap(), CheckOutcome::Yes);
    assert_eq!(it.check(&mut b, 5).unwrap(), CheckOutcome::No);
    assert_eq!(it.next(&mut b).unwrap(), Outcome::Value(2));
}

#[test]
fn test_clone_is_independent_of_original_position() {
    let mut b = Budget::new(1_000);
    let mut it = SortedIdIter::new(Kind::Fixed, "f", vec![1, 2, 3], Direction::Forward);
    it.next(&mut b).unwrap();
    let mut cloned = it.clone_box();
    it.next(&mut b).unwrap();
    assert_eq!(cloned.next(&mut b).unwrap(), Outcome::Value(2));
    assert_eq!(it.next(&mut b).unwrap(), Outcome::Value(3));
}

#[test]
fn test_exhausted_budget_yields_needs_more() {
    let mut b = Budget::new(1);
    let mut it = SortedIdIter::new(Kind::All, "all", vec![1, 2], Direction::Forward);
    assert_eq!(it.next(&mut b).unwrap(), Outcome::NeedsMore);
}

#[test]
fn test_freeze_thaw_position_round_trips() {
    let mut b = Budget::new(1_000);
    let mut it = SortedIdIter::new(Kind::Gmap, "right/5", vec![1, 2, 3, 4], Direction::Forward);
    it.next(&mut b).unwrap();
    it.next(&mut b).unwrap();
    let pos = it.freeze(FreezeWhich::Position);
    let mut resumed = thaw_sorted(Kind::Gmap, "right/5", vec![1, 2, 3, 4], Direction::Forward, Some(&pos), None);
    assert_eq!(resumed.next(&mut b).unwrap(), Outcome::Value(3));
}
