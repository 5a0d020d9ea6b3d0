use super::*;

#[test]
fn test_charge_exhausts_at_zero() {
    let mut b = Budget::new(10);
    assert!(b.charge(4));
    assert!(b.charge(5));
    assert!(!b.charge(1));
    assert!(b.is_exhausted());
}

#[test]
fn test_refill_resets_allowance() {
    let mut b = Budget::new(1);
    assert!(!b.charge(1));
    b.refill(10);
    assert!(!b.is_exhausted());
    assert_eq!(b.remaining(), 10);
}
