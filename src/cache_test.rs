use super::*;

#[test]
fn test_put_get_round_trip() {
    let mut c: CoatCheck<Vec<u64>> = CoatCheck::new(10);
    c.put("mask:a", vec![1, 2, 3]);
    assert_eq!(c.get("mask:a"), Some(&vec![1, 2, 3]));
}

#[test]
fn test_miss_returns_none() {
    let mut c: CoatCheck<u64> = CoatCheck::new(10);
    assert_eq!(c.get("nope"), None);
}

#[test]
fn test_evicts_least_recently_used_over_capacity() {
    let mut c: CoatCheck<u64> = CoatCheck::new(2);
    c.put("a", 1);
    c.put("b", 2);
    c.get("a"); // touch a, making b the LRU victim
    c.put("c", 3);
    assert!(c.contains("a"));
    assert!(c.contains("c"));
    assert!(!c.contains("b"));
    assert_eq!(c.len(), 2);
}

#[test]
fn test_remove_drops_entry() {
    let mut c: CoatCheck<u64> = CoatCheck::new(10);
    c.put("a", 1);
    assert_eq!(c.remove("a"), Some(1));
    assert!(!c.contains("a"));
}
