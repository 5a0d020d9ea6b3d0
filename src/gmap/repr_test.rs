use super::*;

fn cfg() -> Config {
    Config::default()
}

#[test]
fn test_empty_to_singleton() {
    let mut r = Repr::Empty;
    r.add(5, false, &cfg(), 5).unwrap();
    assert_eq!(r.shape_name(), "singleton");
    assert_eq!(r.len(), 1);
}

#[test]
fn test_singleton_to_multiarray_exp1() {
    let mut r = Repr::Singleton(3);
    r.add(9, false, &cfg(), 9).unwrap();
    match &r {
        Repr::MultiArray { data, exp } => {
            assert_eq!(*exp, 1);
            assert_eq!(data, &vec![3, 9]);
        }
        _ => panic!("expected multi-array"),
    }
}

#[test]
fn test_singleton_equal_target_without_duplicates_errors() {
    let mut r = Repr::Singleton(3);
    assert!(r.add(3, false, &cfg(), 3).is_err());
    r.add(3, true, &cfg(), 3).unwrap();
    assert_eq!(r.len(), 1);
}

#[test]
fn test_singleton_out_of_order_is_fatal() {
    let mut r = Repr::Singleton(9);
    assert!(r.add(3, false, &cfg(), 9).is_err());
}

#[test]
fn test_multiarray_doubling_sequence_matches_documented_scenario() {
    // inserting ids 0..=16 (17 inserts) into one key must transit
    // singleton -> multi-array exponents 1,2,3,4,5.
    let mut r = Repr::Empty;
    let mut seen_exponents = vec![];
    for id in 0u64..=16 {
        r.add(id, false, &cfg(), 16).unwrap();
        if let Repr::MultiArray { exp, .. } = &r {
            if seen_exponents.last() != Some(exp) {
                seen_exponents.push(*exp);
            }
        }
    }
    assert_eq!(seen_exponents, vec![1, 2, 3, 4, 5]);
    assert_eq!(r.len(), 17);
    // strictly ascending, no duplicate emission.
    if let Repr::MultiArray { data, .. } = &r {
        let mut sorted = data.clone();
        sorted.sort();
        sorted.dedup();
        assert_eq!(sorted, *data);
        assert_eq!(data.len(), 17);
    }
}

#[test]
fn test_migrates_to_large_file_past_split_threshold() {
    let mut c = cfg();
    c.split_threshold = 2; // force early migration for the test
    let mut r = Repr::Empty;
    for id in 0u64..20 {
        r.add(id, false, &c, 20).unwrap();
    }
    assert_eq!(r.shape_name(), "large-file");
    assert_eq!(r.len(), 20);
}

#[test]
fn test_migrates_to_bitmap_past_density_threshold() {
    let mut c = cfg();
    c.split_threshold = 1;
    c.bitmap_density_min_size = 2;
    c.bitmap_density_numerator = 1;
    let mut r = Repr::Empty;
    for id in 0u64..10 {
        r.add(id, false, &c, 5).unwrap();
    }
    assert_eq!(r.shape_name(), "bitmap");
    assert_eq!(r.len(), 10);
}

#[test]
fn test_representation_never_shrinks_across_dup_noop() {
    let mut r = Repr::MultiArray {
        data: vec![1, 2, 3],
        exp: 2,
    };
    // re-adding the last id is a no-op when duplicates are allowed, never
    // reverts representation.
    r.add(3, true, &cfg(), 3).unwrap();
    assert_eq!(r.shape_name(), "multi-array");
    assert_eq!(r.len(), 3);
}
