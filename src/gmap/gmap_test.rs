use super::*;

#[test]
fn test_add_and_get_simple() {
    let cfg = Config::default();
    let mut g = Gmap::new("typeguid");
    for id in 0..5u64 {
        g.add(100, id, false, &cfg, id).unwrap();
    }
    let got: Vec<Id> = g.get(100).iter_forward().collect();
    assert_eq!(got, vec![0, 1, 2, 3, 4]);
    assert_eq!(g.shape_of(100), "multi-array");
}

#[test]
fn test_unknown_source_is_empty() {
    let g = Gmap::new("typeguid");
    assert_eq!(g.len_of(999), 0);
    assert!(!g.contains(999, 1));
}

#[test]
fn test_partition_routing() {
    let cfg = Config::default();
    let mut g = Gmap::new("right");
    g.add(5, 1, false, &cfg, 1).unwrap();
    g.add(5 + cfg.partition_stride, 2, false, &cfg, 2).unwrap();
    assert_eq!(g.opened_partition_count(), 2);
}

#[test]
fn test_duplicate_rejected_by_default() {
    let cfg = Config::default();
    let mut g = Gmap::new("right");
    g.add(1, 10, false, &cfg, 10).unwrap();
    assert!(g.add(1, 10, false, &cfg, 10).is_err());
    g.add(1, 10, true, &cfg, 10).unwrap();
}
