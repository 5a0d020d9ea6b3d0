use super::*;

#[test]
fn test_append_assigns_dense_monotonic_ids() {
    let mut store = PrimitiveStore::new();
    let a = store.append(Primitive::new(Guid::generate(), 1));
    let b = store.append(Primitive::new(Guid::generate(), 2));
    assert_eq!(a, 0);
    assert_eq!(b, 1);
    assert_eq!(store.high_id(), 2);
}

#[test]
fn test_get_missing_id_is_no_such_id() {
    let store = PrimitiveStore::new();
    let err = store.get(0).unwrap_err();
    assert_eq!(err.keyword(), "EMPTY");
}

#[test]
fn test_linkage_accessor() {
    let left = Guid::generate();
    let p = Primitive::new(Guid::generate(), 1).with_left(left);
    assert_eq!(p.linkage(Linkage::Left), Some(left));
    assert_eq!(p.linkage(Linkage::Right), None);
}

#[test]
fn test_all_ids_covers_full_range() {
    let mut store = PrimitiveStore::new();
    for _ in 0..5 {
        store.append(Primitive::new(Guid::generate(), 0));
    }
    let ids: Vec<Id> = store.all_ids().collect();
    assert_eq!(ids, vec![0, 1, 2, 3, 4]);
}
