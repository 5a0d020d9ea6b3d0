use super::*;

#[test]
fn test_alloc_and_put_get_roundtrip() {
    let mut bs = BlockStore::new("p0");
    let off = bs.alloc(8).unwrap();
    bs.put(off, b"deadbeef").unwrap();
    let (tile, _r) = bs.get(off).unwrap();
    let local = (off - tile.offset) as usize;
    assert_eq!(&tile.bytes[local..local + 8], b"deadbeef");
}

#[test]
fn test_alloc_never_spans_tile_boundary() {
    let mut bs = BlockStore::new("p0");
    // burn up to near the end of the first tile.
    let _ = bs.alloc(TILE_SIZE - 4).unwrap();
    let off = bs.alloc(8).unwrap();
    assert_eq!(off % TILE_SIZE, 0, "allocation should have rolled to next tile");
}

#[test]
fn test_alloc_rejects_oversize_request() {
    let mut bs = BlockStore::new("p0");
    assert!(bs.alloc(TILE_SIZE + 1).is_err());
}

#[test]
fn test_tile_ref_drop_releases_pin() {
    let mut bs = BlockStore::new("p0");
    let off = bs.alloc(4).unwrap();
    bs.put(off, b"abcd").unwrap();
    {
        let (_tile, _r) = bs.get(off).unwrap();
        assert_eq!(bs.pinned_tile_count(), 1);
    }
    assert_eq!(bs.pinned_tile_count(), 0);
}

#[test]
fn test_read_raw_stops_at_tile_boundary() {
    let mut bs = BlockStore::new("p0");
    bs.grow(TILE_SIZE * 2).unwrap();
    let (bytes, actual_end, _r) = bs.read_raw(TILE_SIZE - 4, TILE_SIZE + 100).unwrap();
    assert_eq!(bytes.len(), 4);
    assert_eq!(actual_end, TILE_SIZE);
}

#[test]
fn test_get_past_end_is_error() {
    let mut bs = BlockStore::new("p0");
    assert!(bs.get(0).is_err());
}

#[test]
fn test_clone_tile_ref_bumps_refcount() {
    let mut bs = BlockStore::new("p0");
    let off = bs.alloc(4).unwrap();
    bs.put(off, b"abcd").unwrap();
    let (_tile, r1) = bs.get(off).unwrap();
    let r2 = r1.clone();
    assert_eq!(bs.pinned_tile_count(), 1);
    drop(r1);
    assert_eq!(bs.pinned_tile_count(), 1);
    drop(r2);
    assert_eq!(bs.pinned_tile_count(), 0);
}
