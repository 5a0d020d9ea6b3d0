//! A tile is the fixed-size unit a [super::BlockStore] pages its backing
//! file in; a [TileRef] is the opaque pinned-borrow handle §4.1 describes
//! — its `Drop` releases the pin, on every exit path including a
//! cooperative suspend.

use std::sync::{atomic::AtomicUsize, Arc};

/// Bytes for one resident tile, paged in starting at `offset`.
#[derive(Clone)]
pub struct Tile {
    pub offset: u64,
    pub bytes: Arc<[u8]>,
}

impl Tile {
    pub fn end(&self) -> u64 {
        self.offset + self.bytes.len() as u64
    }
}

/// A scoped borrow on a resident tile. While any `TileRef` for a tile is
/// alive, the tile manager (here, the in-memory [super::BlockStore]) must
/// keep it resident; dropping the last reference permits eviction or, for
/// a GMAP promotion, frees the superseded array (§3.9).
pub struct TileRef {
    pub(super) tile_no: u64,
    pub(super) refcount: Arc<AtomicUsize>,
}

impl TileRef {
    pub fn tile_no(&self) -> u64 {
        self.tile_no
    }
}

impl Drop for TileRef {
    fn drop(&mut self) {
        self.refcount
            .fetch_sub(1, std::sync::atomic::Ordering::SeqCst);
    }
}

impl Clone for TileRef {
    fn clone(&self) -> TileRef {
        self.refcount
            .fetch_add(1, std::sync::atomic::Ordering::SeqCst);
        TileRef {
            tile_no: self.tile_no,
            refcount: Arc::clone(&self.refcount),
        }
    }
}
