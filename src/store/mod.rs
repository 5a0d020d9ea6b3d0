//! Block store facade (§4.1).
//!
//! The real page/tile manager and file-backed memory map are, per §1,
//! an out-of-scope collaborator: "treated as a block store exporting
//! `get(offset)→page`, `put`, `alloc`, `grow`, with tile references acting
//! as pinned borrows." [BlockStore] is a concrete, in-memory-backed
//! implementation of exactly that facade — one per partition file — so
//! the GMAP/iterator/planner/execution pipeline above it is exercisable
//! without a real mmap.

mod tile;

pub use tile::{Tile, TileRef};

use std::{
    collections::HashMap,
    sync::{atomic::AtomicUsize, atomic::Ordering::SeqCst, Arc},
};

use crate::{err_at, Result};

/// Tile size in bytes; mirrors the 4KB block convention used throughout
/// this engine's storage layer.
pub const TILE_SIZE: u64 = 4 * 1024;

/// One partition's worth of paged, refcounted storage.
pub struct BlockStore {
    name: String,
    data: Vec<u8>,
    tile_refs: HashMap<u64, Arc<AtomicUsize>>,
}

impl BlockStore {
    pub fn new(name: impl Into<String>) -> BlockStore {
        BlockStore {
            name: name.into(),
            data: Vec::new(),
            tile_refs: HashMap::new(),
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// Current allocated size of this partition.
    pub fn len(&self) -> u64 {
        self.data.len() as u64
    }

    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }

    /// Grow the backing storage to at least `new_size` bytes, zero-filled.
    pub fn grow(&mut self, new_size: u64) -> Result<()> {
        let new_size = err_at!(FailConvert, usize::try_from(new_size))?;
        if new_size > self.data.len() {
            self.data.resize(new_size, 0);
        }
        Ok(())
    }

    /// Reserve `size` contiguous bytes. Never spans a tile boundary: if
    /// `size` would not fit in the current tile's remaining room, the
    /// request is pushed to the start of the next tile (the caller sees
    /// this as the returned offset, effectively "splitting" wasted tail
    /// space off rather than fragmenting the allocation across tiles).
    pub fn alloc(&mut self, size: u64) -> Result<u64> {
        if size > TILE_SIZE {
            return err_at!(
                InvalidInput,
                msg: "alloc of {} exceeds tile size {}", size, TILE_SIZE
            );
        }
        let mut offset = self.data.len() as u64;
        let room = TILE_SIZE - (offset % TILE_SIZE);
        if size > room {
            offset += room;
        }
        self.grow(offset + size)?;
        Ok(offset)
    }

    /// Overwrite `value` at `offset`, growing storage if needed.
    pub fn put(&mut self, offset: u64, value: &[u8]) -> Result<()> {
        let end = offset + value.len() as u64;
        self.grow(end)?;
        let start = err_at!(FailConvert, usize::try_from(offset))?;
        let end_u = err_at!(FailConvert, usize::try_from(end))?;
        self.data[start..end_u].copy_from_slice(value);
        Ok(())
    }

    /// Pin and return the tile containing `offset`.
    pub fn get(&mut self, offset: u64) -> Result<(Tile, TileRef)> {
        if offset >= self.data.len() as u64 {
            return err_at!(
                InvalidInput,
                msg: "offset {} beyond partition {} (len {})", offset, self.name, self.data.len()
            );
        }
        let tile_no = offset / TILE_SIZE;
        let start = tile_no * TILE_SIZE;
        let end = (start + TILE_SIZE).min(self.data.len() as u64);
        let (s, e) = (start as usize, end as usize);
        let bytes: Arc<[u8]> = self.data[s..e].into();

        let refcount = self
            .tile_refs
            .entry(tile_no)
            .or_insert_with(|| Arc::new(AtomicUsize::new(0)));
        refcount.fetch_add(1, SeqCst);

        Ok((
            Tile { offset: start, bytes },
            TileRef {
                tile_no,
                refcount: Arc::clone(refcount),
            },
        ))
    }

    /// Return the longest contiguous run of bytes starting at `start`, not
    /// crossing a tile boundary and not exceeding `end`.
    pub fn read_raw(&mut self, start: u64, end: u64) -> Result<(Arc<[u8]>, u64, TileRef)> {
        if start >= self.data.len() as u64 {
            return err_at!(
                InvalidInput,
                msg: "read_raw start {} beyond partition {} (len {})", start, self.name, self.data.len()
            );
        }
        let tile_no = start / TILE_SIZE;
        let tile_end = (tile_no + 1) * TILE_SIZE;
        let actual_end = end.min(tile_end).min(self.data.len() as u64);
        let (s, e) = (start as usize, actual_end as usize);
        let bytes: Arc<[u8]> = self.data[s..e].into();

        let refcount = self
            .tile_refs
            .entry(tile_no)
            .or_insert_with(|| Arc::new(AtomicUsize::new(0)));
        refcount.fetch_add(1, SeqCst);

        Ok((
            bytes,
            actual_end,
            TileRef {
                tile_no,
                refcount: Arc::clone(refcount),
            },
        ))
    }

    /// Number of tiles with at least one live [TileRef]. Used by tests to
    /// assert that a request (e.g. one that timed out) released every pin
    /// it took (§5, "the engine drains all pinned tile references before
    /// suspending").
    pub fn pinned_tile_count(&self) -> usize {
        self.tile_refs.values().filter(|r| r.load(SeqCst) > 0).count()
    }
}

#[cfg(test)]
#[path = "mod_test.rs"]
mod mod_test;
