//! The four (five, counting empty) physical representations one GMAP key
//! can take (§3.3), and the promotion algorithm between them (§4.2).

use croaring::Bitmap;

use std::convert::TryFrom;

use crate::{config::Config, err_at, gmap::idarray::IdArray, guid::Id, Error, Result};

/// One key's backing storage. `Empty` carries no bytes at all; `Singleton`
/// is inline; `MultiArray` is the sorted power-of-two bucket; `LargeFile`
/// is the unbounded append-only overflow; `Bitmap` is the dense-range
/// representation.
pub enum Repr {
    Empty,
    Singleton(Id),
    /// `exp` is the current capacity tier: the bucket holds `2^exp` slots
    /// once it has ever reached that size; `data.len() <= 2^exp`.
    MultiArray { data: Vec<Id>, exp: u8 },
    LargeFile(Vec<Id>),
    Bitmap(Bitmap),
}

impl Repr {
    pub fn as_idarray(&self) -> IdArray<'_> {
        match self {
            Repr::Empty => IdArray::Empty,
            Repr::Singleton(id) => IdArray::Singleton(*id),
            Repr::MultiArray { data, .. } => IdArray::Slice(data),
            Repr::LargeFile(data) => IdArray::Slice(data),
            Repr::Bitmap(b) => IdArray::Bitmap(b),
        }
    }

    pub fn len(&self) -> usize {
        self.as_idarray().len()
    }

    /// Name used in planner heatmaps and tests; matches the on-the-wire
    /// iterator type prefixes of the same shapes (§6) where applicable.
    pub fn shape_name(&self) -> &'static str {
        match self {
            Repr::Empty => "empty",
            Repr::Singleton(_) => "singleton",
            Repr::MultiArray { .. } => "multi-array",
            Repr::LargeFile(_) => "large-file",
            Repr::Bitmap(_) => "bitmap",
        }
    }

    fn last_id(&self) -> Option<Id> {
        match self {
            Repr::Empty => None,
            Repr::Singleton(id) => Some(*id),
            Repr::MultiArray { data, .. } => data.last().copied(),
            Repr::LargeFile(data) => data.last().copied(),
            Repr::Bitmap(b) => b.maximum().map(|v| v as Id),
        }
    }

    /// Append `target`, migrating representation as needed. `max_id` is
    /// the current high-water mark of the id space, consulted only for
    /// the large-file→bitmap density rule.
    pub fn add(
        &mut self,
        target: Id,
        duplicates_ok: bool,
        config: &Config,
        max_id: Id,
    ) -> Result<()> {
        if let Some(last) = self.last_id() {
            if last == target {
                return if duplicates_ok {
                    Ok(())
                } else {
                    err_at!(Already, msg: "target {} already present", target)
                };
            }
            if last > target {
                return err_at!(System, msg: "inserted out of order: {} after {}", target, last);
            }
        }

        match self {
            Repr::Empty => {
                *self = Repr::Singleton(target);
            }
            Repr::Singleton(prev) => {
                *self = Repr::MultiArray {
                    data: vec![*prev, target],
                    exp: 1,
                };
            }
            Repr::MultiArray { data, exp } => {
                if data.len() == (1usize << *exp) {
                    *exp += 1;
                }
                data.push(target);
                if config.needs_large_file(*exp) {
                    let data = std::mem::take(data);
                    log::debug!("gmap representation promoted: multi-array(exp={}) -> large-file({} ids)", exp, data.len());
                    *self = Repr::LargeFile(data);
                }
            }
            Repr::LargeFile(data) => {
                data.push(target);
                if config.needs_bitmap(data.len() as u64, max_id.max(1)) {
                    let ids = std::mem::take(data);
                    log::debug!("gmap representation promoted: large-file({} ids) -> bitmap", ids.len());
                    let mut bm = Bitmap::create();
                    for id in ids {
                        let v = err_at!(FailConvert, u32::try_from(id))?;
                        bm.add(v);
                    }
                    *self = Repr::Bitmap(bm);
                }
            }
            Repr::Bitmap(bm) => {
                let v = err_at!(FailConvert, u32::try_from(target))?;
                bm.add(v);
            }
        }
        Ok(())
    }
}

#[cfg(test)]
#[path = "repr_test.rs"]
mod repr_test;
