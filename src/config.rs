//! Runtime tunables (§6, §9): every magic number left as a bare constant
//! elsewhere in this design is a field here instead, with the same
//! default value.

use serde::{Deserialize, Serialize};

use std::{fs, path::Path};

use crate::{err_at, Error, Result};

/// Database/engine-wide configuration. Deserializable from TOML.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// `source / partition_stride` selects the partition file for a GMAP key.
    pub partition_stride: u64,
    /// Multi-array exponent above which a GMAP key migrates to large-file.
    pub split_threshold: u8,
    /// Initial capacity, in entries, reserved when a key first migrates to
    /// large-file representation.
    pub large_file_initial_map: u64,
    /// Above this array size, intersections are materialized eagerly into a
    /// `fixed` iterator rather than planned as a lazy `and`.
    pub fast_intersect_max: usize,
    /// Capacity of the per-request bad-id / checker cache.
    pub check_cache_cap: usize,
    /// Width, in milliseconds, of the rolling read-suspend pressure window.
    pub read_suspends_window_ms: u64,
    /// Numerator in the bitmap-density promotion rule `size*N > max_id`.
    pub bitmap_density_numerator: u64,
    /// Minimum array size before the bitmap-density rule is even consulted.
    pub bitmap_density_min_size: u64,
    /// Default `resultpagesize` when a request does not specify one.
    pub page_size_default: usize,
    /// Default count-limit when a request does not specify one.
    pub count_limit_default: u64,
    /// Default per-request cooperative-scheduling budget.
    pub budget_default: i64,
    /// Capacity of the iterator-state coat-check cache (§3.9, §9).
    pub coat_check_capacity: usize,
}

impl Default for Config {
    fn default() -> Config {
        Config {
            partition_stride: 1 << 20,
            split_threshold: 14,
            large_file_initial_map: 1 << 16,
            fast_intersect_max: 32 * 1024,
            check_cache_cap: 4096,
            read_suspends_window_ms: 120_000,
            bitmap_density_numerator: 40,
            bitmap_density_min_size: 131_072,
            page_size_default: 100,
            count_limit_default: u64::MAX,
            budget_default: 100_000,
            coat_check_capacity: 10_000,
        }
    }
}

impl Config {
    /// Load configuration from a TOML file, falling back to `Default` for
    /// any field the file omits (via `#[serde(default)]`).
    pub fn from_toml_file<P: AsRef<Path>>(path: P) -> Result<Config> {
        let text = err_at!(IOError, fs::read_to_string(path.as_ref()))?;
        Config::from_toml_str(&text)
    }

    /// Parse configuration from a TOML string.
    pub fn from_toml_str(text: &str) -> Result<Config> {
        err_at!(InvalidInput, toml::from_str(text))
    }

    /// Whether `size_exponent` (log2 of a multi-array's capacity) demands
    /// migration to large-file representation.
    pub fn needs_large_file(&self, size_exponent: u8) -> bool {
        size_exponent > self.split_threshold
    }

    /// Whether a large-file backed key of `size` entries, within a keyspace
    /// whose highest id is `max_id`, should migrate to bitmap.
    pub fn needs_bitmap(&self, size: u64, max_id: u64) -> bool {
        size * self.bitmap_density_numerator > max_id && size > self.bitmap_density_min_size
    }
}

#[cfg(test)]
#[path = "config_test.rs"]
mod config_test;
