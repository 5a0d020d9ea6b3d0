//! Per-database causal read watermark (§5, GLOSSARY "Dateline"): a vector
//! of `(partition, max_id)` pairs pinning a read's horizon so it never
//! observes a subset of a set it already saw within the same request.

use crate::guid::Id;

/// One partition's high-water mark as of some point in the write stream.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Watermark {
    pub partition: u64,
    pub max_id: Id,
}

/// A causal horizon: the highest id observed per partition. Comparisons
/// are pointwise; a dateline "covers" another if it dominates it on every
/// partition the other names.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct Dateline {
    marks: Vec<Watermark>,
}

impl Dateline {
    pub fn new() -> Dateline {
        Dateline::default()
    }

    /// Record (or raise) a partition's watermark.
    pub fn observe(&mut self, partition: u64, max_id: Id) {
        match self.marks.iter_mut().find(|w| w.partition == partition) {
            Some(w) => w.max_id = w.max_id.max(max_id),
            None => self.marks.push(Watermark { partition, max_id }),
        }
    }

    pub fn max_id_of(&self, partition: u64) -> Id {
        self.marks.iter().find(|w| w.partition == partition).map(|w| w.max_id).unwrap_or(0)
    }

    /// `true` if every partition named in `other` is covered by `self`,
    /// i.e. a read with this horizon has already seen everything `other`
    /// pins.
    pub fn covers(&self, other: &Dateline) -> bool {
        other.marks.iter().all(|w| self.max_id_of(w.partition) >= w.max_id)
    }

    /// Merge `other`'s watermarks into `self`, keeping the higher of the
    /// two per partition (a read's horizon only ever grows).
    pub fn merge(&mut self, other: &Dateline) {
        for w in other.marks.iter() {
            self.observe(w.partition, w.max_id);
        }
    }

    /// Render as the `dateline="..."` reply modifier text: comma-separated
    /// `partition.max_id` pairs, ascending by partition.
    pub fn serialize(&self) -> String {
        let mut marks = self.marks.clone();
        marks.sort_by_key(|w| w.partition);
        marks.iter().map(|w| format!("{}.{}", w.partition, w.max_id)).collect::<Vec<_>>().join(",")
    }

    pub fn parse(text: &str) -> crate::Result<Dateline> {
        if text.is_empty() {
            return Ok(Dateline::new());
        }
        let mut d = Dateline::new();
        for part in text.split(',') {
            let (p, m) = part.split_once('.').ok_or_else(|| {
                crate::Error::Syntax("dateline".into(), format!("malformed dateline entry {:?}", part))
            })?;
            let partition: u64 = crate::err_at!(Syntax, p.parse(), "parsing dateline partition {:?}", p)?;
            let max_id: Id = crate::err_at!(Syntax, m.parse(), "parsing dateline max_id {:?}", m)?;
            d.observe(partition, max_id);
        }
        Ok(d)
    }
}

#[cfg(test)]
#[path = "dateline_test.rs"]
mod dateline_test;
