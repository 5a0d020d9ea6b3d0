//! Pattern tree (§3.5): describes how to shape a constraint's output.
//! Nodes are drawn from a closed tag set; each carries independent
//! sort/sample/collect flags and an optional or-branch index used once a
//! pattern has been rewritten under an or-group (§4.4).

use crate::{err_at, Result};

/// Primitive-field leaves (§3.1's attributes, plus the derived
/// `datatype`/`next`/`previous`/`meta` views).
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum PrimitiveField {
    Guid,
    Name,
    Value,
    Type,
    Typeguid,
    Left,
    Right,
    Scope,
    Live,
    Archival,
    Datatype,
    Valuetype,
    Timestamp,
    Generation,
    Next,
    Previous,
    Meta,
}

/// Aggregate leaves: computed over the matching set rather than read off
/// one primitive. `Contents` and the others are each subject to a
/// once-per-result-clause cardinality rule, enforced by [Pattern::validate].
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Aggregate {
    Count,
    Estimate,
    EstimateCount,
    Iterator,
    Cursor,
    Timeout,
    Contents,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum SortDirection {
    None,
    Ascending,
    Descending,
}

#[derive(Clone, Debug, PartialEq)]
pub enum PatternKind {
    /// A literal constant rendered verbatim (e.g. a quoted string).
    Literal(crate::value::Value),
    /// `$name` reference to a variable declaration (§3.6).
    Variable(String),
    Field(PrimitiveField),
    Aggregate(Aggregate),
    /// Sequence; `(name value)` etc. At most one element may itself be a
    /// `List`, and nesting may go no deeper than two `List`s total.
    List(Vec<Pattern>),
    /// Selects among alternatives, one per or-branch, indexed by the
    /// alternative's `or_index` (§4.4's pick-assignment rewrite).
    Pick(Vec<Pattern>),
}

#[derive(Clone, Debug, PartialEq)]
pub struct Pattern {
    pub kind: PatternKind,
    pub sort: SortDirection,
    pub sample: bool,
    pub collect: bool,
    pub or_index: Option<u32>,
}

impl Pattern {
    pub fn new(kind: PatternKind) -> Pattern {
        Pattern { kind, sort: SortDirection::None, sample: false, collect: false, or_index: None }
    }

    pub fn with_sort(mut self, dir: SortDirection) -> Pattern {
        self.sort = dir;
        self
    }

    pub fn with_sample(mut self, sample: bool) -> Pattern {
        self.sample = sample;
        self
    }

    pub fn with_collect(mut self, collect: bool) -> Pattern {
        self.collect = collect;
        self
    }

    pub fn with_or_index(mut self, idx: u32) -> Pattern {
        self.or_index = Some(idx);
        self
    }

    /// Nested-list depth rooted at this node; a leaf is depth 0.
    pub fn depth(&self) -> usize {
        match &self.kind {
            PatternKind::List(items) => 1 + items.iter().map(Pattern::depth).max().unwrap_or(0),
            PatternKind::Pick(items) => items.iter().map(Pattern::depth).max().unwrap_or(0),
            _ => 0,
        }
    }

    /// Enforce §3.5's structural invariants: depth <= 2, at most one
    /// nested `List` per `List`, and `contents`/other aggregates appear at
    /// most once among a `List`'s direct children.
    pub fn validate(&self) -> Result<()> {
        if self.depth() > 2 {
            return err_at!(Semantics, msg: "pattern nests lists deeper than 2 levels");
        }
        self.validate_list_rules()
    }

    fn validate_list_rules(&self) -> Result<()> {
        if let PatternKind::List(items) = &self.kind {
            let nested_lists = items.iter().filter(|p| matches!(p.kind, PatternKind::List(_))).count();
            if nested_lists > 1 {
                return err_at!(Semantics, msg: "more than one nested list in a single result list");
            }
            let contents_count = items
                .iter()
                .filter(|p| matches!(p.kind, PatternKind::Aggregate(Aggregate::Contents)))
                .count();
            if contents_count > 1 {
                return err_at!(Semantics, msg: "`contents` appears more than once at one result level");
            }
            for other in [Aggregate::Count, Aggregate::Cursor, Aggregate::Timeout, Aggregate::Estimate, Aggregate::EstimateCount, Aggregate::Iterator] {
                let n = items.iter().filter(|p| matches!(p.kind, PatternKind::Aggregate(a) if a == other)).count();
                if n > 1 {
                    return err_at!(Semantics, msg: "aggregate {:?} appears more than once in one result clause", other);
                }
            }
        }
        match &self.kind {
            PatternKind::List(items) | PatternKind::Pick(items) => {
                for item in items {
                    item.validate_list_rules()?;
                }
            }
            _ => {}
        }
        Ok(())
    }
}

#[cfg(test)]
#[path = "pattern_test.rs"]
mod pattern_test;
