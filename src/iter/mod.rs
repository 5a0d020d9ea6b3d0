//! Polymorphic lazy iterator algebra (§3.7, §4.3): every iterator variant
//! implements the same small surface — `next`/`find`/`check`/`statistics`,
//! plus cloning, resetting, and freeze/thaw for cursor persistence — so the
//! planner and the runloop can treat a `gmap` leaf and an `and` combinator
//! identically.

mod combinators;
mod cursor;
mod join;
mod predicate;
mod sorted;

pub use combinators::{AndIter, OrIter, SortIter, WithoutIter};
pub use cursor::{freeze_ids, thaw, ThawContext};
pub use join::{build_vip, IsaIter, LinksToIter};
pub use predicate::{AtomicChecker, ConstraintGuard};
pub use sorted::{SortedIdIter, SortedKind};

use crate::{guid::Id, primitive::Linkage, Result};

/// Forward (ascending) or reverse (descending) iteration order (§4.3).
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Direction {
    Forward,
    Reverse,
}

/// Result of `next`/`find`: either a value, natural exhaustion, or a
/// request to suspend because the budget ran out mid-operation.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Outcome<T> {
    Value(T),
    Done,
    NeedsMore,
}

impl<T> Outcome<T> {
    pub fn is_needs_more(&self) -> bool {
        matches!(self, Outcome::NeedsMore)
    }
}

/// Result of `check(id)`: is `id` a member, possibly without knowing yet.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum CheckOutcome {
    Yes,
    No,
    NeedsMore,
}

/// Cost/shape summary an iterator reports to the planner (§4.3's cost
/// model inputs: cardinality estimate and per-operation cost class).
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Stats {
    pub cardinality: Option<u64>,
    pub next_cost: i64,
    pub find_cost: i64,
    pub check_cost: i64,
    pub sorted: bool,
    pub direction: Direction,
}

/// What a producer has already nailed down about the primitive it is
/// walking, consulted by the planner to avoid re-checking constraints an
/// upstream iterator already guarantees (§3.7 "primitive_summary").
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct PrimitiveSummary {
    pub locked: Vec<(Linkage, Id)>,
    pub complete: bool,
}

/// Which part of a cursor to render: the member set identity, the current
/// position within it, or (for stateful combinators) auxiliary state
/// (§4.3/§6 cursor grammar: `<type>:<set>[/<position>[/<state>]]`).
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum FreezeWhich {
    Set,
    Position,
    State,
}

/// Common surface implemented by every iterator variant (`all`, `null`,
/// `gmap`, `bgmap`, `hmap`, `vip`, `fixed`, `prefix`, `isa`, `linksto`,
/// `sort`, `without`, `or`, `and`).
pub trait GraphIterator: std::fmt::Debug {
    /// Wire prefix used in the frozen-cursor text, e.g. `"gmap"`, `"and"`.
    fn type_prefix(&self) -> &'static str;

    /// Advance and return the next member in `direction()`, or suspend.
    fn next(&mut self, budget: &mut crate::budget::Budget) -> Result<Outcome<Id>>;

    /// Reposition to the smallest member `>= id` (forward) or largest
    /// member `<= id` (reverse); that member becomes the new anchor, so a
    /// following `next` yields the member just past it.
    fn find(&mut self, budget: &mut crate::budget::Budget, id: Id) -> Result<Outcome<Id>>;

    /// Test membership without disturbing the iterator's position.
    fn check(&mut self, budget: &mut crate::budget::Budget, id: Id) -> Result<CheckOutcome>;

    /// Cheap, budget-free shape/cost summary.
    fn stats(&self) -> Stats;

    fn direction(&self) -> Direction;

    /// Independent copy sharing immutable backing data but starting from
    /// this iterator's current position.
    fn clone_box(&self) -> Box<dyn GraphIterator>;

    /// Rewind to the starting position in `direction()`.
    fn reset(&mut self);

    /// `true` once `next`/`find` can provably yield nothing more useful
    /// relative to `id` (used by `and` to short-circuit a producer once a
    /// checker has run past the producer's current candidate).
    fn beyond(&self, id: Id) -> bool;

    fn primitive_summary(&self) -> PrimitiveSummary {
        PrimitiveSummary::default()
    }

    /// Render one cursor component as the text the wire/storage codec uses
    /// to resume this iterator later (§4.3/§6).
    fn freeze(&self, which: FreezeWhich) -> String;
}

/// Intersect two ascending, duplicate-free id slices via the
/// binary-search divide-and-conquer described for two sorted arrays
/// (§4.3): always recurse on the smaller side, locating its pivot's
/// position in the larger side by binary search rather than a linear
/// merge scan. Output is already ascending; no final sort needed.
pub fn intersect_sorted(a: &[Id], b: &[Id]) -> Vec<Id> {
    let mut out = Vec::new();
    intersect_into(a, b, &mut out);
    out
}

fn intersect_into(a: &[Id], b: &[Id], out: &mut Vec<Id>) {
    if a.is_empty() || b.is_empty() {
        return;
    }
    let (a, b) = if a.len() <= b.len() { (a, b) } else { (b, a) };
    let m = a.len() / 2;
    let pivot = a[m];
    let pos = b.partition_point(|&x| x < pivot);
    intersect_into(&a[..m], &b[..pos], out);
    if pos < b.len() && b[pos] == pivot {
        out.push(pivot);
    }
    intersect_into(&a[m + 1..], &b[pos..], out);
}
