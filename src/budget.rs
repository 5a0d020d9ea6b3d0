//! Cooperative-scheduling budget (§4.3, §5, GLOSSARY): an integer cost
//! allowance threaded through every iterator operation. Crossing zero
//! forces the current call to yield [crate::iter::Outcome::NeedsMore]
//! back to the runloop instead of completing.

/// Per-operation costs charged against a [Budget]. Values are small
/// integers, not wall-clock units; they only need to be comparable to
/// each other and to a request's configured allowance.
pub mod cost {
    pub const NEXT_SORTED: i64 = 1;
    pub const NEXT_COMPOSITE: i64 = 2;
    pub const FIND_ARRAY: i64 = 4; // O(log n)-ish
    pub const FIND_BITMAP: i64 = 1; // O(1)
    pub const CHECK_ARRAY: i64 = 4;
    pub const CHECK_BITMAP: i64 = 1;
    pub const STATISTICS: i64 = 8;
}

/// Remaining cooperative-scheduling allowance for one request.
#[derive(Clone, Copy, Debug)]
pub struct Budget {
    remaining: i64,
}

impl Budget {
    pub fn new(allowance: i64) -> Budget {
        Budget { remaining: allowance }
    }

    /// Charge `amount`, returning `true` if the budget is still positive
    /// afterwards (i.e. the caller may proceed), `false` if it has been
    /// exhausted and the caller must return `NeedsMore`.
    pub fn charge(&mut self, amount: i64) -> bool {
        self.remaining -= amount;
        self.remaining > 0
    }

    pub fn remaining(&self) -> i64 {
        self.remaining
    }

    pub fn is_exhausted(&self) -> bool {
        self.remaining <= 0
    }

    /// Refill, e.g. when a suspended request resumes with a fresh quantum.
    pub fn refill(&mut self, allowance: i64) {
        self.remaining = allowance;
    }
}

#[cfg(test)]
#[path = "budget_test.rs"]
mod budget_test;
