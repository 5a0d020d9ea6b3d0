//! Constraint tree (§3.4) and or-branch handling (§4.4). A constraint
//! restricts a set of primitive ids and may own sub-constraints linked by
//! a [Linkage], plus an or-group of alternative sub-constraints that
//! inherit defaults from their prototype.
//!
//! Sub-constraints and or-branches are owned recursively (`Box<Constraint>`)
//! rather than addressed through a separate index arena: this crate's
//! request lifetime is just "one call stack", so Rust's ordinary ownership
//! already gives the en-masse teardown §3.9 asks for, without needing the
//! bump-allocator indirection the rest of the design notes describe for
//! the arena's original host language (see DESIGN.md).

use crate::{err_at, guid::Id, pattern::Pattern, primitive::Linkage, variable::VariableId, Guid, Result};

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum CompareOp {
    Eq,
    Ne,
    Match,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum AtomicField {
    Name,
    Value,
    Type,
    Typeguid,
    Left,
    Right,
    Scope,
    Guid,
}

#[derive(Clone, Debug, PartialEq)]
pub enum AtomicValue {
    Bytes(Vec<u8>),
    Guid(Guid),
}

/// `field op {values}` — a literal-set predicate (§3.4).
#[derive(Clone, Debug, PartialEq)]
pub struct AtomicPredicate {
    pub field: AtomicField,
    pub op: CompareOp,
    pub values: Vec<AtomicValue>,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Meta {
    Node,
    EdgeTo,
    EdgeFrom,
    Any,
}

/// An inclusive numeric bound; `None` on either side means unbounded.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct Range<T> {
    pub min: Option<T>,
    pub max: Option<T>,
}

impl<T: PartialOrd + Copy> Range<T> {
    pub fn contains(&self, v: T) -> bool {
        self.min.map_or(true, |m| v >= m) && self.max.map_or(true, |m| v <= m)
    }

    pub fn is_unbounded(&self) -> bool {
        self.min.is_none() && self.max.is_none()
    }
}

/// Which linkage field, and which direction, connects a constraint to its
/// parent: `Forward` means the parent is that linkage of the child (e.g.
/// parent is the child's `right`); `Reverse` is the symmetric case.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct LinkageRef {
    pub field: Linkage,
    pub forward: bool,
}

/// One alternative under an or-group: `head` always present, `tail`
/// optional (`(A) | (B) | (C)` chains via repeated two-way groups).
#[derive(Clone, Debug, PartialEq)]
pub struct OrBranch {
    pub head: Box<Constraint>,
    pub tail: Option<Box<Constraint>>,
    /// `true` for `||` (short-circuit: stop at first matching branch),
    /// `false` for `|` (full-or: evaluate and union every branch).
    pub short_circuit: bool,
}

/// Fields that §4.4 forbids setting locally inside an or-branch; they
/// must live on the prototype.
fn branch_violates_forbidden_fields(c: &Constraint) -> bool {
    c.result_pattern.is_some()
        || c.linkage.is_some()
        || c.sort_pattern.is_some()
        || c.page_size.is_some()
        || c.cursor.is_some()
        || c.count_limit.is_some()
}

#[derive(Clone, Debug, Default, PartialEq)]
pub struct Constraint {
    pub linkage: Option<LinkageRef>,
    pub meta: Option<Meta>,
    pub atomic: Vec<AtomicPredicate>,
    pub live: Option<bool>,
    pub archival: Option<bool>,
    pub valuetype: Option<u8>,
    pub timestamp_range: Range<u64>,
    pub generation_range: Range<u32>,
    pub count_range: Range<u64>,
    pub dateline_range: Range<Id>,
    pub or_branches: Vec<OrBranch>,
    pub result_pattern: Option<Pattern>,
    pub sort_pattern: Option<Pattern>,
    pub assignments: Vec<(VariableId, Pattern)>,
    pub cursor: Option<String>,
    pub page_size: Option<usize>,
    pub count_limit: Option<u64>,
    pub start_offset: Option<u64>,
    pub children: Vec<Constraint>,

    // planning-time caches (§3.4's last bullet).
    pub computed_iterator_shape: Option<String>,
    pub bad_id_cache: Vec<Id>,
    pub sort_root: bool,
    /// Non-`None` once this or-branch was found to conflict irreconcilably
    /// with its prototype (§4.4: "local overrides that conflict ... force
    /// the prototype false"); a dead branch never matches anything.
    pub dead: bool,
}

impl Constraint {
    pub fn new() -> Constraint {
        Constraint::default()
    }

    /// Validate every or-branch under this constraint against §4.4's
    /// forbidden-field rule, recursively.
    pub fn validate_or_branches(&self) -> Result<()> {
        for group in &self.or_branches {
            if branch_violates_forbidden_fields(&group.head) {
                return err_at!(Semantics, msg: "or-branch sets a prototype-only field");
            }
            if let Some(tail) = &group.tail {
                if branch_violates_forbidden_fields(tail) {
                    return err_at!(Semantics, msg: "or-branch sets a prototype-only field");
                }
                tail.validate_or_branches()?;
            }
            group.head.validate_or_branches()?;
        }
        for child in &self.children {
            child.validate_or_branches()?;
        }
        Ok(())
    }

    /// Apply §4.4 inheritance: a branch missing a field picks it up from
    /// `self` (the prototype); a branch whose local value conflicts with a
    /// non-default prototype value marks the branch [Constraint::dead]
    /// rather than erroring, since a conflicting branch is simply
    /// unsatisfiable, not malformed.
    pub fn apply_or_inheritance(&mut self) {
        let proto_linkage = self.linkage;
        let proto_meta = self.meta;
        let proto_live = self.live;
        let proto_archival = self.archival;
        let proto_valuetype = self.valuetype;
        let proto_atomic = self.atomic.clone();
        let proto_generation_range = self.generation_range;
        let proto_timestamp_range = self.timestamp_range;
        for group in self.or_branches.iter_mut() {
            inherit_branch(
                &mut group.head,
                proto_linkage,
                proto_meta,
                proto_live,
                proto_archival,
                proto_valuetype,
                &proto_atomic,
                proto_generation_range,
                proto_timestamp_range,
            );
            if let Some(tail) = group.tail.as_mut() {
                inherit_branch(
                    tail,
                    proto_linkage,
                    proto_meta,
                    proto_live,
                    proto_archival,
                    proto_valuetype,
                    &proto_atomic,
                    proto_generation_range,
                    proto_timestamp_range,
                );
            }
        }
    }
}

/// A branch's own `linkage` field is always `None` at this point
/// (`branch_violates_forbidden_fields` already rejects a branch that sets
/// one), so this always adopts the prototype's rather than ever
/// conflicting; `atomic` doubles as both "comparator" and "link-GUID"
/// inheritance from §4.4's list, since both are represented as
/// [AtomicPredicate] entries on this struct.
#[allow(clippy::too_many_arguments)]
fn inherit_branch(
    branch: &mut Constraint,
    linkage: Option<LinkageRef>,
    meta: Option<Meta>,
    live: Option<bool>,
    archival: Option<bool>,
    valuetype: Option<u8>,
    atomic: &[AtomicPredicate],
    generation_range: Range<u32>,
    timestamp_range: Range<u64>,
) {
    merge_field(&mut branch.linkage, linkage, &mut branch.dead);
    merge_field(&mut branch.meta, meta, &mut branch.dead);
    merge_field(&mut branch.live, live, &mut branch.dead);
    merge_field(&mut branch.archival, archival, &mut branch.dead);
    merge_field(&mut branch.valuetype, valuetype, &mut branch.dead);
    merge_atomic(&mut branch.atomic, atomic, &mut branch.dead);
    merge_range(&mut branch.generation_range, generation_range, &mut branch.dead);
    merge_range(&mut branch.timestamp_range, timestamp_range, &mut branch.dead);
}

fn merge_field<T: PartialEq + Copy>(local: &mut Option<T>, proto: Option<T>, dead: &mut bool) {
    match (*local, proto) {
        (None, Some(p)) => *local = Some(p),
        (Some(l), Some(p)) if l != p => *dead = true,
        _ => {}
    }
}

fn merge_atomic(local: &mut Vec<AtomicPredicate>, proto: &[AtomicPredicate], dead: &mut bool) {
    if local.is_empty() {
        local.extend_from_slice(proto);
    } else if !proto.is_empty() && local.as_slice() != proto {
        *dead = true;
    }
}

fn merge_range<T: PartialEq + PartialOrd + Copy>(local: &mut Range<T>, proto: Range<T>, dead: &mut bool) {
    if local.is_unbounded() {
        *local = proto;
    } else if !proto.is_unbounded() && *local != proto {
        *dead = true;
    }
}

#[cfg(test)]
#[path = "constraint_test.rs"]
mod constraint_test;
