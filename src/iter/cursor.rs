//! Cursor persistence: render a frozen iterator to the wire/storage text
//! format `<type>:<set>[/<position>[/<state>]]` (§4.3/§6) and parse it back
//! into a live iterator given a [ThawContext] that can re-resolve each leaf
//! variant's backing set from the still-live store.

use std::sync::Arc;

use crate::{
    guid::Id,
    iter::{sorted::Kind, Direction, GraphIterator, SortedIdIter},
};

pub fn freeze_ids(ids: &[Id]) -> String {
    ids.iter().map(|id| id.to_string()).collect::<Vec<_>>().join(",")
}

fn parse_ids(text: &str) -> Vec<Id> {
    if text.is_empty() {
        return Vec::new();
    }
    text.split(',').filter_map(|s| s.parse().ok()).collect()
}

/// Callbacks a thaw call uses to re-resolve a leaf variant's live backing
/// set; the frozen text only ever names the set, never its contents, so a
/// resumed cursor always reflects the current state of the store.
pub struct ThawContext<'a> {
    pub resolve_all: Box<dyn Fn() -> Vec<Id> + 'a>,
    pub resolve_gmap: Box<dyn Fn(&str) -> Vec<Id> + 'a>,
    pub resolve_bgmap: Box<dyn Fn(&str) -> Vec<Id> + 'a>,
    pub resolve_hmap: Box<dyn Fn(&str) -> Vec<Id> + 'a>,
    pub resolve_prefix: Box<dyn Fn(&str) -> Vec<Id> + 'a>,
}

/// Parse one frozen cursor string back into a live, leaf iterator.
/// Composite types (`and`/`or`/`without`) are reconstructed by the caller
/// from their own sub-cursor bookkeeping, not by this function, since only
/// the planner knows how to re-derive which sub-iterator played which
/// role.
pub fn thaw(text: &str, direction: Direction, ctx: &ThawContext) -> crate::Result<Box<dyn GraphIterator>> {
    let (head, rest) = match text.split_once('/') {
        Some((h, r)) => (h, Some(r)),
        None => (text, None),
    };
    let (kind_str, set) = head.split_once(':').ok_or_else(|| {
        crate::Error::Syntax("cursor".into(), format!("missing ':' in cursor head {:?}", head))
    })?;
    let (position, state) = match rest {
        Some(r) => match r.split_once('/') {
            Some((p, s)) => (Some(p), Some(s)),
            None => (Some(r), None),
        },
        None => (None, None),
    };
    let (kind, data) = match kind_str {
        "all" => (Kind::All, (ctx.resolve_all)()),
        "null" => (Kind::Null, Vec::new()),
        "gmap" => (Kind::Gmap, (ctx.resolve_gmap)(set)),
        "bgmap" => (Kind::Bgmap, (ctx.resolve_bgmap)(set)),
        "hmap" => (Kind::Hmap, (ctx.resolve_hmap)(set)),
        "prefix" => (Kind::Prefix, (ctx.resolve_prefix)(set)),
        "fixed" => (Kind::Fixed, parse_ids(set)),
        // `isa`/`linksto`/`vip` only ever freeze once their join has already
        // been materialized into a literal id array (same trade `sort`
        // makes), so thawing them back just re-parses that array rather
        // than re-running the join against the live store.
        "isa" => (Kind::Isa, parse_ids(set)),
        "linksto" => (Kind::Linksto, parse_ids(set)),
        "vip" => (Kind::Vip, parse_ids(set)),
        other => {
            return Err(crate::Error::Syntax("cursor".into(), format!("unknown iterator type {:?}", other)))
        }
    };
    Ok(Box::new(super::sorted::thaw_sorted(kind, set, data, direction, position, state)))
}

/// Trivial registry-free resolver used when a `fixed` set is frozen with
/// its literal ids embedded in the set text (no store lookup needed).
pub fn fixed_iter(ids: Vec<Id>, direction: Direction, masquerade: Option<Arc<str>>) -> SortedIdIter {
    let mut sorted = ids.clone();
    sorted.sort_unstable();
    sorted.dedup();
    let it = SortedIdIter::new(Kind::Fixed, freeze_ids(&sorted), sorted, direction);
    match masquerade {
        Some(name) => it.with_masquerade(name.to_string()),
        None => it,
    }
}

#[cfg(test)]
#[path = "cursor_test.rs"]
mod cursor_test;
