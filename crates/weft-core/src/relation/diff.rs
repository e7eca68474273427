//! The relation diff algorithm.

use std::collections::HashSet;

use tracing::trace;
use weft_proto::{Position, Ref, RelationOperationSet};

use crate::error::Error;

/// One link row to write: a reference and its 1-based order value.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LinkOp {
    /// Target reference.
    pub reference: Ref,
    /// 1-based order value in the final list.
    pub order: u64,
}

/// The computed difference between the current state and the requested one.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RelationDiff {
    /// Rows to insert or rewrite: new references plus every reference whose
    /// order value changed.
    pub to_link: Vec<LinkOp>,
    /// References whose link rows must be removed.
    pub to_unlink: Vec<Ref>,
    /// The complete final ordered state.
    pub final_order: Vec<Ref>,
}

impl RelationDiff {
    /// Whether applying this diff would change nothing.
    pub fn is_noop(&self) -> bool {
        self.to_link.is_empty() && self.to_unlink.is_empty()
    }
}

/// Reconcile a relation field's current ordered state with an operation set.
///
/// `set` replaces the working list wholesale before the disconnect and
/// connect phases run. Disconnects are validated against the working list:
/// in strict mode a reference that is not linked is an error, unless the
/// same reference also appears in `connect` (the connect wins and the
/// disconnect is dropped). Connects apply in caller order; a positional
/// hint resolves against the working list as mutated so far, and an anchor
/// that is not in the list degrades to an append. Connecting an already
/// linked reference without a position keeps its slot.
///
/// Order values in the result are dense, 1-based, and cover the whole final
/// list; `to_link` reports only the rows whose stored order actually
/// differs from the current state.
pub fn reconcile(current: &[Ref], ops: &RelationOperationSet) -> Result<RelationDiff, Error> {
    ops.validate()?;

    let mut working: Vec<Ref> = match &ops.set {
        Some(set) => {
            // a repeated reference keeps its first slot
            let mut seen = HashSet::new();
            set.iter()
                .map(|r| r.reference())
                .filter(|id| seen.insert(id.clone()))
                .collect()
        }
        None => current.to_vec(),
    };

    let connect_refs: HashSet<Ref> = ops.connect.iter().map(|c| c.reference()).collect();

    for entry in &ops.disconnect {
        let target = entry.reference();
        match working.iter().position(|r| *r == target) {
            Some(index) => {
                working.remove(index);
            }
            None if ops.options.strict && !connect_refs.contains(&target) => {
                return Err(Error::Validation(format!(
                    "cannot disconnect `{target}`: not linked"
                )));
            }
            None => {}
        }
    }

    for entry in &ops.connect {
        let target = entry.reference();
        let existing = working.iter().position(|r| *r == target);
        match (&entry.position, existing) {
            // already linked, no hint: keep the current slot
            (None, Some(_)) => continue,
            (Some(position), Some(index)) => {
                working.remove(index);
                let at = resolve_position(&working, position);
                working.insert(at, target);
            }
            (position, None) => {
                let at = position
                    .as_ref()
                    .map(|p| resolve_position(&working, p))
                    .unwrap_or(working.len());
                working.insert(at, target);
            }
        }
    }

    // Dense 1-based renumber; only rows whose stored order differs from the
    // current state need a write.
    let to_link: Vec<LinkOp> = working
        .iter()
        .enumerate()
        .filter_map(|(index, reference)| {
            let order = index as u64 + 1;
            let unchanged = current
                .iter()
                .position(|r| r == reference)
                .is_some_and(|old| old as u64 + 1 == order);
            (!unchanged).then(|| LinkOp {
                reference: reference.clone(),
                order,
            })
        })
        .collect();

    let final_set: HashSet<&Ref> = working.iter().collect();
    let to_unlink: Vec<Ref> = current
        .iter()
        .filter(|r| !final_set.contains(r))
        .cloned()
        .collect();

    trace!(
        links = to_link.len(),
        unlinks = to_unlink.len(),
        total = working.len(),
        "reconciled relation field"
    );

    Ok(RelationDiff {
        to_link,
        to_unlink,
        final_order: working,
    })
}

/// Resolve a positional hint to an insertion index in the working list.
fn resolve_position(working: &[Ref], position: &Position) -> usize {
    match position {
        Position::Start => 0,
        Position::End => working.len(),
        Position::Before(anchor) => working
            .iter()
            .position(|r| r == anchor)
            .unwrap_or(working.len()),
        Position::After(anchor) => working
            .iter()
            .position(|r| r == anchor)
            .map(|i| i + 1)
            .unwrap_or(working.len()),
    }
}
