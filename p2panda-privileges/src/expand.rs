// SPDX-License-Identifier: MIT OR Apache-2.0

//! Apply edits requested against (aggregate) privileges to the leaf privileges they govern.
//!
//! Aggregates are never edited directly here: every operation is pushed down to all leaves
//! reachable through the declared children of the targets. Unknown targets are rejected before
//! the table is modified.
use tracing::trace;

use crate::hierarchy::{PrivilegeError, PrivilegeGraph};
use crate::restriction::{Restriction, RestrictionSet};
use crate::state::{LocalPrivilegeState, PrivilegeStateTable};
use crate::traits::PrivilegeId;

/// Run `f` on the state of every leaf governed by the targets.
fn for_each_leaf<P, F>(
    table: &mut PrivilegeStateTable<P>,
    graph: &PrivilegeGraph<P>,
    targets: &[P],
    mut f: F,
) -> Result<(), PrivilegeError<P>>
where
    P: PrivilegeId,
    F: FnMut(&mut LocalPrivilegeState<P>),
{
    let leaves = graph.leaves_of(targets)?;
    trace!(targets = ?targets, leaves = leaves.len(), "expand edit to leaf privileges");

    for leaf in leaves {
        f(table.entry(leaf));
    }

    Ok(())
}

/// Push the decisions held by aggregates of a consolidated table back down to their leaves.
///
/// Every aggregate state is removed and its allow and deny buckets, with their restrictions, are
/// merged into the states of the leaves it governs. Privileges unknown to the graph are kept as
/// they are. Returns the number of expanded aggregates.
pub fn expand_aggregates<P>(
    table: &mut PrivilegeStateTable<P>,
    graph: &PrivilegeGraph<P>,
) -> usize
where
    P: PrivilegeId,
{
    let aggregates: Vec<P> = table
        .privileges()
        .filter(|privilege| graph.is_aggregate(privilege))
        .collect();

    for aggregate in &aggregates {
        let Some(state) = table.remove(aggregate) else {
            continue;
        };

        for leaf in graph.reachable_leaves(*aggregate) {
            let leaf_state = table.entry(leaf);
            if state.is_allow() {
                leaf_state.allow(state.allow_restrictions());
            }
            if state.is_deny() {
                leaf_state.deny(state.deny_restrictions());
            }
        }
    }

    trace!(aggregates = aggregates.len(), "expand aggregate states to leaf privileges");
    aggregates.len()
}

/// Allow the targets, merging the given restrictions into their allow buckets.
pub fn allow<P>(
    table: &mut PrivilegeStateTable<P>,
    graph: &PrivilegeGraph<P>,
    targets: &[P],
    restrictions: &RestrictionSet,
) -> Result<(), PrivilegeError<P>>
where
    P: PrivilegeId,
{
    for_each_leaf(table, graph, targets, |state| state.allow(restrictions))
}

/// Clear allow and its restrictions on the targets.
pub fn unallow<P>(
    table: &mut PrivilegeStateTable<P>,
    graph: &PrivilegeGraph<P>,
    targets: &[P],
) -> Result<(), PrivilegeError<P>>
where
    P: PrivilegeId,
{
    for_each_leaf(table, graph, targets, |state| state.unallow())
}

/// Deny the targets, merging the given restrictions into their deny buckets.
pub fn deny<P>(
    table: &mut PrivilegeStateTable<P>,
    graph: &PrivilegeGraph<P>,
    targets: &[P],
    restrictions: &RestrictionSet,
) -> Result<(), PrivilegeError<P>>
where
    P: PrivilegeId,
{
    for_each_leaf(table, graph, targets, |state| state.deny(restrictions))
}

/// Clear deny and its restrictions on the targets.
pub fn undeny<P>(
    table: &mut PrivilegeStateTable<P>,
    graph: &PrivilegeGraph<P>,
    targets: &[P],
) -> Result<(), PrivilegeError<P>>
where
    P: PrivilegeId,
{
    for_each_leaf(table, graph, targets, |state| state.undeny())
}

/// Clear both buckets on the targets.
pub fn none<P>(
    table: &mut PrivilegeStateTable<P>,
    graph: &PrivilegeGraph<P>,
    targets: &[P],
) -> Result<(), PrivilegeError<P>>
where
    P: PrivilegeId,
{
    for_each_leaf(table, graph, targets, |state| state.none())
}

pub fn allow_restriction<P>(
    table: &mut PrivilegeStateTable<P>,
    graph: &PrivilegeGraph<P>,
    targets: &[P],
    restriction: &Restriction,
) -> Result<(), PrivilegeError<P>>
where
    P: PrivilegeId,
{
    let restrictions = RestrictionSet::from_iter([restriction.clone()]);
    allow_restrictions(table, graph, targets, &restrictions)
}

/// Merge restrictions into the allow bucket of the targets, setting allow if it was not set.
pub fn allow_restrictions<P>(
    table: &mut PrivilegeStateTable<P>,
    graph: &PrivilegeGraph<P>,
    targets: &[P],
    restrictions: &RestrictionSet,
) -> Result<(), PrivilegeError<P>>
where
    P: PrivilegeId,
{
    allow(table, graph, targets, restrictions)
}

pub fn unallow_restriction<P>(
    table: &mut PrivilegeStateTable<P>,
    graph: &PrivilegeGraph<P>,
    targets: &[P],
    name: &str,
) -> Result<(), PrivilegeError<P>>
where
    P: PrivilegeId,
{
    unallow_restrictions(table, graph, targets, &[name])
}

/// Remove named restrictions from the allow bucket of the targets.
pub fn unallow_restrictions<P>(
    table: &mut PrivilegeStateTable<P>,
    graph: &PrivilegeGraph<P>,
    targets: &[P],
    names: &[&str],
) -> Result<(), PrivilegeError<P>>
where
    P: PrivilegeId,
{
    for_each_leaf(table, graph, targets, |state| {
        state.unallow_restrictions(names.iter().copied())
    })
}

pub fn deny_restriction<P>(
    table: &mut PrivilegeStateTable<P>,
    graph: &PrivilegeGraph<P>,
    targets: &[P],
    restriction: &Restriction,
) -> Result<(), PrivilegeError<P>>
where
    P: PrivilegeId,
{
    let restrictions = RestrictionSet::from_iter([restriction.clone()]);
    deny_restrictions(table, graph, targets, &restrictions)
}

/// Merge restrictions into the deny bucket of the targets, setting deny if it was not set.
pub fn deny_restrictions<P>(
    table: &mut PrivilegeStateTable<P>,
    graph: &PrivilegeGraph<P>,
    targets: &[P],
    restrictions: &RestrictionSet,
) -> Result<(), PrivilegeError<P>>
where
    P: PrivilegeId,
{
    deny(table, graph, targets, restrictions)
}

pub fn undeny_restriction<P>(
    table: &mut PrivilegeStateTable<P>,
    graph: &PrivilegeGraph<P>,
    targets: &[P],
    name: &str,
) -> Result<(), PrivilegeError<P>>
where
    P: PrivilegeId,
{
    undeny_restrictions(table, graph, targets, &[name])
}

/// Remove named restrictions from the deny bucket of the targets.
pub fn undeny_restrictions<P>(
    table: &mut PrivilegeStateTable<P>,
    graph: &PrivilegeGraph<P>,
    targets: &[P],
    names: &[&str],
) -> Result<(), PrivilegeError<P>>
where
    P: PrivilegeId,
{
    for_each_leaf(table, graph, targets, |state| {
        state.undeny_restrictions(names.iter().copied())
    })
}

pub fn allow_or_deny_restriction<P>(
    table: &mut PrivilegeStateTable<P>,
    graph: &PrivilegeGraph<P>,
    targets: &[P],
    restriction: &Restriction,
) -> Result<(), PrivilegeError<P>>
where
    P: PrivilegeId,
{
    let restrictions = RestrictionSet::from_iter([restriction.clone()]);
    allow_or_deny_restrictions(table, graph, targets, &restrictions)
}

/// Merge restrictions into whichever buckets of the targets are already set.
///
/// Used for restriction-only edits which must not introduce a new allow or deny.
pub fn allow_or_deny_restrictions<P>(
    table: &mut PrivilegeStateTable<P>,
    graph: &PrivilegeGraph<P>,
    targets: &[P],
    restrictions: &RestrictionSet,
) -> Result<(), PrivilegeError<P>>
where
    P: PrivilegeId,
{
    for_each_leaf(table, graph, targets, |state| {
        state.allow_or_deny_restrictions(restrictions)
    })
}

pub fn unallow_or_undeny_restriction<P>(
    table: &mut PrivilegeStateTable<P>,
    graph: &PrivilegeGraph<P>,
    targets: &[P],
    name: &str,
) -> Result<(), PrivilegeError<P>>
where
    P: PrivilegeId,
{
    unallow_or_undeny_restrictions(table, graph, targets, &[name])
}

/// Remove named restrictions from whichever buckets of the targets are set.
pub fn unallow_or_undeny_restrictions<P>(
    table: &mut PrivilegeStateTable<P>,
    graph: &PrivilegeGraph<P>,
    targets: &[P],
    names: &[&str],
) -> Result<(), PrivilegeError<P>>
where
    P: PrivilegeId,
{
    for_each_leaf(table, graph, targets, |state| {
        state.unallow_or_undeny_restrictions(names.iter().copied())
    })
}
