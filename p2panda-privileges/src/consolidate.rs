// SPDX-License-Identifier: MIT OR Apache-2.0

//! Fold leaf-level decisions back into the aggregates containing them.
//!
//! Aggregates are visited deepest first. An aggregate is only considered when every one of its
//! direct children holds a state; when all of them agree on a decision the decision is set on
//! the aggregate, and when they also agree on its restrictions the children's decisions are
//! cleared. Aggregates folded this way act as children of shallower aggregates in the same
//! pass.
//!
//! Since a privilege can be reachable through several aggregates, only children whose depth is
//! exactly one below the aggregate count as direct children. Children which are deeper are
//! folded through the longer path instead.
use std::cmp::Reverse;

use tracing::{debug, trace};

use crate::depth::PrivilegeDepthMap;
use crate::hierarchy::{PrivilegeError, PrivilegeGraph};
use crate::restriction::RestrictionSet;
use crate::state::{Bucket, PrivilegeStateTable};
use crate::traits::PrivilegeId;

/// Consolidate the table in place.
///
/// `in_scope` are the privileges supported where the table applies, aggregates outside of it
/// are never introduced. States with neither allow nor deny set are removed afterwards.
pub fn consolidate<P>(
    table: &mut PrivilegeStateTable<P>,
    graph: &PrivilegeGraph<P>,
    depth_map: &PrivilegeDepthMap<P>,
    in_scope: &[P],
) -> Result<(), PrivilegeError<P>>
where
    P: PrivilegeId,
{
    let mut aggregates = Vec::new();
    for privilege in in_scope.iter().filter(|privilege| graph.is_aggregate(privilege)) {
        let depth = depth_map
            .depth(privilege)
            .ok_or(PrivilegeError::MissingDepth(*privilege))?;
        aggregates.push((*privilege, depth));
    }
    aggregates.sort_by_key(|(privilege, depth)| (Reverse(*depth), *privilege));
    aggregates.dedup();

    for (aggregate, depth) in aggregates {
        let children = direct_children(graph, depth_map, aggregate, depth)?;
        fold(table, aggregate, &children);
    }

    let pruned = table.prune();
    debug!(pruned, remaining = table.len(), "consolidated privilege states");

    Ok(())
}

/// Declared children of the aggregate found exactly one level below it.
fn direct_children<P>(
    graph: &PrivilegeGraph<P>,
    depth_map: &PrivilegeDepthMap<P>,
    aggregate: P,
    depth: usize,
) -> Result<Vec<P>, PrivilegeError<P>>
where
    P: PrivilegeId,
{
    let mut children = Vec::new();
    for child in graph.children(aggregate) {
        let child_depth = depth_map
            .depth(&child)
            .ok_or(PrivilegeError::MissingDepth(child))?;
        if child_depth == depth + 1 {
            children.push(child);
        }
    }

    Ok(children)
}

fn fold<P>(table: &mut PrivilegeStateTable<P>, aggregate: P, children: &[P])
where
    P: PrivilegeId,
{
    if children.is_empty() {
        return;
    }

    // A child without a state is neither allowed nor denied, nothing can be folded.
    if let Some(missing) = children.iter().find(|child| !table.contains(child)) {
        trace!(%aggregate, %missing, "skip aggregate with undecided child");
        return;
    }

    for bucket in [Bucket::Allow, Bucket::Deny] {
        fold_bucket(table, aggregate, children, bucket);
    }
}

fn fold_bucket<P>(table: &mut PrivilegeStateTable<P>, aggregate: P, children: &[P], bucket: Bucket)
where
    P: PrivilegeId,
{
    let mut states = Vec::with_capacity(children.len());
    for child in children {
        let Some(state) = table.get(child) else {
            return;
        };
        if !state.decision(bucket).granted {
            return;
        }
        states.push(state);
    }

    let uniform = states
        .windows(2)
        .all(|pair| pair[0].same_restrictions(pair[1], bucket));
    let shared: Option<RestrictionSet> = states
        .first()
        .filter(|_| uniform)
        .map(|state| state.decision(bucket).restrictions.clone());

    let decision = table.entry(aggregate).decision_mut(bucket);
    decision.granted = true;

    let Some(restrictions) = shared else {
        decision.restrictions.clear();
        debug!(%aggregate, ?bucket, "set aggregate, children differ in restrictions");
        return;
    };
    decision.restrictions.merge(&restrictions);

    let Some(folded) = table.get(&aggregate) else {
        return;
    };
    let covered: Vec<P> = children
        .iter()
        .copied()
        .filter(|child| {
            table
                .get(child)
                .is_some_and(|state| state.same_restrictions(folded, bucket))
        })
        .collect();
    for child in covered {
        if let Some(state) = table.get_mut(&child) {
            state.revoke(bucket);
        }
    }

    debug!(%aggregate, ?bucket, children = children.len(), "folded children into aggregate");
}

#[cfg(test)]
mod tests {
    use crate::expand::{allow, deny};
    use crate::test_utils::{
        ADD_CHILD_NODES, ALL, JCR_WRITE, MODIFY_PROPERTIES, NODE_TYPE_MANAGEMENT, READ,
        READ_NODES, READ_PROPERTIES, REMOVE_CHILD_NODES, REMOVE_NODE, REP_WRITE, WRITE, glob,
        item_names, jcr_hierarchy, simple_hierarchy,
    };
    use crate::{
        PrivilegeDepthMap, PrivilegeError, PrivilegeGraph, PrivilegeStateTable, RestrictionSet,
    };

    use super::consolidate;

    fn in_scope(graph: &PrivilegeGraph<&'static str>) -> Vec<&'static str> {
        graph.privileges().collect()
    }

    #[test]
    fn fold_children_into_aggregate() {
        let graph = simple_hierarchy();
        let depth_map = PrivilegeDepthMap::build(&graph);
        let mut table = PrivilegeStateTable::new();

        allow(&mut table, &graph, &[READ_PROPERTIES, READ_NODES], &RestrictionSet::new()).unwrap();
        consolidate(&mut table, &graph, &depth_map, &in_scope(&graph)).unwrap();

        assert_eq!(table.privileges().collect::<Vec<_>>(), vec![READ]);
        assert!(table.is_allow(&READ));
        assert!(!table.is_deny(&READ));
    }

    #[test]
    fn missing_child_blocks_folding() {
        let graph = simple_hierarchy();
        let depth_map = PrivilegeDepthMap::build(&graph);
        let mut table = PrivilegeStateTable::new();

        allow(&mut table, &graph, &[READ_PROPERTIES], &RestrictionSet::new()).unwrap();
        let before = table.clone();
        consolidate(&mut table, &graph, &depth_map, &in_scope(&graph)).unwrap();

        assert!(!table.contains(&READ));
        assert_eq!(table, before);
    }

    #[test]
    fn fold_in_two_batches() {
        let graph = simple_hierarchy();
        let depth_map = PrivilegeDepthMap::build(&graph);
        let mut table = PrivilegeStateTable::new();

        allow(&mut table, &graph, &[READ_PROPERTIES, READ_NODES], &RestrictionSet::new()).unwrap();
        consolidate(&mut table, &graph, &depth_map, &in_scope(&graph)).unwrap();
        assert_eq!(table.privileges().collect::<Vec<_>>(), vec![READ]);

        allow(&mut table, &graph, &[WRITE], &RestrictionSet::new()).unwrap();
        consolidate(&mut table, &graph, &depth_map, &in_scope(&graph)).unwrap();
        assert_eq!(table.privileges().collect::<Vec<_>>(), vec![ALL]);
        assert!(table.is_allow(&ALL));
    }

    #[test]
    fn fold_nested_aggregates_in_one_pass() {
        let graph = jcr_hierarchy();
        let depth_map = PrivilegeDepthMap::build(&graph);
        let mut table = PrivilegeStateTable::new();

        deny(&mut table, &graph, &[REP_WRITE], &RestrictionSet::new()).unwrap();
        consolidate(&mut table, &graph, &depth_map, &in_scope(&graph)).unwrap();

        // "jcr:write" and "jcr:modifyProperties" were folded on the way up.
        assert_eq!(table.privileges().collect::<Vec<_>>(), vec![REP_WRITE]);
        assert!(table.is_deny(&REP_WRITE));
    }

    #[test]
    fn alias_child_is_not_counted_twice() {
        let graph = jcr_hierarchy();
        let depth_map = PrivilegeDepthMap::build(&graph);
        let mut table = PrivilegeStateTable::new();

        // "jcr:write" is declared by the root aggregate as well, but sits at depth 3 and is only
        // folded into "rep:write".
        allow(&mut table, &graph, &[JCR_WRITE], &RestrictionSet::new()).unwrap();
        consolidate(&mut table, &graph, &depth_map, &in_scope(&graph)).unwrap();

        assert_eq!(table.privileges().collect::<Vec<_>>(), vec![JCR_WRITE]);
        assert!(!table.contains(&REP_WRITE));
        assert!(!table.contains(&NODE_TYPE_MANAGEMENT));
    }

    #[test]
    fn deeper_alias_is_not_a_direct_child() {
        //      root
        //     /    \
        //    x      z
        //   / \     |
        //  a   \    y
        //       \  /
        //       leaf
        let mut graph = PrivilegeGraph::new("root");
        graph.add_aggregate("root", ["x", "z"]);
        graph.add_aggregate("x", ["a", "leaf"]);
        graph.add_aggregate("z", ["y"]);
        graph.add_aggregate("y", ["leaf"]);
        let depth_map = PrivilegeDepthMap::build(&graph);
        assert_eq!(depth_map.depth(&"leaf"), Some(4));

        // "leaf" is not a direct child of "x", which is folded from "a" alone.
        let mut table = PrivilegeStateTable::new();
        allow(&mut table, &graph, &["a"], &RestrictionSet::new()).unwrap();
        consolidate(&mut table, &graph, &depth_map, &in_scope(&graph)).unwrap();

        assert_eq!(table.privileges().collect::<Vec<_>>(), vec!["x"]);
        assert!(table.is_none(&"leaf"));
    }

    #[test]
    fn shared_restrictions_are_promoted() {
        let graph = simple_hierarchy();
        let depth_map = PrivilegeDepthMap::build(&graph);
        let mut table = PrivilegeStateTable::new();
        let restrictions = RestrictionSet::from_iter([glob("/a")]);

        allow(&mut table, &graph, &[READ], &restrictions).unwrap();
        consolidate(&mut table, &graph, &depth_map, &in_scope(&graph)).unwrap();

        assert_eq!(table.len(), 1);
        assert_eq!(table.get(&READ).unwrap().allow_restrictions(), &restrictions);
    }

    #[test]
    fn differing_restrictions_keep_children() {
        let graph = simple_hierarchy();
        let depth_map = PrivilegeDepthMap::build(&graph);
        let mut table = PrivilegeStateTable::new();

        allow(&mut table, &graph, &[READ_NODES], &RestrictionSet::from_iter([glob("/a")])).unwrap();
        allow(&mut table, &graph, &[READ_PROPERTIES], &RestrictionSet::from_iter([glob("/b")]))
            .unwrap();
        consolidate(&mut table, &graph, &depth_map, &in_scope(&graph)).unwrap();

        let read = table.get(&READ).unwrap();
        assert!(read.is_allow());
        assert!(read.allow_restrictions().is_empty());
        assert_eq!(
            table.get(&READ_NODES).unwrap().allow_restriction("rep:glob"),
            Some(&glob("/a"))
        );
        assert_eq!(
            table.get(&READ_PROPERTIES).unwrap().allow_restriction("rep:glob"),
            Some(&glob("/b"))
        );
    }

    #[test]
    fn allow_and_deny_fold_independently() {
        let graph = simple_hierarchy();
        let depth_map = PrivilegeDepthMap::build(&graph);
        let mut table = PrivilegeStateTable::new();

        allow(&mut table, &graph, &[READ], &RestrictionSet::from_iter([glob("/a")])).unwrap();
        deny(&mut table, &graph, &[READ], &RestrictionSet::from_iter([item_names(&["x"])]))
            .unwrap();
        consolidate(&mut table, &graph, &depth_map, &in_scope(&graph)).unwrap();

        assert_eq!(table.privileges().collect::<Vec<_>>(), vec![READ]);
        let read = table.get(&READ).unwrap();
        assert!(read.is_allow() && read.is_deny());
        assert_eq!(read.deny_restriction("rep:itemNames"), Some(&item_names(&["x"])));
    }

    #[test]
    fn out_of_scope_aggregates_are_not_introduced() {
        let graph = jcr_hierarchy();
        let depth_map = PrivilegeDepthMap::build(&graph);
        let mut table = PrivilegeStateTable::new();

        allow(&mut table, &graph, &[JCR_WRITE], &RestrictionSet::new()).unwrap();
        consolidate(&mut table, &graph, &depth_map, &[MODIFY_PROPERTIES, READ]).unwrap();

        assert!(table.is_allow(&MODIFY_PROPERTIES));
        assert!(!table.contains(&JCR_WRITE));
        for leaf in [ADD_CHILD_NODES, REMOVE_NODE, REMOVE_CHILD_NODES] {
            assert!(table.is_allow(&leaf));
        }
    }

    #[test]
    fn unreachable_aggregate_is_an_error() {
        let mut graph = simple_hierarchy();
        graph.add_aggregate("detached", [READ_NODES]);
        let depth_map = PrivilegeDepthMap::build(&graph);
        let mut table = PrivilegeStateTable::new();

        let result = consolidate(&mut table, &graph, &depth_map, &in_scope(&graph));
        assert_eq!(result, Err(PrivilegeError::MissingDepth("detached")));
    }
}
