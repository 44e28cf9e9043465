// SPDX-License-Identifier: MIT OR Apache-2.0

//! Longest distance of every privilege from the root aggregate.
use std::collections::HashMap;
use std::collections::hash_map::Iter;

use tracing::trace;

use crate::hierarchy::PrivilegeGraph;
use crate::traits::PrivilegeId;

/// Depth of every privilege reachable from the root aggregate.
///
/// The root has depth 1, its declared children depth 2 and so on. A privilege reachable along
/// several paths is recorded with the depth of the longest one.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct PrivilegeDepthMap<P>
where
    P: PrivilegeId,
{
    depths: HashMap<P, usize>,
}

impl<P> PrivilegeDepthMap<P>
where
    P: PrivilegeId,
{
    /// Compute depths starting at the root aggregate of the graph.
    pub fn build(graph: &PrivilegeGraph<P>) -> Self {
        Self::from_root(graph, graph.root())
    }

    /// Compute depths starting at the given privilege.
    pub fn from_root(graph: &PrivilegeGraph<P>, root: P) -> Self {
        let mut depths = HashMap::new();
        depths.insert(root, 1);
        record_children(graph, root, 1, &mut depths);

        trace!(%root, privileges = depths.len(), "built privilege depth map");
        Self { depths }
    }

    pub fn depth(&self, privilege: &P) -> Option<usize> {
        self.depths.get(privilege).copied()
    }

    pub fn len(&self) -> usize {
        self.depths.len()
    }

    pub fn is_empty(&self) -> bool {
        self.depths.is_empty()
    }

    pub fn iter(&self) -> Iter<'_, P, usize> {
        self.depths.iter()
    }
}

/// Walk the declared children of `parent`, descending only where a longer path was found.
fn record_children<P>(
    graph: &PrivilegeGraph<P>,
    parent: P,
    parent_depth: usize,
    depths: &mut HashMap<P, usize>,
) where
    P: PrivilegeId,
{
    let depth = parent_depth + 1;
    for child in graph.children(parent) {
        let deeper = depths.get(&child).is_none_or(|recorded| depth > *recorded);
        if deeper {
            depths.insert(child, depth);
            record_children(graph, child, depth, depths);
        }
    }
}
