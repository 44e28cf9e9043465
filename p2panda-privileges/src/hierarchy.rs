// SPDX-License-Identifier: MIT OR Apache-2.0

//! Privilege hierarchy expressed as a directed acyclic graph of aggregate containment.
use std::collections::HashSet;

use petgraph::Direction;
use petgraph::graphmap::DiGraphMap;
use petgraph::visit::{Dfs, Reversed};
use thiserror::Error;

use crate::traits::{PrivilegeCatalog, PrivilegeId};

#[derive(Debug, Error, PartialEq)]
pub enum PrivilegeError<P>
where
    P: PrivilegeId,
{
    #[error("privilege {0} is not part of the privilege hierarchy")]
    UnknownPrivilege(P),

    #[error("privilege {0} was not reached from the root aggregate when building the depth map")]
    MissingDepth(P),
}

/// Aggregate containment graph of all known privileges.
///
/// An edge points from an aggregate to each of its declared (direct) children. A privilege can
/// be a child of several aggregates, the graph is not a tree.
#[derive(Clone, Debug)]
pub struct PrivilegeGraph<P>
where
    P: PrivilegeId,
{
    root: P,
    graph: DiGraphMap<P, ()>,
    aggregates: HashSet<P>,
}

impl<P> PrivilegeGraph<P>
where
    P: PrivilegeId,
{
    /// Create a graph containing only the root.
    ///
    /// The root is a leaf until its children are declared with `add_aggregate`.
    pub fn new(root: P) -> Self {
        let mut graph = DiGraphMap::new();
        graph.add_node(root);

        Self {
            root,
            graph,
            aggregates: HashSet::new(),
        }
    }

    /// Materialize the privilege graph from all privileges registered in a catalog.
    pub fn from_catalog<S, C>(catalog: &C) -> Result<Self, C::Error>
    where
        S: ?Sized,
        C: PrivilegeCatalog<P, S>,
    {
        let mut graph = Self::new(catalog.root()?);
        for privilege in catalog.registered_privileges()? {
            match catalog.declared_children(&privilege)? {
                Some(children) => graph.add_aggregate(privilege, children),
                None => graph.add_leaf(privilege),
            }
        }

        Ok(graph)
    }

    pub fn add_leaf(&mut self, privilege: P) {
        self.graph.add_node(privilege);
    }

    /// Add an aggregate and edges to its declared children.
    ///
    /// Children which were not added before are inserted as leaves, they can be turned into
    /// aggregates by adding them again with their own children.
    pub fn add_aggregate(&mut self, privilege: P, children: impl IntoIterator<Item = P>) {
        self.graph.add_node(privilege);
        self.aggregates.insert(privilege);
        for child in children {
            self.graph.add_edge(privilege, child, ());
        }
    }

    /// The aggregate which contains all other privileges.
    pub fn root(&self) -> P {
        self.root
    }

    pub fn contains(&self, privilege: &P) -> bool {
        self.graph.contains_node(*privilege)
    }

    pub fn is_aggregate(&self, privilege: &P) -> bool {
        self.aggregates.contains(privilege)
    }

    /// All privileges in the graph.
    pub fn privileges(&self) -> impl Iterator<Item = P> + '_ {
        self.graph.nodes()
    }

    /// Declared children of an aggregate in declaration order, empty for leaves.
    pub fn children(&self, privilege: P) -> impl Iterator<Item = P> + '_ {
        self.graph.neighbors_directed(privilege, Direction::Outgoing)
    }

    /// Leaves governed by the given privilege.
    ///
    /// A leaf privilege governs only itself, an aggregate governs every leaf reachable through
    /// its declared children.
    pub fn leaves(&self, privilege: P) -> Result<Vec<P>, PrivilegeError<P>> {
        if !self.contains(&privilege) {
            return Err(PrivilegeError::UnknownPrivilege(privilege));
        }

        Ok(self.reachable_leaves(privilege))
    }

    /// Leaves reachable from a privilege which is known to be part of the graph.
    pub(crate) fn reachable_leaves(&self, privilege: P) -> Vec<P> {
        let mut leaves = Vec::new();
        let mut dfs = Dfs::new(&self.graph, privilege);
        while let Some(node) = dfs.next(&self.graph) {
            if !self.is_aggregate(&node) {
                leaves.push(node);
            }
        }

        leaves
    }

    /// Leaves governed by any of the given privileges, each leaf returned once.
    ///
    /// All targets are checked before any leaves are returned.
    pub fn leaves_of(&self, targets: &[P]) -> Result<Vec<P>, PrivilegeError<P>> {
        let mut seen = HashSet::new();
        let mut leaves = Vec::new();
        for target in targets {
            for leaf in self.leaves(*target)? {
                if seen.insert(leaf) {
                    leaves.push(leaf);
                }
            }
        }

        Ok(leaves)
    }

    /// All aggregates which (transitively) contain the given privilege.
    pub fn ancestors(&self, privilege: P) -> Result<HashSet<P>, PrivilegeError<P>> {
        if !self.contains(&privilege) {
            return Err(PrivilegeError::UnknownPrivilege(privilege));
        }

        let reversed = Reversed(&self.graph);
        let mut dfs = Dfs::new(reversed, privilege);
        let mut ancestors = HashSet::new();
        while let Some(node) = dfs.next(reversed) {
            if node != privilege {
                ancestors.insert(node);
            }
        }

        Ok(ancestors)
    }
}
