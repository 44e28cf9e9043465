// SPDX-License-Identifier: MIT OR Apache-2.0

//! Test utilities.

mod catalog;
mod random;

pub use catalog::{
    CatalogUnavailable, FailingCatalog, MemoryCatalog, MemoryDefinitions, TestReconciler,
    jcr_catalog, memory_definitions, simple_catalog,
};
pub use random::{effective_decisions, random_actions};

use crate::hierarchy::PrivilegeGraph;
use crate::restriction::{Restriction, RestrictionDefinition, RestrictionValue, ValueType};
use crate::traits::PrivilegeId;

impl PrivilegeId for &'static str {}

pub type PrivilegeName = &'static str;

pub const ALL: PrivilegeName = "jcr:all";
pub const READ: PrivilegeName = "jcr:read";
pub const READ_NODES: PrivilegeName = "rep:readNodes";
pub const READ_PROPERTIES: PrivilegeName = "rep:readProperties";
pub const READ_ACCESS_CONTROL: PrivilegeName = "jcr:readAccessControl";
pub const MODIFY_ACCESS_CONTROL: PrivilegeName = "jcr:modifyAccessControl";
pub const LOCK_MANAGEMENT: PrivilegeName = "jcr:lockManagement";
pub const VERSION_MANAGEMENT: PrivilegeName = "jcr:versionManagement";
pub const NODE_TYPE_MANAGEMENT: PrivilegeName = "jcr:nodeTypeManagement";
pub const REP_WRITE: PrivilegeName = "rep:write";
pub const JCR_WRITE: PrivilegeName = "jcr:write";
pub const MODIFY_PROPERTIES: PrivilegeName = "jcr:modifyProperties";
pub const ADD_PROPERTIES: PrivilegeName = "rep:addProperties";
pub const ALTER_PROPERTIES: PrivilegeName = "rep:alterProperties";
pub const REMOVE_PROPERTIES: PrivilegeName = "rep:removeProperties";
pub const ADD_CHILD_NODES: PrivilegeName = "jcr:addChildNodes";
pub const REMOVE_NODE: PrivilegeName = "jcr:removeNode";
pub const REMOVE_CHILD_NODES: PrivilegeName = "jcr:removeChildNodes";

/// Leaf next to "jcr:read" in the simple hierarchy.
pub const WRITE: PrivilegeName = JCR_WRITE;

/// Aggregates and their declared children, parents listed before their children.
pub(crate) const JCR_AGGREGATES: &[(PrivilegeName, &[PrivilegeName])] = &[
    (
        ALL,
        &[
            READ,
            READ_ACCESS_CONTROL,
            MODIFY_ACCESS_CONTROL,
            LOCK_MANAGEMENT,
            VERSION_MANAGEMENT,
            NODE_TYPE_MANAGEMENT,
            JCR_WRITE,
            REP_WRITE,
        ],
    ),
    (READ, &[READ_NODES, READ_PROPERTIES]),
    (REP_WRITE, &[JCR_WRITE, NODE_TYPE_MANAGEMENT]),
    (
        JCR_WRITE,
        &[
            MODIFY_PROPERTIES,
            ADD_CHILD_NODES,
            REMOVE_NODE,
            REMOVE_CHILD_NODES,
        ],
    ),
    (
        MODIFY_PROPERTIES,
        &[ADD_PROPERTIES, ALTER_PROPERTIES, REMOVE_PROPERTIES],
    ),
];

pub(crate) const SIMPLE_AGGREGATES: &[(PrivilegeName, &[PrivilegeName])] = &[
    (ALL, &[READ, WRITE]),
    (READ, &[READ_PROPERTIES, READ_NODES]),
];

fn hierarchy(aggregates: &[(PrivilegeName, &[PrivilegeName])]) -> PrivilegeGraph<PrivilegeName> {
    let mut graph = PrivilegeGraph::new(ALL);
    for (aggregate, children) in aggregates {
        graph.add_aggregate(*aggregate, children.iter().copied());
    }
    graph
}

/// A JCR-like hierarchy where "jcr:write" and "jcr:nodeTypeManagement" are declared by the root
/// aggregate and by "rep:write".
///
/// ```text
/// jcr:all
/// ├── jcr:read
/// │   ├── rep:readNodes
/// │   └── rep:readProperties
/// ├── jcr:readAccessControl
/// ├── jcr:modifyAccessControl
/// ├── jcr:lockManagement
/// ├── jcr:versionManagement
/// ├── jcr:nodeTypeManagement  (also below rep:write)
/// ├── jcr:write               (also below rep:write)
/// │   ├── jcr:modifyProperties
/// │   │   ├── rep:addProperties
/// │   │   ├── rep:alterProperties
/// │   │   └── rep:removeProperties
/// │   ├── jcr:addChildNodes
/// │   ├── jcr:removeNode
/// │   └── jcr:removeChildNodes
/// └── rep:write
/// ```
pub fn jcr_hierarchy() -> PrivilegeGraph<PrivilegeName> {
    hierarchy(JCR_AGGREGATES)
}

/// "jcr:all" containing "jcr:read" (with two leaves) and a single "jcr:write" leaf.
pub fn simple_hierarchy() -> PrivilegeGraph<PrivilegeName> {
    hierarchy(SIMPLE_AGGREGATES)
}

pub fn glob_definition() -> RestrictionDefinition {
    RestrictionDefinition::new("rep:glob", ValueType::String, false)
}

pub fn item_names_definition() -> RestrictionDefinition {
    RestrictionDefinition::new("rep:itemNames", ValueType::Name, true)
}

pub fn glob(pattern: &str) -> Restriction {
    Restriction::single(
        glob_definition(),
        RestrictionValue::String(pattern.to_owned()),
    )
}

pub fn item_names(names: &[&str]) -> Restriction {
    let values = names
        .iter()
        .map(|name| RestrictionValue::Name((*name).to_owned()))
        .collect();
    Restriction::new(item_names_definition(), values)
}

pub fn setup_logging() {
    if std::env::var("RUST_LOG").is_ok() {
        let _ = tracing_subscriber::fmt()
            .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
            .try_init();
    }
}
