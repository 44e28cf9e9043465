// SPDX-License-Identifier: MIT OR Apache-2.0

use std::collections::HashMap;
use std::convert::Infallible;

use thiserror::Error;

use crate::reconciler::Reconciler;
use crate::restriction::{RestrictionDefinition, ValueType};
use crate::test_utils::{
    ALL, JCR_AGGREGATES, PrivilegeName, READ, READ_NODES, READ_PROPERTIES, SIMPLE_AGGREGATES,
    WRITE, glob_definition, item_names_definition,
};
use crate::traits::{PrivilegeCatalog, RestrictionDefinitions};

pub type TestReconciler<C = MemoryCatalog> =
    Reconciler<PrivilegeName, str, C, MemoryDefinitions>;

/// Privilege catalog held in memory, scopes are paths.
#[derive(Clone, Debug)]
pub struct MemoryCatalog {
    root: PrivilegeName,
    registered: Vec<PrivilegeName>,
    aggregates: HashMap<PrivilegeName, Vec<PrivilegeName>>,
    scopes: HashMap<String, Vec<PrivilegeName>>,
}

impl MemoryCatalog {
    /// Register all aggregates and their children, the first aggregate is the root.
    pub fn new(aggregates: &[(PrivilegeName, &[PrivilegeName])]) -> Self {
        let root = aggregates.first().map(|(root, _)| *root).unwrap_or(ALL);

        let mut registered = vec![root];
        for (aggregate, children) in aggregates {
            for privilege in std::iter::once(aggregate).chain(children.iter()) {
                if !registered.contains(privilege) {
                    registered.push(*privilege);
                }
            }
        }

        let aggregates = aggregates
            .iter()
            .map(|(aggregate, children)| (*aggregate, children.to_vec()))
            .collect();

        Self {
            root,
            registered,
            aggregates,
            scopes: HashMap::new(),
        }
    }

    /// Declare the privileges supported below a path.
    pub fn with_scope(mut self, path: &str, privileges: &[PrivilegeName]) -> Self {
        self.scopes.insert(path.to_owned(), privileges.to_vec());
        self
    }
}

impl PrivilegeCatalog<PrivilegeName, str> for MemoryCatalog {
    type Error = Infallible;

    fn root(&self) -> Result<PrivilegeName, Self::Error> {
        Ok(self.root)
    }

    fn registered_privileges(&self) -> Result<Vec<PrivilegeName>, Self::Error> {
        Ok(self.registered.clone())
    }

    fn supported_privileges(&self, path: &str) -> Result<Option<Vec<PrivilegeName>>, Self::Error> {
        Ok(self.scopes.get(path).cloned())
    }

    fn declared_children(
        &self,
        privilege: &PrivilegeName,
    ) -> Result<Option<Vec<PrivilegeName>>, Self::Error> {
        Ok(self.aggregates.get(privilege).cloned())
    }
}

/// Catalog of the JCR-like hierarchy without any known paths.
pub fn jcr_catalog() -> MemoryCatalog {
    MemoryCatalog::new(JCR_AGGREGATES)
}

/// Catalog of the simple hierarchy.
///
/// Every privilege is supported below "/content", only "jcr:read" and its leaves below
/// "/restricted".
pub fn simple_catalog() -> MemoryCatalog {
    MemoryCatalog::new(SIMPLE_AGGREGATES)
        .with_scope("/content", &[ALL, READ, READ_NODES, READ_PROPERTIES, WRITE])
        .with_scope("/restricted", &[READ, READ_NODES, READ_PROPERTIES])
}

#[derive(Clone, Debug, Default)]
pub struct MemoryDefinitions(Vec<RestrictionDefinition>);

impl MemoryDefinitions {
    pub fn new(definitions: Vec<RestrictionDefinition>) -> Self {
        Self(definitions)
    }
}

impl RestrictionDefinitions<str> for MemoryDefinitions {
    type Error = Infallible;

    fn definitions(&self, _path: &str) -> Result<Vec<RestrictionDefinition>, Self::Error> {
        Ok(self.0.clone())
    }
}

/// "rep:glob", "rep:itemNames" and a single-valued "rep:nodePath".
pub fn memory_definitions() -> MemoryDefinitions {
    MemoryDefinitions::new(vec![
        glob_definition(),
        item_names_definition(),
        RestrictionDefinition::new("rep:nodePath", ValueType::Path, false),
    ])
}

#[derive(Debug, Error)]
#[error("privilege catalog is unavailable")]
pub struct CatalogUnavailable;

/// Catalog failing on every lookup.
#[derive(Clone, Debug)]
pub struct FailingCatalog;

impl PrivilegeCatalog<PrivilegeName, str> for FailingCatalog {
    type Error = CatalogUnavailable;

    fn root(&self) -> Result<PrivilegeName, Self::Error> {
        Err(CatalogUnavailable)
    }

    fn registered_privileges(&self) -> Result<Vec<PrivilegeName>, Self::Error> {
        Err(CatalogUnavailable)
    }

    fn supported_privileges(&self, _path: &str) -> Result<Option<Vec<PrivilegeName>>, Self::Error> {
        Err(CatalogUnavailable)
    }

    fn declared_children(
        &self,
        _privilege: &PrivilegeName,
    ) -> Result<Option<Vec<PrivilegeName>>, Self::Error> {
        Err(CatalogUnavailable)
    }
}
