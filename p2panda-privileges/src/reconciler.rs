// SPDX-License-Identifier: MIT OR Apache-2.0

//! Reconciliation sessions over privileges and restriction definitions from injected providers.
use std::collections::HashMap;
use std::marker::PhantomData;

use thiserror::Error;
use tracing::{debug, trace};

use crate::action::PrivilegeAction;
use crate::config::Config;
use crate::consolidate::consolidate;
use crate::depth::PrivilegeDepthMap;
use crate::expand;
use crate::hierarchy::{PrivilegeError, PrivilegeGraph};
use crate::restriction::{Restriction, RestrictionDefinition, RestrictionError};
use crate::state::PrivilegeStateTable;
use crate::traits::{PrivilegeCatalog, PrivilegeId, RestrictionDefinitions};

/// Errors raised by the providers while a session is opened.
#[derive(Debug, Error)]
pub enum ReconcileError<CE, DE>
where
    CE: std::error::Error,
    DE: std::error::Error,
{
    #[error("privilege catalog error: {0}")]
    Catalog(CE),

    #[error("restriction definitions error: {0}")]
    Definitions(DE),
}

/// Entry point for reconciling edits against privileges of a scope.
///
/// The catalog and the restriction definition provider are injected, all lookups happen when a
/// session is opened.
#[derive(Debug)]
pub struct Reconciler<P, S, C, R>
where
    S: ?Sized,
{
    catalog: C,
    definitions: R,
    config: Config,
    _marker: PhantomData<(P, fn(&S))>,
}

impl<P, S, C, R> Reconciler<P, S, C, R>
where
    P: PrivilegeId,
    S: ?Sized,
    C: PrivilegeCatalog<P, S>,
    R: RestrictionDefinitions<S>,
{
    pub fn new(catalog: C, definitions: R, config: Config) -> Self {
        Self {
            catalog,
            definitions,
            config,
            _marker: PhantomData,
        }
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    /// Open a session for the given scope, continuing from a previous table.
    ///
    /// Decisions the previous table holds on aggregates are expanded to leaf privileges first, so
    /// edits in this session can narrow them down again.
    pub fn session(
        &self,
        scope: &S,
        mut table: PrivilegeStateTable<P>,
    ) -> Result<Session<P>, ReconcileError<C::Error, R::Error>> {
        let graph = PrivilegeGraph::from_catalog::<S, C>(&self.catalog)
            .map_err(ReconcileError::Catalog)?;
        let in_scope = self
            .catalog
            .privileges_in_scope(scope)
            .map_err(ReconcileError::Catalog)?;
        let definitions = self
            .definitions
            .definitions(scope)
            .map_err(ReconcileError::Definitions)?
            .into_iter()
            .map(|definition| (definition.name().to_owned(), definition))
            .collect::<HashMap<_, _>>();
        let depth_map = PrivilegeDepthMap::build(&graph);
        let expanded = expand::expand_aggregates(&mut table, &graph);

        debug!(
            root = %graph.root(),
            expanded,
            in_scope = in_scope.len(),
            depths = depth_map.len(),
            restrictions = definitions.len(),
            "open reconciliation session"
        );

        Ok(Session {
            graph,
            depth_map,
            in_scope,
            definitions,
            table,
            config: self.config.clone(),
        })
    }
}

/// A batch of edits against the privileges of one scope.
///
/// Actions are expanded to leaf privileges as they are applied. Consolidation runs once, when
/// the session is committed.
#[derive(Debug)]
pub struct Session<P>
where
    P: PrivilegeId,
{
    graph: PrivilegeGraph<P>,
    depth_map: PrivilegeDepthMap<P>,
    in_scope: Vec<P>,
    definitions: HashMap<String, RestrictionDefinition>,
    table: PrivilegeStateTable<P>,
    config: Config,
}

impl<P> Session<P>
where
    P: PrivilegeId,
{
    pub fn graph(&self) -> &PrivilegeGraph<P> {
        &self.graph
    }

    pub fn depth_map(&self) -> &PrivilegeDepthMap<P> {
        &self.depth_map
    }

    /// Privileges supported by the scope, or all registered ones if the scope does not exist.
    pub fn in_scope(&self) -> &[P] {
        &self.in_scope
    }

    /// Current, not yet consolidated table.
    pub fn table(&self) -> &PrivilegeStateTable<P> {
        &self.table
    }

    pub fn definition(&self, name: &str) -> Option<&RestrictionDefinition> {
        self.definitions.get(name)
    }

    /// Build a restriction from raw values according to its definition in this scope.
    pub fn restriction(
        &self,
        name: &str,
        raw_values: &[&str],
    ) -> Result<Restriction, RestrictionError> {
        self.definition(name)
            .ok_or_else(|| RestrictionError::UnknownRestriction(name.to_owned()))?
            .parse(raw_values)
    }

    /// Expand an action onto the leaf privileges it governs.
    pub fn apply(&mut self, action: &PrivilegeAction<P>) -> Result<(), PrivilegeError<P>> {
        trace!(
            privileges = ?action.privileges(),
            restriction_only = action.is_restriction_only(),
            "apply privilege action"
        );

        let table = &mut self.table;
        let graph = &self.graph;
        match action {
            PrivilegeAction::Allow {
                privileges,
                restrictions,
            } => expand::allow(table, graph, privileges, restrictions),
            PrivilegeAction::Unallow { privileges } => expand::unallow(table, graph, privileges),
            PrivilegeAction::Deny {
                privileges,
                restrictions,
            } => expand::deny(table, graph, privileges, restrictions),
            PrivilegeAction::Undeny { privileges } => expand::undeny(table, graph, privileges),
            PrivilegeAction::None { privileges } => expand::none(table, graph, privileges),
            PrivilegeAction::AllowRestrictions {
                privileges,
                restrictions,
            } => expand::allow_restrictions(table, graph, privileges, restrictions),
            PrivilegeAction::UnallowRestrictions { privileges, names } => {
                expand::unallow_restrictions(table, graph, privileges, &as_strs(names))
            }
            PrivilegeAction::DenyRestrictions {
                privileges,
                restrictions,
            } => expand::deny_restrictions(table, graph, privileges, restrictions),
            PrivilegeAction::UndenyRestrictions { privileges, names } => {
                expand::undeny_restrictions(table, graph, privileges, &as_strs(names))
            }
            PrivilegeAction::AllowOrDenyRestrictions {
                privileges,
                restrictions,
            } => expand::allow_or_deny_restrictions(table, graph, privileges, restrictions),
            PrivilegeAction::UnallowOrUndenyRestrictions { privileges, names } => {
                expand::unallow_or_undeny_restrictions(table, graph, privileges, &as_strs(names))
            }
        }
    }

    /// Apply all actions in order, stopping at the first failing one.
    pub fn apply_all<'a>(
        &mut self,
        actions: impl IntoIterator<Item = &'a PrivilegeAction<P>>,
    ) -> Result<(), PrivilegeError<P>>
    where
        P: 'a,
    {
        for action in actions {
            self.apply(action)?;
        }
        Ok(())
    }

    /// Finish the batch, consolidating the table unless disabled in the config.
    pub fn commit(self) -> Result<PrivilegeStateTable<P>, PrivilegeError<P>> {
        let mut table = self.table;
        if self.config.consolidate() {
            consolidate(&mut table, &self.graph, &self.depth_map, &self.in_scope)?;
        }
        Ok(table)
    }
}

fn as_strs(names: &[String]) -> Vec<&str> {
    names.iter().map(String::as_str).collect()
}

#[cfg(test)]
mod tests {
    use assert_matches::assert_matches;

    use crate::test_utils::{
        ALL, FailingCatalog, READ, READ_NODES, READ_PROPERTIES, TestReconciler, WRITE, glob,
        memory_definitions, simple_catalog,
    };
    use crate::{
        Config, PrivilegeAction, PrivilegeError, PrivilegeStateTable, Reconciler, RestrictionError,
        RestrictionSet,
    };

    use super::ReconcileError;

    fn reconciler(config: Config) -> TestReconciler {
        Reconciler::new(simple_catalog(), memory_definitions(), config)
    }

    #[test]
    fn commit_consolidates() {
        let reconciler = reconciler(Config::default());
        let mut session = reconciler.session("/content", PrivilegeStateTable::new()).unwrap();

        session
            .apply(&PrivilegeAction::Allow {
                privileges: vec![READ_PROPERTIES, READ_NODES],
                restrictions: RestrictionSet::new(),
            })
            .unwrap();
        assert_eq!(session.table().len(), 2);

        let table = session.commit().unwrap();
        assert_eq!(table.privileges().collect::<Vec<_>>(), vec![READ]);
    }

    #[test]
    fn commit_without_consolidation() {
        let reconciler = reconciler(Config::new().with_consolidation(false));
        assert!(!reconciler.config().consolidate());
        let mut session = reconciler.session("/content", PrivilegeStateTable::new()).unwrap();

        session
            .apply(&PrivilegeAction::Allow {
                privileges: vec![READ],
                restrictions: RestrictionSet::new(),
            })
            .unwrap();
        session
            .apply(&PrivilegeAction::Unallow {
                privileges: vec![READ_NODES],
            })
            .unwrap();

        let table = session.commit().unwrap();
        assert_eq!(table.len(), 2);
        assert!(table.is_none(&READ_NODES));
        assert!(table.is_allow(&READ_PROPERTIES));
    }

    #[test]
    fn scope_restricts_consolidation() {
        // Only "jcr:read" is supported below "/restricted", "jcr:all" is never introduced there.
        let reconciler = reconciler(Config::default());
        let mut session = reconciler.session("/restricted", PrivilegeStateTable::new()).unwrap();
        assert_eq!(session.in_scope(), &[READ, READ_NODES, READ_PROPERTIES]);

        session
            .apply(&PrivilegeAction::Allow {
                privileges: vec![ALL],
                restrictions: RestrictionSet::new(),
            })
            .unwrap();
        let table = session.commit().unwrap();
        assert_eq!(table.privileges().collect::<Vec<_>>(), vec![READ, WRITE]);
    }

    #[test]
    fn continue_from_consolidated_table() {
        let reconciler = reconciler(Config::default());

        let mut session = reconciler.session("/content", PrivilegeStateTable::new()).unwrap();
        session
            .apply(&PrivilegeAction::Allow {
                privileges: vec![READ],
                restrictions: RestrictionSet::from_iter([glob("/a")]),
            })
            .unwrap();
        let table = session.commit().unwrap();
        assert_eq!(table.privileges().collect::<Vec<_>>(), vec![READ]);

        // The aggregate is expanded again when the next session opens.
        let mut session = reconciler.session("/content", table).unwrap();
        assert!(!session.table().contains(&READ));
        assert_eq!(
            session.table().get(&READ_NODES).unwrap().allow_restriction("rep:glob"),
            Some(&glob("/a"))
        );

        session
            .apply(&PrivilegeAction::Unallow {
                privileges: vec![READ_NODES],
            })
            .unwrap();
        let table = session.commit().unwrap();

        assert_eq!(table.privileges().collect::<Vec<_>>(), vec![READ_PROPERTIES]);
        assert_eq!(
            table.get(&READ_PROPERTIES).unwrap().allow_restriction("rep:glob"),
            Some(&glob("/a"))
        );
    }

    #[test]
    fn missing_scope_falls_back_to_registered_privileges() {
        let reconciler = reconciler(Config::default());
        let session = reconciler.session("/not/yet/created", PrivilegeStateTable::new()).unwrap();
        assert_eq!(session.in_scope().len(), 5);
    }

    #[test]
    fn restriction_from_raw_values() {
        let reconciler = reconciler(Config::default());
        let session = reconciler.session("/content", PrivilegeStateTable::new()).unwrap();

        assert_eq!(session.restriction("rep:glob", &["/a"]), Ok(glob("/a")));
        assert_eq!(
            session.restriction("rep:unknown", &["/a"]),
            Err(RestrictionError::UnknownRestriction("rep:unknown".to_string()))
        );
    }

    #[test]
    fn apply_all_stops_at_unknown_privilege() {
        let reconciler = reconciler(Config::default());
        let mut session = reconciler.session("/content", PrivilegeStateTable::new()).unwrap();

        let result = session.apply_all(&[
            PrivilegeAction::Deny {
                privileges: vec![WRITE],
                restrictions: RestrictionSet::new(),
            },
            PrivilegeAction::None {
                privileges: vec!["jcr:unknown"],
            },
        ]);
        assert_eq!(result, Err(PrivilegeError::UnknownPrivilege("jcr:unknown")));
        assert!(session.table().is_deny(&WRITE));
    }

    #[test]
    fn catalog_errors_are_surfaced() {
        let reconciler: TestReconciler<FailingCatalog> =
            Reconciler::new(FailingCatalog, memory_definitions(), Config::default());
        let result = reconciler.session("/content", PrivilegeStateTable::new());
        assert_matches!(result, Err(ReconcileError::Catalog(_)));
    }
}
