// SPDX-License-Identifier: MIT OR Apache-2.0

use rand::SeedableRng;
use rand_chacha::ChaCha20Rng;

use crate::test_utils::{
    ALL, JCR_WRITE, MODIFY_PROPERTIES, NODE_TYPE_MANAGEMENT, READ, READ_NODES, READ_PROPERTIES,
    REP_WRITE, TestReconciler, effective_decisions, jcr_catalog, memory_definitions,
    random_actions, setup_logging,
};
use crate::{Config, PrivilegeAction, PrivilegeStateTable, Reconciler, RestrictionSet};

fn jcr_reconciler(config: Config) -> TestReconciler {
    Reconciler::new(jcr_catalog(), memory_definitions(), config)
}

#[test]
fn reconcile_over_several_batches() {
    setup_logging();

    let reconciler = jcr_reconciler(Config::default());

    // Allow everything, then take away a single leaf.
    let mut session = reconciler.session("/", PrivilegeStateTable::new()).unwrap();
    session
        .apply(&PrivilegeAction::Allow {
            privileges: vec![ALL],
            restrictions: RestrictionSet::new(),
        })
        .unwrap();
    let table = session.commit().unwrap();
    assert_eq!(table.privileges().collect::<Vec<_>>(), vec![ALL]);

    // A fresh batch starting from leaf states re-folds everything but the touched branch.
    let mut session = reconciler.session("/", PrivilegeStateTable::new()).unwrap();
    session
        .apply_all(&[
            PrivilegeAction::Allow {
                privileges: vec![ALL],
                restrictions: RestrictionSet::new(),
            },
            PrivilegeAction::Unallow {
                privileges: vec![READ_NODES],
            },
        ])
        .unwrap();
    let table = session.commit().unwrap();

    assert!(!table.contains(&ALL));
    assert!(!table.contains(&READ));
    assert!(table.is_allow(&REP_WRITE));
    assert!(!table.contains(&READ_NODES));
    assert!(!table.contains(&JCR_WRITE));
}

#[test]
fn restricted_deny_is_promoted_to_aggregate() {
    let reconciler = jcr_reconciler(Config::default());
    let mut session = reconciler.session("/", PrivilegeStateTable::new()).unwrap();

    let glob = session.restriction("rep:glob", &["*/jcr:content"]).unwrap();
    session
        .apply(&PrivilegeAction::Deny {
            privileges: vec![JCR_WRITE],
            restrictions: RestrictionSet::from_iter([glob.clone()]),
        })
        .unwrap();
    session
        .apply(&PrivilegeAction::Deny {
            privileges: vec![NODE_TYPE_MANAGEMENT],
            restrictions: RestrictionSet::from_iter([glob.clone()]),
        })
        .unwrap();
    let table = session.commit().unwrap();

    assert_eq!(table.privileges().collect::<Vec<_>>(), vec![REP_WRITE]);
    let state = table.get(&REP_WRITE).unwrap();
    assert!(state.is_deny());
    assert_eq!(state.deny_restriction("rep:glob"), Some(&glob));
}

#[test]
fn restriction_only_edits_leave_undecided_privileges_alone() {
    let reconciler = jcr_reconciler(Config::new().with_consolidation(false));
    let mut session = reconciler.session("/", PrivilegeStateTable::new()).unwrap();

    let item_names = session.restriction("rep:itemNames", &["a", "b"]).unwrap();
    session
        .apply_all(&[
            PrivilegeAction::Allow {
                privileges: vec![MODIFY_PROPERTIES],
                restrictions: RestrictionSet::new(),
            },
            PrivilegeAction::AllowOrDenyRestrictions {
                privileges: vec![JCR_WRITE],
                restrictions: RestrictionSet::from_iter([item_names.clone()]),
            },
        ])
        .unwrap();
    let table = session.commit().unwrap();

    for state in table.iter() {
        if state.is_allow() {
            assert_eq!(state.allow_restriction("rep:itemNames"), Some(&item_names));
        } else {
            assert!(state.is_none());
            assert!(state.allow_restrictions().is_empty());
        }
    }
    assert_eq!(table.iter().filter(|state| state.is_allow()).count(), 3);
}

#[test]
fn leaf_edit_below_consolidated_aggregate() {
    let reconciler = jcr_reconciler(Config::default());

    let mut session = reconciler.session("/", PrivilegeStateTable::new()).unwrap();
    session
        .apply(&PrivilegeAction::Allow {
            privileges: vec![READ],
            restrictions: RestrictionSet::new(),
        })
        .unwrap();
    let table = session.commit().unwrap();
    assert_eq!(table.privileges().collect::<Vec<_>>(), vec![READ]);

    let mut session = reconciler.session("/", table).unwrap();
    session
        .apply(&PrivilegeAction::Unallow {
            privileges: vec![READ_NODES],
        })
        .unwrap();
    let graph = session.graph().clone();
    let table = session.commit().unwrap();

    assert!(!table.contains(&READ));
    let decisions = effective_decisions(&table, &graph);
    assert_eq!(decisions[&READ_NODES], (false, false));
    assert_eq!(decisions[&READ_PROPERTIES], (true, false));
}

#[test]
fn consolidation_preserves_effective_decisions() {
    setup_logging();

    let expanding = jcr_reconciler(Config::new().with_consolidation(false));
    let consolidating = jcr_reconciler(Config::default());

    for seed in 0..64 {
        let mut rng = ChaCha20Rng::seed_from_u64(seed);
        let mut expanded = PrivilegeStateTable::new();
        let mut consolidated = PrivilegeStateTable::new();

        // Every batch continues from the table committed by the previous one.
        for batch in 0..3 {
            let mut session = expanding.session("/", expanded).unwrap();
            let actions = random_actions(&mut rng, session.graph(), 8);
            session.apply_all(&actions).unwrap();
            let graph = session.graph().clone();
            expanded = session.commit().unwrap();

            let mut session = consolidating.session("/", consolidated).unwrap();
            session.apply_all(&actions).unwrap();
            consolidated = session.commit().unwrap();

            assert!(consolidated.len() <= expanded.len(), "seed {seed}, batch {batch}");
            assert!(
                consolidated.iter().all(|state| !state.is_none()),
                "seed {seed}, batch {batch}"
            );
            assert_eq!(
                effective_decisions(&expanded, &graph),
                effective_decisions(&consolidated, &graph),
                "seed {seed}, batch {batch}"
            );
        }
    }
}
