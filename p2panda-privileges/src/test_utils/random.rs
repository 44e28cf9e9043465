// SPDX-License-Identifier: MIT OR Apache-2.0

use std::collections::BTreeMap;

use rand::Rng;
use rand_chacha::ChaCha20Rng;

use crate::action::PrivilegeAction;
use crate::hierarchy::PrivilegeGraph;
use crate::restriction::RestrictionSet;
use crate::state::PrivilegeStateTable;
use crate::traits::PrivilegeId;

/// Generate unrestricted allow, deny and clearing actions against random privileges.
pub fn random_actions<P>(
    rng: &mut ChaCha20Rng,
    graph: &PrivilegeGraph<P>,
    count: usize,
) -> Vec<PrivilegeAction<P>>
where
    P: PrivilegeId,
{
    let privileges: Vec<P> = graph.privileges().collect();
    let mut actions = Vec::with_capacity(count);
    for _ in 0..count {
        let targets = (0..rng.random_range(1..=2))
            .map(|_| privileges[rng.random_range(0..privileges.len())])
            .collect::<Vec<_>>();

        let action = match rng.random_range(0..5) {
            0 => PrivilegeAction::Allow {
                privileges: targets,
                restrictions: RestrictionSet::new(),
            },
            1 => PrivilegeAction::Deny {
                privileges: targets,
                restrictions: RestrictionSet::new(),
            },
            2 => PrivilegeAction::Unallow {
                privileges: targets,
            },
            3 => PrivilegeAction::Undeny {
                privileges: targets,
            },
            _ => PrivilegeAction::None {
                privileges: targets,
            },
        };
        actions.push(action);
    }

    actions
}

/// Whether every leaf is allowed and denied, either through its own state or through the state
/// of any aggregate containing it.
pub fn effective_decisions<P>(
    table: &PrivilegeStateTable<P>,
    graph: &PrivilegeGraph<P>,
) -> BTreeMap<P, (bool, bool)>
where
    P: PrivilegeId,
{
    graph
        .privileges()
        .filter(|privilege| !graph.is_aggregate(privilege))
        .map(|leaf| {
            let ancestors = graph.ancestors(leaf).expect("leaf is part of the graph");
            let allow = table.is_allow(&leaf) || ancestors.iter().any(|p| table.is_allow(p));
            let deny = table.is_deny(&leaf) || ancestors.iter().any(|p| table.is_deny(p));
            (leaf, (allow, deny))
        })
        .collect()
}
