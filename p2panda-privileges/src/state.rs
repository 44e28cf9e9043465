// SPDX-License-Identifier: MIT OR Apache-2.0

//! Allow and deny decisions per privilege.
use std::collections::BTreeMap;
use std::collections::btree_map::Values;

use crate::restriction::{Restriction, RestrictionSet};
use crate::traits::PrivilegeId;

/// One of the two decision buckets of a privilege.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub(crate) enum Bucket {
    Allow,
    Deny,
}

/// A decision bucket: whether it is set and the restrictions qualifying it.
#[derive(Clone, Debug, Default, PartialEq)]
pub(crate) struct Decision {
    pub(crate) granted: bool,
    pub(crate) restrictions: RestrictionSet,
}

impl Decision {
    fn grant(&mut self, restrictions: &RestrictionSet) {
        self.granted = true;
        self.restrictions.merge(restrictions);
    }

    fn revoke(&mut self) {
        self.granted = false;
        self.restrictions.clear();
    }
}

/// Allow and deny decisions declared for a single privilege.
///
/// Both buckets are independent, each qualified by its own set of restrictions. A bucket which
/// is not set carries no restrictions after any of the decision methods was applied.
#[derive(Clone, Debug, PartialEq)]
pub struct LocalPrivilegeState<P>
where
    P: PrivilegeId,
{
    privilege: P,
    allow: Decision,
    deny: Decision,
}

impl<P> LocalPrivilegeState<P>
where
    P: PrivilegeId,
{
    /// State with neither allow nor deny set.
    pub fn new(privilege: P) -> Self {
        Self {
            privilege,
            allow: Decision::default(),
            deny: Decision::default(),
        }
    }

    pub fn privilege(&self) -> P {
        self.privilege
    }

    pub fn is_allow(&self) -> bool {
        self.allow.granted
    }

    pub fn is_deny(&self) -> bool {
        self.deny.granted
    }

    /// Return `true` if neither allow nor deny is set.
    pub fn is_none(&self) -> bool {
        !self.allow.granted && !self.deny.granted
    }

    pub fn allow_restrictions(&self) -> &RestrictionSet {
        &self.allow.restrictions
    }

    pub fn deny_restrictions(&self) -> &RestrictionSet {
        &self.deny.restrictions
    }

    pub fn allow_restriction(&self, name: &str) -> Option<&Restriction> {
        self.allow.restrictions.get(name)
    }

    pub fn deny_restriction(&self, name: &str) -> Option<&Restriction> {
        self.deny.restrictions.get(name)
    }

    pub fn same_allow_restrictions(&self, other: &Self) -> bool {
        self.same_restrictions(other, Bucket::Allow)
    }

    pub fn same_deny_restrictions(&self, other: &Self) -> bool {
        self.same_restrictions(other, Bucket::Deny)
    }

    /// Return `true` if the allow and deny buckets carry equal restrictions.
    pub fn same_allow_and_deny_restrictions(&self) -> bool {
        self.allow.restrictions == self.deny.restrictions
    }

    /// Set allow and merge the given restrictions into the allow bucket.
    ///
    /// A deny carrying the same restrictions afterwards is cleared.
    pub fn allow(&mut self, restrictions: &RestrictionSet) {
        self.allow.grant(restrictions);
        self.resolve_collision(Bucket::Allow);
    }

    /// Set deny and merge the given restrictions into the deny bucket.
    ///
    /// An allow carrying the same restrictions afterwards is cleared.
    pub fn deny(&mut self, restrictions: &RestrictionSet) {
        self.deny.grant(restrictions);
        self.resolve_collision(Bucket::Deny);
    }

    /// Clear allow and its restrictions.
    pub fn unallow(&mut self) {
        self.allow.revoke();
    }

    /// Clear deny and its restrictions.
    pub fn undeny(&mut self) {
        self.deny.revoke();
    }

    /// Clear both buckets.
    pub fn none(&mut self) {
        self.allow.revoke();
        self.deny.revoke();
    }

    /// Remove named restrictions from the allow bucket.
    pub fn unallow_restrictions<'a>(&mut self, names: impl IntoIterator<Item = &'a str>) {
        self.allow.restrictions.unset(names);
        self.resolve_collision(Bucket::Allow);
    }

    /// Remove named restrictions from the deny bucket.
    pub fn undeny_restrictions<'a>(&mut self, names: impl IntoIterator<Item = &'a str>) {
        self.deny.restrictions.unset(names);
        self.resolve_collision(Bucket::Deny);
    }

    /// Merge restrictions into whichever buckets are currently set.
    ///
    /// Never sets a bucket which was not set before. When both buckets end up with equal
    /// restrictions the deny is kept.
    pub fn allow_or_deny_restrictions(&mut self, restrictions: &RestrictionSet) {
        for bucket in [Bucket::Allow, Bucket::Deny] {
            let decision = self.decision_mut(bucket);
            if decision.granted {
                decision.restrictions.merge(restrictions);
            }
        }
        self.resolve_collision(Bucket::Deny);
    }

    /// Remove named restrictions from whichever buckets are currently set.
    ///
    /// When both buckets end up with equal restrictions the deny is kept.
    pub fn unallow_or_undeny_restrictions<'a>(
        &mut self,
        names: impl IntoIterator<Item = &'a str> + Clone,
    ) {
        for bucket in [Bucket::Allow, Bucket::Deny] {
            let decision = self.decision_mut(bucket);
            if decision.granted {
                decision.restrictions.unset(names.clone());
            }
        }
        self.resolve_collision(Bucket::Deny);
    }

    pub(crate) fn decision(&self, bucket: Bucket) -> &Decision {
        match bucket {
            Bucket::Allow => &self.allow,
            Bucket::Deny => &self.deny,
        }
    }

    pub(crate) fn decision_mut(&mut self, bucket: Bucket) -> &mut Decision {
        match bucket {
            Bucket::Allow => &mut self.allow,
            Bucket::Deny => &mut self.deny,
        }
    }

    pub(crate) fn revoke(&mut self, bucket: Bucket) {
        self.decision_mut(bucket).revoke();
    }

    /// Compare the restrictions of the same bucket of two states.
    pub(crate) fn same_restrictions(&self, other: &Self, bucket: Bucket) -> bool {
        self.decision(bucket).restrictions == other.decision(bucket).restrictions
    }

    /// Both buckets set with equal restrictions can not coexist, `winner` is kept.
    fn resolve_collision(&mut self, winner: Bucket) {
        if self.allow.granted && self.deny.granted && self.same_allow_and_deny_restrictions() {
            match winner {
                Bucket::Allow => self.deny.revoke(),
                Bucket::Deny => self.allow.revoke(),
            }
        }
    }
}

/// Working set of privilege states for one batch of edits.
///
/// States are created on first access and kept until explicitly removed or pruned, iteration
/// follows the ordering of the privilege identifiers.
#[derive(Clone, Debug, PartialEq)]
pub struct PrivilegeStateTable<P>
where
    P: PrivilegeId,
{
    states: BTreeMap<P, LocalPrivilegeState<P>>,
}

impl<P> Default for PrivilegeStateTable<P>
where
    P: PrivilegeId,
{
    fn default() -> Self {
        Self {
            states: Default::default(),
        }
    }
}

impl<P> PrivilegeStateTable<P>
where
    P: PrivilegeId,
{
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, privilege: &P) -> Option<&LocalPrivilegeState<P>> {
        self.states.get(privilege)
    }

    pub fn get_mut(&mut self, privilege: &P) -> Option<&mut LocalPrivilegeState<P>> {
        self.states.get_mut(privilege)
    }

    /// State of the given privilege, created with neither allow nor deny set if missing.
    pub fn entry(&mut self, privilege: P) -> &mut LocalPrivilegeState<P> {
        self.states
            .entry(privilege)
            .or_insert_with(|| LocalPrivilegeState::new(privilege))
    }

    /// Insert a state, replacing any previous state of the same privilege.
    pub fn insert(&mut self, state: LocalPrivilegeState<P>) -> Option<LocalPrivilegeState<P>> {
        self.states.insert(state.privilege(), state)
    }

    pub fn remove(&mut self, privilege: &P) -> Option<LocalPrivilegeState<P>> {
        self.states.remove(privilege)
    }

    pub fn contains(&self, privilege: &P) -> bool {
        self.states.contains_key(privilege)
    }

    pub fn len(&self) -> usize {
        self.states.len()
    }

    pub fn is_empty(&self) -> bool {
        self.states.is_empty()
    }

    pub fn iter(&self) -> Values<'_, P, LocalPrivilegeState<P>> {
        self.states.values()
    }

    /// Privileges with a state in this table.
    pub fn privileges(&self) -> impl Iterator<Item = P> + '_ {
        self.states.keys().copied()
    }

    pub fn is_allow(&self, privilege: &P) -> bool {
        self.get(privilege).is_some_and(|state| state.is_allow())
    }

    pub fn is_deny(&self, privilege: &P) -> bool {
        self.get(privilege).is_some_and(|state| state.is_deny())
    }

    /// Return `true` if the privilege has no state or neither allow nor deny is set.
    pub fn is_none(&self, privilege: &P) -> bool {
        self.get(privilege).is_none_or(|state| state.is_none())
    }

    /// Remove all states with neither allow nor deny set, returning how many were removed.
    pub fn prune(&mut self) -> usize {
        let before = self.states.len();
        self.states.retain(|_, state| !state.is_none());
        before - self.states.len()
    }
}

impl<P> FromIterator<LocalPrivilegeState<P>> for PrivilegeStateTable<P>
where
    P: PrivilegeId,
{
    fn from_iter<T: IntoIterator<Item = LocalPrivilegeState<P>>>(iter: T) -> Self {
        let mut table = Self::new();
        for state in iter {
            table.insert(state);
        }
        table
    }
}

impl<'a, P> IntoIterator for &'a PrivilegeStateTable<P>
where
    P: PrivilegeId,
{
    type Item = &'a LocalPrivilegeState<P>;
    type IntoIter = Values<'a, P, LocalPrivilegeState<P>>;

    fn into_iter(self) -> Self::IntoIter {
        self.iter()
    }
}
