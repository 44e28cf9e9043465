// SPDX-License-Identifier: MIT OR Apache-2.0

//! Serialized view of privilege states.
//!
//! A table is written as a map from privilege name to state. A state holds an "allow" and / or a
//! "deny" entry, buckets which are not set are omitted. A set bucket without restrictions is
//! written as `true`, otherwise as a map from restriction name to its value (or sequence of
//! values for multi-valued restrictions).
//!
//! ```json
//! {
//!   "jcr:read": { "allow": true },
//!   "jcr:write": { "deny": { "rep:glob": "/a/*", "rep:itemNames": ["x", "y"] } }
//! }
//! ```
use serde::Serialize;
use serde::ser::{SerializeMap, SerializeSeq};

use crate::restriction::{Restriction, RestrictionSet};
use crate::state::{Bucket, Decision, LocalPrivilegeState, PrivilegeStateTable};
use crate::traits::PrivilegeId;

impl<P> Serialize for PrivilegeStateTable<P>
where
    P: PrivilegeId,
{
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: serde::Serializer,
    {
        let mut map = serializer.serialize_map(Some(self.len()))?;
        for state in self.iter() {
            map.serialize_entry(&state.privilege().to_string(), state)?;
        }
        map.end()
    }
}

impl<P> Serialize for LocalPrivilegeState<P>
where
    P: PrivilegeId,
{
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: serde::Serializer,
    {
        let len = usize::from(self.is_allow()) + usize::from(self.is_deny());
        let mut map = serializer.serialize_map(Some(len))?;
        if self.is_allow() {
            map.serialize_entry("allow", self.decision(Bucket::Allow))?;
        }
        if self.is_deny() {
            map.serialize_entry("deny", self.decision(Bucket::Deny))?;
        }
        map.end()
    }
}

impl Serialize for Decision {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: serde::Serializer,
    {
        if self.restrictions.is_empty() {
            serializer.serialize_bool(true)
        } else {
            self.restrictions.serialize(serializer)
        }
    }
}

impl Serialize for RestrictionSet {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: serde::Serializer,
    {
        let mut map = serializer.serialize_map(Some(self.len()))?;
        for restriction in self {
            map.serialize_entry(restriction.name(), restriction)?;
        }
        map.end()
    }
}

impl Serialize for Restriction {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: serde::Serializer,
    {
        match (self.is_multi_value(), self.value()) {
            (false, Some(value)) => value.serialize(serializer),
            _ => {
                let mut seq = serializer.serialize_seq(Some(self.values().len()))?;
                for value in self.values() {
                    seq.serialize_element(value)?;
                }
                seq.end()
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use crate::test_utils::{READ, WRITE, glob, item_names, simple_hierarchy};
    use crate::{PrivilegeStateTable, RestrictionSet, expand};

    #[test]
    fn serialized_shape() {
        let graph = simple_hierarchy();
        let mut table = PrivilegeStateTable::new();
        table.entry(READ).allow(&RestrictionSet::new());
        expand::deny(
            &mut table,
            &graph,
            &[WRITE],
            &RestrictionSet::from_iter([glob("/a/*"), item_names(&["x", "y"])]),
        )
        .unwrap();
        table.entry("jcr:undecided");

        assert_eq!(
            serde_json::to_value(&table).unwrap(),
            json!({
                "jcr:read": { "allow": true },
                "jcr:undecided": {},
                "jcr:write": {
                    "deny": { "rep:glob": "/a/*", "rep:itemNames": ["x", "y"] }
                }
            })
        );
    }
}
