// SPDX-License-Identifier: MIT OR Apache-2.0

//! Reconcile allow / deny edits over a hierarchy of (aggregate) privileges.
//!
//! Edits requested against aggregate privileges are expanded to the leaf privileges they control
//! and, once a batch of edits is complete, consolidated back into the coarsest equivalent set of
//! aggregate entries. The privilege hierarchy is a DAG: a leaf can be reachable from the root
//! aggregate along several paths of different length.
mod action;
mod config;
pub mod consolidate;
mod depth;
#[cfg(feature = "serde")]
mod entries;
pub mod expand;
mod hierarchy;
mod reconciler;
mod restriction;
mod state;
#[cfg(any(test, feature = "test_utils"))]
pub mod test_utils;
#[cfg(test)]
mod tests;
pub mod traits;

pub use action::PrivilegeAction;
pub use config::Config;
pub use consolidate::consolidate;
pub use depth::PrivilegeDepthMap;
pub use hierarchy::{PrivilegeError, PrivilegeGraph};
pub use reconciler::{ReconcileError, Reconciler, Session};
pub use restriction::{
    Restriction, RestrictionDefinition, RestrictionError, RestrictionSet, RestrictionValue,
    ValueType,
};
pub use state::{LocalPrivilegeState, PrivilegeStateTable};
