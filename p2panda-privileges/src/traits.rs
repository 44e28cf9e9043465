// SPDX-License-Identifier: MIT OR Apache-2.0

//! Interfaces for privilege identifiers and the catalog a reconciliation session is built from.
use std::error::Error;
use std::fmt::{Debug, Display};
use std::hash::Hash;

use crate::restriction::RestrictionDefinition;

/// Identifier of a privilege.
///
/// The `Display` representation is used as the privilege name, for example when a state table is
/// serialized.
pub trait PrivilegeId: Copy + Debug + Display + Eq + Hash + Ord {}

/// Catalog of registered privileges and the privileges supported by a resource scope.
///
/// The generic parameter S is the scope (for example a resource path) privileges are looked up
/// for.
pub trait PrivilegeCatalog<P, S>
where
    P: PrivilegeId,
    S: ?Sized,
{
    type Error: Error;

    /// The aggregate privilege which contains all other privileges.
    fn root(&self) -> Result<P, Self::Error>;

    /// All privileges registered in the catalog.
    fn registered_privileges(&self) -> Result<Vec<P>, Self::Error>;

    /// Privileges supported by the given scope.
    ///
    /// Returns `None` when the scope does not exist (yet) and supported privileges can not be
    /// determined.
    fn supported_privileges(&self, scope: &S) -> Result<Option<Vec<P>>, Self::Error>;

    /// Direct children declared by an aggregate privilege, `None` if the privilege is a leaf.
    fn declared_children(&self, privilege: &P) -> Result<Option<Vec<P>>, Self::Error>;

    /// Privileges relevant for the given scope.
    ///
    /// Falls back to all registered privileges when the scope does not exist.
    fn privileges_in_scope(&self, scope: &S) -> Result<Vec<P>, Self::Error> {
        match self.supported_privileges(scope)? {
            Some(privileges) => Ok(privileges),
            None => self.registered_privileges(),
        }
    }
}

/// Provider of the restriction definitions usable within a scope.
pub trait RestrictionDefinitions<S>
where
    S: ?Sized,
{
    type Error: Error;

    /// Query all restriction definitions for the given scope.
    fn definitions(&self, scope: &S) -> Result<Vec<RestrictionDefinition>, Self::Error>;
}
