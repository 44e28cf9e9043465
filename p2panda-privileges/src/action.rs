// SPDX-License-Identifier: MIT OR Apache-2.0

use crate::restriction::RestrictionSet;

/// Edits which can be requested against a set of (aggregate) privileges.
#[derive(Clone, Debug, PartialEq)]
pub enum PrivilegeAction<P> {
    Allow {
        privileges: Vec<P>,
        restrictions: RestrictionSet,
    },
    Unallow {
        privileges: Vec<P>,
    },
    Deny {
        privileges: Vec<P>,
        restrictions: RestrictionSet,
    },
    Undeny {
        privileges: Vec<P>,
    },
    None {
        privileges: Vec<P>,
    },
    AllowRestrictions {
        privileges: Vec<P>,
        restrictions: RestrictionSet,
    },
    UnallowRestrictions {
        privileges: Vec<P>,
        names: Vec<String>,
    },
    DenyRestrictions {
        privileges: Vec<P>,
        restrictions: RestrictionSet,
    },
    UndenyRestrictions {
        privileges: Vec<P>,
        names: Vec<String>,
    },
    AllowOrDenyRestrictions {
        privileges: Vec<P>,
        restrictions: RestrictionSet,
    },
    UnallowOrUndenyRestrictions {
        privileges: Vec<P>,
        names: Vec<String>,
    },
}

impl<P> PrivilegeAction<P> {
    /// Privileges this action was requested against.
    pub fn privileges(&self) -> &[P] {
        match self {
            PrivilegeAction::Allow { privileges, .. }
            | PrivilegeAction::Unallow { privileges }
            | PrivilegeAction::Deny { privileges, .. }
            | PrivilegeAction::Undeny { privileges }
            | PrivilegeAction::None { privileges }
            | PrivilegeAction::AllowRestrictions { privileges, .. }
            | PrivilegeAction::UnallowRestrictions { privileges, .. }
            | PrivilegeAction::DenyRestrictions { privileges, .. }
            | PrivilegeAction::UndenyRestrictions { privileges, .. }
            | PrivilegeAction::AllowOrDenyRestrictions { privileges, .. }
            | PrivilegeAction::UnallowOrUndenyRestrictions { privileges, .. } => privileges,
        }
    }

    /// Return `true` if this action only edits restrictions of already existing decisions.
    pub fn is_restriction_only(&self) -> bool {
        matches!(
            self,
            PrivilegeAction::AllowOrDenyRestrictions { .. }
                | PrivilegeAction::UnallowOrUndenyRestrictions { .. }
        )
    }
}
