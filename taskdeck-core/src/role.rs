//! Workspace membership roles

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::Error;

/// Role of a user within a workspace
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum WorkspaceRole {
    Member,
    Manager,
    Admin,
}

impl WorkspaceRole {
    pub fn as_str(&self) -> &'static str {
        match self {
            WorkspaceRole::Member => "member",
            WorkspaceRole::Manager => "manager",
            WorkspaceRole::Admin => "admin",
        }
    }

    /// Whether this role may issue workspace invitations
    pub fn can_invite(&self) -> bool {
        matches!(self, WorkspaceRole::Manager | WorkspaceRole::Admin)
    }

    /// Check if this role has at least the privileges of another role
    pub fn includes(&self, other: WorkspaceRole) -> bool {
        match self {
            WorkspaceRole::Admin => true,
            WorkspaceRole::Manager => {
                matches!(other, WorkspaceRole::Manager | WorkspaceRole::Member)
            }
            WorkspaceRole::Member => matches!(other, WorkspaceRole::Member),
        }
    }
}

impl fmt::Display for WorkspaceRole {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for WorkspaceRole {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "member" => Ok(WorkspaceRole::Member),
            "manager" => Ok(WorkspaceRole::Manager),
            "admin" => Ok(WorkspaceRole::Admin),
            _ => Err(Error::InvalidRole(s.to_string())),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_role_round_trip() {
        for role in [
            WorkspaceRole::Member,
            WorkspaceRole::Manager,
            WorkspaceRole::Admin,
        ] {
            assert_eq!(role.as_str().parse::<WorkspaceRole>().unwrap(), role);
        }
    }

    #[test]
    fn test_unknown_role_rejected() {
        assert!("owner".parse::<WorkspaceRole>().is_err());
        assert!("Admin".parse::<WorkspaceRole>().is_err());
    }

    #[test]
    fn test_invitation_privilege() {
        assert!(!WorkspaceRole::Member.can_invite());
        assert!(WorkspaceRole::Manager.can_invite());
        assert!(WorkspaceRole::Admin.can_invite());
    }

    #[test]
    fn test_includes_is_ordered() {
        assert!(WorkspaceRole::Admin.includes(WorkspaceRole::Member));
        assert!(WorkspaceRole::Manager.includes(WorkspaceRole::Member));
        assert!(!WorkspaceRole::Member.includes(WorkspaceRole::Manager));
        assert!(!WorkspaceRole::Manager.includes(WorkspaceRole::Admin));
    }
}
