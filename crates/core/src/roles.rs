//! Organisation-level roles.
//!
//! Role codes must match the seed data in `db/migrations`. Every
//! permission decision compares [`Role`] values, never raw strings.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::CoreError;

pub const ROLE_ADMIN: &str = "admin";
pub const ROLE_DEPT_MANAGER: &str = "dept_manager";
pub const ROLE_TEAM_LEADER: &str = "team_leader";
pub const ROLE_TEAM_MEMBER: &str = "team_member";

/// The closed set of organisation roles.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Role {
    Admin,
    DeptManager,
    TeamLeader,
    TeamMember,
}

impl Role {
    pub const ALL: [Role; 4] = [
        Role::Admin,
        Role::DeptManager,
        Role::TeamLeader,
        Role::TeamMember,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            Role::Admin => ROLE_ADMIN,
            Role::DeptManager => ROLE_DEPT_MANAGER,
            Role::TeamLeader => ROLE_TEAM_LEADER,
            Role::TeamMember => ROLE_TEAM_MEMBER,
        }
    }

    /// Human-readable name stored in `roles.name`.
    pub fn display_name(self) -> &'static str {
        match self {
            Role::Admin => "系统管理员",
            Role::DeptManager => "部门经理",
            Role::TeamLeader => "组长",
            Role::TeamMember => "组员",
        }
    }

    /// Admins and department managers administer users, logs and the
    /// knowledge base.
    pub fn is_management(self) -> bool {
        matches!(self, Role::Admin | Role::DeptManager)
    }

    /// Team leaders and members do the project work.
    pub fn is_contributor(self) -> bool {
        matches!(self, Role::TeamLeader | Role::TeamMember)
    }
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Role {
    type Err = CoreError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            ROLE_ADMIN => Ok(Role::Admin),
            ROLE_DEPT_MANAGER => Ok(Role::DeptManager),
            ROLE_TEAM_LEADER => Ok(Role::TeamLeader),
            ROLE_TEAM_MEMBER => Ok(Role::TeamMember),
            other => Err(CoreError::Validation(format!("Unknown role code '{other}'"))),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn codes_round_trip_through_from_str() {
        for role in Role::ALL {
            assert_eq!(role.as_str().parse::<Role>().unwrap(), role);
        }
    }

    #[test]
    fn unknown_code_is_rejected() {
        assert!("superuser".parse::<Role>().is_err());
        assert!("Admin".parse::<Role>().is_err(), "codes are case-sensitive");
    }

    #[test]
    fn management_and_contributor_sets_are_disjoint() {
        for role in Role::ALL {
            assert!(!(role.is_management() && role.is_contributor()));
        }
        assert!(Role::DeptManager.is_management());
        assert!(Role::TeamLeader.is_contributor());
    }

    #[test]
    fn serde_uses_snake_case_codes() {
        let json = serde_json::to_string(&Role::DeptManager).unwrap();
        assert_eq!(json, "\"dept_manager\"");
    }
}
