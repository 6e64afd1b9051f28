//! User model and related functionality

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use thiserror::Error;
use uuid::Uuid;

/// Workforce role of a user
///
/// Roles are stored as lowercase snake_case strings in the database.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum UserRole {
    Employee,
    CrewChief,
    Admin,
    Client,
}

impl UserRole {
    /// Whether this role may hold explicit crew chief permission grants.
    ///
    /// Admins have implicit full authority and never need a grant row;
    /// client users never hold crew chief authority at all.
    pub fn can_hold_grants(&self) -> bool {
        matches!(self, UserRole::Employee | UserRole::CrewChief)
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            UserRole::Employee => "employee",
            UserRole::CrewChief => "crew_chief",
            UserRole::Admin => "admin",
            UserRole::Client => "client",
        }
    }
}

impl fmt::Display for UserRole {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Error returned when parsing an unknown role string
#[derive(Debug, Error)]
#[error("unknown user role: {0}")]
pub struct ParseUserRoleError(pub String);

impl FromStr for UserRole {
    type Err = ParseUserRoleError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "employee" => Ok(UserRole::Employee),
            "crew_chief" => Ok(UserRole::CrewChief),
            "admin" => Ok(UserRole::Admin),
            "client" => Ok(UserRole::Client),
            other => Err(ParseUserRoleError(other.to_string())),
        }
    }
}

/// Minimal user projection returned by the directory lookup
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UserSummary {
    pub id: Uuid,
    pub name: String,
    pub role: UserRole,
}

/// The user on whose behalf an authority check runs
#[derive(Debug, Clone, Copy)]
pub struct ActingUser {
    pub id: Uuid,
    pub role: UserRole,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_grant_eligibility_by_role() {
        assert!(UserRole::Employee.can_hold_grants());
        assert!(UserRole::CrewChief.can_hold_grants());
        assert!(!UserRole::Admin.can_hold_grants());
        assert!(!UserRole::Client.can_hold_grants());
    }

    #[test]
    fn test_role_round_trips_through_string_form() {
        for role in [
            UserRole::Employee,
            UserRole::CrewChief,
            UserRole::Admin,
            UserRole::Client,
        ] {
            assert_eq!(role.as_str().parse::<UserRole>().unwrap(), role);
        }
        assert!("supervisor".parse::<UserRole>().is_err());
    }
}
