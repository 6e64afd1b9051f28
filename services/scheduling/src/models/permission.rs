//! Permission grant models

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use thiserror::Error;
use uuid::Uuid;

use crate::models::UserRole;

/// Scope of a crew chief permission grant
///
/// The three scopes form a hierarchy: a shift belongs to a job, which
/// belongs to a client. Authority checks walk from the most specific
/// scope to the least specific one.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PermissionType {
    Client,
    Job,
    Shift,
}

impl PermissionType {
    pub fn as_str(&self) -> &'static str {
        match self {
            PermissionType::Client => "client",
            PermissionType::Job => "job",
            PermissionType::Shift => "shift",
        }
    }
}

impl fmt::Display for PermissionType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Error returned when parsing an unknown permission type string
#[derive(Debug, Error)]
#[error("unknown permission type: {0}")]
pub struct ParsePermissionTypeError(pub String);

impl FromStr for PermissionType {
    type Err = ParsePermissionTypeError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "client" => Ok(PermissionType::Client),
            "job" => Ok(PermissionType::Job),
            "shift" => Ok(PermissionType::Shift),
            other => Err(ParsePermissionTypeError(other.to_string())),
        }
    }
}

/// Permission grant entity
///
/// A grant is active while `revoked_at` is unset. Revocation stamps the
/// timestamp and keeps the row for the audit trail; granting again later
/// creates a fresh row instead of reviving an old one.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PermissionGrant {
    pub id: Uuid,
    pub user_id: Uuid,
    pub permission_type: PermissionType,
    pub target_id: Uuid,
    pub granted_by: Uuid,
    pub granted_at: DateTime<Utc>,
    pub revoked_at: Option<DateTime<Utc>>,
}

impl PermissionGrant {
    pub fn is_active(&self) -> bool {
        self.revoked_at.is_none()
    }
}

/// New permission grant payload
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NewPermissionGrant {
    pub user_id: Uuid,
    pub permission_type: PermissionType,
    pub target_id: Uuid,
    pub granted_by: Uuid,
}

/// Active grant enriched with grantee details for admin listing
#[derive(Debug, Clone, Serialize)]
pub struct PermissionGrantView {
    pub id: Uuid,
    pub user_id: Uuid,
    pub user_name: String,
    pub user_role: UserRole,
    pub permission_type: PermissionType,
    pub target_id: Uuid,
    pub granted_at: DateTime<Utc>,
}
