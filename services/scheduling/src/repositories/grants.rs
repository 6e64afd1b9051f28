//! Permission grant store backed by PostgreSQL

use anyhow::Result;
use chrono::{DateTime, Utc};
use sqlx::{PgPool, Row, postgres::PgRow};
use tracing::info;
use uuid::Uuid;

use crate::models::{NewPermissionGrant, PermissionGrant, PermissionType};
use crate::permissions::GrantStore;

/// PostgreSQL implementation of the permission grant store
///
/// Grants live in the `permission_grants` table and are soft-revoked by
/// stamping `revoked_at`, keeping the audit trail intact. The table does
/// not enforce at-most-one active grant per tuple; the resolver's
/// any-active-grant semantics make duplicates harmless.
#[derive(Clone)]
pub struct PgGrantStore {
    pool: PgPool,
}

impl PgGrantStore {
    /// Create a new grant store
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

fn grant_from_row(row: &PgRow) -> Result<PermissionGrant> {
    let permission_type: String = row.get("permission_type");
    Ok(PermissionGrant {
        id: row.get("id"),
        user_id: row.get("user_id"),
        permission_type: permission_type.parse::<PermissionType>()?,
        target_id: row.get("target_id"),
        granted_by: row.get("granted_by"),
        granted_at: row.get("granted_at"),
        revoked_at: row.get("revoked_at"),
    })
}

impl GrantStore for PgGrantStore {
    async fn has_active_grant(
        &self,
        user_id: Uuid,
        permission_type: PermissionType,
        target_id: Uuid,
    ) -> Result<bool> {
        let exists: bool = sqlx::query_scalar(
            r#"
            SELECT EXISTS(
                SELECT 1 FROM permission_grants
                WHERE user_id = $1 AND permission_type = $2 AND target_id = $3
                  AND revoked_at IS NULL
            )
            "#,
        )
        .bind(user_id)
        .bind(permission_type.as_str())
        .bind(target_id)
        .fetch_one(&self.pool)
        .await?;

        Ok(exists)
    }

    async fn insert(&self, new_grant: &NewPermissionGrant) -> Result<PermissionGrant> {
        info!(
            "Inserting {} grant on {} for user {}",
            new_grant.permission_type, new_grant.target_id, new_grant.user_id
        );

        let row = sqlx::query(
            r#"
            INSERT INTO permission_grants (user_id, permission_type, target_id, granted_by)
            VALUES ($1, $2, $3, $4)
            RETURNING id, user_id, permission_type, target_id, granted_by, granted_at, revoked_at
            "#,
        )
        .bind(new_grant.user_id)
        .bind(new_grant.permission_type.as_str())
        .bind(new_grant.target_id)
        .bind(new_grant.granted_by)
        .fetch_one(&self.pool)
        .await?;

        grant_from_row(&row)
    }

    async fn revoke_all(
        &self,
        user_id: Uuid,
        permission_type: PermissionType,
        target_id: Uuid,
        revoked_at: DateTime<Utc>,
    ) -> Result<u64> {
        let result = sqlx::query(
            r#"
            UPDATE permission_grants
            SET revoked_at = $4
            WHERE user_id = $1 AND permission_type = $2 AND target_id = $3
              AND revoked_at IS NULL
            "#,
        )
        .bind(user_id)
        .bind(permission_type.as_str())
        .bind(target_id)
        .bind(revoked_at)
        .execute(&self.pool)
        .await?;

        Ok(result.rows_affected())
    }

    async fn list_active(
        &self,
        permission_type: PermissionType,
        target_id: Uuid,
    ) -> Result<Vec<PermissionGrant>> {
        let rows = sqlx::query(
            r#"
            SELECT id, user_id, permission_type, target_id, granted_by, granted_at, revoked_at
            FROM permission_grants
            WHERE permission_type = $1 AND target_id = $2 AND revoked_at IS NULL
            ORDER BY granted_at
            "#,
        )
        .bind(permission_type.as_str())
        .bind(target_id)
        .fetch_all(&self.pool)
        .await?;

        rows.iter().map(grant_from_row).collect()
    }
}
