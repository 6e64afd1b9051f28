//! User and hierarchy lookups backed by PostgreSQL

use anyhow::Result;
use sqlx::{PgPool, Row};
use uuid::Uuid;

use crate::models::{Shift, UserRole, UserSummary};
use crate::permissions::OrgDirectory;

/// PostgreSQL implementation of the org directory
///
/// Read-only projections over the `users`, `shifts`, and `jobs` tables.
/// These are the lookups the permission resolver walks along.
#[derive(Clone)]
pub struct PgOrgDirectory {
    pool: PgPool,
}

impl PgOrgDirectory {
    /// Create a new org directory
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

impl OrgDirectory for PgOrgDirectory {
    async fn find_shift(&self, shift_id: Uuid) -> Result<Option<Shift>> {
        let row = sqlx::query(
            r#"
            SELECT id, job_id, designated_crew_chief_id, starts_at, ends_at
            FROM shifts
            WHERE id = $1
            "#,
        )
        .bind(shift_id)
        .fetch_optional(&self.pool)
        .await?;

        match row {
            Some(row) => Ok(Some(Shift {
                id: row.get("id"),
                job_id: row.get("job_id"),
                designated_crew_chief_id: row.get("designated_crew_chief_id"),
                starts_at: row.get("starts_at"),
                ends_at: row.get("ends_at"),
            })),
            None => Ok(None),
        }
    }

    async fn client_id_for_job(&self, job_id: Uuid) -> Result<Option<Uuid>> {
        let client_id = sqlx::query_scalar(
            r#"
            SELECT client_id FROM jobs WHERE id = $1
            "#,
        )
        .bind(job_id)
        .fetch_optional(&self.pool)
        .await?;

        Ok(client_id)
    }

    async fn find_user(&self, user_id: Uuid) -> Result<Option<UserSummary>> {
        let row = sqlx::query(
            r#"
            SELECT id, name, role FROM users WHERE id = $1
            "#,
        )
        .bind(user_id)
        .fetch_optional(&self.pool)
        .await?;

        match row {
            Some(row) => {
                let role: String = row.get("role");
                Ok(Some(UserSummary {
                    id: row.get("id"),
                    name: row.get("name"),
                    role: role.parse::<UserRole>()?,
                }))
            }
            None => Ok(None),
        }
    }
}
