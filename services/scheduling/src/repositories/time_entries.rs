//! Time entry repository for database operations

use anyhow::Result;
use sqlx::{PgPool, Row, postgres::PgRow};
use uuid::Uuid;

use crate::models::TimeEntry;

/// Time entry repository
#[derive(Clone)]
pub struct TimeEntryRepository {
    pool: PgPool,
}

impl TimeEntryRepository {
    /// Create a new time entry repository
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// List every time entry recorded against a shift, grouped by worker
    /// and ordered by entry number.
    pub async fn list_for_shift(&self, shift_id: Uuid) -> Result<Vec<TimeEntry>> {
        let rows = sqlx::query(
            r#"
            SELECT id, shift_id, user_id, entry_number, clock_in, clock_out
            FROM time_entries
            WHERE shift_id = $1
            ORDER BY user_id, entry_number
            "#,
        )
        .bind(shift_id)
        .fetch_all(&self.pool)
        .await?;

        Ok(rows.iter().map(entry_from_row).collect())
    }

    /// List one worker's time entries on a shift, ordered by entry number.
    pub async fn list_for_worker(&self, shift_id: Uuid, user_id: Uuid) -> Result<Vec<TimeEntry>> {
        let rows = sqlx::query(
            r#"
            SELECT id, shift_id, user_id, entry_number, clock_in, clock_out
            FROM time_entries
            WHERE shift_id = $1 AND user_id = $2
            ORDER BY entry_number
            "#,
        )
        .bind(shift_id)
        .bind(user_id)
        .fetch_all(&self.pool)
        .await?;

        Ok(rows.iter().map(entry_from_row).collect())
    }
}

fn entry_from_row(row: &PgRow) -> TimeEntry {
    TimeEntry {
        id: row.get("id"),
        shift_id: row.get("shift_id"),
        user_id: row.get("user_id"),
        entry_number: row.get("entry_number"),
        clock_in: row.get("clock_in"),
        clock_out: row.get("clock_out"),
    }
}
