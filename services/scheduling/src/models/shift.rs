//! Shift model

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Shift entity
///
/// A shift belongs to a job and may name a crew chief of record. The
/// designated crew chief holds full authority over the shift without a
/// separate permission grant.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Shift {
    pub id: Uuid,
    pub job_id: Uuid,
    pub designated_crew_chief_id: Option<Uuid>,
    pub starts_at: DateTime<Utc>,
    pub ends_at: DateTime<Utc>,
}
