//! Time entry model

use chrono::{DateTime, SecondsFormat, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::timekeeping::ClockPair;

/// One clock-in/clock-out pair for one worker on one shift
///
/// Workers may clock in and out several times per shift (breaks, split
/// assignments); `entry_number` orders the pairs. An entry with only one
/// side recorded contributes zero billable hours until it is completed.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TimeEntry {
    pub id: Uuid,
    pub shift_id: Uuid,
    pub user_id: Uuid,
    pub entry_number: i32,
    pub clock_in: Option<DateTime<Utc>>,
    pub clock_out: Option<DateTime<Utc>>,
}

impl TimeEntry {
    /// Project the entry into the string pair the timekeeping engine consumes.
    pub fn clock_pair(&self) -> ClockPair {
        ClockPair {
            clock_in: self
                .clock_in
                .map(|t| t.to_rfc3339_opts(SecondsFormat::Secs, false)),
            clock_out: self
                .clock_out
                .map(|t| t.to_rfc3339_opts(SecondsFormat::Secs, false)),
        }
    }
}
