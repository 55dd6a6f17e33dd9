//! Username change log.

use chrono::{DateTime, DurationRound, TimeDelta, Utc};
use serde::{Deserialize, Serialize};

use super::PlayerId;

/// One observed username change. `(user_id, changed_at)` is unique, and
/// `changed_at` is truncated to the minute so repeat detections within the
/// same cycle collapse into one row.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NameChange {
    pub user_id: PlayerId,
    pub changed_at: DateTime<Utc>,
    pub old_username: String,
    pub new_username: String,
}

impl NameChange {
    pub fn new(
        user_id: PlayerId,
        old_username: impl Into<String>,
        new_username: impl Into<String>,
        observed_at: DateTime<Utc>,
    ) -> Self {
        Self {
            user_id,
            changed_at: truncate_to_minute(observed_at),
            old_username: old_username.into(),
            new_username: new_username.into(),
        }
    }
}

/// Drop seconds and sub-second precision.
pub fn truncate_to_minute(at: DateTime<Utc>) -> DateTime<Utc> {
    at.duration_trunc(TimeDelta::minutes(1)).unwrap_or(at)
}
