//! Bulk jobs built on the sync layer.

pub mod leaderboard;

use std::time::Duration;

use serde::{Deserialize, Serialize};

pub use leaderboard::LeaderboardJob;

/// Counters for one batch run. Per-player failures are counted here and never
/// abort the batch.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct BatchReport {
    pub processed: u32,
    pub created: u32,
    pub updated: u32,
    /// Players whose stored state already matched
    pub skipped: u32,
    pub failed: u32,
    pub errors: Vec<String>,
    #[serde(skip)]
    pub duration: Duration,
}

impl BatchReport {
    pub fn record_failure(&mut self, error: impl Into<String>) {
        self.failed += 1;
        self.errors.push(error.into());
    }
}
