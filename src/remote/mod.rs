//! Remote stats service access.
//!
//! `StatsProvider` is the seam the sync layer talks to; `StatsClient` is the
//! HTTP implementation. Token refresh and region probing live beside it.

pub mod client;
pub mod region;
pub mod token;
pub mod types;

#[cfg(test)]
pub mod mock;

use async_trait::async_trait;
use thiserror::Error;

use crate::models::{PlayerId, Region};

pub use client::StatsClient;
pub use region::{ensure_region, EnsuredRegion};
pub use token::{FileTokenStore, TokenManager, TokenPair, TokenStore};
pub use types::*;

/// Errors from the remote stats service.
#[derive(Debug, Error)]
pub enum RemoteError {
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("Invalid URL: {0}")]
    InvalidUrl(String),

    #[error("Rate limited, retry after {retry_after_secs}s")]
    RateLimited { retry_after_secs: u64 },

    #[error("HTTP {status}: {message}")]
    HttpStatus { status: u16, message: String },

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Token refresh failed: {0}")]
    Auth(String),
}

impl RemoteError {
    /// The service answered that it has no such resource.
    pub fn is_not_found(&self) -> bool {
        matches!(self, RemoteError::HttpStatus { status: 404, .. })
    }
}

/// Queries against the authoritative stats service.
#[async_trait]
pub trait StatsProvider: Send + Sync {
    /// Provider name for logging.
    fn name(&self) -> &'static str;

    /// Exact (case-insensitive) username match, if the service knows one.
    async fn query_by_username(&self, username: &str) -> Result<Option<PlayerDoc>, RemoteError>;

    /// Ranking neighbourhood around a player id.
    async fn search_ranking(
        &self,
        id: &PlayerId,
        entries_before: u32,
        entries_after: u32,
        region: Region,
    ) -> Result<RankingSearch, RemoteError>;

    async fn fetch_mastery(&self, id: &PlayerId) -> Result<MasteryDoc, RemoteError>;

    async fn fetch_character_stats(&self, id: &PlayerId)
        -> Result<CharacterStatsDoc, RemoteError>;

    /// One page of a regional leaderboard, starting at `start_rank`.
    async fn leaderboard_page(
        &self,
        start_rank: u32,
        page_size: u32,
        region: Region,
    ) -> Result<LeaderboardPage, RemoteError>;
}
