//! HTTP client for the remote stats service.

use std::sync::Arc;
use std::time::{Duration, Instant};

use async_trait::async_trait;
use reqwest::header::{HeaderMap, HeaderValue, USER_AGENT};
use reqwest::{Client, Method, RequestBuilder, StatusCode};
use serde::de::DeserializeOwned;
use tokio::sync::Mutex;
use tracing::{debug, info, warn};
use url::Url;

use super::types::{TokenResponse, UsernameQueryResponse};
use super::{
    CharacterStatsDoc, LeaderboardPage, MasteryDoc, PlayerDoc, RankingSearch, RemoteError,
    StatsProvider, TokenManager, TokenPair,
};
use crate::config::RemoteConfig;
use crate::models::{PlayerId, Region};

const AUTH_HEADER: &str = "X-Authorization";
const REFRESH_HEADER: &str = "X-Refresh-Token";

/// Authenticated, rate-limited client for the stats service.
pub struct StatsClient {
    client: Client,
    base_url: Url,
    tokens: Arc<TokenManager>,
    request_delay: Duration,
    last_request: Mutex<Option<Instant>>,
}

impl StatsClient {
    pub fn new(config: &RemoteConfig, tokens: Arc<TokenManager>) -> Result<Self, RemoteError> {
        let mut headers = HeaderMap::new();
        headers.insert(
            USER_AGENT,
            HeaderValue::from_str(&config.user_agent)
                .unwrap_or_else(|_| HeaderValue::from_static("player-sync/0.1.0")),
        );

        let client = Client::builder()
            .timeout(Duration::from_secs(config.timeout_seconds))
            .default_headers(headers)
            .build()?;

        let mut base = config.base_url.clone();
        if !base.ends_with('/') {
            base.push('/');
        }
        let base_url = Url::parse(&base).map_err(|e| RemoteError::InvalidUrl(e.to_string()))?;

        Ok(Self {
            client,
            base_url,
            tokens,
            request_delay: Duration::from_millis(config.request_delay_ms),
            last_request: Mutex::new(None),
        })
    }

    fn endpoint(&self, path: &str) -> Result<Url, RemoteError> {
        self.base_url
            .join(path.trim_start_matches('/'))
            .map_err(|e| RemoteError::InvalidUrl(format!("{}: {}", path, e)))
    }

    /// Endpoint with the player id escaped as a single path segment.
    fn player_endpoint(
        &self,
        prefix: &str,
        id: &PlayerId,
        suffix: Option<&str>,
    ) -> Result<Url, RemoteError> {
        let mut url = self.endpoint(prefix)?;
        url.path_segments_mut()
            .map_err(|_| RemoteError::InvalidUrl(format!("{} cannot take a path", prefix)))?
            .pop_if_empty()
            .push(id.as_str())
            .extend(suffix);
        Ok(url)
    }

    /// Space requests at least `request_delay` apart.
    async fn throttle(&self) {
        let mut last = self.last_request.lock().await;
        if let Some(at) = *last {
            let elapsed = at.elapsed();
            if elapsed < self.request_delay {
                tokio::time::sleep(self.request_delay - elapsed).await;
            }
        }
        *last = Some(Instant::now());
    }

    fn authorize(request: RequestBuilder, pair: &TokenPair) -> RequestBuilder {
        request
            .header(AUTH_HEADER, format!("Bearer {}", pair.token))
            .header(REFRESH_HEADER, &pair.refresh)
    }

    /// GET a JSON document, refreshing the token and retrying once on 401/403.
    async fn get_json<T: DeserializeOwned>(
        &self,
        url: Url,
        query: &[(&str, String)],
    ) -> Result<T, RemoteError> {
        let mut pair = self.tokens.current().await;
        let mut refreshed = false;

        loop {
            self.throttle().await;
            debug!("GET {}", url);

            let request = Self::authorize(self.client.request(Method::GET, url.clone()), &pair)
                .query(query);
            let response = request.send().await?;
            let status = response.status();

            if matches!(status, StatusCode::UNAUTHORIZED | StatusCode::FORBIDDEN) && !refreshed {
                warn!("{} returned {}, refreshing token", url, status);
                pair = self.refresh(&pair).await?;
                refreshed = true;
                continue;
            }

            Self::check_status(status, &response)?;
            let body = response.bytes().await?;
            return Ok(serde_json::from_slice(&body)?);
        }
    }

    fn check_status(status: StatusCode, response: &reqwest::Response) -> Result<(), RemoteError> {
        if status == StatusCode::TOO_MANY_REQUESTS {
            let retry_after = response
                .headers()
                .get("retry-after")
                .and_then(|v| v.to_str().ok())
                .and_then(|s| s.parse().ok())
                .unwrap_or(60);
            return Err(RemoteError::RateLimited {
                retry_after_secs: retry_after,
            });
        }

        if !status.is_success() {
            return Err(RemoteError::HttpStatus {
                status: status.as_u16(),
                message: status.canonical_reason().unwrap_or("Unknown").to_string(),
            });
        }

        Ok(())
    }

    async fn refresh(&self, stale: &TokenPair) -> Result<TokenPair, RemoteError> {
        let client = self.client.clone();
        let url = self.endpoint("v1/login/token")?;

        self.tokens
            .refresh(stale, move |live| async move {
                info!("Requesting new token pair");
                let response = Self::authorize(client.post(url), &live).send().await?;
                Self::check_status(response.status(), &response)?;
                let body: TokenResponse = response.json().await?;
                Ok(TokenPair {
                    token: body.jwt,
                    refresh: body.refresh_token,
                })
            })
            .await
    }

    fn region_param(region: Region) -> Vec<(&'static str, String)> {
        region
            .query_param()
            .map(|r| vec![("specificRegion", r.to_string())])
            .unwrap_or_default()
    }
}

#[async_trait]
impl StatsProvider for StatsClient {
    fn name(&self) -> &'static str {
        "stats-http"
    }

    async fn query_by_username(&self, username: &str) -> Result<Option<PlayerDoc>, RemoteError> {
        let response: UsernameQueryResponse = self
            .get_json(self.endpoint("v1/players")?, &[("usernameQuery", username.to_string())])
            .await?;

        let wanted = username.to_lowercase();
        Ok(response
            .matches
            .into_iter()
            .find(|doc| doc.username.to_lowercase() == wanted))
    }

    async fn search_ranking(
        &self,
        id: &PlayerId,
        entries_before: u32,
        entries_after: u32,
        region: Region,
    ) -> Result<RankingSearch, RemoteError> {
        let mut query = vec![
            ("entriesBefore", entries_before.to_string()),
            ("entriesAfter", entries_after.to_string()),
        ];
        query.extend(Self::region_param(region));

        let url = self.player_endpoint("v1/ranked/leaderboard/search", id, None)?;
        self.get_json(url, &query).await
    }

    async fn fetch_mastery(&self, id: &PlayerId) -> Result<MasteryDoc, RemoteError> {
        let url = self.player_endpoint("v1/mastery", id, Some("player"))?;
        self.get_json(url, &[]).await
    }

    async fn fetch_character_stats(
        &self,
        id: &PlayerId,
    ) -> Result<CharacterStatsDoc, RemoteError> {
        let url = self.player_endpoint("v1/stats/player-stats", id, None)?;
        self.get_json(url, &[]).await
    }

    async fn leaderboard_page(
        &self,
        start_rank: u32,
        page_size: u32,
        region: Region,
    ) -> Result<LeaderboardPage, RemoteError> {
        let mut query = vec![
            ("startRank", start_rank.to_string()),
            ("pageSize", page_size.to_string()),
        ];
        query.extend(Self::region_param(region));

        self.get_json(self.endpoint("v1/ranked/leaderboard/players")?, &query)
            .await
    }
}
