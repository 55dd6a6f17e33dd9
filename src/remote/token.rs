//! Bearer/refresh token handling.
//!
//! The current pair lives in a `TokenManager`. When a request is rejected the
//! client asks the manager to refresh; concurrent callers that saw the same
//! stale pair all await one in-flight refresh.

use std::future::Future;
use std::path::PathBuf;
use std::sync::Arc;

use async_trait::async_trait;
use futures::future::{BoxFuture, FutureExt, Shared};
use serde::{Deserialize, Serialize};
use tokio::fs;
use tokio::sync::{Mutex, RwLock};
use tracing::{debug, info, warn};

use super::RemoteError;

/// Bearer token plus the refresh token that renews it.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TokenPair {
    pub token: String,
    pub refresh: String,
}

/// Where the token pair is persisted between runs.
#[async_trait]
pub trait TokenStore: Send + Sync {
    async fn load(&self) -> Result<TokenPair, RemoteError>;

    async fn save(&self, pair: &TokenPair) -> Result<(), RemoteError>;
}

/// Token pair stored as a JSON file.
pub struct FileTokenStore {
    path: PathBuf,
}

impl FileTokenStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }
}

#[async_trait]
impl TokenStore for FileTokenStore {
    async fn load(&self) -> Result<TokenPair, RemoteError> {
        if !self.path.exists() {
            warn!("Token file {} not found, starting unauthenticated", self.path.display());
            return Ok(TokenPair::default());
        }
        let content = fs::read_to_string(&self.path).await?;
        Ok(serde_json::from_str(&content)?)
    }

    async fn save(&self, pair: &TokenPair) -> Result<(), RemoteError> {
        if let Some(parent) = self.path.parent() {
            fs::create_dir_all(parent).await?;
        }
        let json = serde_json::to_string_pretty(pair)?;
        fs::write(&self.path, json).await?;
        Ok(())
    }
}

type RefreshFuture = Shared<BoxFuture<'static, Result<TokenPair, String>>>;

struct InFlight {
    generation: u64,
    future: RefreshFuture,
}

/// Holds the live token pair and single-flights refreshes.
pub struct TokenManager {
    store: Arc<dyn TokenStore>,
    current: RwLock<TokenPair>,
    in_flight: Mutex<Option<InFlight>>,
    generation: Mutex<u64>,
}

impl TokenManager {
    /// Load the persisted pair from `store`.
    pub async fn load(store: Arc<dyn TokenStore>) -> Result<Self, RemoteError> {
        let pair = store.load().await?;
        Ok(Self::with_pair(store, pair))
    }

    pub fn with_pair(store: Arc<dyn TokenStore>, pair: TokenPair) -> Self {
        Self {
            store,
            current: RwLock::new(pair),
            in_flight: Mutex::new(None),
            generation: Mutex::new(0),
        }
    }

    pub async fn current(&self) -> TokenPair {
        self.current.read().await.clone()
    }

    /// Replace `stale` with a fresh pair obtained from `fetch`.
    ///
    /// If the live pair has already moved past `stale`, it is returned without
    /// calling `fetch`. If a refresh is already running, its result is shared.
    /// The new pair is saved to the store before anyone observes it.
    pub async fn refresh<F, Fut>(&self, stale: &TokenPair, fetch: F) -> Result<TokenPair, RemoteError>
    where
        F: FnOnce(TokenPair) -> Fut,
        Fut: Future<Output = Result<TokenPair, RemoteError>> + Send + 'static,
    {
        let (generation, future) = {
            let mut in_flight = self.in_flight.lock().await;

            let live = self.current.read().await.clone();
            if &live != stale {
                debug!("Token already refreshed by another caller");
                return Ok(live);
            }

            match in_flight.as_ref() {
                Some(running) => (running.generation, running.future.clone()),
                None => {
                    let generation = {
                        let mut counter = self.generation.lock().await;
                        *counter += 1;
                        *counter
                    };
                    info!("Refreshing access token");

                    let store = Arc::clone(&self.store);
                    let request = fetch(live);
                    let future = async move {
                        let pair = request.await.map_err(|e| e.to_string())?;
                        store.save(&pair).await.map_err(|e| e.to_string())?;
                        Ok(pair)
                    }
                    .boxed()
                    .shared();

                    *in_flight = Some(InFlight {
                        generation,
                        future: future.clone(),
                    });
                    (generation, future)
                }
            }
        };

        let result = future.await;

        let mut in_flight = self.in_flight.lock().await;
        if in_flight.as_ref().map(|f| f.generation) == Some(generation) {
            if let Ok(pair) = &result {
                *self.current.write().await = pair.clone();
            }
            *in_flight = None;
        }

        result.map_err(RemoteError::Auth)
    }
}
