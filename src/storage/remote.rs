//! Read-through cache in front of a remote token service.
//!
//! Entries are kept alive by access, not insertion: every cache hit stamps
//! `last_access`, and a background sweeper reclaims entries idle longer
//! than the configured lifetime. One lock guards both maps, so the sweep
//! never observes a torn update from a concurrent `get`/`set`.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use tokio::sync::{watch, Mutex, RwLock};
use tokio::task::JoinHandle;
use tokio::time::{self, Instant};

use crate::config::BackendConfig;
use crate::errors::TokenError;
use crate::storage::{StoredToken, TokenStore};

struct CacheState {
    cache: HashMap<String, StoredToken>,
    last_access: HashMap<String, Instant>,
}

pub struct RemoteStore {
    state: Arc<RwLock<CacheState>>,
    client: reqwest::Client,
    url: String,
    cache_life: Duration,
    shutdown: watch::Sender<bool>,
    sweeper: Mutex<Option<JoinHandle<()>>>,
}

impl RemoteStore {
    /// Recognized DSN options: `url` (remote endpoint) and `cacheLife`
    /// (idle lifetime, default one minute).
    pub fn new(dsn: &str) -> Self {
        let config = BackendConfig::parse(dsn);
        let (shutdown, _) = watch::channel(false);

        RemoteStore {
            state: Arc::new(RwLock::new(CacheState {
                cache: HashMap::new(),
                last_access: HashMap::new(),
            })),
            client: reqwest::Client::builder()
                .timeout(Duration::from_secs(10))
                .build()
                .expect("failed to build remote store HTTP client"),
            url: config.url.clone(),
            cache_life: config.cache_life(),
            shutdown,
            sweeper: Mutex::new(None),
        }
    }

    /// Number of currently cached entries (for tests / debugging).
    pub async fn cached_len(&self) -> usize {
        self.state.read().await.cache.len()
    }

    fn token_url(&self, id: &str) -> String {
        format!("{}/{}", self.url.trim_end_matches('/'), id)
    }

    async fn fetch_remote(&self, id: &str) -> Result<StoredToken, TokenError> {
        let response = self.client.get(self.token_url(id)).send().await?;

        if response.status() == reqwest::StatusCode::NOT_FOUND {
            return Err(TokenError::TokenNotFound);
        }
        let token: StoredToken = response.error_for_status()?.json().await?;
        Ok(token)
    }

    fn spawn_sweeper(&self) -> JoinHandle<()> {
        let state = Arc::clone(&self.state);
        let cache_life = self.cache_life;
        let mut shutdown = self.shutdown.subscribe();

        tokio::spawn(async move {
            // First wake one full lifetime out; nothing can be stale sooner.
            let mut interval = time::interval_at(Instant::now() + cache_life, cache_life);
            loop {
                tokio::select! {
                    _ = interval.tick() => {
                        let mut state = state.write().await;
                        let now = Instant::now();
                        let expired: Vec<String> = state
                            .last_access
                            .iter()
                            .filter(|(_, seen)| now.duration_since(**seen) > cache_life)
                            .map(|(id, _)| id.clone())
                            .collect();
                        for id in &expired {
                            state.cache.remove(id);
                            state.last_access.remove(id);
                        }
                        if !expired.is_empty() {
                            tracing::debug!(evicted = expired.len(), "cache sweep");
                        }
                    }
                    _ = shutdown.changed() => break,
                }
            }
        })
    }
}

#[async_trait]
impl TokenStore for RemoteStore {
    /// Start the eviction sweeper. Calling `init` again replaces any
    /// sweeper that is still running.
    async fn init(&self) -> Result<(), TokenError> {
        let mut sweeper = self.sweeper.lock().await;
        if let Some(old) = sweeper.take() {
            old.abort();
        }
        *sweeper = Some(self.spawn_sweeper());
        Ok(())
    }

    /// Signal the sweeper and wait for it to wind down.
    async fn close(&self) -> Result<(), TokenError> {
        let handle = self.sweeper.lock().await.take();
        if let Some(handle) = handle {
            self.shutdown.send_replace(true);
            if let Err(e) = handle.await {
                tracing::warn!(error = %e, "eviction sweeper did not stop cleanly");
            }
        }
        Ok(())
    }

    async fn get(&self, id: &str) -> Result<StoredToken, TokenError> {
        let hit = self.state.read().await.cache.contains_key(id);
        if hit {
            let mut state = self.state.write().await;
            // Re-check under the write lock: a sweep may have won the
            // race. A miss here falls through to a fresh fetch.
            if let Some(token) = state.cache.get(id).cloned() {
                state.last_access.insert(id.to_string(), Instant::now());
                return Ok(token);
            }
        }

        let token = self.fetch_remote(id).await?;

        let mut state = self.state.write().await;
        state.cache.insert(id.to_string(), token.clone());
        state.last_access.insert(id.to_string(), Instant::now());
        tracing::debug!(id, "cache miss filled from remote");

        Ok(token)
    }

    async fn set(&self, token: StoredToken) -> Result<(), TokenError> {
        let response = self.client.post(&self.url).json(&token).send().await?;

        let status = response.status();
        if !status.is_success() {
            return Err(TokenError::StoreFailed {
                status: status.as_u16(),
            });
        }

        let mut state = self.state.write().await;
        state.last_access.insert(token.id.clone(), Instant::now());
        state.cache.insert(token.id.clone(), token);
        Ok(())
    }
}
