//! In-process backend persisted to a JSON snapshot file.
//!
//! Every write lands on disk before `set` returns; the snapshot is written
//! to a sibling temp file and renamed into place so readers never observe a
//! torn file.

use std::collections::HashMap;
use std::path::PathBuf;

use async_trait::async_trait;
use tokio::sync::RwLock;

use crate::config::BackendConfig;
use crate::errors::TokenError;
use crate::storage::{StoredToken, TokenStore};

pub struct LocalStore {
    entries: RwLock<HashMap<String, StoredToken>>,
    path: PathBuf,
}

impl LocalStore {
    /// Recognized DSN option: `file` (snapshot path).
    pub fn new(dsn: &str) -> Self {
        let config = BackendConfig::parse(dsn);
        LocalStore {
            entries: RwLock::new(HashMap::new()),
            path: PathBuf::from(config.file),
        }
    }

    /// Serialize the full map to disk. Callers hold the write lock, so
    /// snapshots are serialized with map mutations.
    async fn persist(&self, entries: &HashMap<String, StoredToken>) -> Result<(), TokenError> {
        let json = serde_json::to_vec_pretty(entries)?;

        let tmp = self.path.with_extension("tmp");
        tokio::fs::write(&tmp, &json).await?;
        tokio::fs::rename(&tmp, &self.path).await?;

        tracing::debug!(
            path = %self.path.display(),
            entries = entries.len(),
            "snapshot written"
        );
        Ok(())
    }
}

#[async_trait]
impl TokenStore for LocalStore {
    /// Load the snapshot file. A missing file is an empty store; any other
    /// read or parse failure propagates.
    async fn init(&self) -> Result<(), TokenError> {
        let bytes = match tokio::fs::read(&self.path).await {
            Ok(bytes) => bytes,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(()),
            Err(e) => return Err(e.into()),
        };

        let loaded: HashMap<String, StoredToken> = serde_json::from_slice(&bytes)?;
        let mut entries = self.entries.write().await;
        *entries = loaded;

        tracing::debug!(
            path = %self.path.display(),
            entries = entries.len(),
            "snapshot loaded"
        );
        Ok(())
    }

    async fn close(&self) -> Result<(), TokenError> {
        let entries = self.entries.read().await;
        self.persist(&entries).await
    }

    async fn get(&self, id: &str) -> Result<StoredToken, TokenError> {
        let entries = self.entries.read().await;
        entries.get(id).cloned().ok_or(TokenError::TokenNotFound)
    }

    async fn set(&self, token: StoredToken) -> Result<(), TokenError> {
        let mut entries = self.entries.write().await;
        entries.insert(token.id.clone(), token);
        self.persist(&entries).await
    }
}
