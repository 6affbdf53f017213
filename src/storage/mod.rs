pub mod local;
pub mod remote;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::errors::TokenError;

/// The externally persisted/retrieved token shape.
///
/// Distinct from the codec [`crate::Token`]: the two representations are
/// correlated by identifier only and must not be conflated. `access` is an
/// ordered list of capability names.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StoredToken {
    pub id: String,
    pub account: u64,
    pub access: Vec<String>,
    pub created: DateTime<Utc>,
    pub expired: DateTime<Utc>,
}

/// Abstraction over token storage backends.
/// Implementations: [`local::LocalStore`] (persisted in-process map),
/// [`remote::RemoteStore`] (read-through cache over a remote service).
///
/// Callers depend only on this contract; any backend is substitutable,
/// including in-memory fakes in tests.
#[async_trait]
pub trait TokenStore: Send + Sync {
    /// Startup work: load durable state or start background tasks.
    async fn init(&self) -> Result<(), TokenError>;

    /// Flush state and stop background tasks.
    async fn close(&self) -> Result<(), TokenError>;

    /// Fetch a token by id. A miss is [`TokenError::TokenNotFound`].
    async fn get(&self, id: &str) -> Result<StoredToken, TokenError>;

    /// Create or overwrite a token.
    async fn set(&self, token: StoredToken) -> Result<(), TokenError>;
}
