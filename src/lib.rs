//! Compact sealed authentication tokens.
//!
//! A token is a fixed-layout binary record (identity, permission bit-sets,
//! validity window, opaque payload) sealed with AES-128-GCM and rendered
//! into one of three tagged text encodings. A separate storage contract
//! persists the simpler stored-token shape through either a file-backed
//! local map or a read-through cache over a remote token service.

mod ascii85;
pub mod config;
pub mod envelope;
pub mod errors;
pub mod metrics;
pub mod storage;
pub mod token;

pub use config::BackendConfig;
pub use envelope::Envelope;
pub use errors::TokenError;
pub use metrics::{MetricRegistry, MetricSnapshot};
pub use storage::local::LocalStore;
pub use storage::remote::RemoteStore;
pub use storage::{StoredToken, TokenStore};
pub use token::{TextFormat, Token};
