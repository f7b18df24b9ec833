pub mod dbsync;
pub mod memory;

use chrono::{DateTime, Utc};
use futures_util::future::BoxFuture;
use serde::{Deserialize, Serialize};

/// Verified account identity attached to saves.
pub type AccountId = i64;

/// A stored editing session with the content of its latest version.
#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow, PartialEq)]
pub struct SessionRow {
    pub id: i64,
    pub session_code: String,
    pub content: String,
    pub last_modified: DateTime<Utc>,
}

#[derive(Debug)]
pub enum StoreError {
    Database(sqlx::Error),
    SessionNotFound(String),
}

impl std::fmt::Display for StoreError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            StoreError::Database(e) => write!(f, "Database error: {}", e),
            StoreError::SessionNotFound(code) => write!(f, "Session with code {} not found", code),
        }
    }
}

impl std::error::Error for StoreError {}

impl From<sqlx::Error> for StoreError {
    fn from(e: sqlx::Error) -> Self {
        StoreError::Database(e)
    }
}

/// Durable home of session documents.
///
/// Every `save` creates a new version; loads return the latest one.
pub trait DocumentStore: Send + Sync + 'static {
    /// Content of the latest version, creating the session row when unknown.
    fn load_or_create<'a>(&'a self, code: &'a str) -> BoxFuture<'a, Result<String, StoreError>>;

    fn save<'a>(
        &'a self,
        code: &'a str,
        content: &'a str,
        account: Option<AccountId>,
    ) -> BoxFuture<'a, Result<(), StoreError>>;

    /// Sessions the account touched, most recently seen first.
    fn list_sessions_for(&self, account: AccountId) -> BoxFuture<'_, Result<Vec<SessionRow>, StoreError>>;
}
