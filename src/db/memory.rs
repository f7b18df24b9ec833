use chrono::{DateTime, Utc};
use futures_util::future::BoxFuture;
use std::collections::HashMap;
use std::sync::Mutex;
use tracing::debug;

use super::{AccountId, DocumentStore, SessionRow, StoreError};

#[derive(Debug, Clone)]
struct StoredSession {
    id: i64,
    versions: Vec<(String, Option<AccountId>)>,
    last_modified: DateTime<Utc>,
}

#[derive(Default)]
struct MemoryState {
    next_id: i64,
    sessions: HashMap<String, StoredSession>,
    // (account, session id) -> last seen
    user_sessions: HashMap<(AccountId, i64), DateTime<Utc>>,
}

/// Process-local store used when no database is configured.
#[derive(Default)]
pub struct MemoryStore {
    state: Mutex<MemoryState>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Every save of a session with its account, oldest first.
    #[cfg(test)]
    pub fn saves(&self, code: &str) -> Vec<(String, Option<AccountId>)> {
        let state = self.state.lock().unwrap_or_else(|p| p.into_inner());
        state
            .sessions
            .get(code)
            .map(|s| s.versions.clone())
            .unwrap_or_default()
    }
}

impl DocumentStore for MemoryStore {
    fn load_or_create<'a>(&'a self, code: &'a str) -> BoxFuture<'a, Result<String, StoreError>> {
        Box::pin(async move {
            let mut state = self.state.lock().unwrap_or_else(|p| p.into_inner());
            if let Some(session) = state.sessions.get(code) {
                return Ok(session.versions.last().map(|(c, _)| c.clone()).unwrap_or_default());
            }

            state.next_id += 1;
            let id = state.next_id;
            state.sessions.insert(
                code.to_string(),
                StoredSession { id, versions: Vec::new(), last_modified: Utc::now() },
            );
            debug!("Created in-memory session {} ({})", code, id);
            Ok(String::new())
        })
    }

    fn save<'a>(
        &'a self,
        code: &'a str,
        content: &'a str,
        account: Option<AccountId>,
    ) -> BoxFuture<'a, Result<(), StoreError>> {
        Box::pin(async move {
            let mut state = self.state.lock().unwrap_or_else(|p| p.into_inner());
            let now = Utc::now();
            let session = state
                .sessions
                .get_mut(code)
                .ok_or_else(|| StoreError::SessionNotFound(code.to_string()))?;
            session.versions.push((content.to_string(), account));
            session.last_modified = now;
            let session_id = session.id;

            if let Some(account) = account {
                state.user_sessions.insert((account, session_id), now);
            }
            Ok(())
        })
    }

    fn list_sessions_for(&self, account: AccountId) -> BoxFuture<'_, Result<Vec<SessionRow>, StoreError>> {
        Box::pin(async move {
            let state = self.state.lock().unwrap_or_else(|p| p.into_inner());
            let mut seen: Vec<(DateTime<Utc>, SessionRow)> = state
                .sessions
                .iter()
                .filter_map(|(code, s)| {
                    let last_seen = state.user_sessions.get(&(account, s.id))?;
                    Some((
                        *last_seen,
                        SessionRow {
                            id: s.id,
                            session_code: code.clone(),
                            content: s.versions.last().map(|(c, _)| c.clone()).unwrap_or_default(),
                            last_modified: s.last_modified,
                        },
                    ))
                })
                .collect();
            seen.sort_by(|a, b| b.0.cmp(&a.0).then(b.1.id.cmp(&a.1.id)));
            Ok(seen.into_iter().map(|(_, row)| row).collect())
        })
    }
}
