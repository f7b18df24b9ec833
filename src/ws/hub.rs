use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::RwLock;
use tracing::{error, info};

use crate::db::DocumentStore;
use super::session::{Session, SessionOptions};

/// Process-wide directory of live sessions keyed by session code.
///
/// Sessions are never evicted; they live until the process exits.
pub struct SessionRegistry {
    sessions: RwLock<HashMap<String, Arc<Session>>>,
    store: Arc<dyn DocumentStore>,
    options: SessionOptions,
}

impl SessionRegistry {
    pub fn new(store: Arc<dyn DocumentStore>, options: SessionOptions) -> Self {
        Self {
            sessions: RwLock::new(HashMap::new()),
            store,
            options,
        }
    }

    /// Return the live session for `code`, loading and starting it on first use.
    pub async fn get_or_create(&self, code: &str) -> Arc<Session> {
        if let Some(session) = self.sessions.read().await.get(code) {
            return session.clone();
        }

        // Check again under the write lock so a racing first access loads once
        let mut sessions = self.sessions.write().await;
        if let Some(session) = sessions.get(code) {
            return session.clone();
        }

        let content = match self.store.load_or_create(code).await {
            Ok(content) => content,
            Err(e) => {
                error!("Failed to load session {} from store, starting empty: {}", code, e);
                String::new()
            }
        };

        info!("Starting session {} ({} bytes)", code, content.len());
        let session = Session::spawn(code.to_string(), content, self.store.clone(), self.options.clone());
        sessions.insert(code.to_string(), session.clone());
        session
    }

    /// Live session for `code` without creating one.
    pub async fn get(&self, code: &str) -> Option<Arc<Session>> {
        self.sessions.read().await.get(code).cloned()
    }

    /// Number of live sessions and of participants across them.
    pub async fn stats(&self) -> (usize, usize) {
        let sessions = self.sessions.read().await;
        let participants = sessions.values().map(|s| s.participant_count()).sum();
        (sessions.len(), participants)
    }
}
