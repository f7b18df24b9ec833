use std::sync::Arc;
use std::time::Duration;
use tokio::task::JoinHandle;
use tracing::{error, info};

use crate::db::DocumentStore;
use super::session::SessionState;

/// Collapses a burst of edits into one save once the session has been quiet
/// for `window`.
pub struct PersistenceDebouncer {
    window: Duration,
    state: Arc<SessionState>,
    store: Arc<dyn DocumentStore>,
    pending: Option<JoinHandle<()>>,
}

impl PersistenceDebouncer {
    pub fn new(window: Duration, state: Arc<SessionState>, store: Arc<dyn DocumentStore>) -> Self {
        Self { window, state, store, pending: None }
    }

    /// Replace the pending timer with a fresh one.
    pub fn arm(&mut self) {
        if let Some(pending) = self.pending.take() {
            pending.abort();
        }

        let window = self.window;
        let state = self.state.clone();
        let store = self.store.clone();
        self.pending = Some(tokio::spawn(async move {
            tokio::time::sleep(window).await;
            // Detached: aborting the timer must not cut a started save short
            tokio::spawn(persist(state, store));
        }));
    }
}

async fn persist(state: Arc<SessionState>, store: Arc<dyn DocumentStore>) {
    let content = state.content();
    let account = state.first_account();

    match store.save(state.code(), &content, account).await {
        Ok(()) => info!("Document saved for session {} (account: {:?})", state.code(), account),
        Err(e) => error!("Failed to save document for session {}: {}", state.code(), e),
    }
}
