use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex, RwLock};
use std::time::Duration;
use tokio::sync::mpsc::{self, error::TrySendError};
use tracing::{debug, error, info, warn};
use uuid::Uuid;

use crate::db::{AccountId, DocumentStore};
use crate::models::Message;
use super::debounce::PersistenceDebouncer;

pub type ConnectionId = Uuid;

/// Presence colors handed out round-robin as participants join.
pub const PALETTE: [&str; 6] = ["#FF6B6B", "#4ECDC4", "#45B7D1", "#96CEB4", "#DDA0DD", "#F4A460"];

#[derive(Clone, Debug)]
pub struct SessionOptions {
    pub save_delay: Duration,
    pub mailbox_capacity: usize,
}

impl Default for SessionOptions {
    fn default() -> Self {
        Self {
            save_delay: Duration::from_secs(5),
            mailbox_capacity: 1024,
        }
    }
}

/// A connection as seen by its session: identity plus the sending half of its
/// outbound mailbox. The session holds the only sender, so dropping the
/// participant closes the mailbox.
#[derive(Debug)]
pub struct Participant {
    pub id: ConnectionId,
    pub user_id: String,
    pub color: String,
    pub outbound: mpsc::Sender<Message>,
}

#[derive(Debug)]
enum SessionEvent {
    Register(Participant),
    Unregister(ConnectionId),
    Broadcast(Message),
}

/// State shared between the actor and tasks outside its mailbox.
///
/// `content` and `identities` each sit behind their own lock, held only for
/// the copy in or out.
pub struct SessionState {
    code: String,
    content: RwLock<String>,
    identities: RwLock<HashMap<String, AccountId>>,
    color_cursor: Mutex<usize>,
    participants: AtomicUsize,
}

impl SessionState {
    fn new(code: String, content: String) -> Self {
        Self {
            code,
            content: RwLock::new(content),
            identities: RwLock::new(HashMap::new()),
            color_cursor: Mutex::new(0),
            participants: AtomicUsize::new(0),
        }
    }

    pub fn code(&self) -> &str {
        &self.code
    }

    pub fn content(&self) -> String {
        self.content.read().unwrap_or_else(|p| p.into_inner()).clone()
    }

    fn replace_content(&self, content: &str) {
        let mut current = self.content.write().unwrap_or_else(|p| p.into_inner());
        current.clear();
        current.push_str(content);
    }

    /// Any verified account present in the session. Which one wins is
    /// unspecified when several are connected.
    pub fn first_account(&self) -> Option<AccountId> {
        self.identities
            .read()
            .unwrap_or_else(|p| p.into_inner())
            .values()
            .copied()
            .find(|id| *id > 0)
    }

    fn set_identity(&self, user_id: &str, account: AccountId) {
        if account > 0 {
            self.identities
                .write()
                .unwrap_or_else(|p| p.into_inner())
                .insert(user_id.to_string(), account);
        }
    }

    fn remove_identity(&self, user_id: &str) {
        self.identities.write().unwrap_or_else(|p| p.into_inner()).remove(user_id);
    }

    fn next_color(&self) -> String {
        let mut cursor = self.color_cursor.lock().unwrap_or_else(|p| p.into_inner());
        let color = PALETTE[*cursor % PALETTE.len()];
        *cursor += 1;
        color.to_string()
    }
}

/// Handle to one live document. All participant and content mutation goes
/// through the actor behind `mailbox`.
pub struct Session {
    state: Arc<SessionState>,
    mailbox: mpsc::Sender<SessionEvent>,
}

impl Session {
    /// Start the actor for `code` seeded with `content`.
    pub fn spawn(code: String, content: String, store: Arc<dyn DocumentStore>, options: SessionOptions) -> Arc<Self> {
        let state = Arc::new(SessionState::new(code, content));
        let (mailbox, events) = mpsc::channel(options.mailbox_capacity.max(1));

        let actor = SessionActor {
            state: state.clone(),
            participants: HashMap::new(),
            debouncer: PersistenceDebouncer::new(options.save_delay, state.clone(), store),
            events,
        };
        tokio::spawn(actor.run());

        Arc::new(Self { state, mailbox })
    }

    pub fn code(&self) -> &str {
        self.state.code()
    }

    pub fn content(&self) -> String {
        self.state.content()
    }

    pub fn participant_count(&self) -> usize {
        self.state.participants.load(Ordering::Relaxed)
    }

    pub fn next_color(&self) -> String {
        self.state.next_color()
    }

    pub fn set_identity(&self, user_id: &str, account: AccountId) {
        self.state.set_identity(user_id, account);
    }

    pub async fn register(&self, participant: Participant) {
        self.enqueue(SessionEvent::Register(participant)).await;
    }

    pub async fn unregister(&self, id: ConnectionId) {
        self.enqueue(SessionEvent::Unregister(id)).await;
    }

    pub async fn broadcast(&self, msg: Message) {
        self.enqueue(SessionEvent::Broadcast(msg)).await;
    }

    async fn enqueue(&self, event: SessionEvent) {
        if let Err(e) = self.mailbox.send(event).await {
            error!("Session {} actor is gone, dropping {:?}", self.state.code, e.0);
        }
    }
}

struct SessionActor {
    state: Arc<SessionState>,
    participants: HashMap<ConnectionId, Participant>,
    debouncer: PersistenceDebouncer,
    events: mpsc::Receiver<SessionEvent>,
}

impl SessionActor {
    async fn run(mut self) {
        debug!("Session {} actor started", self.state.code);
        while let Some(event) = self.events.recv().await {
            match event {
                SessionEvent::Register(participant) => self.on_register(participant),
                SessionEvent::Unregister(id) => self.on_unregister(id),
                SessionEvent::Broadcast(msg) => self.on_broadcast(msg),
            }
            self.state.participants.store(self.participants.len(), Ordering::Relaxed);
        }
        debug!("Session {} actor stopped", self.state.code);
    }

    fn on_register(&mut self, newcomer: Participant) {
        info!("{} joined session {} ({} already present)", newcomer.user_id, self.state.code, self.participants.len());

        let init = Message::init(&self.state.content(), &newcomer.user_id, &newcomer.color);
        let _ = newcomer.outbound.try_send(init);

        // Presence is best effort, a full mailbox just misses the notice
        for existing in self.participants.values() {
            let _ = newcomer.outbound.try_send(Message::user_joined(&existing.user_id, &existing.color));
            let _ = existing.outbound.try_send(Message::user_joined(&newcomer.user_id, &newcomer.color));
        }

        self.participants.insert(newcomer.id, newcomer);
    }

    fn on_unregister(&mut self, id: ConnectionId) {
        let Some(leaving) = self.participants.remove(&id) else {
            return;
        };
        info!("{} left session {}", leaving.user_id, self.state.code);

        self.state.remove_identity(&leaving.user_id);
        let user_id = leaving.user_id.clone();
        drop(leaving);

        for remaining in self.participants.values() {
            let _ = remaining.outbound.try_send(Message::user_left(&user_id));
        }
    }

    fn on_broadcast(&mut self, msg: Message) {
        if msg.is_update() {
            self.state.replace_content(&msg.content);
            self.debouncer.arm();
        }

        // Unresponsive participants are evicted without a userLeft
        let code = &self.state.code;
        self.participants.retain(|_, participant| match participant.outbound.try_send(msg.clone()) {
            Ok(()) => true,
            Err(TrySendError::Full(_)) => {
                warn!("Evicting {} from session {}: outbound mailbox full", participant.user_id, code);
                false
            }
            Err(TrySendError::Closed(_)) => {
                debug!("Dropping {} from session {}: connection already gone", participant.user_id, code);
                false
            }
        });
    }
}
