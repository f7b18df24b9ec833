use axum::{
    extract::{ws::{WebSocket, WebSocketUpgrade}, Query, State},
    http::{HeaderMap, StatusCode},
    response::{IntoResponse, Response},
};
use serde::Deserialize;
use tokio::sync::mpsc;
use tracing::{error, info, warn};
use uuid::Uuid;

use crate::db::AccountId;
use crate::models::api_error;
use crate::services::auth_service::get_auth_token;
use crate::AppState;
use super::client::ClientConnection;
use super::session::Participant;

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ConnectParams {
    pub session: Option<String>,
    pub user_id: Option<String>,
    pub token: Option<String>,
}

/// WebSocket handler
pub async fn websocket_handler(
    ws: WebSocketUpgrade,
    Query(params): Query<ConnectParams>,
    headers: HeaderMap,
    State(state): State<AppState>,
) -> Response {
    let Some(code) = non_empty(params.session) else {
        warn!("Refusing WebSocket connection without a session code");
        return api_error(StatusCode::BAD_REQUEST, "Session code required").into_response();
    };

    let user_id = non_empty(params.user_id).unwrap_or_else(generate_user_id);

    // Query parameter first, then Authorization header or auth_token cookie
    let token = non_empty(params.token).or_else(|| get_auth_token(&headers).ok());
    let account = match (token, &state.verifier) {
        (Some(token), Some(verifier)) => match verifier.verify(&token) {
            Ok(account) => Some(account),
            Err(e) => {
                warn!("Ignoring token for {} in session {}: {}", user_id, code, e);
                None
            }
        },
        _ => None,
    };

    info!("New WebSocket connection attempt for session {} as {}", code, user_id);
    ws.on_upgrade(move |socket| handle_socket(socket, state, code, user_id, account))
}

/// Join the session and pump frames until the connection ends
async fn handle_socket(socket: WebSocket, state: AppState, code: String, user_id: String, account: Option<AccountId>) {
    let session = state.registry.get_or_create(&code).await;

    if let Some(account) = account {
        info!("Authenticated account {} for {} in session {}", account, user_id, code);
        session.set_identity(&user_id, account);
        // Records the account/session association even if the user never edits
        if let Err(e) = state.store.save(&code, &session.content(), Some(account)).await {
            error!("Failed to create initial user-session association: {}", e);
        }
    }

    let id = Uuid::new_v4();
    let color = session.next_color();
    let (outbound, inbox) = mpsc::channel(state.client_mailbox_capacity.max(1));
    session
        .register(Participant { id, user_id: user_id.clone(), color: color.clone(), outbound })
        .await;

    ClientConnection::new(id, user_id, color, session, inbox).run(socket).await;
}

fn non_empty(value: Option<String>) -> Option<String> {
    value.map(|v| v.trim().to_string()).filter(|v| !v.is_empty())
}

fn generate_user_id() -> String {
    format!("user-{}", &Uuid::new_v4().simple().to_string()[..8])
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::memory::MemoryStore;
    use crate::db::DocumentStore;
    use crate::models::Message;
    use crate::services::auth_service::{tests::{token_for, SECRET}, JwtVerifier};
    use crate::ws::hub::SessionRegistry;
    use crate::ws::session::{SessionOptions, PALETTE};
    use futures_util::{SinkExt, StreamExt};
    use std::net::SocketAddr;
    use std::sync::Arc;
    use std::time::Duration;
    use tokio_tungstenite::{connect_async, tungstenite::Message as WireMessage, MaybeTlsStream, WebSocketStream};

    type Client = WebSocketStream<MaybeTlsStream<tokio::net::TcpStream>>;

    async fn serve(store: Arc<MemoryStore>) -> (SocketAddr, AppState) {
        let options = SessionOptions { save_delay: Duration::from_millis(200), ..SessionOptions::default() };
        let state = AppState {
            registry: Arc::new(SessionRegistry::new(store.clone(), options)),
            store,
            verifier: Some(Arc::new(JwtVerifier::new(SECRET))),
            client_mailbox_capacity: 256,
        };
        let app = crate::routes::create_app(state.clone(), None);
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move { axum::serve(listener, app).await.unwrap() });
        (addr, state)
    }

    async fn recv(client: &mut Client) -> Message {
        loop {
            let frame = tokio::time::timeout(Duration::from_secs(2), client.next())
                .await
                .expect("timed out waiting for a frame")
                .expect("socket closed")
                .unwrap();
            if let WireMessage::Text(text) = frame {
                return serde_json::from_str(text.as_str()).unwrap();
            }
        }
    }

    #[tokio::test]
    async fn two_editors_share_one_document() {
        let store = Arc::new(MemoryStore::new());
        let (addr, _) = serve(store.clone()).await;

        let (mut a, _) = connect_async(format!("ws://{}/ws?session=abc&userId=A", addr)).await.unwrap();
        let init = recv(&mut a).await;
        assert_eq!(init, Message::init("", "A", PALETTE[0]));

        let (mut b, _) = connect_async(format!("ws://{}/ws?session=abc&userId=B", addr)).await.unwrap();
        assert_eq!(recv(&mut b).await, Message::init("", "B", PALETTE[1]));
        assert_eq!(recv(&mut b).await, Message::user_joined("A", PALETTE[0]));
        assert_eq!(recv(&mut a).await, Message::user_joined("B", PALETTE[1]));

        a.send(WireMessage::text(r#"{"type":"update","content":"hello","userId":"spoofed"}"#)).await.unwrap();
        for client in [&mut a, &mut b] {
            let update = recv(client).await;
            assert!(update.is_update());
            assert_eq!(update.content, "hello");
            assert_eq!(update.user_id, "A");
        }

        tokio::time::sleep(Duration::from_millis(600)).await;
        assert_eq!(store.saves("abc"), vec![("hello".to_string(), None)]);

        b.close(None).await.unwrap();
        let left = recv(&mut a).await;
        assert_eq!(left, Message::user_left("B"));
    }

    #[tokio::test]
    async fn connection_without_session_code_is_refused() {
        let store = Arc::new(MemoryStore::new());
        let (addr, state) = serve(store).await;

        let err = connect_async(format!("ws://{}/ws?userId=A", addr)).await.unwrap_err();
        match err {
            tokio_tungstenite::tungstenite::Error::Http(response) => {
                assert_eq!(response.status().as_u16(), 400);
            }
            other => panic!("expected an HTTP rejection, got {:?}", other),
        }
        assert_eq!(state.registry.stats().await, (0, 0));
    }

    #[tokio::test]
    async fn authenticated_join_records_the_account() {
        let store = Arc::new(MemoryStore::new());
        let (addr, _) = serve(store.clone()).await;

        let url = format!("ws://{}/ws?session=team&userId=A&token={}", addr, token_for(7));
        let (mut a, _) = connect_async(url).await.unwrap();
        recv(&mut a).await;

        let sessions = store.list_sessions_for(7).await.unwrap();
        assert_eq!(sessions.len(), 1);
        assert_eq!(sessions[0].session_code, "team");
    }
}
