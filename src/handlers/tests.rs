use axum::{
    body::{to_bytes, Body},
    http::{header, Request, StatusCode},
    Router,
};
use std::sync::Arc;
use tower::ServiceExt;

use crate::db::memory::MemoryStore;
use crate::db::DocumentStore;
use crate::models::Message;
use crate::routes::create_app;
use crate::services::auth_service::{tests::{token_for, SECRET}, JwtVerifier};
use crate::ws::hub::SessionRegistry;
use crate::ws::session::SessionOptions;
use crate::AppState;

fn app_with(store: Arc<MemoryStore>) -> (Router, AppState) {
    let state = AppState {
        registry: Arc::new(SessionRegistry::new(store.clone(), SessionOptions::default())),
        store,
        verifier: Some(Arc::new(JwtVerifier::new(SECRET))),
        client_mailbox_capacity: 256,
    };
    (create_app(state.clone(), None), state)
}

async fn body_json(response: axum::response::Response) -> serde_json::Value {
    let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
    serde_json::from_slice(&bytes).unwrap()
}

fn save_request(body: serde_json::Value, token: Option<&str>) -> Request<Body> {
    let mut builder = Request::post("/api/document/save").header(header::CONTENT_TYPE, "application/json");
    if let Some(token) = token {
        builder = builder.header(header::AUTHORIZATION, format!("Bearer {}", token));
    }
    builder.body(Body::from(body.to_string())).unwrap()
}

#[tokio::test]
async fn health_reports_ok() {
    let (app, _) = app_with(Arc::new(MemoryStore::new()));
    let response = app.oneshot(Request::get("/api/health").body(Body::empty()).unwrap()).await.unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(body_json(response).await["status"], "ok");
}

#[tokio::test]
async fn anonymous_save_creates_a_version() {
    let store = Arc::new(MemoryStore::new());
    store.load_or_create("abc").await.unwrap();
    let (app, _) = app_with(store.clone());

    let response = app
        .oneshot(save_request(serde_json::json!({"session_code": "abc", "content": "saved"}), None))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let body = body_json(response).await;
    assert_eq!(body, serde_json::json!({"status": "saved", "type": "anonymous"}));
    assert_eq!(store.saves("abc"), vec![("saved".to_string(), None)]);
}

#[tokio::test]
async fn authenticated_save_then_lists_the_session() {
    let store = Arc::new(MemoryStore::new());
    store.load_or_create("abc").await.unwrap();
    let (app, _) = app_with(store.clone());
    let token = token_for(3);

    let response = app
        .clone()
        .oneshot(save_request(serde_json::json!({"session_code": "abc", "content": "mine"}), Some(&token)))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(body_json(response).await["user_id"], 3);

    let request = Request::get("/api/sessions")
        .header(header::AUTHORIZATION, format!("Bearer {}", token))
        .body(Body::empty())
        .unwrap();
    let response = app.oneshot(request).await.unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let sessions = body_json(response).await;
    assert_eq!(sessions[0]["session_code"], "abc");
    assert_eq!(sessions[0]["content"], "mine");
}

#[tokio::test]
async fn bad_tokens_are_rejected() {
    let store = Arc::new(MemoryStore::new());
    store.load_or_create("abc").await.unwrap();
    let (app, _) = app_with(store.clone());

    let response = app
        .clone()
        .oneshot(save_request(serde_json::json!({"session_code": "abc", "content": "x"}), Some("garbage")))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
    assert!(store.saves("abc").is_empty());

    let response = app.oneshot(Request::get("/api/sessions").body(Body::empty()).unwrap()).await.unwrap();
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn save_to_unknown_session_is_not_found() {
    let (app, _) = app_with(Arc::new(MemoryStore::new()));
    let response = app
        .oneshot(save_request(serde_json::json!({"session_code": "nope", "content": "x"}), None))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn export_prefers_live_content() {
    let store = Arc::new(MemoryStore::new());
    let (app, state) = app_with(store.clone());
    let session = state.registry.get_or_create("abc").await;
    store.save("abc", "stale", None).await.unwrap();

    // Round-trip through the actor so the update is applied before exporting
    let (outbound, mut inbox) = tokio::sync::mpsc::channel(8);
    session
        .register(crate::ws::session::Participant {
            id: uuid::Uuid::new_v4(),
            user_id: "a".to_string(),
            color: "#FF6B6B".to_string(),
            outbound,
        })
        .await;
    session.broadcast(Message::update("live text")).await;
    inbox.recv().await.unwrap();
    inbox.recv().await.unwrap();

    let response = app
        .oneshot(Request::get("/api/export?session=abc&format=txt").body(Body::empty()).unwrap())
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let disposition = response.headers()[header::CONTENT_DISPOSITION].to_str().unwrap().to_string();
    assert!(disposition.starts_with("attachment; filename=\"document-abc-"));
    let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
    assert_eq!(&bytes[..], b"live text");
}

#[tokio::test]
async fn export_rejects_unknown_or_missing_formats_and_missing_code() {
    let (app, _) = app_with(Arc::new(MemoryStore::new()));
    let response = app
        .clone()
        .oneshot(Request::get("/api/export?session=abc&format=pdf").body(Body::empty()).unwrap())
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);

    let response = app
        .clone()
        .oneshot(Request::get("/api/export?session=abc").body(Body::empty()).unwrap())
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    assert_eq!(body_json(response).await["error"], "Invalid format. Supported formats: txt");

    let response = app.oneshot(Request::get("/api/export?format=txt").body(Body::empty()).unwrap()).await.unwrap();
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn diagnostics_counts_live_sessions() {
    let (app, state) = app_with(Arc::new(MemoryStore::new()));
    state.registry.get_or_create("one").await;
    state.registry.get_or_create("two").await;

    let request = Request::get("/api/v1/diagnostics")
        .header(header::AUTHORIZATION, format!("Bearer {}", token_for(1)))
        .body(Body::empty())
        .unwrap();
    let response = app.oneshot(request).await.unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let body = body_json(response).await;
    assert_eq!(body["n_sessions"], 2);
    assert_eq!(body["n_conn"], 0);
}
