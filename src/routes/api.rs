use crate::{handlers::*, routes::auth_middleware::auth_middleware, AppState};
use axum::{middleware, routing::{get, post}, Router};

/// Create API routes
pub fn create_api_routes(state: AppState) -> Router<AppState> {
    let protected = Router::new()
        .route("/sessions", get(user_sessions))
        .route("/v1/diagnostics", get(diagnostics))
        .route_layer(middleware::from_fn_with_state(state, auth_middleware)); // Applies to all routes added above

    Router::new()
        .route("/health", get(health_check))
        .route("/ready", get(ready_check))
        .route("/document/save", post(doc_save))
        .route("/export", get(doc_export))
        .merge(protected)
}
