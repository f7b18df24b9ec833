use axum::{extract::{Extension, State}, http::StatusCode, Json};
use tracing::error;

use crate::db::AccountId;
use crate::models::{api_error, ApiError, SessionSummary};
use crate::AppState;

/// List the sessions the authenticated account has worked on
pub async fn user_sessions(
    State(state): State<AppState>,
    Extension(account): Extension<AccountId>,
) -> Result<(StatusCode, Json<Vec<SessionSummary>>), ApiError> {
    let rows = match state.store.list_sessions_for(account).await {
        Ok(rows) => rows,
        Err(e) => {
            error!("Failed to list sessions for account {}: {}", account, e);
            return Err(api_error(StatusCode::INTERNAL_SERVER_ERROR, "Failed to get sessions"));
        }
    };

    Ok((StatusCode::OK, Json(rows.into_iter().map(SessionSummary::from).collect())))
}
