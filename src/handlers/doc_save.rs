use axum::{extract::State, http::{header, HeaderMap, StatusCode}, Json};
use tracing::{error, info, warn};

use crate::db::StoreError;
use crate::models::{api_error, ApiError, SaveDocumentRequest, SaveDocumentResponse};
use crate::services::auth_service::get_auth_token;
use crate::AppState;

/// Save a document version directly, anonymously or as the bearer's account
pub async fn doc_save(
    State(state): State<AppState>,
    headers: HeaderMap,
    Json(request): Json<SaveDocumentRequest>,
) -> Result<(StatusCode, Json<SaveDocumentResponse>), ApiError> {

    if request.session_code.trim().is_empty() {
        return Err(api_error(StatusCode::BAD_REQUEST, "Session code required"));
    }

    // Anonymous saves carry no Authorization header at all
    let account = if headers.contains_key(header::AUTHORIZATION) {
        let verified = get_auth_token(&headers)
            .ok()
            .zip(state.verifier.as_ref())
            .map(|(token, verifier)| verifier.verify(&token));
        match verified {
            Some(Ok(account)) => Some(account),
            Some(Err(e)) => {
                warn!("Rejecting save for session {}: {}", request.session_code, e);
                return Err(api_error(StatusCode::UNAUTHORIZED, "Invalid token"));
            }
            None => return Err(api_error(StatusCode::UNAUTHORIZED, "Invalid token")),
        }
    } else {
        None
    };

    match state.store.save(&request.session_code, &request.content, account).await {
        Ok(()) => {}
        Err(StoreError::SessionNotFound(code)) => {
            return Err(api_error(StatusCode::NOT_FOUND, format!("Session with code {} not found", code)));
        }
        Err(e) => {
            error!("Failed to save document for session {}: {}", request.session_code, e);
            return Err(api_error(StatusCode::INTERNAL_SERVER_ERROR, "Failed to save document"));
        }
    }

    info!("Document saved for session {} (account: {:?})", request.session_code, account);
    let save_type = if account.is_some() { "authenticated" } else { "anonymous" };
    Ok((
        StatusCode::OK,
        Json(SaveDocumentResponse {
            status: "saved".to_string(),
            save_type: save_type.to_string(),
            user_id: account,
        }),
    ))
}
