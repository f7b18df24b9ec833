use axum::{
    extract::{Query, State},
    http::{header, StatusCode},
    response::{IntoResponse, Response},
};
use chrono::Utc;
use tracing::error;

use crate::models::{api_error, ApiError, DocumentExportQuery};
use crate::AppState;

/// Export a session document as a plain text download
pub async fn doc_export(
    State(state): State<AppState>,
    Query(query): Query<DocumentExportQuery>,
) -> Result<Response, ApiError> {

    let code = match query.session.as_deref().map(str::trim).filter(|c| !c.is_empty()) {
        Some(code) => code.to_string(),
        None => return Err(api_error(StatusCode::BAD_REQUEST, "Session code required")),
    };

    let format = query.format.as_deref().map(str::trim).unwrap_or_default().to_lowercase();
    if format != "txt" {
        return Err(api_error(StatusCode::BAD_REQUEST, "Invalid format. Supported formats: txt"));
    }

    // Prefer the live document, it may be ahead of the last save
    let content = match state.registry.get(&code).await {
        Some(session) => session.content(),
        None => match state.store.load_or_create(&code).await {
            Ok(content) => content,
            Err(e) => {
                error!("Failed to load session {} for export: {}", code, e);
                return Err(api_error(StatusCode::INTERNAL_SERVER_ERROR, "Failed to get session"));
            }
        },
    };

    let filename = format!("document-{}-{}.txt", code, Utc::now().format("%Y%m%d-%H%M%S"));
    Ok((
        StatusCode::OK,
        [
            (header::CONTENT_TYPE, "text/plain; charset=utf-8".to_string()),
            (header::CONTENT_DISPOSITION, format!("attachment; filename=\"{}\"", filename)),
        ],
        content,
    )
        .into_response())
}
