use utoipa::OpenApi;
use crate::models::*;

/// Health check endpoint
#[utoipa::path(
    get,
    path = "/api/health",
    responses(
        (status = 200, description = "Service is healthy", body = HealthResponse)
    )
)]
#[allow(dead_code)]
pub async fn health_check_doc() {}

/// Readiness check endpoint
#[utoipa::path(
    get,
    path = "/api/ready",
    responses(
        (status = 200, description = "Service is ready", body = HealthResponse)
    )
)]
#[allow(dead_code)]
pub async fn ready_check_doc() {}

/// Sessions of the authenticated account
#[utoipa::path(
    get,
    path = "/api/sessions",
    responses(
        (status = 200, description = "Sessions, most recently seen first", body = [SessionSummary]),
        (status = 401, description = "Missing or invalid token")
    )
)]
#[allow(dead_code)]
pub async fn user_sessions_doc() {}

/// Save a document version
#[utoipa::path(
    post,
    path = "/api/document/save",
    request_body = SaveDocumentRequest,
    responses(
        (status = 200, description = "Document saved", body = SaveDocumentResponse),
        (status = 401, description = "Invalid token", body = ErrorResponse),
        (status = 404, description = "Unknown session", body = ErrorResponse)
    )
)]
#[allow(dead_code)]
pub async fn doc_save_doc() {}

/// Export a document as plain text
#[utoipa::path(
    get,
    path = "/api/export",
    params(DocumentExportQuery),
    responses(
        (status = 200, description = "Plain text attachment", body = String, content_type = "text/plain"),
        (status = 400, description = "Missing session code, or missing or unsupported format", body = ErrorResponse)
    )
)]
#[allow(dead_code)]
pub async fn doc_export_doc() {}

/// Service diagnostics
#[utoipa::path(
    get,
    path = "/api/v1/diagnostics",
    responses(
        (status = 200, description = "Live statistics", body = DiagnosticsResponse)
    )
)]
#[allow(dead_code)]
pub async fn diagnostics_doc() {}

#[derive(OpenApi)]
#[openapi(
    paths(
        health_check_doc,
        ready_check_doc,
        user_sessions_doc,
        doc_save_doc,
        doc_export_doc,
        diagnostics_doc,
    ),
    components(
        schemas(HealthResponse, ErrorResponse, SessionSummary, SaveDocumentRequest, SaveDocumentResponse, DiagnosticsResponse)
    ),
    tags(
        (name = "api", description = "API endpoints")
    )
)]
pub struct ApiDoc;
