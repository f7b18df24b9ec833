use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

/// Request for saving a document outside of a live session
#[derive(Serialize, Deserialize, ToSchema)]
pub struct SaveDocumentRequest {
    pub session_code: String,
    pub content: String,
}

/// Response for a saved document
#[derive(Serialize, Deserialize, ToSchema, Debug)]
pub struct SaveDocumentResponse {
    pub status: String,
    #[serde(rename = "type")]
    pub save_type: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub user_id: Option<i64>,
}
