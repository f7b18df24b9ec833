use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

use crate::db::SessionRow;

/// A session the caller has edited, with its latest content
#[derive(Serialize, Deserialize, ToSchema, Debug, PartialEq)]
pub struct SessionSummary {
    pub id: i64,
    pub session_code: String,
    pub content: String,
    pub last_modified: DateTime<Utc>,
}

impl From<SessionRow> for SessionSummary {
    fn from(row: SessionRow) -> Self {
        Self {
            id: row.id,
            session_code: row.session_code,
            content: row.content,
            last_modified: row.last_modified,
        }
    }
}
