use serde::Deserialize;
use utoipa::IntoParams;

/// Query for exporting a session document
#[derive(Deserialize, IntoParams)]
#[into_params(parameter_in = Query)]
pub struct DocumentExportQuery {
    /// Session code
    pub session: Option<String>,
    /// Output format, required; only `txt` is supported
    pub format: Option<String>,
}
