use axum::{
    extract::{Request, State},
    http::StatusCode,
    middleware::Next,
    response::Response,
};
use tracing::{error, info};

use crate::services::auth_service::get_auth_token;
use crate::AppState;

/// Require a verified bearer token and expose its account to handlers
pub async fn auth_middleware(
    State(state): State<AppState>,
    mut req: Request,
    next: Next,
) -> Result<Response, StatusCode> {

    // 1. Get the auth token from the request
    let token = match get_auth_token(req.headers()) {
        Ok(token) => token,
        Err(e) => {
            info!("Rejecting request: {}", e);
            return Err(StatusCode::UNAUTHORIZED);
        }
    };

    // 2. Validate Token
    let verifier = match &state.verifier {
        Some(verifier) => verifier,
        None => {
            error!("JWT secret not configured");
            return Err(StatusCode::INTERNAL_SERVER_ERROR);
        }
    };
    let account = match verifier.verify(&token) {
        Ok(account) => account,
        Err(e) => {
            error!("{}", e);
            return Err(StatusCode::UNAUTHORIZED);
        }
    };

    // 3. Hand the account to downstream handlers
    req.extensions_mut().insert(account);

    Ok(next.run(req).await)
}
