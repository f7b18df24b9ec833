use axum::http::{self, HeaderMap};
use jsonwebtoken::{decode, Algorithm, DecodingKey, TokenData, Validation};
use tracing::info;

use crate::db::AccountId;

#[derive(Debug)]
pub enum AuthError {
    MissingToken,
    InvalidHeader(&'static str),
    Jwt(jsonwebtoken::errors::Error),
    MissingClaim(&'static str),
}

impl std::fmt::Display for AuthError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            AuthError::MissingToken => write!(f, "Missing Authorization header or auth_token cookie"),
            AuthError::InvalidHeader(name) => write!(f, "Invalid {} header", name),
            AuthError::Jwt(e) => write!(f, "JWT validation failed: {}", e),
            AuthError::MissingClaim(claim) => write!(f, "JWT token does not contain a usable '{}' claim", claim),
        }
    }
}

impl std::error::Error for AuthError {}

impl From<jsonwebtoken::errors::Error> for AuthError {
    fn from(e: jsonwebtoken::errors::Error) -> Self {
        AuthError::Jwt(e)
    }
}

/// Turns a bearer token into the account it was issued for.
pub trait IdentityVerifier: Send + Sync + 'static {
    fn verify(&self, token: &str) -> Result<AccountId, AuthError>;
}

/// HS256 verifier for tokens minted by the account service
pub struct JwtVerifier {
    key: DecodingKey,
    validation: Validation,
}

impl JwtVerifier {
    pub fn new(secret: &str) -> Self {
        Self {
            key: DecodingKey::from_secret(secret.as_bytes()),
            validation: Validation::new(Algorithm::HS256),
        }
    }
}

impl IdentityVerifier for JwtVerifier {
    fn verify(&self, token: &str) -> Result<AccountId, AuthError> {
        let token_data: TokenData<serde_json::Value> = decode(token, &self.key, &self.validation)?;
        let claims = &token_data.claims;

        // Account service puts the numeric id in "user_id"; "sub" is accepted as well
        let account = claims
            .get("user_id")
            .and_then(|v| v.as_i64())
            .or_else(|| claims.get("sub").and_then(|v| v.as_str()).and_then(|s| s.parse().ok()))
            .filter(|id| *id > 0)
            .ok_or(AuthError::MissingClaim("user_id"))?;

        info!("JWT token validated successfully for account: {}", account);
        Ok(account)
    }
}

// Get the auth token from request headers
pub fn get_auth_token(headers: &HeaderMap) -> Result<String, AuthError> {
    // 1. Try to get token from Authorization header
    if let Some(auth_header) = headers.get(http::header::AUTHORIZATION) {
        let auth_str = auth_header.to_str().map_err(|_| AuthError::InvalidHeader("Authorization"))?;
        return Ok(auth_str.strip_prefix("Bearer ").unwrap_or(auth_str).to_string());
    }

    // 2. Try to get token from cookies
    let cookie_header = headers
        .get(http::header::COOKIE)
        .ok_or(AuthError::MissingToken)?
        .to_str()
        .map_err(|_| AuthError::InvalidHeader("Cookie"))?;

    for cookie in cookie::Cookie::split_parse(cookie_header).flatten() {
        if cookie.name() == "auth_token" {
            return Ok(cookie.value().to_string());
        }
    }
    Err(AuthError::MissingToken)
}

#[cfg(test)]
pub mod tests {
    use super::*;
    use axum::http::HeaderValue;
    use jsonwebtoken::{encode, EncodingKey, Header};

    pub const SECRET: &str = "test-secret";

    pub fn mint(claims: serde_json::Value, secret: &str) -> String {
        encode(&Header::default(), &claims, &EncodingKey::from_secret(secret.as_bytes())).unwrap()
    }

    pub fn token_for(account: AccountId) -> String {
        let exp = chrono::Utc::now().timestamp() + 3600;
        mint(serde_json::json!({"user_id": account, "username": "alice", "exp": exp}), SECRET)
    }

    #[test]
    fn verifies_user_id_claim() {
        let verifier = JwtVerifier::new(SECRET);
        assert_eq!(verifier.verify(&token_for(42)).unwrap(), 42);
    }

    #[test]
    fn accepts_numeric_sub() {
        let exp = chrono::Utc::now().timestamp() + 3600;
        let token = mint(serde_json::json!({"sub": "17", "exp": exp}), SECRET);
        assert_eq!(JwtVerifier::new(SECRET).verify(&token).unwrap(), 17);
    }

    #[test]
    fn rejects_wrong_secret_and_expired_tokens() {
        let verifier = JwtVerifier::new(SECRET);
        let forged = mint(serde_json::json!({"user_id": 1, "exp": chrono::Utc::now().timestamp() + 3600}), "other");
        assert!(matches!(verifier.verify(&forged), Err(AuthError::Jwt(_))));

        let expired = mint(serde_json::json!({"user_id": 1, "exp": chrono::Utc::now().timestamp() - 3600}), SECRET);
        assert!(matches!(verifier.verify(&expired), Err(AuthError::Jwt(_))));
    }

    #[test]
    fn rejects_tokens_without_an_account() {
        let token = mint(serde_json::json!({"username": "x", "exp": chrono::Utc::now().timestamp() + 3600}), SECRET);
        assert!(matches!(JwtVerifier::new(SECRET).verify(&token), Err(AuthError::MissingClaim("user_id"))));
    }

    #[test]
    fn extracts_bearer_then_cookie() {
        let mut headers = HeaderMap::new();
        assert!(matches!(get_auth_token(&headers), Err(AuthError::MissingToken)));

        headers.insert(http::header::COOKIE, HeaderValue::from_static("theme=dark; auth_token=from-cookie"));
        assert_eq!(get_auth_token(&headers).unwrap(), "from-cookie");

        headers.insert(http::header::AUTHORIZATION, HeaderValue::from_static("Bearer from-header"));
        assert_eq!(get_auth_token(&headers).unwrap(), "from-header");
    }
}
