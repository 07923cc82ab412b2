use axum::http::{self, HeaderMap};
use jsonwebtoken::{decode, Algorithm, DecodingKey, Validation, TokenData};
use serde_json::Value;
use tracing::debug;

use crate::auth::Identity;
use crate::errors::AuthError;

// Get the auth token from request headers
pub fn get_auth_token(headers: &HeaderMap) -> Result<String, AuthError> {
    // 1. Try to get token from Authorization header
    if let Some(auth_header) = headers.get(http::header::AUTHORIZATION) {
        let auth_str = auth_header
            .to_str()
            .map_err(|_| AuthError::Malformed("invalid Authorization header".to_string()))?;
        Ok(auth_str
            .strip_prefix("Bearer ")
            .unwrap_or(auth_str)
            .to_string())
    }
    // 2. Try to get token from cookies
    else {
        let cookie_header = headers.get(http::header::COOKIE)
            .ok_or(AuthError::MissingCredential)?
            .to_str()
            .map_err(|_| AuthError::Malformed("invalid Cookie header".to_string()))?;

        for c in cookie::Cookie::split_parse(cookie_header).flatten() {
            if c.name() == "auth_token" {
                return Ok(c.value().to_string());
            }
        }
        Err(AuthError::MissingCredential)
    }
}

/// Verify a signed credential and resolve the identity it carries.
///
/// This is the single verification entry point, used by both the WebSocket gate and
/// the REST middleware.
pub fn authenticate(credential: Option<&str>, secret: Option<&str>) -> Result<Identity, AuthError> {
    let token = credential
        .map(str::trim)
        .filter(|t| !t.is_empty())
        .ok_or(AuthError::MissingCredential)?;
    let secret = secret.ok_or(AuthError::SecretNotConfigured)?;

    let token_data = validate_jwt(token, secret)?;
    let identity = identity_from_claims(&token_data.claims)?;
    debug!("Credential verified for user {}", identity.user_id);
    Ok(identity)
}

// Validate a JWT token and return the token data
pub fn validate_jwt(token: &str, secret: &str) -> Result<TokenData<Value>, jsonwebtoken::errors::Error> {
    let validation = Validation::new(Algorithm::HS256);
    let decoding_key = DecodingKey::from_secret(secret.as_bytes());
    decode::<Value>(token, &decoding_key, &validation)
}

// Tokens come either flat ({id|sub, name}) or nested under "user" ({user: {id, name}}).
fn identity_from_claims(claims: &Value) -> Result<Identity, AuthError> {
    let nested = claims.get("user");
    let lookup = |key: &str| -> Option<String> {
        nested
            .and_then(|u| u.get(key))
            .or_else(|| claims.get(key))
            .and_then(claim_as_string)
    };

    let user_id = lookup("id")
        .or_else(|| lookup("sub"))
        .ok_or(AuthError::MissingUserId)?;
    let display_name = lookup("name")
        .or_else(|| lookup("displayName"))
        .unwrap_or_else(|| user_id.clone());

    let roles = claims
        .get("roles")
        .and_then(|v| v.as_array())
        .map(|roles| roles.iter().filter_map(|r| r.as_str().map(str::to_string)).collect())
        .unwrap_or_default();

    Ok(Identity { user_id, display_name, roles })
}

fn claim_as_string(value: &Value) -> Option<String> {
    match value {
        Value::String(s) if !s.is_empty() => Some(s.clone()),
        Value::Number(n) => Some(n.to_string()),
        _ => None,
    }
}
