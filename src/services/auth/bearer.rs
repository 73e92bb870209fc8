//! `Authorization: Bearer <token>` extraction.
use axum::http::{HeaderMap, header};
use sha2::{Digest, Sha256};

use super::AuthError;

const SCHEME: &str = "Bearer ";

/// Returns the raw bearer token from the request headers.
///
/// - no `Authorization` header → `MissingToken`
/// - repeated header, non-ASCII value, other scheme, empty credential → `MalformedScheme`
pub fn extract_bearer(headers: &HeaderMap) -> Result<&str, AuthError> {
    let mut values = headers.get_all(header::AUTHORIZATION).iter();

    let value = values.next().ok_or(AuthError::MissingToken)?;
    if values.next().is_some() {
        return Err(AuthError::MalformedScheme);
    }

    let value = value.to_str().map_err(|_| AuthError::MalformedScheme)?;

    let prefix = value.get(..SCHEME.len()).ok_or(AuthError::MalformedScheme)?;
    if !prefix.eq_ignore_ascii_case(SCHEME) {
        return Err(AuthError::MalformedScheme);
    }

    let token = value[SCHEME.len()..].trim();
    if token.is_empty() {
        return Err(AuthError::MalformedScheme);
    }

    Ok(token)
}

/// Short, non-reversible token id for log correlation. Never log the token itself.
pub fn fingerprint(token: &str) -> String {
    let digest = Sha256::digest(token.as_bytes());
    digest
        .iter()
        .take(6)
        .map(|b| format!("{:02x}", b))
        .collect()
}
