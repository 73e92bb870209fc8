//! Access-token (JWT) verification against the issuer's published keys.
//!
//! Stages run in a fixed order and stop at the first failure:
//!
//! 1. envelope parse (`MalformedToken`)
//! 2. key lookup by `kid` (`UnknownSigningKey`)
//! 3. signature (`SignatureInvalid`)
//! 4. `exp` / `nbf` with leeway (`Expired`, `NotYetValid`)
//! 5. `iss` (`IssuerMismatch`)
//! 6. `aud` (`AudienceMismatch`)
//!
//! Claims are only trusted after stage 3.

use std::sync::Arc;

use base64::{Engine, engine::general_purpose::URL_SAFE_NO_PAD};
use chrono::Utc;
use jsonwebtoken::{Algorithm, Validation};
use serde_json::Value;
use tracing::warn;

use super::AuthError;
use crate::services::jwks::{KeyProvider, KeyProviderError, SigningKey, key_set::is_asymmetric};

pub type ClaimMap = serde_json::Map<String, Value>;

/// Unverified envelope data needed to pick a key.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TokenHeader {
    pub algorithm: Algorithm,
    pub kid: String,
}

/// Claims of a token whose signature, lifetime, issuer and audience all checked out.
#[derive(Debug, Clone, PartialEq)]
pub struct TokenClaims(ClaimMap);

impl TokenClaims {
    pub fn get(&self, name: &str) -> Option<&Value> {
        self.0.get(name)
    }

    pub fn into_map(self) -> ClaimMap {
        self.0
    }

    #[cfg(test)]
    pub(crate) fn from_verified(claims: ClaimMap) -> Self {
        Self(claims)
    }
}

/// What a token must satisfy besides a valid signature.
#[derive(Debug, Clone)]
pub struct ValidationPolicy {
    pub issuer: String,
    pub audience: String,
    pub subject_claim: String,
    pub leeway_seconds: u64,
}

pub struct TokenValidator {
    keys: Arc<dyn KeyProvider>,
    policy: ValidationPolicy,
}

impl std::fmt::Debug for TokenValidator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TokenValidator")
            .field("policy", &self.policy)
            .finish()
    }
}

impl TokenValidator {
    pub fn new(keys: Arc<dyn KeyProvider>, policy: ValidationPolicy) -> Self {
        Self { keys, policy }
    }

    pub fn policy(&self) -> &ValidationPolicy {
        &self.policy
    }

    pub async fn validate(&self, token: &str) -> Result<TokenClaims, AuthError> {
        self.validate_at(token, Utc::now().timestamp()).await
    }

    /// Same as [`validate`](Self::validate) with an explicit clock (unix seconds).
    pub async fn validate_at(&self, token: &str, now: i64) -> Result<TokenClaims, AuthError> {
        let header = parse_envelope(token)?;

        let key = self
            .keys
            .signing_key(&header.kid)
            .await
            .map_err(|err| {
                match &err {
                    KeyProviderError::UnknownKey { .. } => {
                        warn!(kid = %header.kid, "token signed with unknown key")
                    }
                    other => warn!(kid = %header.kid, error = %other, "signing key unavailable"),
                }
                AuthError::UnknownSigningKey
            })?;

        let claims = verify_signature(token, &header, &key)?;

        check_time_window(&claims, now, self.leeway())?;
        check_issuer(&claims, &self.policy.issuer)?;
        check_audience(&claims, &self.policy.audience)?;
        check_subject(&claims, &self.policy.subject_claim)?;

        Ok(TokenClaims(claims))
    }

    fn leeway(&self) -> i64 {
        i64::try_from(self.policy.leeway_seconds).unwrap_or(i64::MAX)
    }
}

/// Structural parse of `header.payload.signature` without trusting anything.
pub fn parse_envelope(token: &str) -> Result<TokenHeader, AuthError> {
    let mut parts = token.split('.');
    let (Some(_), Some(payload), Some(signature), None) =
        (parts.next(), parts.next(), parts.next(), parts.next())
    else {
        return Err(AuthError::MalformedToken("expected three segments"));
    };

    let header = jsonwebtoken::decode_header(token)
        .map_err(|_| AuthError::MalformedToken("undecodable header"))?;

    let payload = URL_SAFE_NO_PAD
        .decode(payload)
        .map_err(|_| AuthError::MalformedToken("undecodable payload"))?;
    serde_json::from_slice::<ClaimMap>(&payload)
        .map_err(|_| AuthError::MalformedToken("payload is not a JSON object"))?;

    if signature.is_empty() || URL_SAFE_NO_PAD.decode(signature).is_err() {
        return Err(AuthError::MalformedToken("undecodable signature"));
    }

    if !is_asymmetric(header.alg) {
        return Err(AuthError::MalformedToken("unsupported algorithm"));
    }

    let kid = header
        .kid
        .filter(|kid| !kid.is_empty())
        .ok_or(AuthError::MalformedToken("missing kid"))?;

    Ok(TokenHeader {
        algorithm: header.alg,
        kid,
    })
}

fn verify_signature(
    token: &str,
    header: &TokenHeader,
    key: &SigningKey,
) -> Result<ClaimMap, AuthError> {
    // A token may not choose a different algorithm than the key was published for.
    if header.algorithm != key.algorithm {
        return Err(AuthError::SignatureInvalid);
    }

    // Signature only; claim checks below run in a fixed order with their own errors.
    let mut validation = Validation::new(key.algorithm);
    validation.validate_exp = false;
    validation.validate_nbf = false;
    validation.validate_aud = false;
    validation.required_spec_claims.clear();

    let data = jsonwebtoken::decode::<ClaimMap>(token, &key.key, &validation)?;
    Ok(data.claims)
}

// NumericDate may be an integer or a float.
fn numeric_date(value: &Value) -> Option<i64> {
    value
        .as_i64()
        .or_else(|| value.as_f64().map(|f| f.floor() as i64))
}

fn check_time_window(claims: &ClaimMap, now: i64, leeway: i64) -> Result<(), AuthError> {
    let exp = claims
        .get("exp")
        .ok_or(AuthError::MalformedToken("missing exp claim"))
        .and_then(|v| numeric_date(v).ok_or(AuthError::MalformedToken("invalid exp claim")))?;

    if now >= exp.saturating_add(leeway) {
        return Err(AuthError::Expired);
    }

    if let Some(nbf) = claims.get("nbf") {
        let nbf = numeric_date(nbf).ok_or(AuthError::MalformedToken("invalid nbf claim"))?;
        if now.saturating_add(leeway) < nbf {
            return Err(AuthError::NotYetValid);
        }
    }

    Ok(())
}

fn check_issuer(claims: &ClaimMap, issuer: &str) -> Result<(), AuthError> {
    match claims.get("iss").and_then(Value::as_str) {
        Some(iss) if iss == issuer => Ok(()),
        _ => Err(AuthError::IssuerMismatch),
    }
}

fn check_audience(claims: &ClaimMap, audience: &str) -> Result<(), AuthError> {
    let accepted = match claims.get("aud") {
        Some(Value::String(aud)) => aud == audience,
        // Every entry must be a string; any other shape is treated as a mismatch.
        Some(Value::Array(auds)) => {
            auds.iter().all(Value::is_string) && auds.iter().any(|v| v.as_str() == Some(audience))
        }
        _ => false,
    };

    if accepted {
        Ok(())
    } else {
        Err(AuthError::AudienceMismatch)
    }
}

fn check_subject(claims: &ClaimMap, subject_claim: &str) -> Result<(), AuthError> {
    match claims.get(subject_claim).and_then(Value::as_str) {
        Some(sub) if !sub.trim().is_empty() => Ok(()),
        _ => Err(AuthError::MalformedToken("missing subject claim")),
    }
}
