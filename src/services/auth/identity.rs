use serde_json::Value;

use super::validator::{ClaimMap, TokenClaims};

/// Authenticated caller for the lifetime of one request.
///
/// - `subject` comes from the configured user-id claim (`sub` by default) and cannot change
/// - `claims` is the full verified claim set
#[derive(Debug, Clone, PartialEq)]
pub struct Identity {
    subject: String,
    claims: ClaimMap,
}

impl Identity {
    /// Builds the identity from already validated claims.
    ///
    /// The validator guarantees the subject claim is a non-empty string.
    pub fn from_claims(claims: TokenClaims, subject_claim: &str) -> Self {
        let subject = claims
            .get(subject_claim)
            .and_then(Value::as_str)
            .unwrap_or_default()
            .to_string();

        Self {
            subject,
            claims: claims.into_map(),
        }
    }

    pub fn subject(&self) -> &str {
        &self.subject
    }

    pub fn claim(&self, name: &str) -> Option<&Value> {
        self.claims.get(name)
    }

    /// Space-separated OAuth `scope` claim.
    pub fn scopes(&self) -> impl Iterator<Item = &str> {
        self.claim("scope")
            .and_then(Value::as_str)
            .unwrap_or_default()
            .split_whitespace()
    }

    /// Auth0 RBAC `permissions` array.
    pub fn permissions(&self) -> impl Iterator<Item = &str> {
        self.claim("permissions")
            .and_then(Value::as_array)
            .into_iter()
            .flatten()
            .filter_map(Value::as_str)
    }

    pub fn has_scope(&self, scope: &str) -> bool {
        self.scopes().any(|s| s == scope) || self.permissions().any(|p| p == scope)
    }
}
