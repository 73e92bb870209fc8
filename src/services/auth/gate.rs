//! Per-endpoint authorization decision.
//!
//! Pure function of the endpoint requirement and the (optional) identity; no I/O.

use super::Identity;

/// What an endpoint demands from the caller.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Requirement {
    Public,
    RequireAuthenticated,
    /// Authenticated and holding the scope (or Auth0 permission).
    RequireScope(String),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DenyReason {
    /// No identity: no token or token rejected upstream. Maps to 401.
    Unauthenticated,
    /// Identity present but not allowed. Maps to 403.
    InsufficientScope,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AuthorizationDecision {
    Allow,
    Deny(DenyReason),
}

pub fn authorize(requirement: &Requirement, identity: Option<&Identity>) -> AuthorizationDecision {
    match (requirement, identity) {
        (Requirement::Public, _) => AuthorizationDecision::Allow,
        (_, None) => AuthorizationDecision::Deny(DenyReason::Unauthenticated),
        (Requirement::RequireAuthenticated, Some(_)) => AuthorizationDecision::Allow,
        (Requirement::RequireScope(scope), Some(identity)) => {
            if identity.has_scope(scope) {
                AuthorizationDecision::Allow
            } else {
                AuthorizationDecision::Deny(DenyReason::InsufficientScope)
            }
        }
    }
}
