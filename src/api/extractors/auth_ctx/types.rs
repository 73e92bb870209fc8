/*
 * Responsibility
 * - 認証 middleware の判定結果を request extensions に載せるための型
 * - middleware が insert し、認可 middleware / extractor が読むだけ
 */

use crate::services::auth::{AuthError, Identity};

/// Outcome of the authentication layer for one request.
///
/// Anonymous requests carry `Err(AuthError::MissingToken)`.
#[derive(Debug, Clone)]
pub struct AuthCtx {
    outcome: Result<Identity, AuthError>,
}

impl AuthCtx {
    pub fn new(outcome: Result<Identity, AuthError>) -> Self {
        Self { outcome }
    }

    pub fn identity(&self) -> Option<&Identity> {
        self.outcome.as_ref().ok()
    }

    pub fn outcome(&self) -> &Result<Identity, AuthError> {
        &self.outcome
    }
}
