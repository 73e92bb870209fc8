/*
 * Responsibility
 * - アプリ共通の AppError 定義
 * - IntoResponse 実装 (HTTP status / JSON error body / WWW-Authenticate)
 * - AuthError / 認可判定の結果を統一的に変換
 */
use axum::{
    Json,
    http::{HeaderValue, StatusCode, header},
    response::{IntoResponse, Response},
};
use serde::Serialize;
use thiserror::Error;

use crate::services::auth::{AuthError, DenyReason};

#[derive(Debug, Serialize)]
pub struct ErrorResponse {
    pub error: ErrorBody,
}

#[derive(Debug, Serialize)]
pub struct ErrorBody {
    pub code: &'static str,
    pub message: String,
}

#[derive(Debug, Error)]
pub enum AppError {
    /// The presented credentials were rejected.
    #[error(transparent)]
    Auth(#[from] AuthError),
    /// No authentication outcome is attached to the request.
    #[error("unauthenticated")]
    Unauthenticated,
    #[error("insufficient scope")]
    Forbidden,
    #[error("internal server error")]
    Internal,
}

impl From<DenyReason> for AppError {
    fn from(reason: DenyReason) -> Self {
        match reason {
            DenyReason::Unauthenticated => AppError::Unauthenticated,
            DenyReason::InsufficientScope => AppError::Forbidden,
        }
    }
}

fn bearer_challenge(error: Option<&'static str>) -> HeaderValue {
    match error {
        Some("invalid_request") => HeaderValue::from_static(r#"Bearer error="invalid_request""#),
        Some(_) => HeaderValue::from_static(r#"Bearer error="invalid_token""#),
        None => HeaderValue::from_static("Bearer"),
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let (status, code, message, challenge) = match &self {
            AppError::Auth(err) => (
                StatusCode::UNAUTHORIZED,
                err.code(),
                err.to_string(),
                Some(bearer_challenge(err.challenge_error())),
            ),
            AppError::Unauthenticated => (
                StatusCode::UNAUTHORIZED,
                "UNAUTHENTICATED",
                "authentication required".into(),
                Some(bearer_challenge(None)),
            ),
            AppError::Forbidden => (
                StatusCode::FORBIDDEN,
                "INSUFFICIENT_SCOPE",
                "insufficient scope".into(),
                None,
            ),
            AppError::Internal => (
                StatusCode::INTERNAL_SERVER_ERROR,
                "INTERNAL_SERVER_ERROR",
                "internal server error".into(),
                None,
            ),
        };

        let body = ErrorResponse {
            error: ErrorBody { code, message },
        };

        let mut res = (status, Json(body)).into_response();
        if let Some(value) = challenge {
            res.headers_mut().insert(header::WWW_AUTHENTICATE, value);
        }
        res
    }
}
