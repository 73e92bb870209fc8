use axum::extract::FromRequestParts;
use axum::http::request::Parts;

use crate::error::AppError;
use crate::services::auth::Identity;
use crate::state::AppState;

use super::AuthCtx;

/// 認証済み Identity を受け取るための extractor
/// AuthCtx が無い（認証 middleware 未設定）場合や token が拒否された場合は 401
pub struct Authenticated(pub Identity);

impl FromRequestParts<AppState> for Authenticated {
    type Rejection = AppError;

    async fn from_request_parts(
        parts: &mut Parts,
        _state: &AppState,
    ) -> Result<Self, Self::Rejection> {
        let ctx = parts
            .extensions
            .get::<AuthCtx>()
            .ok_or(AppError::Unauthenticated)?;

        match ctx.outcome() {
            Ok(identity) => Ok(Authenticated(identity.clone())),
            Err(err) => Err(AppError::Auth(err.clone())),
        }
    }
}

/// 匿名でも良い endpoint 用。token が無い/無効なら None
pub struct MaybeAuthenticated(pub Option<Identity>);

impl FromRequestParts<AppState> for MaybeAuthenticated {
    type Rejection = std::convert::Infallible;

    async fn from_request_parts(
        parts: &mut Parts,
        _state: &AppState,
    ) -> Result<Self, Self::Rejection> {
        let identity = parts
            .extensions
            .get::<AuthCtx>()
            .and_then(AuthCtx::identity)
            .cloned();

        Ok(MaybeAuthenticated(identity))
    }
}
