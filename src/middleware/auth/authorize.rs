//! Authorization layer (per route)
//!
//! `route_layer` で route ごとに Requirement を宣言し、AuthCtx を見て通す/拒否する。
//! 拒否理由は 401 (token 無し/無効) と 403 (scope 不足) のみ。

use axum::{
    Router,
    body::Body,
    extract::State,
    http::Request,
    middleware::{self, Next},
    response::Response,
};

use crate::api::extractors::AuthCtx;
use crate::error::AppError;
use crate::services::auth::{AuthorizationDecision, DenyReason, Requirement, authorize};

pub fn apply<S>(router: Router<S>, requirement: Requirement) -> Router<S>
where
    S: Clone + Send + Sync + 'static,
{
    router.route_layer(middleware::from_fn_with_state(requirement, enforce))
}

async fn enforce(
    State(requirement): State<Requirement>,
    req: Request<Body>,
    next: Next,
) -> Result<Response, AppError> {
    let ctx = req.extensions().get::<AuthCtx>();

    match authorize(&requirement, ctx.and_then(AuthCtx::identity)) {
        AuthorizationDecision::Allow => Ok(next.run(req).await),
        AuthorizationDecision::Deny(DenyReason::Unauthenticated) => match ctx.map(AuthCtx::outcome) {
            // Surface the concrete rejection reason to the client.
            Some(Err(err)) => Err(AppError::Auth(err.clone())),
            _ => Err(AppError::Unauthenticated),
        },
        AuthorizationDecision::Deny(reason) => {
            tracing::info!(?requirement, ?reason, "request denied");
            Err(reason.into())
        }
    }
}
