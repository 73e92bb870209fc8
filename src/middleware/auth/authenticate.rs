//! Authentication layer
//!
//! - `Authorization: Bearer <jwt>` を取り出し、AuthService で検証する
//! - 結果 (Identity or AuthError) を AuthCtx として request extensions に入れる
//! - ここでは拒否しない。401/403 の判断は authorize (route_layer) 側

use axum::{
    Router,
    body::Body,
    extract::State,
    http::Request,
    middleware::{self, Next},
    response::Response,
};

use crate::api::extractors::AuthCtx;
use crate::services::auth::{AuthError, bearer};
use crate::state::AppState;

/// Applies the authentication layer to every route of `router`.
///
/// ```ignore
/// let api = middleware::auth::authenticate::apply(api::routes(), state.clone());
/// app = app.nest("/api", api);
/// ```
pub fn apply(router: Router<AppState>, state: AppState) -> Router<AppState> {
    router.layer(middleware::from_fn_with_state(state, authenticate))
}

async fn authenticate(
    State(state): State<AppState>,
    mut req: Request<Body>,
    next: Next,
) -> Response {
    let outcome = match bearer::extract_bearer(req.headers()).map(str::to_owned) {
        Ok(token) => {
            let outcome = state.auth.authenticate(&token).await;
            match &outcome {
                Ok(identity) => {
                    tracing::debug!(sub = %identity.subject(), "access token accepted");
                }
                Err(err) => {
                    tracing::warn!(
                        code = err.code(),
                        error = %err,
                        token = %bearer::fingerprint(&token),
                        "access token rejected"
                    );
                }
            }
            outcome
        }
        Err(AuthError::MissingToken) => Err(AuthError::MissingToken),
        Err(err) => {
            tracing::warn!(code = err.code(), "malformed authorization header");
            Err(err)
        }
    };

    // middleware → authorize / extractor への受け渡し
    req.extensions_mut().insert(AuthCtx::new(outcome));

    next.run(req).await
}
