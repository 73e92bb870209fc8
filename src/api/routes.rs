/*
 * Responsibility
 * - /api の URL 構造を定義
 * - 各 route に必要な Requirement を route_layer で宣言する
 */
use axum::{Router, routing::get};

use crate::api::handlers::secret::{get_public, get_secret};
use crate::middleware::auth::authorize;
use crate::services::auth::Requirement;
use crate::state::AppState;

/// `required_scope` tightens `/secret` from "any valid token" to "token holding the scope".
pub fn routes(required_scope: Option<String>) -> Router<AppState> {
    let secret = match required_scope {
        Some(scope) => Requirement::RequireScope(scope),
        None => Requirement::RequireAuthenticated,
    };

    let protected = authorize::apply(Router::new().route("/secret", get(get_secret)), secret);

    let public = authorize::apply(
        Router::new().route("/secret/public", get(get_public)),
        Requirement::Public,
    );

    protected.merge(public)
}
