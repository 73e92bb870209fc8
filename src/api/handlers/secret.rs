/*
 * Responsibility
 * - GET /api/secret (認証必須)
 * - GET /api/secret/public (誰でも)
 * - 認証/認可は middleware 側で済んでいる前提。handler は Identity を受け取るだけ
 */
use axum::Json;
use chrono::{SecondsFormat, Utc};

use crate::api::dto::secret::MessageResponse;
use crate::api::extractors::{Authenticated, MaybeAuthenticated};

pub async fn get_secret(Authenticated(identity): Authenticated) -> Json<MessageResponse> {
    let now = Utc::now().to_rfc3339_opts(SecondsFormat::Secs, true);

    Json(MessageResponse::new(format!(
        "Hello user {}! This is secret data from the API. Time: {}",
        identity.subject(),
        now
    )))
}

pub async fn get_public(MaybeAuthenticated(identity): MaybeAuthenticated) -> Json<MessageResponse> {
    if let Some(identity) = &identity {
        tracing::debug!(sub = %identity.subject(), "public endpoint called with a valid token");
    }

    Json(MessageResponse::new(
        "This is public data. Anyone can see it.",
    ))
}
