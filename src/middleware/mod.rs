/*
 * Responsibility
 * - middleware の公開インターフェース
 * - 適用順 (外側から): http → security_headers → cors → auth::authenticate → auth::authorize
 */
pub mod auth;
pub mod cors;
pub mod http;
pub mod security_headers;
