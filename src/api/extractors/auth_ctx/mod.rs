/*!
 * Authentication context extractor
 *
 * Responsibility:
 * - 認証 middleware の結果（AuthCtx）を handler に提供する
 * - HTTP / axum 依存は core に閉じ込め、型定義は types に分離する
 *
 * Public API:
 * - AuthCtx
 * - Authenticated
 * - MaybeAuthenticated
 */

mod core;
mod types;

pub use core::{Authenticated, MaybeAuthenticated};
pub use types::AuthCtx;
