pub mod fetcher;
pub mod key_set;
pub mod provider;

pub use fetcher::{HttpJwksFetcher, JwksFetcher};
pub use key_set::{KeyMap, SigningKey, parse_key_set};
pub use provider::{JwksKeyProvider, KeyProvider};

/// Key-provider errors.
///
/// Kept separate from `AuthError` so the validator decides how a provider failure
/// surfaces to clients (always `UnknownSigningKey`).
#[derive(Debug, thiserror::Error)]
pub enum KeyProviderError {
    #[error("signing key not found: {kid}")]
    UnknownKey { kid: String },

    #[error("key set fetch failed: {0}")]
    Fetch(String),

    #[error("key set document invalid: {0}")]
    Parse(String),
}
