/// Factory: build the key provider and `AuthService` from application `Config`.
use std::sync::Arc;

use crate::config::AuthSettings;
use crate::services::auth::{AuthService, TokenValidator, ValidationPolicy};
use crate::services::jwks::{HttpJwksFetcher, JwksKeyProvider, KeyProvider, KeyProviderError};

pub fn build_key_provider(settings: &AuthSettings) -> Result<Arc<JwksKeyProvider>, KeyProviderError> {
    let fetcher = HttpJwksFetcher::new(settings.jwks_uri.clone(), settings.jwks_fetch_timeout)?;

    Ok(Arc::new(JwksKeyProvider::new(
        Arc::new(fetcher),
        settings.jwks_cache_ttl,
        settings.jwks_min_refresh_interval,
    )))
}

pub fn build_auth_service(settings: &AuthSettings, keys: Arc<dyn KeyProvider>) -> Arc<AuthService> {
    let policy = ValidationPolicy {
        issuer: settings.issuer.clone(),
        audience: settings.audience.clone(),
        subject_claim: settings.subject_claim.clone(),
        leeway_seconds: settings.leeway_seconds,
    };

    Arc::new(AuthService::new(TokenValidator::new(keys, policy)))
}
