/*
 * Responsibility
 * - 環境変数 (.env) から起動設定を読み込む
 * - issuer / audience / JWKS / CORS の値を検証し、不足なら起動失敗
 */
use std::fmt;
use std::net::SocketAddr;
use std::str::FromStr;
use std::time::Duration;

use url::Url;

use crate::services::jwks::provider::{DEFAULT_CACHE_TTL, DEFAULT_MIN_REFRESH_INTERVAL};

/// Upper bound for the accepted clock skew between issuer and this service.
pub const MAX_LEEWAY_SECONDS: u64 = 120;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AppEnv {
    Development,
    Production,
}

impl AppEnv {
    fn parse(raw: &str) -> Self {
        match raw.to_ascii_lowercase().as_str() {
            "production" | "prod" => Self::Production,
            _ => Self::Development,
        }
    }

    pub fn is_production(&self) -> bool {
        matches!(self, Self::Production)
    }
}

#[derive(Debug)]
pub enum ConfigError {
    Missing(&'static str),
    Invalid(&'static str),
}

impl fmt::Display for ConfigError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ConfigError::Missing(key) => write!(f, "missing configuration: {}", key),
            ConfigError::Invalid(key) => write!(f, "invalid configuration: {}", key),
        }
    }
}

impl std::error::Error for ConfigError {}

/// Token validation settings handed to the auth service.
#[derive(Debug, Clone)]
pub struct AuthSettings {
    pub issuer: String,
    pub audience: String,
    pub subject_claim: String,
    /// Scope (or permission) `/api/secret` additionally demands, if any.
    pub required_scope: Option<String>,
    pub leeway_seconds: u64,
    pub jwks_uri: Url,
    pub jwks_cache_ttl: Duration,
    pub jwks_min_refresh_interval: Duration,
    pub jwks_fetch_timeout: Duration,
}

#[derive(Debug, Clone)]
pub struct Config {
    pub addr: SocketAddr,
    pub app_env: AppEnv,
    pub cors_allowed_origins: Vec<String>,
    pub auth: AuthSettings,
}

impl Config {
    pub fn from_env() -> Result<Self, ConfigError> {
        dotenvy::dotenv().ok();

        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Builds the config from any key lookup; `from_env` passes the process environment.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let port: u16 = match lookup("PORT") {
            Some(raw) => raw.parse().map_err(|_| ConfigError::Invalid("PORT"))?,
            None => 3000,
        };

        let addr: SocketAddr = SocketAddr::from_str(&format!("0.0.0.0:{}", port))
            .map_err(|_| ConfigError::Invalid("PORT"))?;

        let app_env = lookup("APP_ENV")
            .map(|raw| AppEnv::parse(&raw))
            .unwrap_or(AppEnv::Development);

        let cors_allowed_origins = lookup("CORS_ALLOWED_ORIGINS")
            .unwrap_or_else(|| "http://localhost:5000".to_string())
            .split(',')
            .map(|s| s.trim().to_string())
            .filter(|s| !s.is_empty())
            .collect::<Vec<_>>();

        let issuer = lookup("AUTH_ISSUER")
            .map(|s| s.trim().to_string())
            .filter(|s| !s.is_empty())
            .ok_or(ConfigError::Missing("AUTH_ISSUER"))?;
        let issuer_url = Url::parse(&issuer).map_err(|_| ConfigError::Invalid("AUTH_ISSUER"))?;

        let audience = lookup("AUTH_AUDIENCE")
            .map(|s| s.trim().to_string())
            .filter(|s| !s.is_empty())
            .ok_or(ConfigError::Missing("AUTH_AUDIENCE"))?;

        let jwks_uri = match lookup("AUTH_JWKS_URI") {
            Some(raw) => Url::parse(raw.trim()).map_err(|_| ConfigError::Invalid("AUTH_JWKS_URI"))?,
            None => default_jwks_uri(&issuer_url).ok_or(ConfigError::Invalid("AUTH_ISSUER"))?,
        };

        let subject_claim = lookup("AUTH_SUBJECT_CLAIM")
            .map(|s| s.trim().to_string())
            .filter(|s| !s.is_empty())
            .unwrap_or_else(|| "sub".to_string());

        let required_scope = lookup("AUTH_REQUIRED_SCOPE")
            .map(|s| s.trim().to_string())
            .filter(|s| !s.is_empty());

        let leeway_seconds = seconds(&lookup, "ACCESS_TOKEN_LEEWAY_SECONDS", 60)?;
        if leeway_seconds > MAX_LEEWAY_SECONDS {
            return Err(ConfigError::Invalid("ACCESS_TOKEN_LEEWAY_SECONDS"));
        }

        let jwks_cache_ttl = seconds(&lookup, "JWKS_CACHE_TTL_SECONDS", DEFAULT_CACHE_TTL.as_secs())?;
        if jwks_cache_ttl == 0 {
            return Err(ConfigError::Invalid("JWKS_CACHE_TTL_SECONDS"));
        }
        let jwks_min_refresh_interval = seconds(
            &lookup,
            "JWKS_MIN_REFRESH_INTERVAL_SECONDS",
            DEFAULT_MIN_REFRESH_INTERVAL.as_secs(),
        )?;
        let jwks_fetch_timeout = seconds(&lookup, "JWKS_FETCH_TIMEOUT_SECONDS", 10)?;

        Ok(Self {
            addr,
            app_env,
            cors_allowed_origins,
            auth: AuthSettings {
                issuer,
                audience,
                subject_claim,
                required_scope,
                leeway_seconds,
                jwks_uri,
                jwks_cache_ttl: Duration::from_secs(jwks_cache_ttl),
                jwks_min_refresh_interval: Duration::from_secs(jwks_min_refresh_interval),
                jwks_fetch_timeout: Duration::from_secs(jwks_fetch_timeout),
            },
        })
    }
}

fn seconds<F>(lookup: &F, key: &'static str, default: u64) -> Result<u64, ConfigError>
where
    F: Fn(&str) -> Option<String>,
{
    match lookup(key) {
        Some(raw) => raw.trim().parse().map_err(|_| ConfigError::Invalid(key)),
        None => Ok(default),
    }
}

/// Auth0 publishes its key set at `{issuer}/.well-known/jwks.json`.
fn default_jwks_uri(issuer: &Url) -> Option<Url> {
    let base = issuer.as_str().trim_end_matches('/');
    Url::parse(&format!("{}/.well-known/jwks.json", base)).ok()
}
