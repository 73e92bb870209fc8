//! Shared fixtures for unit tests: Ed25519 test keys, token minting, scripted JWKS source.
use std::sync::{
    Arc, Mutex,
    atomic::{AtomicBool, AtomicUsize, Ordering},
};
use std::time::Duration;

use async_trait::async_trait;
use base64::{Engine, engine::general_purpose::URL_SAFE_NO_PAD};
use jsonwebtoken::{Algorithm, EncodingKey, Header};
use serde_json::{Value, json};

use crate::services::auth::{TokenValidator, ValidationPolicy};
use crate::services::jwks::{JwksFetcher, JwksKeyProvider, KeyProviderError};

pub const ISSUER: &str = "https://tenant.example.auth0.com/";
pub const AUDIENCE: &str = "https://localhost:7294/";
pub const SUBJECT: &str = "auth0|65f1c0ffee";

pub fn now() -> i64 {
    chrono::Utc::now().timestamp()
}

/// Claims for a token that is valid at `issued_at` for ten minutes.
pub fn claims_at(issued_at: i64) -> Value {
    json!({
        "iss": ISSUER,
        "aud": AUDIENCE,
        "sub": SUBJECT,
        "iat": issued_at,
        "exp": issued_at + 600,
        "scope": "openid read:secret",
    })
}

pub fn policy() -> ValidationPolicy {
    ValidationPolicy {
        issuer: ISSUER.to_string(),
        audience: AUDIENCE.to_string(),
        subject_claim: "sub".to_string(),
        leeway_seconds: 60,
    }
}

/// Deterministic Ed25519 key (seeded) published under `kid`.
pub struct TestKey {
    pub kid: String,
    signing: ed25519_dalek::SigningKey,
}

impl TestKey {
    pub fn new(kid: &str, seed: u8) -> Self {
        Self {
            kid: kid.to_string(),
            signing: ed25519_dalek::SigningKey::from_bytes(&[seed; 32]),
        }
    }

    pub fn jwk(&self) -> Value {
        json!({
            "kty": "OKP",
            "crv": "Ed25519",
            "use": "sig",
            "alg": "EdDSA",
            "kid": self.kid,
            "x": URL_SAFE_NO_PAD.encode(self.signing.verifying_key().as_bytes()),
        })
    }

    pub fn sign(&self, claims: &Value) -> String {
        self.sign_with_header(Some(self.kid.clone()), claims)
    }

    pub fn sign_without_kid(&self, claims: &Value) -> String {
        self.sign_with_header(None, claims)
    }

    fn sign_with_header(&self, kid: Option<String>, claims: &Value) -> String {
        // PKCS#8 v1 wrapping of the raw 32-byte seed (RFC 8410).
        let mut der = vec![
            0x30, 0x2e, 0x02, 0x01, 0x00, 0x30, 0x05, 0x06, 0x03, 0x2b, 0x65, 0x70, 0x04, 0x22,
            0x04, 0x20,
        ];
        der.extend_from_slice(&self.signing.to_bytes());
        let key = EncodingKey::from_ed_der(&der);

        let mut header = Header::new(Algorithm::EdDSA);
        header.typ = Some("JWT".to_string());
        header.kid = kid;

        jsonwebtoken::encode(&header, claims, &key).unwrap()
    }
}

/// In-memory JWKS source that counts fetches and can be switched to failing.
pub struct ScriptedFetcher {
    keys: Mutex<Vec<Value>>,
    delay: Duration,
    pub calls: AtomicUsize,
    pub fail: AtomicBool,
}

impl ScriptedFetcher {
    pub fn serving(keys: Vec<Value>) -> Arc<Self> {
        Self::slow(keys, Duration::ZERO)
    }

    pub fn slow(keys: Vec<Value>, delay: Duration) -> Arc<Self> {
        Arc::new(Self {
            keys: Mutex::new(keys),
            delay,
            calls: AtomicUsize::new(0),
            fail: AtomicBool::new(false),
        })
    }

    pub fn set_keys(&self, keys: Vec<Value>) {
        *self.keys.lock().unwrap() = keys;
    }
}

#[async_trait]
impl JwksFetcher for ScriptedFetcher {
    fn source(&self) -> &str {
        "scripted"
    }

    async fn fetch(&self) -> Result<Vec<u8>, KeyProviderError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        if !self.delay.is_zero() {
            tokio::time::sleep(self.delay).await;
        }
        if self.fail.load(Ordering::SeqCst) {
            return Err(KeyProviderError::Fetch("scripted failure".to_string()));
        }

        let keys = self.keys.lock().unwrap().clone();
        Ok(serde_json::to_vec(&json!({ "keys": keys })).unwrap())
    }
}

/// In-memory sink for `tracing` output, installed for the current thread.
#[derive(Clone, Default)]
pub struct CapturedLogs(Arc<Mutex<Vec<u8>>>);

impl CapturedLogs {
    pub fn contents(&self) -> String {
        String::from_utf8_lossy(&self.0.lock().unwrap()).into_owned()
    }
}

impl std::io::Write for CapturedLogs {
    fn write(&mut self, buf: &[u8]) -> std::io::Result<usize> {
        self.0.lock().unwrap().extend_from_slice(buf);
        Ok(buf.len())
    }

    fn flush(&mut self) -> std::io::Result<()> {
        Ok(())
    }
}

/// Records every event (all levels) until the guard is dropped.
pub fn capture_logs() -> (CapturedLogs, tracing::subscriber::DefaultGuard) {
    let logs = CapturedLogs::default();
    let writer = logs.clone();
    let subscriber = tracing_subscriber::fmt()
        .with_max_level(tracing::Level::TRACE)
        .with_ansi(false)
        .with_writer(move || writer.clone())
        .finish();

    (logs, tracing::subscriber::set_default(subscriber))
}

pub fn provider_serving(keys: Vec<Value>) -> (Arc<JwksKeyProvider>, Arc<ScriptedFetcher>) {
    let fetcher = ScriptedFetcher::serving(keys);
    let provider = Arc::new(JwksKeyProvider::new(
        fetcher.clone(),
        Duration::from_secs(600),
        Duration::ZERO,
    ));
    (provider, fetcher)
}

pub fn validator_with(keys: Vec<Value>) -> TokenValidator {
    let (provider, _) = provider_serving(keys);
    TokenValidator::new(provider, policy())
}
