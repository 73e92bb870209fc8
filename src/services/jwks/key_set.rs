//! JWKS document → verified-only signing keys.
//!
//! Only asymmetric signature keys survive parsing. A `kid` that appears more than once
//! in the same document is ambiguous and is dropped entirely.

use std::{collections::HashMap, fmt, str::FromStr, sync::Arc};

use jsonwebtoken::{Algorithm, DecodingKey, jwk::Jwk};
use serde::Deserialize;
use tracing::warn;

use super::KeyProviderError;

/// A public verification key published by the issuer.
///
/// Replaced as a whole on refresh, never mutated.
#[derive(Clone)]
pub struct SigningKey {
    pub kid: String,
    pub algorithm: Algorithm,
    pub key: DecodingKey,
}

impl fmt::Debug for SigningKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        // Do not print key material
        f.debug_struct("SigningKey")
            .field("kid", &self.kid)
            .field("algorithm", &self.algorithm)
            .finish()
    }
}

#[derive(Debug, Deserialize)]
struct RawKeySet {
    keys: Vec<serde_json::Value>,
}

/// Parsed key set indexed by `kid`.
pub type KeyMap = HashMap<String, Arc<SigningKey>>;

pub fn parse_key_set(body: &[u8]) -> Result<KeyMap, KeyProviderError> {
    let raw: RawKeySet =
        serde_json::from_slice(body).map_err(|e| KeyProviderError::Parse(e.to_string()))?;

    // Counted over every published entry, usable or not.
    let mut seen: HashMap<String, usize> = HashMap::new();
    for value in &raw.keys {
        if let Some(kid) = value.get("kid").and_then(|v| v.as_str()) {
            *seen.entry(kid.to_string()).or_insert(0) += 1;
        }
    }

    let mut keys = KeyMap::new();
    for value in raw.keys {
        let Some(key) = parse_key(value) else {
            continue;
        };

        match seen.get(&key.kid) {
            Some(&count) if count > 1 => {
                warn!(kid = %key.kid, count, "duplicate kid in key set, rejecting all entries");
            }
            _ => {
                keys.insert(key.kid.clone(), Arc::new(key));
            }
        }
    }

    Ok(keys)
}

fn parse_key(value: serde_json::Value) -> Option<SigningKey> {
    let kid = value.get("kid").and_then(|v| v.as_str())?.to_string();

    if value.get("use").and_then(|v| v.as_str()) == Some("enc") {
        return None;
    }

    let algorithm = match value.get("alg").and_then(|v| v.as_str()) {
        Some(alg) => match Algorithm::from_str(alg) {
            Ok(alg) => alg,
            Err(_) => {
                warn!(kid = %kid, alg, "unsupported key algorithm, skipping");
                return None;
            }
        },
        None => infer_algorithm(&value)?,
    };

    if !is_asymmetric(algorithm) {
        warn!(kid = %kid, ?algorithm, "symmetric key in key set, skipping");
        return None;
    }

    let jwk: Jwk = match serde_json::from_value(value) {
        Ok(jwk) => jwk,
        Err(err) => {
            warn!(kid = %kid, error = %err, "unparseable jwk, skipping");
            return None;
        }
    };

    match DecodingKey::from_jwk(&jwk) {
        Ok(key) => Some(SigningKey {
            kid,
            algorithm,
            key,
        }),
        Err(err) => {
            warn!(kid = %kid, error = %err, "invalid public key material, skipping");
            None
        }
    }
}

fn infer_algorithm(value: &serde_json::Value) -> Option<Algorithm> {
    let kty = value.get("kty").and_then(|v| v.as_str())?;
    let crv = value.get("crv").and_then(|v| v.as_str());

    match (kty, crv) {
        ("RSA", _) => Some(Algorithm::RS256),
        ("OKP", Some("Ed25519")) => Some(Algorithm::EdDSA),
        ("EC", Some("P-256")) => Some(Algorithm::ES256),
        ("EC", Some("P-384")) => Some(Algorithm::ES384),
        _ => None,
    }
}

pub fn is_asymmetric(algorithm: Algorithm) -> bool {
    !matches!(
        algorithm,
        Algorithm::HS256 | Algorithm::HS384 | Algorithm::HS512
    )
}
