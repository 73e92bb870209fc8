//! Key-set transport used by the key provider.
use std::time::Duration;

use async_trait::async_trait;
use url::Url;

use super::KeyProviderError;

/// Fetches the raw JWKS document.
///
/// Implementations must be cheap to share (`Send + Sync`, typically `Arc` inside).
#[async_trait]
pub trait JwksFetcher: Send + Sync + 'static {
    // Returns the transport name (for logging).
    fn source(&self) -> &str;

    async fn fetch(&self) -> Result<Vec<u8>, KeyProviderError>;
}

/// HTTP fetcher for the issuer's well-known JWKS endpoint.
#[derive(Clone, Debug)]
pub struct HttpJwksFetcher {
    client: reqwest::Client,
    uri: Url,
}

impl HttpJwksFetcher {
    pub fn new(uri: Url, timeout: Duration) -> Result<Self, KeyProviderError> {
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| KeyProviderError::Fetch(format!("failed to build http client: {}", e)))?;

        Ok(Self { client, uri })
    }
}

#[async_trait]
impl JwksFetcher for HttpJwksFetcher {
    fn source(&self) -> &str {
        self.uri.as_str()
    }

    async fn fetch(&self) -> Result<Vec<u8>, KeyProviderError> {
        let response = self
            .client
            .get(self.uri.clone())
            .header(reqwest::header::ACCEPT, "application/json")
            .send()
            .await
            .map_err(|e| KeyProviderError::Fetch(e.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            return Err(KeyProviderError::Fetch(format!(
                "key set endpoint returned {}",
                status
            )));
        }

        let body = response
            .bytes()
            .await
            .map_err(|e| KeyProviderError::Fetch(e.to_string()))?;

        Ok(body.to_vec())
    }
}

#[cfg(test)]
mod tests {
    use serde_json::json;
    use wiremock::matchers::{method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    use super::*;
    use crate::services::jwks::parse_key_set;
    use crate::test_support::TestKey;

    fn fetcher_for(server: &MockServer) -> HttpJwksFetcher {
        let uri = Url::parse(&format!("{}/.well-known/jwks.json", server.uri())).unwrap();
        HttpJwksFetcher::new(uri, Duration::from_secs(2)).unwrap()
    }

    #[tokio::test]
    async fn fetches_key_set_document() {
        let server = MockServer::start().await;
        let key = TestKey::new("kid-1", 7);
        Mock::given(method("GET"))
            .and(path("/.well-known/jwks.json"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({ "keys": [key.jwk()] })))
            .expect(1)
            .mount(&server)
            .await;

        let body = fetcher_for(&server).fetch().await.unwrap();
        let keys = parse_key_set(&body).unwrap();

        assert!(keys.contains_key("kid-1"));
    }

    #[tokio::test]
    async fn non_success_status_is_a_fetch_error() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(503))
            .mount(&server)
            .await;

        let err = fetcher_for(&server).fetch().await.unwrap_err();
        assert!(matches!(err, KeyProviderError::Fetch(_)));
    }
}
