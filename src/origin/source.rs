// src/origin/source.rs
//! Data source seam: fetching and decoding entities for a tile

use super::entity::RawEntity;
use crate::error::{MetaError, Result};
use serde_json::Value;
use std::future::Future;
use std::time::Duration;
use tracing::{debug, trace, warn};

/// Default User-Agent string for entity requests.
pub const DEFAULT_USER_AGENT: &str = concat!("geometa/", env!("CARGO_PKG_VERSION"));

/// Default request timeout in seconds.
pub const DEFAULT_TIMEOUT_SECS: u64 = 10;

/// Asynchronous HTTP GET.
///
/// Allows the cache to run against a mock in tests.
pub trait AsyncHttpClient: Send + Sync {
    /// Fetch `url` and return the response body.
    ///
    /// Non-success statuses are errors.
    fn get(&self, url: &str) -> impl Future<Output = Result<Vec<u8>>> + Send;
}

/// HTTP client backed by reqwest.
#[derive(Clone)]
pub struct ReqwestClient {
    client: reqwest::Client,
}

impl ReqwestClient {
    pub fn new() -> Result<Self> {
        Self::with_options(DEFAULT_TIMEOUT_SECS, DEFAULT_USER_AGENT)
    }

    pub fn with_options(timeout_secs: u64, user_agent: &str) -> Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(timeout_secs))
            .user_agent(user_agent)
            .build()
            .map_err(|e| MetaError::Http(format!("Failed to create HTTP client: {}", e)))?;

        Ok(Self { client })
    }
}

impl AsyncHttpClient for ReqwestClient {
    async fn get(&self, url: &str) -> Result<Vec<u8>> {
        trace!(url = url, "HTTP GET request starting");

        let response = self.client.get(url).send().await.map_err(|e| {
            warn!(
                url = url,
                error = %e,
                is_connect = e.is_connect(),
                is_timeout = e.is_timeout(),
                "HTTP request failed"
            );
            MetaError::Http(format!("Request failed: {}", e))
        })?;

        if !response.status().is_success() {
            warn!(url = url, status = response.status().as_u16(), "HTTP error status");
            return Err(MetaError::Http(format!("HTTP {} from {}", response.status(), url)));
        }

        let bytes = response
            .bytes()
            .await
            .map_err(|e| MetaError::Http(format!("Failed to read response: {}", e)))?;
        debug!(url = url, bytes = bytes.len(), "HTTP response received");

        Ok(bytes.to_vec())
    }
}

/// Decode a source response body.
///
/// The body must be a JSON array. Elements that cannot become a
/// [`RawEntity`] are returned separately so the rest of the batch survives.
pub fn decode_entities(body: &[u8]) -> Result<(Vec<RawEntity>, Vec<MetaError>)> {
    let value: Value = serde_json::from_slice(body)?;
    entities_from_value(value)
}

/// Split an already parsed response into entities and rejected elements.
pub fn entities_from_value(value: Value) -> Result<(Vec<RawEntity>, Vec<MetaError>)> {
    let Value::Array(items) = value else {
        return Err(MetaError::Other("response is not a JSON array".to_string()));
    };

    let mut entities = Vec::with_capacity(items.len());
    let mut rejected = Vec::new();
    for item in items {
        match RawEntity::from_value(item) {
            Ok(entity) => entities.push(entity),
            Err(e) => rejected.push(e),
        }
    }

    Ok((entities, rejected))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_decode_entities() {
        let body = br#"[
            {"id": "1", "geometry": "POINT(1 1)", "name": "A"},
            {"id": "2"},
            {"id": 3, "geometry": "POINT(2 2)"}
        ]"#;

        let (entities, rejected) = decode_entities(body).unwrap();
        assert_eq!(entities.len(), 2);
        assert_eq!(entities[1].id, "3");
        assert_eq!(rejected.len(), 1);
    }

    #[test]
    fn test_decode_rejects_non_array() {
        assert!(decode_entities(br#"{"id": "1"}"#).is_err());
        assert!(decode_entities(b"not json").is_err());
    }

    #[test]
    fn test_entities_from_value() {
        let (entities, rejected) =
            entities_from_value(serde_json::json!([{"id": "a", "geometry": "POINT(0 0)"}, 5])).unwrap();
        assert_eq!(entities[0].id, "a");
        assert_eq!(rejected.len(), 1);

        assert!(entities_from_value(serde_json::json!({"items": []})).is_err());
    }

    #[test]
    fn test_decode_empty_array() {
        let (entities, rejected) = decode_entities(b"[]").unwrap();
        assert!(entities.is_empty());
        assert!(rejected.is_empty());
    }

    #[test]
    fn test_client_builds() {
        assert!(ReqwestClient::with_options(5, "geometa-test").is_ok());
    }
}
