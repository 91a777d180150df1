//! Track outline sources.

use std::future::Future;
use std::time::Duration;

use super::error::GeometryError;

/// Default timeout for a single outline download.
pub const DEFAULT_FETCH_TIMEOUT: Duration = Duration::from_secs(15);

/// Something that can fetch a track outline document by URL.
///
/// Abstracted so the projector can be tested without network access.
pub trait GeometrySource: Send + Sync {
    /// Fetch the raw document at `url`.
    fn fetch(&self, url: &str) -> impl Future<Output = Result<Vec<u8>, GeometryError>> + Send;
}

/// Fetches outlines over HTTP with reqwest.
#[derive(Debug, Clone)]
pub struct HttpGeometrySource {
    client: reqwest::Client,
}

impl HttpGeometrySource {
    /// Create a source with the default timeout.
    pub fn new() -> Result<Self, GeometryError> {
        Self::with_timeout(DEFAULT_FETCH_TIMEOUT)
    }

    /// Create a source with a custom timeout.
    pub fn with_timeout(timeout: Duration) -> Result<Self, GeometryError> {
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .user_agent(concat!("trackside/", env!("CARGO_PKG_VERSION")))
            .build()
            .map_err(|e| GeometryError::Fetch(format!("Failed to create HTTP client: {}", e)))?;

        Ok(Self { client })
    }
}

#[allow(clippy::manual_async_fn)]
impl GeometrySource for HttpGeometrySource {
    fn fetch(&self, url: &str) -> impl Future<Output = Result<Vec<u8>, GeometryError>> + Send {
        let request = self.client.get(url);
        let url = url.to_string();
        async move {
            let response = request
                .send()
                .await
                .map_err(|e| GeometryError::Fetch(format!("Request failed: {}", e)))?;

            if !response.status().is_success() {
                return Err(GeometryError::Fetch(format!(
                    "HTTP {} from {}",
                    response.status(),
                    url
                )));
            }

            response
                .bytes()
                .await
                .map(|b| b.to_vec())
                .map_err(|e| GeometryError::Fetch(format!("Failed to read response: {}", e)))
        }
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use std::collections::HashMap;

    use parking_lot::Mutex;

    /// In-memory source keyed by URL, with an optional delay per URL.
    #[derive(Default)]
    pub struct MockGeometrySource {
        pub responses: Mutex<HashMap<String, Result<Vec<u8>, GeometryError>>>,
        pub delays: Mutex<HashMap<String, Duration>>,
        pub requests: Mutex<Vec<String>>,
    }

    impl MockGeometrySource {
        pub fn with(self, url: &str, response: Result<Vec<u8>, GeometryError>) -> Self {
            self.responses.lock().insert(url.to_string(), response);
            self
        }

        pub fn delayed(self, url: &str, delay: Duration) -> Self {
            self.delays.lock().insert(url.to_string(), delay);
            self
        }
    }

    #[allow(clippy::manual_async_fn)]
    impl GeometrySource for MockGeometrySource {
        fn fetch(&self, url: &str) -> impl Future<Output = Result<Vec<u8>, GeometryError>> + Send {
            self.requests.lock().push(url.to_string());
            let delay = self.delays.lock().get(url).copied();
            let response = self
                .responses
                .lock()
                .get(url)
                .cloned()
                .unwrap_or_else(|| Err(GeometryError::Fetch(format!("HTTP 404 from {url}"))));
            async move {
                if let Some(delay) = delay {
                    tokio::time::sleep(delay).await;
                }
                response
            }
        }
    }

    #[tokio::test]
    async fn test_mock_source_success_and_missing() {
        let mock = MockGeometrySource::default().with("http://x/a.geojson", Ok(b"{}".to_vec()));

        assert_eq!(mock.fetch("http://x/a.geojson").await, Ok(b"{}".to_vec()));
        assert!(matches!(
            mock.fetch("http://x/b.geojson").await,
            Err(GeometryError::Fetch(_))
        ));
        assert_eq!(mock.requests.lock().len(), 2);
    }

    #[test]
    fn test_http_source_builds() {
        assert!(HttpGeometrySource::with_timeout(Duration::from_secs(1)).is_ok());
    }

    #[tokio::test]
    async fn test_http_source_unreachable_is_fetch_error() {
        let source = HttpGeometrySource::with_timeout(Duration::from_secs(2)).unwrap();
        let result = source.fetch("http://127.0.0.1:9/track.geojson").await;
        assert!(matches!(result, Err(GeometryError::Fetch(_))));
    }
}
