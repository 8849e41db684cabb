//! Transport seam for route metadata and shared data.

use async_trait::async_trait;
use serde_json::Value;

/// Error type for fetch operations.
///
/// `Clone` so a single settled request can be handed to every waiter that
/// joined it.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum FetchError {
    #[error("HTTP error: {status} for {url}")]
    Http { status: u16, url: String },

    #[error("Timeout: {0}")]
    Timeout(String),

    #[error("Connection error: {0}")]
    Connection(String),

    #[error("Deserialization error: {0}")]
    Deserialization(String),

    #[error("Request error: {0}")]
    Request(String),
}

impl FetchError {
    /// HTTP status, when the server answered.
    pub fn status(&self) -> Option<u16> {
        match self {
            Self::Http { status, .. } => Some(*status),
            _ => None,
        }
    }
}

/// Read-only JSON transport.
///
/// Implementations issue one `GET` per call and decode the body as JSON.
/// Any status of 400 or above must surface as [`FetchError::Http`].
#[async_trait]
pub trait Transport: Send + Sync {
    /// Fetch and decode a JSON document.
    async fn get_json(&self, url: &str) -> Result<Value, FetchError>;
}

#[cfg(feature = "reqwest")]
pub use self::http::ReqwestTransport;

#[cfg(feature = "reqwest")]
mod http {
    use super::*;

    /// [`Transport`] backed by a `reqwest` client.
    ///
    /// Relative URLs are resolved against the configured base URL.
    #[derive(Debug, Clone)]
    pub struct ReqwestTransport {
        client: reqwest::Client,
        base_url: Option<String>,
    }

    impl Default for ReqwestTransport {
        fn default() -> Self {
            Self::new()
        }
    }

    impl ReqwestTransport {
        /// Create a transport with a default client.
        pub fn new() -> Self {
            Self {
                client: reqwest::Client::new(),
                base_url: None,
            }
        }

        /// Use an existing client.
        pub fn with_client(mut self, client: reqwest::Client) -> Self {
            self.client = client;
            self
        }

        /// Set a base URL that will be prepended to relative requests.
        pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
            self.base_url = Some(base_url.into());
            self
        }

        fn resolve(&self, url: &str) -> String {
            match &self.base_url {
                Some(base) if !url.starts_with("http://") && !url.starts_with("https://") => {
                    format!(
                        "{}/{}",
                        base.trim_end_matches('/'),
                        url.trim_start_matches('/')
                    )
                }
                _ => url.to_string(),
            }
        }
    }

    #[async_trait]
    impl Transport for ReqwestTransport {
        async fn get_json(&self, url: &str) -> Result<Value, FetchError> {
            let url = self.resolve(url);

            let response = self.client.get(&url).send().await.map_err(|e| {
                if e.is_timeout() {
                    FetchError::Timeout(e.to_string())
                } else if e.is_connect() {
                    FetchError::Connection(e.to_string())
                } else {
                    FetchError::Request(e.to_string())
                }
            })?;

            let status = response.status().as_u16();
            if status >= 400 {
                return Err(FetchError::Http { status, url });
            }

            response
                .json::<Value>()
                .await
                .map_err(|e| FetchError::Deserialization(e.to_string()))
        }
    }

}

#[cfg(test)]
mod tests {
    use super::*;

    struct Fixed(Value);

    #[async_trait]
    impl Transport for Fixed {
        async fn get_json(&self, _url: &str) -> Result<Value, FetchError> {
            Ok(self.0.clone())
        }
    }

    #[test]
    fn test_status_accessor() {
        let err = FetchError::Http {
            status: 404,
            url: "/ghost/routeInfo.json".to_string(),
        };
        assert_eq!(err.status(), Some(404));
        assert_eq!(FetchError::Timeout("slow".into()).status(), None);
    }

    #[tokio::test]
    async fn test_transport_object_safety() {
        let transport: Box<dyn Transport> = Box::new(Fixed(serde_json::json!({ "port": 9000 })));
        let value = transport.get_json("/__react-static__/getMessagePort").await.unwrap();
        assert_eq!(value["port"], 9000);
    }
}
