//! HTTP image source backed by reqwest.

use async_trait::async_trait;
use reqwest::Client;
use std::time::Duration;
use tracing::debug;

use crate::config::FetcherConfig;
use crate::metrics::IMAGES_FETCHED;

use super::{FetchError, ImageBytes, ImageSource};

/// Downloads images over HTTP(S).
#[derive(Debug, Clone)]
pub struct HttpImageSource {
    client: Client,
}

impl HttpImageSource {
    /// Create a new source with the timeout and user agent from `config`.
    pub fn new(config: &FetcherConfig) -> Result<Self, FetchError> {
        let client = Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .user_agent(config.user_agent.clone())
            .build()
            .map_err(|e| FetchError::Internal(format!("Failed to create HTTP client: {}", e)))?;

        Ok(Self { client })
    }
}

#[async_trait]
impl ImageSource for HttpImageSource {
    fn name(&self) -> &str {
        "http"
    }

    async fn fetch(&self, url: &str) -> Result<ImageBytes, FetchError> {
        debug!(url = url, "Downloading image");

        let response = self
            .client
            .get(url)
            .send()
            .await
            .map_err(|e| FetchError::from_reqwest(url, e))?;

        let status = response.status();
        if !status.is_success() {
            return Err(FetchError::Status {
                url: url.to_string(),
                status: status.as_u16(),
            });
        }

        let body = response
            .bytes()
            .await
            .map_err(|e| FetchError::from_reqwest(url, e))?;

        IMAGES_FETCHED.with_label_values(&["network"]).inc();
        debug!(url = url, bytes = body.len(), "Image downloaded");

        Ok(ImageBytes::from(body.as_ref()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tokio::io::{AsyncReadExt, AsyncWriteExt};
    use tokio::net::TcpListener;

    /// Serves a single canned HTTP response and returns its URL.
    async fn serve_once(status_line: &'static str, body: &'static [u8]) -> String {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();

        tokio::spawn(async move {
            let (mut socket, _) = listener.accept().await.unwrap();
            let mut buf = [0u8; 1024];
            let _ = socket.read(&mut buf).await;
            let head = format!(
                "HTTP/1.1 {}\r\nContent-Length: {}\r\nConnection: close\r\n\r\n",
                status_line,
                body.len()
            );
            socket.write_all(head.as_bytes()).await.unwrap();
            socket.write_all(body).await.unwrap();
            socket.shutdown().await.unwrap();
        });

        format!("http://{}/card.png", addr)
    }

    #[tokio::test]
    async fn test_fetch_success_returns_body() {
        let url = serve_once("200 OK", b"\x89PNG-bytes").await;
        let source = HttpImageSource::new(&FetcherConfig::default()).unwrap();

        let bytes = source.fetch(&url).await.unwrap();
        assert_eq!(&*bytes, b"\x89PNG-bytes");
    }

    #[tokio::test]
    async fn test_fetch_non_success_status_fails() {
        let url = serve_once("404 Not Found", b"missing").await;
        let source = HttpImageSource::new(&FetcherConfig::default()).unwrap();

        let err = source.fetch(&url).await.unwrap_err();
        assert!(matches!(err, FetchError::Status { status: 404, .. }));
        assert!(err.to_string().contains("HTTP 404"));
    }

    #[tokio::test]
    async fn test_fetch_connection_refused_fails() {
        // Bind then drop to get a port nothing listens on.
        let port = {
            let listener = std::net::TcpListener::bind("127.0.0.1:0").unwrap();
            listener.local_addr().unwrap().port()
        };
        let source = HttpImageSource::new(&FetcherConfig::default()).unwrap();

        let result = source
            .fetch(&format!("http://127.0.0.1:{}/card.png", port))
            .await;
        assert!(matches!(result, Err(FetchError::Request { .. })));
    }
}
