//! Fetching background image bytes.

use async_trait::async_trait;
use url::Url;

use crate::config::DocumentConfig;
use crate::error::ImageError;
use crate::image::data_uri_bytes;

/// Source of encoded image bytes for remote backgrounds.
#[async_trait]
pub trait ImageFetcher: Send + Sync {
    /// Fetch the encoded bytes behind `url`.
    ///
    /// # Errors
    ///
    /// Returns an error if the bytes cannot be retrieved.
    async fn fetch(&self, url: &Url) -> Result<Vec<u8>, ImageError>;
}

/// Fetches images over HTTP(S), and also reads `data:` and `file:` URLs.
#[derive(Debug, Clone)]
pub struct HttpFetcher {
    http: reqwest::Client,
}

impl HttpFetcher {
    /// Build a fetcher using the timeout and user agent from `config`.
    ///
    /// # Errors
    ///
    /// Returns an error if the HTTP client cannot be constructed.
    pub fn new(config: &DocumentConfig) -> Result<Self, ImageError> {
        let http = reqwest::Client::builder()
            .user_agent(config.user_agent.as_str())
            .timeout(config.fetch_timeout)
            .build()?;
        Ok(Self { http })
    }
}

#[async_trait]
impl ImageFetcher for HttpFetcher {
    async fn fetch(&self, url: &Url) -> Result<Vec<u8>, ImageError> {
        match url.scheme() {
            "http" | "https" => {
                let response = self.http.get(url.clone()).send().await?;
                let status = response.status();
                if !status.is_success() {
                    return Err(ImageError::Status(status.as_u16()));
                }
                let body = response.bytes().await?;
                tracing::debug!(%url, bytes = body.len(), "Fetched background image");
                Ok(body.to_vec())
            }
            "data" => data_uri_bytes(url.as_str()),
            "file" => {
                let path = url
                    .to_file_path()
                    .map_err(|()| ImageError::Fetch(format!("not a local path: {url}")))?;
                tokio::fs::read(&path)
                    .await
                    .map_err(|e| ImageError::Fetch(format!("{}: {e}", path.display())))
            }
            other => Err(ImageError::UnsupportedScheme(other.to_string())),
        }
    }
}
