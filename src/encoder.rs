//! Converts an image source into a base64 payload plus MIME type.

use base64::engine::general_purpose::STANDARD;
use base64::Engine;
use reqwest::Client;
use std::future::Future;
use std::sync::Arc;
use std::time::Duration;
use tracing::debug;

use crate::error::{AltTextError, Result};
use crate::mime::{self, DEFAULT_IMAGE_MIME};
use crate::types::{EncodedImage, ImageSource};

/// Raw bytes of a remote image and its declared content type.
#[derive(Debug, Clone)]
pub struct FetchedImage {
    pub content_type: Option<String>,
    pub bytes: Vec<u8>,
}

/// Retrieves remote images.
///
/// Implementations must report non-success responses and transport failures
/// as [`AltTextError::FetchFailed`].
pub trait ImageFetcher: Send + Sync + 'static {
    fn fetch(&self, url: &str) -> impl Future<Output = Result<FetchedImage>> + Send;
}

impl<T: ImageFetcher> ImageFetcher for Arc<T> {
    fn fetch(&self, url: &str) -> impl Future<Output = Result<FetchedImage>> + Send {
        (**self).fetch(url)
    }
}

/// Plain unauthenticated GET over reqwest.
#[derive(Debug, Clone)]
pub struct HttpFetcher {
    client: Client,
    timeout: Duration,
}

impl HttpFetcher {
    pub fn new(client: Client, timeout: Duration) -> Self {
        Self { client, timeout }
    }
}

impl ImageFetcher for HttpFetcher {
    async fn fetch(&self, url: &str) -> Result<FetchedImage> {
        let failed = |reason: String| AltTextError::FetchFailed {
            url: url.to_string(),
            reason,
        };

        let resp = self
            .client
            .get(url)
            .timeout(self.timeout)
            .send()
            .await
            .map_err(|e| failed(e.to_string()))?;

        if !resp.status().is_success() {
            return Err(failed(format!("HTTP {}", resp.status())));
        }

        let content_type = resp
            .headers()
            .get(reqwest::header::CONTENT_TYPE)
            .and_then(|v| v.to_str().ok())
            .map(str::to_string);

        let bytes = resp.bytes().await.map_err(|e| failed(e.to_string()))?;

        Ok(FetchedImage {
            content_type,
            bytes: bytes.to_vec(),
        })
    }
}

/// Encode an image for transmission.
///
/// Uploads are encoded from their owned bytes using `mime_type` captured at
/// intake. Remote images are fetched first; their MIME type comes from the
/// response, falling back to [`DEFAULT_IMAGE_MIME`].
pub async fn encode<F: ImageFetcher>(
    fetcher: &F,
    source: &ImageSource,
    mime_type: Option<&str>,
) -> Result<EncodedImage> {
    match source {
        ImageSource::Local { file_name, bytes } => {
            debug!(file = %file_name, len = bytes.len(), "encoding upload");
            Ok(EncodedImage {
                data: STANDARD.encode(bytes),
                mime_type: mime_type.unwrap_or(DEFAULT_IMAGE_MIME).to_string(),
            })
        }
        ImageSource::Remote { url } => {
            debug!(%url, "fetching remote image");
            let fetched = fetcher.fetch(url).await?;
            let mime_type = fetched
                .content_type
                .as_deref()
                .and_then(mime::essence)
                .unwrap_or_else(|| DEFAULT_IMAGE_MIME.to_string());

            Ok(EncodedImage {
                data: STANDARD.encode(&fetched.bytes),
                mime_type,
            })
        }
    }
}
