use reqwest::Client;
use serde::{Deserialize, Serialize};
use std::future::Future;
use std::sync::Arc;
use tracing::debug;

use crate::config::AltTextConfig;
use crate::error::{AltTextError, Result};
use crate::types::EncodedImage;

/// Instruction sent with every image unless the config overrides it.
pub const ALT_TEXT_PROMPT: &str = r#"Write alt text for this image for a screen reader user. Keep it concise, ideally under 125 characters. Describe the main subject and what it is doing first, then only the context needed to understand it. Prefer accuracy and brevity over completeness. Do not start with "Image of" or "Picture of". Return only the alt text."#;

/// Produces alt text for an encoded image.
pub trait Captioner: Send + Sync + 'static {
    fn caption(&self, image: &EncodedImage) -> impl Future<Output = Result<String>> + Send;
}

impl<T: Captioner> Captioner for Arc<T> {
    fn caption(&self, image: &EncodedImage) -> impl Future<Output = Result<String>> + Send {
        (**self).caption(image)
    }
}

#[derive(Debug, Serialize)]
struct GenerateRequest<'a> {
    contents: [RequestContent<'a>; 1],
}

#[derive(Debug, Serialize)]
struct RequestContent<'a> {
    role: &'static str,
    parts: [RequestPart<'a>; 2],
}

#[derive(Debug, Serialize)]
#[serde(untagged)]
enum RequestPart<'a> {
    Text { text: &'a str },
    InlineData { inline_data: InlineData<'a> },
}

#[derive(Debug, Serialize)]
struct InlineData<'a> {
    mime_type: &'a str,
    data: &'a str,
}

#[derive(Debug, Default, Deserialize)]
struct GenerateResponse {
    #[serde(default)]
    candidates: Vec<Candidate>,
    error: Option<ErrorBody>,
}

#[derive(Debug, Deserialize)]
struct Candidate {
    content: Option<CandidateContent>,
}

#[derive(Debug, Deserialize)]
struct CandidateContent {
    #[serde(default)]
    parts: Vec<ResponsePart>,
}

#[derive(Debug, Deserialize)]
struct ResponsePart {
    text: Option<String>,
}

#[derive(Debug, Deserialize)]
struct ErrorEnvelope {
    error: ErrorBody,
}

#[derive(Debug, Deserialize)]
struct ErrorBody {
    message: String,
}

fn build_request<'a>(prompt: &'a str, image: &'a EncodedImage) -> GenerateRequest<'a> {
    GenerateRequest {
        contents: [RequestContent {
            role: "user",
            parts: [
                RequestPart::Text { text: prompt },
                RequestPart::InlineData {
                    inline_data: InlineData {
                        mime_type: &image.mime_type,
                        data: &image.data,
                    },
                },
            ],
        }],
    }
}

/// Alt text from a success-status reply. An `error` object in the body
/// still counts as an API error.
fn reply_text(status: u16, response: GenerateResponse) -> Result<String> {
    if let Some(error) = response.error {
        return Err(AltTextError::ApiError {
            status,
            message: error.message,
        });
    }
    first_text(response)
}

/// First text segment of the first candidate, returned verbatim.
fn first_text(response: GenerateResponse) -> Result<String> {
    response
        .candidates
        .into_iter()
        .next()
        .and_then(|c| c.content)
        .and_then(|content| content.parts.into_iter().find_map(|p| p.text))
        .filter(|text| !text.is_empty())
        .ok_or(AltTextError::EmptyCompletion)
}

/// Server-provided error message when the body carries one, else the raw body.
fn error_message(status: reqwest::StatusCode, body: &str) -> String {
    if let Ok(envelope) = serde_json::from_str::<ErrorEnvelope>(body) {
        return envelope.error.message;
    }
    let body = body.trim();
    if body.is_empty() {
        status.canonical_reason().unwrap_or("no response body").to_string()
    } else {
        body.to_string()
    }
}

/// Captioning over the `generateContent` REST endpoint.
#[derive(Debug, Clone)]
pub struct GeminiCaptioner {
    client: Client,
    config: AltTextConfig,
}

impl GeminiCaptioner {
    pub fn new(client: Client, config: AltTextConfig) -> Result<Self> {
        config.validate()?;
        Ok(Self { client, config })
    }

    pub fn config(&self) -> &AltTextConfig {
        &self.config
    }

    fn url(&self) -> String {
        format!(
            "{}/v1beta/models/{}:generateContent",
            self.config.endpoint.trim_end_matches('/'),
            self.config.model
        )
    }

    fn prompt(&self) -> &str {
        self.config.prompt.as_deref().unwrap_or(ALT_TEXT_PROMPT)
    }
}

impl Captioner for GeminiCaptioner {
    async fn caption(&self, image: &EncodedImage) -> Result<String> {
        let body = build_request(self.prompt(), image);

        debug!(model = %self.config.model, mime = %image.mime_type, "requesting alt text");
        let resp = self
            .client
            .post(self.url())
            .header("x-goog-api-key", &self.config.api_key)
            .timeout(self.config.timeout)
            .json(&body)
            .send()
            .await
            .map_err(|e| AltTextError::Connection {
                endpoint: self.config.endpoint.clone(),
                reason: e.to_string(),
            })?;

        let status = resp.status();
        if !status.is_success() {
            let text = resp.text().await.unwrap_or_default();
            return Err(AltTextError::ApiError {
                status: status.as_u16(),
                message: error_message(status, &text),
            });
        }

        let response: GenerateResponse = resp
            .json()
            .await
            .map_err(|e| AltTextError::InvalidResponse(e.to_string()))?;

        reply_text(status.as_u16(), response)
    }
}
