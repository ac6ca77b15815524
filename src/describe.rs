//! Evidence description
//!
//! The verifier hands retrieved (and, when encrypted, opened) evidence
//! bytes to a [`Describer`] and forwards the returned text verbatim.
//! [`VisionDescriber`] is the default implementation: an OpenAI-compatible
//! chat completion with the evidence attached as an image.

use async_trait::async_trait;
use base64::{engine::general_purpose::STANDARD, Engine as _};
use reqwest::Client;
use serde::{Deserialize, Serialize};
use std::time::Duration;
use tracing::{debug, info};

use crate::config::DescriberConfig;
use crate::error::DescribeError;

const DESCRIBE_PROMPT: &str = "Describe this image in detail. What do you see? \
Include all relevant details about objects, people, settings, colors, and any text visible in the image.";

/// Turns evidence into human-readable text
#[async_trait]
pub trait Describer: Send + Sync {
    /// Describe raw evidence bytes
    async fn describe(&self, payload: &[u8]) -> Result<String, DescribeError>;
}

/// Image format for the data URL, sniffed from magic bytes. Defaults to png.
pub fn detect_image_format(payload: &[u8]) -> &'static str {
    if payload.starts_with(b"\x89PNG\r\n\x1a\n") {
        "png"
    } else if payload.starts_with(&[0xFF, 0xD8, 0xFF]) {
        "jpeg"
    } else if payload.starts_with(b"GIF87a") || payload.starts_with(b"GIF89a") {
        "gif"
    } else if payload.len() >= 12 && &payload[..4] == b"RIFF" && &payload[8..12] == b"WEBP" {
        "webp"
    } else {
        "png"
    }
}

/// Inline evidence as a `data:` URL
pub fn image_data_url(payload: &[u8]) -> String {
    format!(
        "data:image/{};base64,{}",
        detect_image_format(payload),
        STANDARD.encode(payload)
    )
}

#[derive(Debug, Serialize)]
struct ChatRequest<'a> {
    model: &'a str,
    messages: Vec<RequestMessage<'a>>,
    max_tokens: u32,
}

#[derive(Debug, Serialize)]
struct RequestMessage<'a> {
    role: &'a str,
    content: Vec<ContentPart<'a>>,
}

#[derive(Debug, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
enum ContentPart<'a> {
    ImageUrl { image_url: ImageUrl },
    Text { text: &'a str },
}

#[derive(Debug, Serialize)]
struct ImageUrl {
    url: String,
}

#[derive(Debug, Deserialize)]
struct ChatResponse {
    #[serde(default)]
    choices: Vec<Choice>,
}

#[derive(Debug, Deserialize)]
struct Choice {
    message: ResponseMessage,
}

#[derive(Debug, Deserialize)]
struct ResponseMessage {
    #[serde(default)]
    content: Option<String>,
}

/// Vision-model describer
pub struct VisionDescriber {
    client: Client,
    config: DescriberConfig,
}

impl VisionDescriber {
    pub fn new(config: DescriberConfig) -> Result<Self, DescribeError> {
        let client = Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()
            .map_err(|e| DescribeError::Request(e.to_string()))?;

        info!("Vision describer: model={}", config.model);
        Ok(Self { client, config })
    }

    async fn complete(&self, image_url: String) -> Result<String, DescribeError> {
        let request = ChatRequest {
            model: &self.config.model,
            messages: vec![RequestMessage {
                role: "user",
                content: vec![
                    ContentPart::ImageUrl {
                        image_url: ImageUrl { url: image_url },
                    },
                    ContentPart::Text {
                        text: DESCRIBE_PROMPT,
                    },
                ],
            }],
            max_tokens: self.config.max_tokens,
        };

        debug!("Calling vision model {}", self.config.model);

        let resp = self
            .client
            .post(format!(
                "{}/chat/completions",
                self.config.api_base.trim_end_matches('/')
            ))
            .bearer_auth(&self.config.api_key)
            .json(&request)
            .send()
            .await
            .map_err(|e| DescribeError::Request(e.to_string()))?;

        let status = resp.status();
        if !status.is_success() {
            let body = resp.text().await.unwrap_or_default();
            return Err(DescribeError::Status {
                status: status.as_u16(),
                body,
            });
        }

        let chat: ChatResponse = resp
            .json()
            .await
            .map_err(|e| DescribeError::Request(format!("Failed to parse response: {}", e)))?;

        chat.choices
            .into_iter()
            .next()
            .and_then(|c| c.message.content)
            .filter(|c| !c.trim().is_empty())
            .ok_or(DescribeError::EmptyResponse)
    }
}

#[async_trait]
impl Describer for VisionDescriber {
    async fn describe(&self, payload: &[u8]) -> Result<String, DescribeError> {
        self.complete(image_data_url(payload)).await
    }
}
