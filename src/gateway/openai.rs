//! OpenAI-compatible chat completions client.

use std::time::Duration;

use base64::Engine as _;
use base64::engine::general_purpose::STANDARD;
use serde::{Deserialize, Serialize};

use super::{CompletionGateway, cap_images, clean_reply};
use crate::config::GatewayConfig;
use crate::display_width::preview;
use crate::error::ProviderError;

pub struct OpenAiGateway {
    api_key: Option<String>,
    endpoint: String,
    model: String,
    vision_model: String,
    temperature: f32,
    client: reqwest::blocking::Client,
}

impl OpenAiGateway {
    pub const DEFAULT_INSTRUCTIONS: &'static str = "You are a helpful grappling coach.";

    /// Vision replies are capped; text replies use the service default.
    const VISION_MAX_TOKENS: u32 = 1000;

    pub fn new(config: &GatewayConfig) -> Self {
        Self {
            api_key: config.api_key.clone(),
            endpoint: config.endpoint.clone(),
            model: config.model.clone(),
            vision_model: config.vision_model.clone(),
            temperature: config.temperature,
            client: build_http_client(config),
        }
    }

    pub fn with_api_key(mut self, key: impl Into<String>) -> Self {
        self.api_key = Some(key.into());
        self
    }

    pub fn with_endpoint(mut self, endpoint: impl Into<String>) -> Self {
        let endpoint: String = endpoint.into();
        self.endpoint = endpoint.trim_end_matches('/').to_string();
        self
    }

    pub fn with_model(mut self, model: impl Into<String>) -> Self {
        self.model = model.into();
        self
    }

    fn request(&self, request: &ChatCompletionRequest) -> Result<String, ProviderError> {
        let api_key = self.api_key.as_ref().ok_or(ProviderError::MissingApiKey)?;

        tracing::info!(model = %request.model, endpoint = %self.endpoint, "sending completion request");
        let response = self
            .client
            .post(format!("{}/chat/completions", self.endpoint))
            .bearer_auth(api_key)
            .json(request)
            .send()
            .map_err(|e| ProviderError::Transport(e.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().unwrap_or_default();
            return Err(ProviderError::Status {
                status: status.as_u16(),
                body: preview(&body),
            });
        }

        let response: ChatCompletionResponse = response
            .json()
            .map_err(|e| ProviderError::MalformedResponse(e.to_string()))?;
        let content = response
            .choices
            .into_iter()
            .next()
            .and_then(|choice| choice.message.content)
            .ok_or_else(|| ProviderError::MalformedResponse("no choices in response".into()))?;

        tracing::debug!(reply = %preview(&content), "completion reply received");
        Ok(clean_reply(&content))
    }
}

impl CompletionGateway for OpenAiGateway {
    fn name(&self) -> &'static str {
        "openai"
    }

    fn complete_text(&self, prompt: &str, instructions: Option<&str>) -> Result<String, ProviderError> {
        let request = ChatCompletionRequest {
            model: self.model.clone(),
            messages: vec![
                ChatMessage::text("system", instructions.unwrap_or(Self::DEFAULT_INSTRUCTIONS)),
                ChatMessage::text("user", prompt),
            ],
            temperature: Some(self.temperature),
            max_tokens: None,
        };
        self.request(&request)
    }

    fn complete_vision(&self, prompt: &str, images: &[Vec<u8>]) -> Result<String, ProviderError> {
        let mut parts = vec![ContentPart::Text {
            text: prompt.to_string(),
        }];
        parts.extend(cap_images(images).iter().map(|bytes| ContentPart::ImageUrl {
            image_url: ImageUrl {
                url: image_data_url(bytes),
            },
        }));
        let request = ChatCompletionRequest {
            model: self.vision_model.clone(),
            messages: vec![ChatMessage {
                role: "user",
                content: MessageContent::Parts(parts),
            }],
            temperature: None,
            max_tokens: Some(Self::VISION_MAX_TOKENS),
        };
        self.request(&request)
    }
}

fn build_http_client(config: &GatewayConfig) -> reqwest::blocking::Client {
    let mut builder = reqwest::blocking::Client::builder();
    if config.timeout_ms > 0 {
        builder = builder.timeout(Duration::from_millis(config.timeout_ms));
    }
    if config.connect_timeout_ms > 0 {
        builder = builder.connect_timeout(Duration::from_millis(config.connect_timeout_ms));
    }
    builder.build().unwrap_or_else(|err| {
        tracing::warn!("failed to build completion HTTP client: {err}");
        reqwest::blocking::Client::new()
    })
}

/// Inline `data:` URL for an image, typed by its magic bytes.
fn image_data_url(bytes: &[u8]) -> String {
    let mime = if bytes.starts_with(b"\x89PNG") {
        "image/png"
    } else if bytes.starts_with(b"GIF8") {
        "image/gif"
    } else {
        "image/jpeg"
    };
    format!("data:{mime};base64,{}", STANDARD.encode(bytes))
}

#[derive(Debug, Serialize)]
struct ChatCompletionRequest {
    model: String,
    messages: Vec<ChatMessage>,
    #[serde(skip_serializing_if = "Option::is_none")]
    temperature: Option<f32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    max_tokens: Option<u32>,
}

#[derive(Debug, Serialize)]
struct ChatMessage {
    role: &'static str,
    content: MessageContent,
}

impl ChatMessage {
    fn text(role: &'static str, content: &str) -> Self {
        Self {
            role,
            content: MessageContent::Text(content.to_string()),
        }
    }
}

#[derive(Debug, Serialize)]
#[serde(untagged)]
enum MessageContent {
    Text(String),
    Parts(Vec<ContentPart>),
}

#[derive(Debug, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
enum ContentPart {
    Text { text: String },
    ImageUrl { image_url: ImageUrl },
}

#[derive(Debug, Serialize)]
struct ImageUrl {
    url: String,
}

#[derive(Debug, Deserialize)]
struct ChatCompletionResponse {
    choices: Vec<Choice>,
}

#[derive(Debug, Deserialize)]
struct Choice {
    message: ResponseMessage,
}

#[derive(Debug, Deserialize)]
struct ResponseMessage {
    content: Option<String>,
}
