use async_trait::async_trait;
use log::{ debug, warn };
use reqwest::Client as HttpClient;
use serde::{ Deserialize, Serialize };

use super::{ error_for_status, http_stream_generate, ChatClient, SseAction, TextStream };
use crate::error::GenerationError;
use crate::llm::{ LlmConfig, LlmType };
use crate::models::chat::{ ChatMessage, ChatRequest };

const DEFAULT_BASE_URL: &str = "https://api.anthropic.com";
const ANTHROPIC_VERSION: &str = "2023-06-01";

pub const DEFAULT_MODEL: &str = "claude-sonnet-4-5-20250929";

pub struct AnthropicChatClient {
    http: HttpClient,
    api_key: Option<String>,
    model: String,
    base_url: String,
}

#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
pub struct AnthropicMessage {
    pub role: String,
    pub content: String,
}

#[derive(Debug, Serialize)]
struct MessagesRequest<'a> {
    model: &'a str,
    max_tokens: u32,
    system: &'a str,
    messages: Vec<AnthropicMessage>,
    #[serde(skip_serializing_if = "Option::is_none")]
    stream: Option<bool>,
}

#[derive(Debug, Deserialize)]
struct MessagesResponse {
    content: Vec<ContentBlock>,
}

#[derive(Debug, Deserialize)]
struct ContentBlock {
    #[serde(rename = "type")]
    content_type: String,
    text: Option<String>,
}

#[derive(Debug, Deserialize)]
struct StreamEvent {
    #[serde(rename = "type")]
    event_type: String,
    delta: Option<StreamDelta>,
    error: Option<ErrorDetails>,
}

#[derive(Debug, Deserialize)]
struct StreamDelta {
    #[serde(rename = "type")]
    delta_type: String,
    text: Option<String>,
}

#[derive(Debug, Deserialize)]
struct ErrorDetails {
    message: String,
    #[serde(rename = "type")]
    error_type: String,
}

/// Maps chat history onto the Messages API shape.
pub fn to_wire(messages: &[ChatMessage]) -> Vec<AnthropicMessage> {
    messages
        .iter()
        .map(|m| AnthropicMessage {
            role: m.role.as_str().to_string(),
            content: m.content.clone(),
        })
        .collect()
}

/// First text block of a non-streaming reply.
fn extract_text(response: MessagesResponse) -> Result<String, GenerationError> {
    response.content
        .into_iter()
        .find(|c| c.content_type == "text")
        .and_then(|c| c.text)
        .ok_or_else(|| GenerationError::MalformedResponse("No text content in response".into()))
}

fn parse_stream_event(data: &str) -> SseAction {
    let event = match serde_json::from_str::<StreamEvent>(data) {
        Ok(event) => event,
        Err(e) => {
            warn!("Skipping unparseable Anthropic stream event: {}", e);
            return SseAction::Skip;
        }
    };

    match event.event_type.as_str() {
        "content_block_delta" =>
            match event.delta {
                Some(StreamDelta { delta_type, text: Some(text) }) if delta_type == "text_delta" => {
                    SseAction::Emit(text)
                }
                _ => SseAction::Skip,
            }
        "message_stop" => SseAction::Stop,
        "error" => {
            let detail = event.error
                .map(|e| format!("{}: {}", e.error_type, e.message))
                .unwrap_or_else(|| "stream error".to_string());
            SseAction::Fail(GenerationError::Status { status: 500, message: detail })
        }
        other => {
            debug!("Ignoring Anthropic stream event '{}'", other);
            SseAction::Skip
        }
    }
}

impl AnthropicChatClient {
    pub fn new(
        api_key: Option<String>,
        model: Option<String>,
        base_url: Option<String>,
        http: HttpClient
    ) -> Self {
        Self {
            http,
            api_key: api_key.filter(|k| !k.trim().is_empty()),
            model: model.unwrap_or_else(|| DEFAULT_MODEL.to_string()),
            base_url: base_url.unwrap_or_else(|| DEFAULT_BASE_URL.to_string()),
        }
    }

    pub fn from_config(config: &LlmConfig) -> Result<Self, GenerationError> {
        if config.llm_type != LlmType::Anthropic {
            return Err(GenerationError::Configuration("Invalid config type for AnthropicChatClient".into()));
        }
        let http = HttpClient::builder().timeout(config.timeout).build()?;
        Ok(
            Self::new(
                config.api_key().map(str::to_string),
                config.model.clone(),
                config.base_url.clone(),
                http
            )
        )
    }

    fn endpoint(&self) -> String {
        let base = self.base_url.trim_end_matches('/');
        if base.ends_with("/v1/messages") {
            base.to_string()
        } else if base.ends_with("/v1") {
            format!("{}/messages", base)
        } else {
            format!("{}/v1/messages", base)
        }
    }

    fn build(
        &self,
        request: &ChatRequest,
        stream: bool
    ) -> Result<reqwest::RequestBuilder, GenerationError> {
        let api_key = self.api_key
            .as_deref()
            .ok_or_else(|| GenerationError::Configuration("ANTHROPIC_API_KEY is not set".into()))?;

        let body = MessagesRequest {
            model: &self.model,
            max_tokens: request.max_tokens,
            system: &request.system,
            messages: to_wire(&request.messages),
            stream: stream.then_some(true),
        };

        Ok(
            self.http
                .post(self.endpoint())
                .header("x-api-key", api_key)
                .header("anthropic-version", ANTHROPIC_VERSION)
                .json(&body)
        )
    }
}

#[async_trait]
impl ChatClient for AnthropicChatClient {
    async fn complete(&self, request: &ChatRequest) -> Result<String, GenerationError> {
        let req = self.build(request, false)?;
        let resp = error_for_status(req.send().await?).await?;
        let body = resp
            .json::<MessagesResponse>().await
            .map_err(|e| GenerationError::MalformedResponse(e.to_string()))?;
        extract_text(body)
    }

    async fn complete_stream(&self, request: &ChatRequest) -> Result<TextStream, GenerationError> {
        let req = self.build(request, true)?;
        http_stream_generate(req, parse_stream_event).await
    }

    fn model(&self) -> &str {
        &self.model
    }

    fn llm_type(&self) -> LlmType {
        LlmType::Anthropic
    }
}
