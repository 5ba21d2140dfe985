use async_trait::async_trait;
use log::warn;
use reqwest::{ Client as HttpClient, header::AUTHORIZATION };
use serde::{ Deserialize, Serialize };

use super::{ error_for_status, http_stream_generate, ChatClient, SseAction, TextStream };
use crate::error::GenerationError;
use crate::llm::{ LlmConfig, LlmType };
use crate::models::chat::{ ChatMessage, ChatRequest };

const DEFAULT_BASE_URL: &str = "https://api.openai.com/v1";
const DEFAULT_MODEL: &str = "gpt-4o";

pub struct OpenAIChatClient {
    http: HttpClient,
    api_key: Option<String>,
    model: String,
    base_url: String,
}

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct OpenAIMessage {
    pub role: String,
    pub content: String,
}

#[derive(Serialize)]
struct OpenAIChatRequest<'a> {
    model: &'a str,
    messages: Vec<OpenAIMessage>,
    max_tokens: u32,
    #[serde(skip_serializing_if = "Option::is_none")]
    stream: Option<bool>,
}

#[derive(Deserialize)]
struct OpenAIResponse {
    choices: Vec<OpenAIChoice>,
}

#[derive(Deserialize)]
struct OpenAIChoice {
    message: OpenAIResponseMessage,
}

#[derive(Deserialize)]
struct OpenAIResponseMessage {
    content: Option<String>,
}

#[derive(Deserialize)]
struct OpenAIStreamResponse {
    choices: Vec<OpenAIStreamChoice>,
}

#[derive(Deserialize)]
struct OpenAIStreamChoice {
    delta: OpenAIDelta,
    #[serde(rename = "finish_reason")]
    finish_reason: Option<String>,
}

#[derive(Deserialize)]
struct OpenAIDelta {
    content: Option<String>,
}

/// Chat completions carry the system instruction as a leading message.
pub fn to_wire(system: &str, messages: &[ChatMessage]) -> Vec<OpenAIMessage> {
    std::iter
        ::once(OpenAIMessage { role: "system".to_string(), content: system.to_string() })
        .chain(
            messages.iter().map(|m| OpenAIMessage {
                role: m.role.as_str().to_string(),
                content: m.content.clone(),
            })
        )
        .collect()
}

fn parse_stream_line(data: &str) -> SseAction {
    if data.is_empty() {
        return SseAction::Skip;
    }
    if data == "[DONE]" {
        return SseAction::Stop;
    }
    match serde_json::from_str::<OpenAIStreamResponse>(data) {
        Ok(stream_resp) => {
            let mut text = String::new();
            let mut finished = false;
            for choice in stream_resp.choices {
                if let Some(content) = choice.delta.content {
                    text.push_str(&content);
                }
                if choice.finish_reason.as_deref() == Some("stop") {
                    finished = true;
                }
            }
            if !text.is_empty() {
                SseAction::Emit(text)
            } else if finished {
                SseAction::Stop
            } else {
                SseAction::Skip
            }
        }
        Err(e) => {
            warn!("JSON parse error: {} for data: {}", e, data);
            SseAction::Skip
        }
    }
}

impl OpenAIChatClient {
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
        if config.llm_type != LlmType::OpenAI {
            return Err(GenerationError::Configuration("Invalid config type for OpenAIChatClient".into()));
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
        if base.ends_with("/chat/completions") {
            base.to_string()
        } else if base.ends_with("/v1") {
            format!("{}/chat/completions", base)
        } else {
            format!("{}/v1/chat/completions", base)
        }
    }

    fn build(
        &self,
        request: &ChatRequest,
        stream: bool
    ) -> Result<reqwest::RequestBuilder, GenerationError> {
        let api_key = self.api_key
            .as_deref()
            .ok_or_else(|| GenerationError::Configuration("OpenAI API key is not set".into()))?;

        let body = OpenAIChatRequest {
            model: &self.model,
            messages: to_wire(&request.system, &request.messages),
            max_tokens: request.max_tokens,
            stream: stream.then_some(true),
        };

        Ok(
            self.http
                .post(self.endpoint())
                .header(AUTHORIZATION, format!("Bearer {}", api_key))
                .json(&body)
        )
    }
}

#[async_trait]
impl ChatClient for OpenAIChatClient {
    async fn complete(&self, request: &ChatRequest) -> Result<String, GenerationError> {
        let req = self.build(request, false)?;
        let resp = error_for_status(req.send().await?).await?
            .json::<OpenAIResponse>().await
            .map_err(|e| GenerationError::MalformedResponse(e.to_string()))?;

        resp.choices
            .into_iter()
            .next()
            .and_then(|c| c.message.content)
            .ok_or_else(|| GenerationError::MalformedResponse("No response from OpenAI API".into()))
    }

    async fn complete_stream(&self, request: &ChatRequest) -> Result<TextStream, GenerationError> {
        let req = self.build(request, true)?;
        http_stream_generate(req, parse_stream_line).await
    }

    fn model(&self) -> &str {
        &self.model
    }

    fn llm_type(&self) -> LlmType {
        LlmType::OpenAI
    }
}
