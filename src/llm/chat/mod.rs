pub mod anthropic;
pub mod openai;

use async_trait::async_trait;
use futures::{ Stream, StreamExt, Future };
use log::debug;
use std::pin::Pin;
use std::sync::Arc;
use super::{ LlmConfig, LlmType };
use self::anthropic::AnthropicChatClient;
use self::openai::OpenAIChatClient;
use crate::error::GenerationError;
use crate::models::chat::ChatRequest;
use tokio::sync::mpsc;
use tokio_stream::wrappers::ReceiverStream;

/// Ordered text fragments of one streamed reply. Dropping it abandons the
/// upstream request.
pub type TextStream = Pin<Box<dyn Stream<Item = Result<String, GenerationError>> + Send>>;

#[async_trait]
pub trait ChatClient: Send + Sync {
    async fn complete(&self, request: &ChatRequest) -> Result<String, GenerationError>;

    async fn complete_stream(&self, request: &ChatRequest) -> Result<TextStream, GenerationError>;

    fn model(&self) -> &str;

    fn llm_type(&self) -> LlmType;
}

pub fn new_client(config: &LlmConfig) -> Result<Arc<dyn ChatClient>, GenerationError> {
    let client: Arc<dyn ChatClient> = match config.llm_type {
        LlmType::Anthropic => {
            let specific_client = AnthropicChatClient::from_config(config)?;
            Arc::new(specific_client)
        }
        LlmType::OpenAI => {
            let specific_client = OpenAIChatClient::from_config(config)?;
            Arc::new(specific_client)
        }
    };
    Ok(client)
}

/// What a provider-specific parser makes of one SSE `data:` payload.
#[derive(Debug)]
pub enum SseAction {
    Emit(String),
    Skip,
    Stop,
    Fail(GenerationError),
}

/// Splits a byte stream into SSE `data:` payloads.
///
/// Network chunks can end mid-line or mid-character, so bytes are held back
/// until a full line is available.
#[derive(Debug, Default)]
pub struct SseDecoder {
    buffer: Vec<u8>,
}

impl SseDecoder {
    pub fn push(&mut self, chunk: &[u8]) -> Vec<String> {
        self.buffer.extend_from_slice(chunk);
        let mut payloads = Vec::new();
        while let Some(pos) = self.buffer.iter().position(|b| *b == b'\n') {
            let line: Vec<u8> = self.buffer.drain(..=pos).collect();
            if let Some(data) = Self::data_of(&line) {
                payloads.push(data);
            }
        }
        payloads
    }

    /// Flushes a final line that arrived without a trailing newline.
    pub fn finish(&mut self) -> Option<String> {
        if self.buffer.is_empty() {
            return None;
        }
        let line = std::mem::take(&mut self.buffer);
        Self::data_of(&line)
    }

    fn data_of(line: &[u8]) -> Option<String> {
        let text = String::from_utf8_lossy(line);
        let text = text.trim_end_matches(['\n', '\r']);
        let data = text.strip_prefix("data:")?;
        let data = data.strip_prefix(' ').unwrap_or(data);
        Some(data.to_string())
    }
}

pub fn create_streaming_response<F, Fut>(response_fn: F) -> TextStream
    where
        F: FnOnce(mpsc::Sender<Result<String, GenerationError>>) -> Fut + Send + 'static,
        Fut: Future<Output = ()> + Send + 'static
{
    let (tx, rx) = mpsc::channel(32);

    tokio::spawn(async move {
        response_fn(tx).await;
    });

    Box::pin(ReceiverStream::new(rx))
}

/// Turns a non-success response into [`GenerationError::Status`], pulling
/// `error.message` out of the provider's JSON body when there is one.
pub async fn error_for_status(
    resp: reqwest::Response
) -> Result<reqwest::Response, GenerationError> {
    let status = resp.status();
    if status.is_success() {
        return Ok(resp);
    }
    let body = resp.text().await.unwrap_or_default();
    let message = serde_json
        ::from_str::<serde_json::Value>(&body)
        .ok()
        .and_then(|v| v["error"]["message"].as_str().map(str::to_string))
        .unwrap_or(body);
    Err(GenerationError::Status { status: status.as_u16(), message })
}

/// Sends `req` and, once the provider has accepted it, streams the fragments
/// `parse` extracts from its SSE body.
///
/// Failures before the first byte of the body are returned directly; later
/// ones arrive as the last item of the stream. A body that closes before the
/// provider's end marker, or that ends without any text, is reported as
/// [`GenerationError::MalformedResponse`].
pub async fn http_stream_generate(
    req: reqwest::RequestBuilder,
    parse: fn(&str) -> SseAction
) -> Result<TextStream, GenerationError> {
    let resp = error_for_status(req.send().await?).await?;

    Ok(
        create_streaming_response(move |tx| async move {
            let mut bytes = resp.bytes_stream();
            let mut decoder = SseDecoder::default();
            let mut emitted = 0usize;

            while let Some(chunk) = bytes.next().await {
                match chunk {
                    Ok(buf) => {
                        for data in decoder.push(&buf) {
                            match forward(&tx, parse(&data), &mut emitted).await {
                                Flow::Continue => {}
                                Flow::Finished => {
                                    finish_stream(&tx, emitted).await;
                                    return;
                                }
                                Flow::Abort => {
                                    return;
                                }
                            }
                        }
                    }
                    Err(e) => {
                        let _ = tx.send(Err(e.into())).await;
                        return;
                    }
                }
            }
            if let Some(data) = decoder.finish() {
                match forward(&tx, parse(&data), &mut emitted).await {
                    Flow::Continue => {}
                    Flow::Finished => {
                        finish_stream(&tx, emitted).await;
                        return;
                    }
                    Flow::Abort => {
                        return;
                    }
                }
            }
            debug!("Provider stream closed after {} fragments without an end marker", emitted);
            let _ = tx.send(
                Err(GenerationError::MalformedResponse("stream ended before completion".into()))
            ).await;
        })
    )
}

enum Flow {
    Continue,
    Finished,
    Abort,
}

async fn forward(
    tx: &mpsc::Sender<Result<String, GenerationError>>,
    action: SseAction,
    emitted: &mut usize
) -> Flow {
    match action {
        SseAction::Emit(text) => {
            if tx.send(Ok(text)).await.is_err() {
                debug!("Stream receiver dropped, abandoning provider stream");
                return Flow::Abort;
            }
            *emitted += 1;
            Flow::Continue
        }
        SseAction::Skip => Flow::Continue,
        SseAction::Stop => Flow::Finished,
        SseAction::Fail(e) => {
            let _ = tx.send(Err(e)).await;
            Flow::Abort
        }
    }
}

/// A stream that stopped cleanly must have produced some text.
async fn finish_stream(tx: &mpsc::Sender<Result<String, GenerationError>>, emitted: usize) {
    if emitted == 0 {
        let _ = tx.send(Err(GenerationError::MalformedResponse("stream carried no text".into()))).await;
    }
}
