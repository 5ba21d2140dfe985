use crate::agent::ResponseGenerator;
use crate::error::GenerationError;
use crate::llm::chat::TextStream;
use crate::models::chat::{ ChatRequestBody, ChatResponseBody, ErrorBody };
use crate::models::stream::StreamEvent;

use axum::{
    extract::{ rejection::JsonRejection, State },
    http::{ HeaderMap, StatusCode },
    response::{ sse::{ Event, KeepAlive, Sse }, IntoResponse, Response },
    routing::{ get, post },
    Json,
    Router,
};
use futures::{ Stream, StreamExt };
use governor::DefaultDirectRateLimiter;
use log::{ error, info, warn };
use serde_json::json;
use std::sync::Arc;
use thiserror::Error;
use tokio::sync::mpsc;
use tokio_stream::wrappers::ReceiverStream;
use tower_http::cors::{ Any, CorsLayer };
use uuid::Uuid;

pub const API_KEY_HEADER: &str = "X-API-Key";

#[derive(Clone)]
pub struct AppState {
    pub generator: Arc<ResponseGenerator>,
    /// Key clients must send in `X-API-Key`; open access when `None`.
    pub api_key: Option<Arc<str>>,
    pub limiter: Option<Arc<DefaultDirectRateLimiter>>,
    /// Default for requests that do not set `use_knowledge`.
    pub use_knowledge: bool,
}

impl AppState {
    pub fn new(generator: Arc<ResponseGenerator>) -> Self {
        Self { generator, api_key: None, limiter: None, use_knowledge: true }
    }
}

#[derive(Debug, Error)]
pub enum ApiError {
    #[error("{0}")]
    BadRequest(String),
    #[error("Unauthorized")]
    Unauthorized,
    #[error("Too many requests, please slow down")]
    RateLimited,
    #[error(transparent)]
    Generation(#[from] GenerationError),
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, message) = match &self {
            ApiError::BadRequest(msg) => (StatusCode::BAD_REQUEST, msg.clone()),
            ApiError::Unauthorized => (StatusCode::UNAUTHORIZED, self.to_string()),
            ApiError::RateLimited => (StatusCode::TOO_MANY_REQUESTS, self.to_string()),
            ApiError::Generation(e) if e.is_configuration() => {
                (StatusCode::SERVICE_UNAVAILABLE, e.public_message().to_string())
            }
            ApiError::Generation(e) => (StatusCode::BAD_GATEWAY, e.public_message().to_string()),
        };
        (status, Json(ErrorBody { error: message })).into_response()
    }
}

pub fn router(state: AppState) -> Router {
    let cors = CorsLayer::new().allow_origin(Any).allow_methods(Any).allow_headers(Any);

    Router::new()
        .route("/api/chat", post(chat_handler))
        .route("/api/chat/stream", post(chat_stream_handler))
        .route("/health", get(health_handler))
        .layer(cors)
        .with_state(state)
}

/// Shared request checks. Returns the parsed body and the knowledge flag.
fn admit(
    state: &AppState,
    headers: &HeaderMap,
    payload: Result<Json<ChatRequestBody>, JsonRejection>
) -> Result<(ChatRequestBody, bool), ApiError> {
    if let Some(required) = &state.api_key {
        let provided = headers.get(API_KEY_HEADER).and_then(|v| v.to_str().ok());
        if provided != Some(required.as_ref()) {
            warn!("Rejected chat request: bad or missing API key");
            return Err(ApiError::Unauthorized);
        }
    }

    if let Some(limiter) = &state.limiter {
        if limiter.check().is_err() {
            warn!("Global chat rate limit exceeded");
            return Err(ApiError::RateLimited);
        }
    }

    let Json(body) = payload.map_err(|rejection| ApiError::BadRequest(rejection.body_text()))?;
    if body.messages.is_empty() {
        return Err(ApiError::BadRequest("messages must not be empty".into()));
    }
    let use_knowledge = body.use_knowledge.unwrap_or(state.use_knowledge);
    Ok((body, use_knowledge))
}

async fn chat_handler(
    State(state): State<AppState>,
    headers: HeaderMap,
    payload: Result<Json<ChatRequestBody>, JsonRejection>
) -> Result<Json<ChatResponseBody>, ApiError> {
    let (body, use_knowledge) = admit(&state, &headers, payload)?;
    let request_id = Uuid::new_v4();
    info!("[{}] Chat request with {} messages", request_id, body.messages.len());

    match state.generator.respond(&body.messages, use_knowledge).await {
        Ok(message) => {
            info!("[{}] Reply of {} bytes", request_id, message.len());
            Ok(Json(ChatResponseBody { message }))
        }
        Err(e) => {
            error!("[{}] Error generating chat response: {}", request_id, e);
            Err(e.into())
        }
    }
}

async fn chat_stream_handler(
    State(state): State<AppState>,
    headers: HeaderMap,
    payload: Result<Json<ChatRequestBody>, JsonRejection>
) -> Result<Sse<impl Stream<Item = Result<Event, axum::Error>>>, ApiError> {
    let (body, use_knowledge) = admit(&state, &headers, payload)?;
    let request_id = Uuid::new_v4();
    info!("[{}] Streaming chat request with {} messages", request_id, body.messages.len());

    let upstream = state.generator
        .respond_stream(&body.messages, use_knowledge).await
        .map_err(|e| {
            error!("[{}] Error opening chat stream: {}", request_id, e);
            ApiError::from(e)
        })?;

    Ok(Sse::new(sse_events(upstream, request_id)).keep_alive(KeepAlive::default()))
}

async fn health_handler(State(state): State<AppState>) -> impl IntoResponse {
    Json(json!({ "status": "ok", "model": state.generator.model() }))
}

fn to_event(event: &StreamEvent) -> Result<Event, axum::Error> {
    Event::default().event(event.name()).json_data(event)
}

/// Relays provider fragments as SSE events. When the client goes away the
/// relay task ends, dropping the provider stream with it.
fn sse_events(
    mut upstream: TextStream,
    request_id: Uuid
) -> impl Stream<Item = Result<Event, axum::Error>> {
    let (tx, rx) = mpsc::channel(32);

    tokio::spawn(async move {
        let mut delivered = 0usize;
        while let Some(item) = upstream.next().await {
            let event = match item {
                Ok(text) => {
                    delivered += 1;
                    StreamEvent::Delta { text }
                }
                Err(e) => {
                    error!("[{}] Chat stream failed after {} chunks: {}", request_id, delivered, e);
                    let event = StreamEvent::Error { error: e.public_message().to_string() };
                    let _ = tx.send(to_event(&event)).await;
                    return;
                }
            };
            if tx.send(to_event(&event)).await.is_err() {
                info!("[{}] Client disconnected, abandoning stream", request_id);
                return;
            }
        }
        info!("[{}] Stream complete ({} chunks)", request_id, delivered);
        let _ = tx.send(to_event(&StreamEvent::done())).await;
    });

    ReceiverStream::new(rx)
}
