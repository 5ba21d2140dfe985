use crate::error::GenerationError;
use crate::knowledge::{ self, KnowledgeEntry, STATIC_KNOWLEDGE };
use crate::llm::chat::{ ChatClient, TextStream };
use crate::models::chat::{ ChatMessage, ChatRequest, Role };

use futures::StreamExt;
use log::{ debug, info };
use std::sync::Arc;

pub const DEFAULT_MAX_TOKENS: u32 = 2048;

/// Produces assistant replies for a conversation, grounded with matching
/// knowledge snippets, through a hosted chat provider.
///
/// Holds no per-conversation state; the full history arrives with every call.
#[derive(Clone)]
pub struct ResponseGenerator {
    chat_client: Arc<dyn ChatClient>,
    system_prompt: Arc<str>,
    max_tokens: u32,
    knowledge: &'static [KnowledgeEntry],
}

impl ResponseGenerator {
    pub fn new(chat_client: Arc<dyn ChatClient>, system_prompt: impl Into<Arc<str>>) -> Self {
        Self {
            chat_client,
            system_prompt: system_prompt.into(),
            max_tokens: DEFAULT_MAX_TOKENS,
            knowledge: &STATIC_KNOWLEDGE,
        }
    }

    pub fn with_max_tokens(mut self, max_tokens: u32) -> Self {
        self.max_tokens = max_tokens;
        self
    }

    pub fn model(&self) -> &str {
        self.chat_client.model()
    }

    /// Builds the provider request for `messages`.
    ///
    /// The last user message is the matcher query. Matched snippets are
    /// appended to the final message only when that message is from the user;
    /// earlier messages are passed through untouched.
    pub fn prepare(&self, messages: &[ChatMessage], use_knowledge: bool) -> ChatRequest {
        let mut outgoing = messages.to_vec();

        let context = if use_knowledge {
            messages
                .iter()
                .rev()
                .find(|m| m.role == Role::User)
                .and_then(|last_user| {
                    let results = knowledge::search(&last_user.content, self.knowledge);
                    debug!("Knowledge matches: {:?}", results.iter().map(|r| (r.index, r.score)).collect::<Vec<_>>());
                    knowledge::context_block(&results)
                })
        } else {
            None
        };

        if let (Some(context), Some(last)) = (context, outgoing.last_mut()) {
            if last.role == Role::User {
                last.content.push_str(&context);
            }
        }

        ChatRequest {
            system: self.system_prompt.to_string(),
            max_tokens: self.max_tokens,
            messages: outgoing,
        }
    }

    pub async fn respond(
        &self,
        messages: &[ChatMessage],
        use_knowledge: bool
    ) -> Result<String, GenerationError> {
        let request = self.prepare(messages, use_knowledge);
        info!(
            "Requesting completion from {} ({} messages)",
            self.chat_client.model(),
            request.messages.len()
        );
        self.chat_client.complete(&request).await
    }

    /// Streams the reply as it is generated. Dropping the returned stream
    /// abandons the provider session.
    pub async fn respond_stream(
        &self,
        messages: &[ChatMessage],
        use_knowledge: bool
    ) -> Result<TextStream, GenerationError> {
        let request = self.prepare(messages, use_knowledge);
        info!(
            "Opening completion stream from {} ({} messages)",
            self.chat_client.model(),
            request.messages.len()
        );
        self.chat_client.complete_stream(&request).await
    }

    /// Callback form of [`Self::respond_stream`]. `on_chunk` runs once per
    /// fragment, in order. On a mid-stream failure the fragments already
    /// delivered stay delivered.
    pub async fn respond_streaming<F>(
        &self,
        messages: &[ChatMessage],
        mut on_chunk: F,
        use_knowledge: bool
    ) -> Result<(), GenerationError>
        where F: FnMut(&str)
    {
        let mut stream = self.respond_stream(messages, use_knowledge).await?;
        while let Some(fragment) = stream.next().await {
            on_chunk(&fragment?);
        }
        Ok(())
    }
}
