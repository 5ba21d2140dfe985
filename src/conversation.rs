use crate::agent::ResponseGenerator;
use crate::knowledge::demo::fallback_reply;
use crate::models::chat::ChatMessage;

use chrono::Utc;
use log::{ error, warn };
use thiserror::Error;

pub const GREETING: &str = "Hi! I'm the ScholaRAG Helper chatbot. I can help you with:

- Understanding the 7-stage workflow
- Query design and search strategies
- PRISMA configuration
- RAG system setup
- Troubleshooting common issues

What would you like to know?";

#[derive(Debug, Error, PartialEq, Eq)]
pub enum ConversationError {
    #[error("message is empty")]
    EmptyInput,
}

#[derive(Clone, Debug, PartialEq)]
pub struct ConversationEntry {
    pub message: ChatMessage,
    pub timestamp: i64,
    /// Set when the reply is a canned demo answer rather than model output.
    pub fallback: bool,
    /// Displayed only; never sent to the provider.
    pub local: bool,
}

impl ConversationEntry {
    fn new(message: ChatMessage, fallback: bool) -> Self {
        Self { message, timestamp: Utc::now().timestamp(), fallback, local: false }
    }
}

/// A chat as the user sees it. Every accepted user turn ends with exactly one
/// assistant entry, live or fallback.
///
/// Turns take `&mut self`, so a second turn cannot start before the first
/// resolves. A turn whose future is dropped leaves the history unchanged.
#[derive(Clone, Debug)]
pub struct Conversation {
    entries: Vec<ConversationEntry>,
    use_knowledge: bool,
}

impl Default for Conversation {
    fn default() -> Self {
        Self::new()
    }
}

impl Conversation {
    pub fn new() -> Self {
        let mut greeting = ConversationEntry::new(ChatMessage::assistant(GREETING), false);
        greeting.local = true;
        Self { entries: vec![greeting], use_knowledge: true }
    }

    pub fn with_knowledge(mut self, use_knowledge: bool) -> Self {
        self.use_knowledge = use_knowledge;
        self
    }

    pub fn entries(&self) -> &[ConversationEntry] {
        &self.entries
    }

    /// History that goes to the provider, with `next` as the final message.
    fn outgoing(&self, next: &ChatMessage) -> Vec<ChatMessage> {
        self.entries
            .iter()
            .filter(|e| !e.local)
            .map(|e| e.message.clone())
            .chain(std::iter::once(next.clone()))
            .collect()
    }

    pub async fn send(
        &mut self,
        generator: &ResponseGenerator,
        text: &str
    ) -> Result<&ConversationEntry, ConversationError> {
        let user = Self::accept(text)?;
        let messages = self.outgoing(&user);

        let reply = match generator.respond(&messages, self.use_knowledge).await {
            Ok(content) => ConversationEntry::new(ChatMessage::assistant(content), false),
            Err(e) => {
                error!("Chat error: {}", e);
                warn!("Falling back to demo answer");
                ConversationEntry::new(ChatMessage::assistant(fallback_reply(&user.content)), true)
            }
        };
        Ok(self.commit(user, reply))
    }

    /// Like [`Self::send`], handing fragments to `on_chunk` as they arrive.
    ///
    /// If the stream fails part way, the fragments already shown stay shown
    /// and the recorded reply is the fallback answer.
    pub async fn send_streaming<F>(
        &mut self,
        generator: &ResponseGenerator,
        text: &str,
        mut on_chunk: F
    ) -> Result<&ConversationEntry, ConversationError>
        where F: FnMut(&str)
    {
        let user = Self::accept(text)?;
        let messages = self.outgoing(&user);

        let mut content = String::new();
        let result = generator.respond_streaming(
            &messages,
            |chunk| {
                content.push_str(chunk);
                on_chunk(chunk);
            },
            self.use_knowledge
        ).await;

        let reply = match result {
            Ok(()) => ConversationEntry::new(ChatMessage::assistant(content), false),
            Err(e) => {
                error!("Chat stream error after {} bytes: {}", content.len(), e);
                warn!("Falling back to demo answer");
                ConversationEntry::new(ChatMessage::assistant(fallback_reply(&user.content)), true)
            }
        };
        Ok(self.commit(user, reply))
    }

    fn accept(text: &str) -> Result<ChatMessage, ConversationError> {
        if text.trim().is_empty() {
            return Err(ConversationError::EmptyInput);
        }
        Ok(ChatMessage::user(text))
    }

    fn commit(&mut self, user: ChatMessage, reply: ConversationEntry) -> &ConversationEntry {
        self.entries.push(ConversationEntry::new(user, false));
        self.entries.push(reply);
        &self.entries[self.entries.len() - 1]
    }
}
