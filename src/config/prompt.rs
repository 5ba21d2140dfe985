use std::error::Error;
use std::fmt;
use std::fs;
use std::path::Path;
use log::info;

pub const SYSTEM_PROMPT: &str = "You are a helpful AI assistant for ScholaRAG - an open-source system that helps researchers build custom RAG systems for systematic literature review following PRISMA 2020 guidelines.

Your role is to:
1. Answer questions about ScholaRAG's **7-stage workflow** (not 5-stage - this was updated!)
2. Explain PRISMA configuration and AI-PRISMA screening
3. Help with query design and search strategies
4. Troubleshoot common issues
5. Provide examples and code snippets
6. Guide users through the documentation

The 7 stages are:
1. Research Domain Setup (15 min)
2. Query Strategy Design (10 min)
3. PRISMA Configuration (20 min)
4. RAG System Design (15 min)
5. Execution Plan (10 min)
6. Research Conversation (2-3 hrs automated)
7. Documentation & Writing (1-2 hrs)

Guidelines:
- Be concise but thorough
- Use the provided context when available
- Cite specific stages when relevant (e.g., \"In Stage 2: Query Strategy...\")
- If you don't know something, suggest visiting the documentation
- Use markdown formatting for code and structured content
- Be encouraging and supportive to researchers

Key technologies:
- Claude Sonnet 4.5 / Haiku 4.5 for AI screening
- ChromaDB for vector storage
- Semantic Scholar, OpenAlex, arXiv for paper retrieval
- Python backend with conversation-driven automation
";

#[derive(Debug)]
pub enum PromptError {
    Empty(String),
    IoError(std::io::Error),
}

impl fmt::Display for PromptError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PromptError::Empty(path) => write!(f, "System prompt file '{}' is empty", path),
            PromptError::IoError(e) => write!(f, "Prompt file IO error: {}", e),
        }
    }
}

impl Error for PromptError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            PromptError::IoError(e) => Some(e),
            _ => None,
        }
    }
}

impl From<std::io::Error> for PromptError {
    fn from(err: std::io::Error) -> Self {
        PromptError::IoError(err)
    }
}

/// Loads the assistant persona from `path`, or the built-in one when no path
/// is configured.
pub fn load_system_prompt<P: AsRef<Path>>(path: Option<P>) -> Result<String, PromptError> {
    let Some(path) = path else {
        return Ok(SYSTEM_PROMPT.to_string());
    };
    let path = path.as_ref();
    let content = fs::read_to_string(path)?;
    if content.trim().is_empty() {
        return Err(PromptError::Empty(path.display().to_string()));
    }
    info!("Loaded system prompt from {}", path.display());
    Ok(content)
}
