//! Static FAQ knowledge and the keyword matcher used to ground replies.

pub mod demo;

use std::cmp::Ordering;

/// Maximum number of snippets returned by [`search`].
pub const MAX_RESULTS: usize = 3;

const CONTEXT_HEADER: &str = "\n\n**Relevant Information:**\n\n";

#[derive(Debug, Clone, Copy)]
pub struct KnowledgeEntry {
    pub keywords: &'static [&'static str],
    pub content: &'static str,
}

#[derive(Debug, Clone, PartialEq)]
pub struct MatchResult<'a> {
    pub content: &'a str,
    pub score: f64,
    /// Position of the entry in the table it was matched from.
    pub index: usize,
}

pub static STATIC_KNOWLEDGE: [KnowledgeEntry; 6] = [
    KnowledgeEntry {
        keywords: &["workflow", "stage", "7", "seven", "process", "step"],
        content: "ScholaRAG uses a **7-stage workflow**:
- **Stage 1**: Research Domain Setup (15 min) - Define research question and scope
- **Stage 2**: Query Strategy (10 min) - Design Boolean search queries
- **Stage 3**: PRISMA Configuration (20 min) - Set AI-PRISMA screening criteria
- **Stage 4**: RAG Design (15 min) - Configure vector database
- **Stage 5**: Execution Plan (10 min) - Review automation pipeline
- **Stage 6**: Research Conversation (2-3 hrs) - Query your RAG system
- **Stage 7**: Documentation Writing (1-2 hrs) - Generate PRISMA diagrams",
    },
    KnowledgeEntry {
        keywords: &["prisma", "screen", "filter", "criteria", "inclusion", "exclusion"],
        content: "**AI-PRISMA** is ScholaRAG's multi-dimensional screening system:
- Uses PICO framework (Population, Intervention, Comparison, Outcomes)
- Confidence thresholds: Auto-include ≥90%, Auto-exclude ≤10%, Human-review 11-89%
- Evidence grounding: AI must quote abstract text to justify decisions
- Achieves 10-20% pass rates matching manual systematic review standards",
    },
    KnowledgeEntry {
        keywords: &["rag", "vector", "database", "chromadb", "embedding"],
        content: "**RAG Architecture** in ScholaRAG:
- Vector database: ChromaDB (default) or FAISS
- Embeddings: OpenAI text-embedding-3-small or local alternatives
- Chunking: 1000 tokens with 200 token overlap
- Retrieval: Top-k semantic search with MMR diversity",
    },
    KnowledgeEntry {
        keywords: &[
            "query",
            "search",
            "boolean",
            "database",
            "semantic scholar",
            "openalex",
            "arxiv",
        ],
        content: "**Database Strategy**:
- Open Access (Free): Semantic Scholar (200M+ papers), OpenAlex (250M+ works), arXiv (2.4M+ preprints)
- Institutional (Optional): Scopus, Web of Science
- Query syntax: Boolean operators (AND, OR, NOT) with field-specific search",
    },
    KnowledgeEntry {
        keywords: &["start", "setup", "install", "begin", "quickstart", "quick"],
        content: "**Quick Start**:
1. Install VS Code + Claude Code extension
2. Copy setup prompt to Claude Code
3. Answer 3 questions: project name, research question, domain
4. Wait 3 minutes for automatic setup
Visit /guide/quickstart for the copy-paste prompt!",
    },
    KnowledgeEntry {
        keywords: &["error", "problem", "issue", "troubleshoot", "fix", "help"],
        content: "**Common Issues**:
- \"Python not found\": Install from python.org/downloads
- \"API key error\": Set ANTHROPIC_API_KEY in .env
- \"0 papers found\": Broaden query terms or check date range
- \"PDF download failed\": Some papers require institutional access",
    },
];

/// Scores every entry by the fraction of its keywords found in `query` and
/// returns the best [`MAX_RESULTS`] with a non-zero score.
///
/// Matching is plain substring containment on the lowercased query, so
/// "7" also hits "2027". Entries with equal scores keep table order.
pub fn search<'a>(query: &str, entries: &'a [KnowledgeEntry]) -> Vec<MatchResult<'a>> {
    let query = query.to_lowercase();

    let mut results: Vec<MatchResult<'a>> = entries
        .iter()
        .enumerate()
        .filter_map(|(index, entry)| {
            if entry.keywords.is_empty() {
                return None;
            }
            let matched = entry.keywords
                .iter()
                .filter(|keyword| query.contains(&keyword.to_lowercase()))
                .count();
            if matched == 0 {
                return None;
            }
            Some(MatchResult {
                content: entry.content,
                score: (matched as f64) / (entry.keywords.len() as f64),
                index,
            })
        })
        .collect();

    // sort_by is stable
    results.sort_by(|a, b| b.score.partial_cmp(&a.score).unwrap_or(Ordering::Equal));
    results.truncate(MAX_RESULTS);
    results
}

/// Joins matched snippets into the block appended to the user's message.
/// Returns `None` when nothing matched.
pub fn context_block(results: &[MatchResult<'_>]) -> Option<String> {
    if results.is_empty() {
        return None;
    }
    let mut context = String::from(CONTEXT_HEADER);
    for result in results {
        context.push_str(result.content);
        context.push_str("\n\n");
    }
    Some(context)
}
