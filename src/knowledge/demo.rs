//! Canned answers shown when the chat provider cannot be reached.
//!
//! Topics are tried in order and the first one with any trigger present in
//! the query wins. This is deliberately not the scored matching used for
//! grounding in [`super::search`].

#[derive(Debug, Clone, Copy)]
pub struct DemoTopic {
    pub key: &'static str,
    pub triggers: &'static [&'static str],
    pub text: &'static str,
}

pub static DEMO_TOPICS: [DemoTopic; 4] = [
    DemoTopic {
        key: "workflow",
        triggers: &["workflow", "stage", "7", "process"],
        text: "**ScholaRAG uses a 7-stage workflow:**

1. **Stage 1: Research Domain Setup** (15 min) - Define your research question and scope
2. **Stage 2: Query Strategy** (10 min) - Design Boolean search queries
3. **Stage 3: PRISMA Configuration** (20 min) - Set AI-PRISMA screening criteria
4. **Stage 4: RAG Design** (15 min) - Configure vector database
5. **Stage 5: Execution Plan** (10 min) - Review automation pipeline
6. **Stage 6: Research Conversation** (2-3 hrs) - Query your RAG system
7. **Stage 7: Documentation Writing** (1-2 hrs) - Generate PRISMA diagrams

Visit [Quick Start](/guide/quickstart) to get started!",
    },
    DemoTopic {
        key: "prisma",
        triggers: &["prisma", "screen", "filter"],
        text: "**AI-PRISMA** is ScholaRAG's multi-dimensional screening system:

- Uses **PICO framework** (Population, Intervention, Comparison, Outcomes)
- **Confidence thresholds**: Auto-include ≥90%, Auto-exclude ≤10%, Human-review 11-89%
- **Evidence grounding**: AI must quote abstract text to justify decisions
- Achieves **10-20% pass rates** matching manual systematic review standards

Learn more in [Core Concepts](/guide/03-core-concepts).",
    },
    DemoTopic {
        key: "query",
        triggers: &["query", "search", "database"],
        text: "**Database Strategy in ScholaRAG:**

**Open Access (Free):**
- Semantic Scholar (200M+ papers)
- OpenAlex (250M+ works)
- arXiv (2.4M+ preprints)

**Institutional (Optional):**
- Scopus, Web of Science

**Query syntax:** Boolean operators (AND, OR, NOT) with field-specific search.

Example: `(chatbot OR \"conversational agent\") AND \"language learning\"`",
    },
    DemoTopic {
        key: "start",
        triggers: &["start", "setup", "install", "begin"],
        text: "**Quick Start:**

1. Install VS Code + Claude Code extension
2. Copy the setup prompt from [Quick Start](/guide/quickstart)
3. Answer 3 questions: project name, research question, domain
4. Wait 3 minutes for automatic setup

That's it! Claude Code handles everything automatically.",
    },
];

pub const DEFAULT_ANSWER: &str = "I can help you with:

- **7-stage workflow** - How ScholaRAG works
- **PRISMA screening** - AI-powered paper filtering
- **Query design** - Boolean search strategies
- **Troubleshooting** - Common issues and fixes

Try asking: \"What is the 7-stage workflow?\" or \"How does PRISMA work?\"

For full documentation, visit [the guide](/guide).";

/// Marker line that opens every fallback reply.
pub const DEMO_MARKER: &str = "⚡ **Demo Mode** (API unavailable)";

const DEMO_FOOTER: &str =
    "---\n*For full AI-powered responses, the server needs an Anthropic API key.*";

pub fn demo_answer(query: &str) -> &'static str {
    let query = query.to_lowercase();
    DEMO_TOPICS.iter()
        .find(|topic| topic.triggers.iter().any(|trigger| query.contains(trigger)))
        .map(|topic| topic.text)
        .unwrap_or(DEFAULT_ANSWER)
}

/// The demo answer for `query`, framed so it cannot be mistaken for a live
/// model reply.
pub fn fallback_reply(query: &str) -> String {
    format!("{}\n\n{}\n\n{}", DEMO_MARKER, demo_answer(query), DEMO_FOOTER)
}
