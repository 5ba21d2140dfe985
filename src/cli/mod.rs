use clap::Parser;

#[derive(Parser, Debug, Clone)]
#[command(author, version, about, long_about = None)]
pub struct Args {
    // --- Chat LLM Provider Args ---
    /// Type of LLM provider for chat completion (anthropic, openai)
    #[arg(long, env = "CHAT_LLM_TYPE", default_value = "anthropic")]
    pub chat_llm_type: String,

    /// API key for the chat provider. Without it every chat request fails and clients fall back to demo answers.
    #[arg(long, env = "ANTHROPIC_API_KEY", hide_env_values = true)]
    pub chat_api_key: Option<String>,

    /// Model name for chat completion (e.g., claude-sonnet-4-5-20250929, gpt-4o)
    #[arg(long, env = "CHAT_MODEL")] // No default, rely on adapter defaults if None
    pub chat_model: Option<String>,

    /// Base URL for the chat provider API (e.g., https://api.anthropic.com)
    #[arg(long, env = "CHAT_BASE_URL")] // No default, let adapters handle defaults if None
    pub chat_base_url: Option<String>,

    /// Maximum number of tokens the model may generate per reply.
    #[arg(long, env = "CHAT_MAX_TOKENS", default_value = "2048")]
    pub chat_max_tokens: u32,

    /// Timeout in seconds for a single provider request, including streamed bodies.
    #[arg(long, env = "CHAT_TIMEOUT_SECS", default_value = "120")]
    pub chat_timeout_secs: u64,

    // --- Assistant Args ---
    /// Append matching knowledge snippets to the user's question before sending it.
    #[arg(long, env = "USE_KNOWLEDGE", default_value = "true", action = clap::ArgAction::Set)]
    pub use_knowledge: bool,

    /// Optional text file replacing the built-in assistant persona.
    #[arg(long, env = "SYSTEM_PROMPT_PATH")]
    pub system_prompt_path: Option<String>,

    // --- Server Args ---
    /// Host address and port for the server to listen on.
    #[arg(long, env = "SERVER_ADDR", default_value = "127.0.0.1:4000")]
    pub server_addr: String,

    /// Optional API Key required for clients to call the chat endpoints. If set, clients must send it in X-API-Key.
    #[arg(long, env = "SERVER_API_KEY", hide_env_values = true)]
    pub server_api_key: Option<String>,

    /// Chat requests accepted per second across all clients. 0 disables the limit.
    #[arg(long, env = "RATE_LIMIT_PER_SECOND", default_value = "10")]
    pub rate_limit_per_second: u32,

    /// Optional path to the TLS certificate file (PEM format) for enabling HTTPS. Requires --tls-key-path.
    #[arg(long, env = "TLS_CERT_PATH")]
    pub tls_cert_path: Option<String>,

    /// Optional path to the TLS private key file (PEM format) for enabling HTTPS. Requires --tls-cert-path.
    #[arg(long, env = "TLS_KEY_PATH")]
    pub tls_key_path: Option<String>,

    #[arg(long, env = "ENABLE_TLS", default_value = "false")]
    pub enable_tls: bool,

    /// Answer one question on stdout instead of starting the server.
    #[arg(long)]
    pub ask: Option<String>,
}
