pub mod agent;
pub mod cli;
pub mod config;
pub mod conversation;
pub mod error;
pub mod knowledge;
pub mod llm;
pub mod models;
pub mod server;

use agent::ResponseGenerator;
use cli::Args;
use config::prompt::load_system_prompt;
use conversation::Conversation;
use governor::{ Quota, RateLimiter };
use llm::{ chat::new_client, LlmConfig, LlmType };
use log::{ info, warn };
use server::{ api::AppState, Server, TlsPaths };
use std::error::Error;
use std::io::Write;
use std::num::NonZeroU32;
use std::sync::Arc;
use std::time::Duration;

pub fn build_generator(args: &Args) -> Result<ResponseGenerator, Box<dyn Error + Send + Sync>> {
    let llm_type: LlmType = args.chat_llm_type.parse()?;
    let config = LlmConfig {
        llm_type,
        api_key: args.chat_api_key.clone(),
        model: args.chat_model.clone(),
        base_url: args.chat_base_url.clone(),
        timeout: Duration::from_secs(args.chat_timeout_secs),
    };
    if config.api_key().is_none() {
        warn!("No chat API key configured; chat requests will fail until one is set.");
    }

    let chat_client = new_client(&config)?;
    info!(
        "Chat client configured: Type={}, Model={}, BaseURL={:?}",
        chat_client.llm_type(),
        chat_client.model(),
        config.base_url.as_deref().unwrap_or("adapter default")
    );

    let system_prompt = load_system_prompt(args.system_prompt_path.as_deref())?;
    Ok(ResponseGenerator::new(chat_client, system_prompt).with_max_tokens(args.chat_max_tokens))
}

pub async fn run(args: Args) -> Result<(), Box<dyn Error + Send + Sync>> {
    info!("--- Core Configuration ---");
    info!("Server Address: {}", args.server_addr);
    info!("Chat LLM Type: {}", args.chat_llm_type);
    info!("Chat Max Tokens: {}", args.chat_max_tokens);
    info!("Chat Timeout: {}s", args.chat_timeout_secs);
    info!("Knowledge Grounding: {}", args.use_knowledge);
    info!("System Prompt: {}", args.system_prompt_path.as_deref().unwrap_or("built-in"));
    info!("Rate Limit: {}/s", args.rate_limit_per_second);
    info!("TLS Enabled: {}", args.enable_tls);
    info!("-------------------------");

    let generator = build_generator(&args)?;

    if let Some(question) = args.ask.as_deref() {
        return ask(&generator, question, args.use_knowledge).await;
    }

    let tls = TlsPaths::from_args(
        args.enable_tls,
        args.tls_cert_path.as_deref(),
        args.tls_key_path.as_deref()
    )?;

    let state = AppState {
        generator: Arc::new(generator),
        api_key: args.server_api_key
            .as_deref()
            .map(str::trim)
            .filter(|k| !k.is_empty())
            .map(Arc::from),
        limiter: NonZeroU32::new(args.rate_limit_per_second).map(|n|
            Arc::new(RateLimiter::direct(Quota::per_second(n)))
        ),
        use_knowledge: args.use_knowledge,
    };

    info!("Starting server on: {}", args.server_addr);
    Server::new(args.server_addr.clone(), state, tls).run().await
}

/// One-shot terminal turn: streams the live answer, or prints the demo
/// fallback if the provider fails.
async fn ask(
    generator: &ResponseGenerator,
    question: &str,
    use_knowledge: bool
) -> Result<(), Box<dyn Error + Send + Sync>> {
    let mut conversation = Conversation::new().with_knowledge(use_knowledge);
    let mut streamed = false;
    let reply = conversation.send_streaming(generator, question, |chunk| {
        streamed = true;
        print!("{}", chunk);
        let _ = std::io::stdout().flush();
    }).await?;

    if reply.fallback {
        if streamed {
            println!("\n");
        }
        println!("{}", reply.message.content);
    } else {
        println!();
    }
    Ok(())
}
