use std::sync::Arc;
use std::time::Duration;

use agent_tui::config::ChatConfig;
use agent_tui::error::ConfigError;
use agent_tui::llm::{LlmBackend, LlmConfig, create_provider};
use agent_tui::session::{SessionManager, SessionState};
use agent_tui::store::ConversationStore;
use agent_tui::tui::InteractiveTui;
use agent_tui::user;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Initialize tracing
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();

    let mut config = ChatConfig::default();
    if let Ok(db_path) = std::env::var("AGENT_TUI_DB_PATH") {
        config.db_path = db_path.into();
    }

    // Provider selection — a missing API key is the only fatal startup error.
    let backend = match std::env::var("AGENT_TUI_PROVIDER").as_deref() {
        Ok("openai") => LlmBackend::OpenAi,
        _ => LlmBackend::Anthropic,
    };
    let (key_var, default_model) = match backend {
        LlmBackend::Anthropic => ("ANTHROPIC_API_KEY", "claude-sonnet-4-20250514"),
        LlmBackend::OpenAi => ("OPENAI_API_KEY", "gpt-4o"),
    };
    let api_key = std::env::var(key_var)
        .map_err(|_| ConfigError::MissingEnvVar(key_var.to_string()))
        .unwrap_or_else(|e| {
            eprintln!("Error: {e}");
            eprintln!("  export {key_var}=...");
            std::process::exit(1);
        });
    let model = std::env::var("AGENT_TUI_MODEL").unwrap_or_else(|_| default_model.to_string());
    let timeout_secs: u64 = std::env::var("AGENT_TUI_TIMEOUT_SECS")
        .unwrap_or_else(|_| "120".to_string())
        .parse()
        .unwrap_or(120);

    let llm_config = LlmConfig {
        backend,
        api_key: secrecy::SecretString::from(api_key),
        model,
        timeout: Duration::from_secs(timeout_secs),
    };
    let llm = create_provider(&llm_config)?;

    let user_id = user::generate_user_id(&user::system_username());

    eprintln!("🚀 Agent TUI v{}", env!("CARGO_PKG_VERSION"));
    eprintln!("   User: {}", user_id);
    eprintln!("   Model: {}", llm.model_name());
    eprintln!("   Database: {}", config.db_path.display());

    let store = Arc::new(ConversationStore::open(&config.db_path).await.unwrap_or_else(|e| {
        eprintln!(
            "Error: Failed to open database at {}: {}",
            config.db_path.display(),
            e
        );
        std::process::exit(1);
    }));

    let manager = SessionManager::new(
        Arc::clone(&store),
        llm,
        config.system_prompt.clone(),
        config.resource_id.clone(),
    );
    let state = SessionState::new(user_id);
    let mut tui = InteractiveTui::new(manager, state, &config);

    // Ctrl-C drops out of the loop; the store handle is released on exit.
    tokio::select! {
        result = tui.run() => result?,
        _ = tokio::signal::ctrl_c() => {
            eprintln!("\n\n👋 Shutting down gracefully...");
        }
    }

    Ok(())
}
