use std::sync::Arc;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use trivia_backend::{
    api,
    auth::TokenIdentity,
    config::{self, GenerationConfig},
    llm,
    state::AppState,
    store::MemoryStore,
};

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Load .env file if present (before any env var reads)
    if let Err(e) = dotenvy::dotenv() {
        // Not an error if .env doesn't exist, only log if it's a different issue
        if !matches!(e, dotenvy::Error::Io(_)) {
            eprintln!("Warning: Failed to load .env file: {}", e);
        }
    }

    // Initialize tracing
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "trivia_backend=debug,tower_http=debug".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    tracing::info!("Starting trivia backend...");

    // Initialize LLM providers
    let llm_config = llm::LlmConfig::from_env();
    let adapters = match llm_config.build_adapters() {
        Ok(adapters) => {
            tracing::info!(count = adapters.len(), "LLM providers initialized successfully");
            adapters
        }
        Err(e) => {
            tracing::warn!(
                "Failed to initialize LLM providers: {}. AI generation will not be available.",
                e
            );
            Vec::new()
        }
    };

    let store = match config::env_non_empty("STORE_SEED_PATH") {
        Some(path) => {
            let store = MemoryStore::from_seed_file(&path).await?;
            tracing::info!(path, "Document store seeded");
            store
        }
        None => MemoryStore::new(),
    };

    let state = AppState::new(Arc::new(store), adapters)
        .with_identity(Arc::new(TokenIdentity::from_env()))
        .with_generation_config(&GenerationConfig::from_env());

    let app = api::router(Arc::new(state));

    let addr = config::bind_addr_from_env();
    tracing::info!("Listening on http://{}", addr);

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app).await?;
    Ok(())
}
