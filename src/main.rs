//! Storefront agent
//!
//! A conversational sales assistant: tools over an offer catalog, an agent
//! loop that calls them, and per-conversation orchestration served over HTTP.

mod agent;
mod api;
mod catalog;
mod conversation;
mod runtime;
mod system_prompt;
mod tools;

use agent::{model_from_config, AgentBoundary, AgentConfig, AgentRunner, HttpAgentBoundary};
use api::{create_router, AppState};
use catalog::Catalog;
use std::net::SocketAddr;
use std::sync::Arc;
use tools::{ToolDispatcher, ToolRegistry};
use tower_http::{
    compression::CompressionLayer,
    cors::{Any, CorsLayer},
    trace::TraceLayer,
};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

const DEFAULT_CHECKOUT_BASE_URL: &str = "https://shop.example.com/checkout";

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Initialize logging
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "storefront_agent=info,tower_http=debug".into()),
        )
        .with(
            tracing_subscriber::fmt::layer()
                .json()
                .with_current_span(false)
                .with_span_list(false),
        )
        .init();

    // Configuration
    let port: u16 = std::env::var("STOREFRONT_PORT")
        .ok()
        .and_then(|p| p.parse().ok())
        .unwrap_or(8000);

    let checkout_base_url = std::env::var("CHECKOUT_BASE_URL")
        .ok()
        .filter(|v| !v.trim().is_empty())
        .unwrap_or_else(|| DEFAULT_CHECKOUT_BASE_URL.to_string());

    // Tools
    let catalog = Arc::new(Catalog::mock());
    let registry = ToolRegistry::standard(catalog.clone(), &checkout_base_url)?;
    tracing::info!(
        tools = ?registry.names(),
        categories = ?catalog.category_names(),
        checkout = %checkout_base_url,
        "Tool registry initialized"
    );
    let dispatcher = ToolDispatcher::new(Arc::new(registry));

    // Agent boundary
    let agent_config = AgentConfig::from_env();
    let agent: Arc<dyn AgentBoundary> = if let Some(url) = &agent_config.remote_url {
        let boundary = HttpAgentBoundary::new(url)?;
        tracing::info!(endpoint = %boundary.endpoint(), "Using remote agent boundary");
        Arc::new(boundary)
    } else {
        if !agent_config.has_credentials() {
            tracing::warn!("No model credentials configured. Set GEMINI_API_KEY or LLM_GATEWAY.");
        }
        let model = model_from_config(&agent_config)?;
        let runner = AgentRunner::new(model, dispatcher.clone(), agent_config.max_tool_rounds);
        tracing::info!(
            model = %runner.model_id(),
            max_tool_rounds = agent_config.max_tool_rounds,
            "Agent runner initialized"
        );
        Arc::new(runner)
    };

    // Create application state
    let state = AppState::new(dispatcher, agent, agent_config.timeout);
    let runtime = state.runtime.clone();

    // Create router
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    let compression = CompressionLayer::new()
        .gzip(true)
        .br(true)
        .deflate(true)
        .zstd(true);

    let app = create_router(state)
        .layer(cors)
        .layer(compression)
        .layer(TraceLayer::new_for_http());

    // Start server
    let addr = SocketAddr::from(([0, 0, 0, 0], port));
    tracing::info!("Storefront agent listening on {}", addr);

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    runtime.shutdown().await;
    tracing::info!("Server stopped");
    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!(error = %e, "Failed to listen for shutdown signal");
        std::future::pending::<()>().await;
    }
    tracing::info!("Shutdown signal received");
}
