mod config;
mod db;
mod errors;
mod extract;
mod generation;
mod kits;
mod llm_client;
mod models;
mod orgs;
mod routes;
mod state;
mod wizard;

use anyhow::Result;
use std::net::SocketAddr;
use std::sync::Arc;
use tower_http::{cors::CorsLayer, trace::TraceLayer};
use tracing::info;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use crate::config::Config;
use crate::db::create_pool;
use crate::generation::OpenAiGenerator;
use crate::kits::gateway::PgKitGateway;
use crate::llm_client::ChatClient;
use crate::routes::build_router;
use crate::state::AppState;
use crate::wizard::service::WizardService;

#[tokio::main]
async fn main() -> Result<()> {
    // Load configuration first (fails on missing required env vars)
    let config = Config::from_env()?;

    // Initialize structured logging
    tracing_subscriber::registry()
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| {
            EnvFilter::new(format!("{}={}", env!("CARGO_PKG_NAME"), &config.rust_log))
        }))
        .with(tracing_subscriber::fmt::layer())
        .init();

    info!("Starting KitForge API v{}", env!("CARGO_PKG_VERSION"));

    // Initialize PostgreSQL (runs pending migrations)
    let pool = create_pool(&config.database_url).await?;

    // Initialize the generative client
    let chat = ChatClient::new(config.openai_api_key.clone());
    let generator = Arc::new(OpenAiGenerator::new(chat));
    info!("Generative client initialized (model: {})", llm_client::MODEL);

    // Initialize the kit gateway and the wizard service
    let kits = Arc::new(PgKitGateway::new(pool.clone()));
    let wizard = Arc::new(WizardService::new(generator, kits));

    // Build app state
    let state = AppState {
        db: pool,
        wizard,
        config: config.clone(),
    };

    // Build router
    let app = build_router(state)
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive()); // TODO: tighten CORS in production

    let addr: SocketAddr = format!("0.0.0.0:{}", config.port).parse()?;
    info!("Listening on {addr}");

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}
