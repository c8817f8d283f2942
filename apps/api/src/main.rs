mod config;
mod db;
mod errors;
mod interview;
mod llm_client;
mod models;
mod routes;
mod state;

use anyhow::Result;
use axum::http::HeaderValue;
use std::net::SocketAddr;
use std::sync::Arc;
use tower_http::{cors::CorsLayer, trace::TraceLayer};
use tracing::{info, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use crate::config::Config;
use crate::db::{create_pool, ensure_schema};
use crate::interview::catalog::ItemCatalog;
use crate::interview::extractor::{LlmCandidateExtractor, LlmInterviewer};
use crate::interview::fixed::FixedInterviewStore;
use crate::interview::orchestrator::TurnLocks;
use crate::interview::store::{AnswerRecordStore, InMemoryAnswerStore, PgAnswerStore};
use crate::llm_client::LlmClient;
use crate::routes::build_router;
use crate::state::AppState;

#[tokio::main]
async fn main() -> Result<()> {
    let config = Config::from_env()?;

    // Initialize structured logging
    tracing_subscriber::registry()
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| {
            EnvFilter::new(format!(
                "{}={}",
                env!("CARGO_PKG_NAME").replace('-', "_"),
                &config.rust_log
            ))
        }))
        .with(tracing_subscriber::fmt::layer())
        .init();

    info!("Starting screening API v{}", env!("CARGO_PKG_VERSION"));

    let catalog = Arc::new(ItemCatalog::phq9());
    info!("Item catalog loaded ({} items)", catalog.len());

    let (store, fixed_store): (Arc<dyn AnswerRecordStore>, Arc<dyn FixedInterviewStore>) =
        match &config.database_url {
            Some(url) => {
                let pool = create_pool(url).await?;
                ensure_schema(&pool).await?;
                info!("Using PostgreSQL answer store");
                let pg = Arc::new(PgAnswerStore::new(pool, catalog.clone()));
                let store: Arc<dyn AnswerRecordStore> = pg.clone();
                let fixed_store: Arc<dyn FixedInterviewStore> = pg;
                (store, fixed_store)
            }
            None => {
                warn!("DATABASE_URL not set; answers are kept in memory and lost on restart");
                let memory = Arc::new(InMemoryAnswerStore::new(catalog.clone()));
                let store: Arc<dyn AnswerRecordStore> = memory.clone();
                let fixed_store: Arc<dyn FixedInterviewStore> = memory;
                (store, fixed_store)
            }
        };

    let llm = LlmClient::new(config.anthropic_api_key.clone())?;
    info!("LLM client initialized (model: {})", llm_client::MODEL);

    let state = AppState {
        config: config.clone(),
        catalog: catalog.clone(),
        store,
        fixed_store,
        extractor: Arc::new(LlmCandidateExtractor::new(llm.clone(), catalog)),
        interviewer: Arc::new(LlmInterviewer::new(llm)),
        turn_locks: TurnLocks::default(),
    };

    let cors = match &config.cors_origin {
        Some(origin) => CorsLayer::permissive().allow_origin(origin.parse::<HeaderValue>()?),
        None => CorsLayer::permissive(),
    };

    let app = build_router(state)
        .layer(TraceLayer::new_for_http())
        .layer(cors);

    let addr: SocketAddr = format!("0.0.0.0:{}", config.port).parse()?;
    info!("Listening on {addr}");

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}
