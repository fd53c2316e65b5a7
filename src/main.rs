//! SEO Publisher Backend
//!
//! Generates SEO post material through a chat-completion API, stages drafts in
//! a secondary blog database and publishes approved posts to the primary
//! SQLite store.

mod api;
mod audit;
mod auth;
mod commands;
mod config;
mod db;
mod errors;
mod generators;
mod html;
mod llm;
mod models;
mod workflow;

use std::sync::Arc;

use axum::{
    middleware,
    routing::{get, post},
    Router,
};
use sqlx::SqlitePool;
use tower::ServiceBuilder;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use audit::AuditLog;
use config::Config;
use db::{PrimaryStore, StagingStore};
use errors::AppError;
use llm::LlmClient;

/// Application state shared across all handlers.
#[derive(Clone)]
pub struct AppState {
    pub primary: Arc<PrimaryStore>,
    pub staging: Arc<StagingStore>,
    pub llm: Arc<LlmClient>,
    pub audit: AuditLog,
    pub config: Arc<Config>,
}

impl AppState {
    /// Wire the stores and the completion client. The staging store connects
    /// on first use.
    pub fn new(config: Config, primary_pool: SqlitePool) -> Result<Self, AppError> {
        let primary = PrimaryStore::new(primary_pool);
        let staging = StagingStore::new(
            &config.staging_db_url,
            &config.staging_table_prefix,
            &config.staging_site_url,
            config.staging_author_id,
        );
        let llm = LlmClient::from_config(&config)?;

        Ok(Self {
            audit: AuditLog::new(primary.clone()),
            primary: Arc::new(primary),
            staging: Arc::new(staging),
            llm: Arc::new(llm),
            config: Arc::new(config),
        })
    }
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Load configuration; missing credentials abort startup
    let config = Config::from_env()?;

    // Initialize logging
    let env_filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&config.log_level));

    tracing_subscriber::registry()
        .with(env_filter)
        .with(tracing_subscriber::fmt::layer())
        .init();

    tracing::info!("Starting SEO Publisher Backend");
    tracing::info!("Primary database: {:?}", config.primary_db_path);
    tracing::info!("Staging table prefix: {}", config.staging_table_prefix);
    tracing::info!("Bind address: {}", config.bind_addr);

    if config.api_psk.is_none() {
        tracing::warn!("No API PSK configured (SEO_API_PSK). Authentication is disabled!");
    }

    let pool = db::init_primary_database(&config.primary_db_path).await?;
    let bind_addr = config.bind_addr;
    let state = AppState::new(config, pool)?;

    let app = create_router(state);

    let listener = tokio::net::TcpListener::bind(bind_addr).await?;
    tracing::info!("Server listening on {}", bind_addr);

    axum::serve(listener, app).await?;

    Ok(())
}

/// Create the application router with all routes.
pub fn create_router(state: AppState) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    let psk = state.config.api_psk.clone();

    let api_routes = Router::new()
        // Generation
        .route("/generate/categories", post(api::generate_categories))
        .route("/generate/toc", post(api::generate_toc))
        .route("/generate/paragraphs", post(api::generate_paragraphs))
        // Publishing
        .route("/publish", post(api::publish_post))
        .route("/publish/draft", get(api::get_publish_draft))
        // Postmeta transfer
        .route("/postmeta/export", get(api::export_postmeta))
        .route("/postmeta/import", post(api::import_postmeta))
        // Status
        .route("/staging/posts", get(api::list_staging_posts))
        .route("/logs", get(api::list_logs))
        .layer(middleware::from_fn(move |req, next| {
            auth::psk_auth_layer(psk.clone(), req, next)
        }));

    // Health check (no auth required)
    let health_routes = Router::new().route("/health", get(health_check));

    Router::new()
        .nest("/api", api_routes)
        .merge(health_routes)
        .layer(
            ServiceBuilder::new()
                .layer(TraceLayer::new_for_http())
                .layer(cors),
        )
        .with_state(state)
}

/// Health check endpoint.
async fn health_check() -> &'static str {
    "OK"
}

#[cfg(test)]
mod testing;

#[cfg(test)]
mod tests;
