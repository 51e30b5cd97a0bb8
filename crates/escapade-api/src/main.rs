//! Escapade API server entry point.

use std::sync::Arc;

use escapade_api::config::AppConfig;
use escapade_api::error::AppError;
use escapade_api::state::AppState;
use escapade_core::clock::SystemClock;
use escapade_core::repository::StoryGraphRepository;
use escapade_reply::ReplyRenderer;
use escapade_store::{PgProgressRepository, PgStoryGraphRepository};
use escapade_story::load_story_file;
use sqlx::postgres::PgPoolOptions;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> Result<(), AppError> {
    dotenvy::dotenv().ok();

    // Initialize tracing subscriber.
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .json()
        .init();

    tracing::info!("Starting Escapade conversation server");

    let config = AppConfig::from_env()?;

    // Create database connection pool and bring the schema up to date.
    let pool = PgPoolOptions::new()
        .max_connections(config.db_max_connections)
        .connect(&config.database_url)
        .await?;
    sqlx::migrate!("../../migrations").run(&pool).await?;

    let story_graph: Arc<dyn StoryGraphRepository> = match &config.story_file {
        Some(path) => {
            tracing::info!(path = %path.display(), "serving story graph from file");
            Arc::new(load_story_file(path)?)
        }
        None => Arc::new(PgStoryGraphRepository::new(pool.clone())),
    };

    let app_state = AppState::new(
        story_graph,
        Arc::new(PgProgressRepository::new(pool)),
        Arc::new(SystemClock),
        ReplyRenderer::new(config.public_base_url.clone()),
        config.engine_settings(),
    );

    // TODO: Replace CorsLayer::permissive() with restricted origins for production.
    let app = escapade_api::router(app_state)
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive());

    let addr = config.bind_addr()?;
    tracing::info!("Listening on {}", addr);

    let listener = tokio::net::TcpListener::bind(addr).await?;

    axum::serve(listener, app).await?;

    Ok(())
}
