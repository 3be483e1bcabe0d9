use axum::{routing::get, Router};
use std::sync::Arc;
use tower_http::{cors::CorsLayer, trace::TraceLayer};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use quizroom::{
    auth::StaticIdentityResolver,
    broadcast::ChannelBroadcaster,
    config::EngineConfig,
    quiz::StaticQuizDirectory,
    state::{AppState, SessionEngine},
    store::MemoryStore,
    ws,
};

#[tokio::main]
async fn main() {
    // Load .env file if present (before any env var reads)
    if let Err(e) = dotenvy::dotenv() {
        if !matches!(e, dotenvy::Error::Io(_)) {
            eprintln!("Warning: Failed to load .env file: {}", e);
        }
    }

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "quizroom=debug,tower_http=debug".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    tracing::info!("Starting quizroom...");

    let config = EngineConfig::from_env();

    let quizzes = match std::env::var("QUIZ_FILE") {
        Ok(path) => match std::fs::read_to_string(&path) {
            Ok(json) => match StaticQuizDirectory::from_json(&json) {
                Ok(dir) => {
                    tracing::info!("Loaded quiz content from {path}");
                    dir
                }
                Err(e) => {
                    tracing::error!("Failed to parse {path}: {e}");
                    std::process::exit(1);
                }
            },
            Err(e) => {
                tracing::error!("Failed to read {path}: {e}");
                std::process::exit(1);
            }
        },
        Err(_) => {
            tracing::warn!("QUIZ_FILE not set - no quiz content, sessions cannot be created");
            StaticQuizDirectory::new()
        }
    };

    let bind_addr = config.bind_addr;
    let engine = Arc::new(SessionEngine::new(
        Arc::new(MemoryStore::new()),
        Arc::new(quizzes),
        Arc::new(ChannelBroadcaster::new()),
        config,
    ));
    let state = AppState::new(engine, Arc::new(StaticIdentityResolver::new()));

    let app = Router::new()
        .route("/ws", get(ws::ws_handler))
        .layer(CorsLayer::permissive())
        .layer(TraceLayer::new_for_http())
        .with_state(state);

    tracing::info!("Listening on http://{}", bind_addr);

    let listener = tokio::net::TcpListener::bind(bind_addr)
        .await
        .expect("failed to bind listen address");
    axum::serve(listener, app).await.expect("server error");
}
