//! Place Chain Back binary entrypoint wiring REST, SSE, the place validator and storage.

use std::{env, net::SocketAddr, sync::Arc};

use anyhow::Context;
use axum::Router;
use tokio::net::TcpListener;
use tower_http::{cors::CorsLayer, trace::TraceLayer};
use tracing::{info, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use place_chain_back::{
    config::AppConfig,
    dao::{
        game_store::{GameStore, memory::MemoryGameStore},
        storage::StorageError,
    },
    routes,
    services::{place_validator::GeminiValidator, storage_supervisor},
    state::{AppState, SharedState},
};

const GEMINI_API_KEY_ENV: &str = "GEMINI_API_KEY";
const STORAGE_BACKEND_ENV: &str = "STORAGE_BACKEND";

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    init_tracing();

    let config = AppConfig::load();
    let api_key = env::var(GEMINI_API_KEY_ENV).ok();
    if api_key.as_deref().is_none_or(|key| key.trim().is_empty()) {
        warn!("{GEMINI_API_KEY_ENV} is not set; every place check will report the validator as unavailable");
    }
    let validator = Arc::new(GeminiValidator::new(config.validator(), api_key));

    let app_state = AppState::new(config, validator);
    start_storage(&app_state).await?;

    // Build the HTTP router once the shared state is ready.
    let app = build_router(app_state);

    let port = env::var("PORT")
        .or_else(|_| env::var("SERVER_PORT"))
        .ok()
        .and_then(|value| value.parse::<u16>().ok())
        .unwrap_or(8080);

    let addr = SocketAddr::from(([0, 0, 0, 0], port));
    info!(%addr, "starting server");

    let listener = TcpListener::bind(addr).await.context("binding server")?;
    let service = app.into_make_service();
    axum::serve(listener, service)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("serving axum")?;

    Ok(())
}

/// Spawn the storage supervisor for the backend named by `STORAGE_BACKEND` (default `mongo`).
async fn start_storage(state: &SharedState) -> anyhow::Result<()> {
    let backend = env::var(STORAGE_BACKEND_ENV).unwrap_or_else(|_| "mongo".into());

    match backend.trim().to_ascii_lowercase().as_str() {
        #[cfg(feature = "mongo-store")]
        "mongo" | "mongodb" => {
            use place_chain_back::dao::game_store::mongodb::{MongoConfig, MongoGameStore};

            let mongo = MongoConfig::from_env()
                .await
                .context("reading MongoDB configuration")?;
            info!(database = %mongo.database_name, "using MongoDB storage");
            tokio::spawn(storage_supervisor::run(state.clone(), move || {
                let mongo = mongo.clone();
                async move {
                    let store = MongoGameStore::connect(mongo).await?;
                    Ok::<_, StorageError>(Arc::new(store) as Arc<dyn GameStore>)
                }
            }));
        }
        #[cfg(feature = "couch-store")]
        "couch" | "couchdb" => {
            use place_chain_back::dao::game_store::couchdb::{CouchConfig, CouchGameStore};

            let couch = CouchConfig::from_env().context("reading CouchDB configuration")?;
            info!(url = %couch.base_url, database = %couch.database, "using CouchDB storage");
            tokio::spawn(storage_supervisor::run(state.clone(), move || {
                let couch = couch.clone();
                async move {
                    let store = CouchGameStore::connect(couch).await?;
                    Ok::<_, StorageError>(Arc::new(store) as Arc<dyn GameStore>)
                }
            }));
        }
        "memory" => {
            warn!("using in-memory storage; scores are lost on restart");
            let store = MemoryGameStore::new();
            tokio::spawn(storage_supervisor::run(state.clone(), move || {
                let store = store.clone();
                async move { Ok::<_, StorageError>(Arc::new(store) as Arc<dyn GameStore>) }
            }));
        }
        other => anyhow::bail!("unsupported {STORAGE_BACKEND_ENV} `{other}`"),
    }

    Ok(())
}

/// Build the top-level router and attach cross-cutting middleware layers.
fn build_router(state: SharedState) -> Router<()> {
    routes::router(state)
        .layer(CorsLayer::permissive())
        .layer(TraceLayer::new_for_http())
}

/// Configure tracing subscribers so logs include spans by default.
fn init_tracing() {
    let env_filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| "info,tower_http=debug".into());
    tracing_subscriber::registry()
        .with(env_filter)
        .with(tracing_subscriber::fmt::layer())
        .init();
}

/// Wait for Ctrl+C or SIGTERM and shut the server down gracefully.
async fn shutdown_signal() {
    #[cfg(unix)]
    {
        use tokio::signal::unix::{SignalKind, signal};

        match signal(SignalKind::terminate()) {
            Ok(mut term) => {
                tokio::select! {
                    _ = tokio::signal::ctrl_c() => {},
                    _ = term.recv() => {},
                }
            }
            Err(err) => {
                warn!(error = %err, "failed to install SIGTERM handler; waiting for Ctrl+C");
                let _ = tokio::signal::ctrl_c().await;
            }
        }
    }

    #[cfg(not(unix))]
    {
        let _ = tokio::signal::ctrl_c().await;
    }
}
