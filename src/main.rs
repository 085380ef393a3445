use std::sync::Arc;

use tokio::signal;
use tracing::{error, info, warn};
use tracing_subscriber::prelude::*;

use brocode::upstream::{
    FirestoreStore, GeminiClient, HistoryStore, ImageError, ImageSearch, SarvamClient, SqliteStore,
};
use brocode::{create_router, AppState, Config, Orchestrator};

/// History backend: Firestore wins over SQLite; neither means no memory.
fn build_store(config: &Config) -> Option<Arc<dyn HistoryStore>> {
    if let Some(firestore) = config.firestore() {
        let project = firestore.project_id.clone();
        return match FirestoreStore::new(firestore) {
            Ok(store) => {
                info!("History store: Firestore (project {project}, app {})", config.app_id);
                Some(Arc::new(store))
            }
            Err(e) => {
                warn!("Firestore unavailable, running without history: {e}");
                None
            }
        };
    }

    let path = config.history_db_path.as_ref()?;
    match SqliteStore::open(path) {
        Ok(store) => {
            info!("History store: SQLite at {}", path.display());
            Some(Arc::new(store))
        }
        Err(e) => {
            warn!("SQLite store unavailable, running without history: {e}");
            None
        }
    }
}

fn build_orchestrator(config: &Config) -> Result<Orchestrator, ImageError> {
    let images = ImageSearch::new(config.image_keys(), config.http_timeout)?;
    let mut orchestrator = Orchestrator::new(images);

    match GeminiClient::new(
        config.gemini_api_key.clone(),
        config.gemini_model.clone(),
        config.gemini_base_url.clone(),
        config.http_timeout,
    ) {
        Ok(client) => {
            info!("Gemini model: {}", config.gemini_model);
            orchestrator = orchestrator.with_generator(Arc::new(client));
        }
        Err(e) => error!("Gemini client failed to initialize, generation endpoints will fail: {e}"),
    }

    match config.sarvam_api_key.clone() {
        Some(key) => match SarvamClient::new(config.sarvam_tts_endpoint.clone(), key, config.http_timeout) {
            Ok(client) => {
                info!("Speech synthesis enabled ({})", config.sarvam_tts_endpoint);
                orchestrator = orchestrator.with_speech(Arc::new(client));
            }
            Err(e) => warn!("Speech client failed to initialize, replies will be text only: {e}"),
        },
        None => warn!("SARVAM_AI_API_KEY not set, replies will be text only"),
    }

    if let Some(store) = build_store(config) {
        orchestrator = orchestrator.with_store(store);
    } else {
        info!("No history store configured, chat runs without memory");
    }

    Ok(orchestrator)
}

#[tokio::main]
async fn main() {
    let config_path = std::env::args().nth(1);
    let config = match &config_path {
        Some(path) => Config::load(path),
        None => Config::from_env(),
    };
    let config = match config {
        Ok(config) => config,
        Err(e) => {
            eprintln!("brocode: {e}");
            std::process::exit(1);
        }
    };

    // Setup logging
    let log_dir = config.data_dir.join("logs");
    std::fs::create_dir_all(&log_dir).ok();
    let log_file = match std::fs::OpenOptions::new()
        .create(true)
        .append(true)
        .open(log_dir.join("brocode.log"))
    {
        Ok(file) => file,
        Err(e) => {
            eprintln!("brocode: failed to open log file in {}: {e}", log_dir.display());
            std::process::exit(1);
        }
    };
    let (non_blocking, _guard) = tracing_appender::non_blocking(log_file);

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::fmt::layer()
                .with_writer(std::io::stdout)
                .with_filter(
                    tracing_subscriber::EnvFilter::from_default_env()
                        .add_directive(tracing::Level::INFO.into()),
                ),
        )
        .with(
            tracing_subscriber::fmt::layer()
                .with_writer(non_blocking)
                .with_ansi(false)
                .with_filter(
                    tracing_subscriber::EnvFilter::from_default_env()
                        .add_directive(tracing::Level::INFO.into()),
                ),
        )
        .init();

    info!("🚀 Starting brocode relay...");
    match &config_path {
        Some(path) => info!("Loaded config from {path}"),
        None => info!("Loaded config from environment"),
    }

    let orchestrator = match build_orchestrator(&config) {
        Ok(orchestrator) => orchestrator,
        Err(e) => {
            error!("Failed to build HTTP clients: {e}");
            std::process::exit(1);
        }
    };

    let app = create_router(AppState::new(orchestrator), &config.cors_origins);

    let addr = config.bind_address();
    let listener = match tokio::net::TcpListener::bind(&addr).await {
        Ok(listener) => listener,
        Err(e) => {
            error!("Failed to bind {addr}: {e}");
            std::process::exit(1);
        }
    };
    info!("Listening on http://{addr} (CORS origins: {:?})", config.cors_origins);

    if let Err(e) = axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
    {
        error!("Server error: {e}");
    }
    info!("Server shutdown complete");
}

async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = signal::ctrl_c().await {
            error!("Failed to listen for Ctrl+C: {e}");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut sigterm) => {
                sigterm.recv().await;
            }
            Err(e) => {
                error!("Failed to install SIGTERM handler: {e}");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => info!("Received Ctrl+C, shutting down"),
        _ = terminate => info!("Received terminate signal, shutting down"),
    }
}
