mod config;

use std::net::SocketAddr;
use std::sync::Arc;

use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;
use tracing::info;

use pictor_api::openai::OpenAiImages;
use pictor_api::{AppState, AppStateInner};
use pictor_storage::S3Store;

use crate::config::Config;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load .env if present
    let _ = dotenvy::dotenv();

    // Init logging
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| {
                "pictor=debug,pictor_api=debug,pictor_storage=info,tower_http=debug".into()
            }),
        )
        .init();

    // Config
    let config = match Config::from_env() {
        Ok(config) => config,
        Err(e) => {
            eprintln!("FATAL: {:#}", e);
            eprintln!("       Set them in the environment or a .env file and restart.");
            std::process::exit(1);
        }
    };

    // Init database
    let db = pictor_db::Database::open(&config.db_path)?;

    // Shared clients
    let http = reqwest::Client::new();
    let store = S3Store::from_env(config.s3.clone())?;
    let generator = OpenAiImages::new(
        http.clone(),
        config.openai_api_key.clone(),
        config.openai_base_url.clone(),
    );

    tokio::fs::create_dir_all(&config.scratch_dir).await?;
    info!("Scratch directory: {}", config.scratch_dir.display());

    let state: AppState = Arc::new(AppStateInner {
        db,
        generator: Arc::new(generator),
        store: Arc::new(store),
        http,
        scratch_dir: config.scratch_dir.clone(),
    });

    let app = pictor_api::router(state)
        .layer(CorsLayer::permissive())
        .layer(TraceLayer::new_for_http());

    let addr: SocketAddr = format!("{}:{}", config.host, config.port).parse()?;
    info!("Pictor listening on {}", addr);

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    Ok(())
}

async fn shutdown_signal() {
    let ctrl_c = tokio::signal::ctrl_c();
    #[cfg(unix)]
    {
        let mut sigterm =
            tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate())
                .expect("failed to install SIGTERM handler");
        tokio::select! {
            _ = ctrl_c => info!("Received Ctrl+C, shutting down..."),
            _ = sigterm.recv() => info!("Received SIGTERM, shutting down..."),
        }
    }
    #[cfg(not(unix))]
    {
        ctrl_c.await.ok();
        info!("Received Ctrl+C, shutting down...");
    }
}
