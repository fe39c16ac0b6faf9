pub mod app;
pub mod chat;
pub mod client;
pub mod config;
pub mod editor;
pub mod error;
pub mod logging;
pub mod manifest;
pub mod models;
pub mod preferences;
pub mod prompt;
pub mod registry;
pub mod server;
pub mod store;

pub use error::AppError;

/// Load configuration, start logging and serve until Ctrl-C.
pub async fn run() -> Result<(), AppError> {
    // A missing .env is fine; real env vars still apply.
    let _ = dotenvy::dotenv();

    let config = config::StudioConfig::load()?;
    let _log_guard = logging::init(&config);

    tracing::info!("Starting Component Studio v{}", env!("CARGO_PKG_VERSION"));
    tracing::info!(
        prompts_dir = %config.prompts_dir.display(),
        public_dir = %config.public_dir.display(),
        components_dir = %config.components_dir.display(),
        "Asset directories"
    );

    server::run(&config, shutdown_signal()).await
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!(error = %e, "Failed to listen for Ctrl-C, running until killed");
        std::future::pending::<()>().await;
    }
}
