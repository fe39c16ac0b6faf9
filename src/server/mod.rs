//! Local development HTTP server.
//!
//! The API is a middleware in front of a static file service: requests that
//! match an API path + method are answered here, everything else falls
//! through to the public directory.

mod routes;

use std::future::Future;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use axum::extract::DefaultBodyLimit;
use axum::{middleware, Router};
use tokio::net::TcpListener;
use tower_http::services::ServeDir;

use crate::config::StudioConfig;
use crate::error::AppError;
use crate::registry::ComponentRegistry;
use crate::store::AssetStore;

pub use routes::dispatch;

/// Shared state for the API middleware.
pub struct ApiState {
    pub store: AssetStore,
    pub registry: ComponentRegistry,
    pub components_dir: PathBuf,
    pub manifest_path: PathBuf,
    pub max_body_bytes: usize,
}

impl ApiState {
    pub fn from_config(config: &StudioConfig) -> Result<Self, AppError> {
        Ok(Self {
            store: AssetStore::from_config(config),
            registry: ComponentRegistry::with_builtins()?,
            components_dir: config.components_dir.clone(),
            manifest_path: config.manifest_path(),
            max_body_bytes: config.max_body_bytes,
        })
    }
}

/// Build the full app: API middleware over static serving of `public_dir`.
pub fn build_app(state: Arc<ApiState>, public_dir: &Path) -> Router {
    let body_limit = state.max_body_bytes;
    Router::new()
        .fallback_service(ServeDir::new(public_dir))
        .layer(middleware::from_fn_with_state(state, routes::dispatch))
        .layer(DefaultBodyLimit::max(body_limit))
}

/// Serve until `shutdown` resolves.
pub async fn serve(
    listener: TcpListener,
    app: Router,
    shutdown: impl Future<Output = ()> + Send + 'static,
) -> Result<(), AppError> {
    let addr = listener.local_addr()?;
    tracing::info!("Studio server listening on http://{}", addr);

    axum::serve(listener, app)
        .with_graceful_shutdown(async move {
            shutdown.await;
            tracing::info!("Studio server shutting down");
        })
        .await?;

    Ok(())
}

/// Bind the configured address and run the studio server.
pub async fn run(
    config: &StudioConfig,
    shutdown: impl Future<Output = ()> + Send + 'static,
) -> Result<(), AppError> {
    let state = Arc::new(ApiState::from_config(config)?);
    let app = build_app(state, &config.public_dir);
    let listener = TcpListener::bind(config.addr()).await?;
    serve(listener, app, shutdown).await
}
