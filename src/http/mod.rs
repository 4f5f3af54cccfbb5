//! HTTP surface
//!
//! `GET /` search page, `POST /api/search`, `GET /api/download` and
//! `GET /static/*path`.

mod files;
mod handlers;

#[cfg(test)]
pub use handlers::SearchResponse;

use axum::response::{IntoResponse, Response};
use axum::routing::{get, post};
use axum::Router;
use std::sync::Arc;

use crate::config::ServerConfig;
use crate::error::AppError;
use crate::search::{NucleoEngine, SearchPipeline};

/// Shared, read-only request state
#[derive(Clone)]
pub struct AppState {
    pub config: Arc<ServerConfig>,
    pub pipeline: SearchPipeline,
}

impl AppState {
    /// State backed by the bundled nucleo engine
    pub fn new(config: ServerConfig) -> Self {
        let engine = Arc::new(NucleoEngine::with_options(config.engine.clone()));
        let pipeline = SearchPipeline::new(engine, config.limits.clone())
            .with_unreadable_policy(config.unreadable);
        Self {
            config: Arc::new(config),
            pipeline,
        }
    }

    #[cfg(test)]
    pub fn with_pipeline(config: ServerConfig, pipeline: SearchPipeline) -> Self {
        Self {
            config: Arc::new(config),
            pipeline,
        }
    }
}

/// Build the application router
pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/", get(handlers::index))
        .route("/api/search", post(handlers::search))
        .route("/api/download", get(handlers::download))
        .route("/static/*path", get(handlers::static_asset))
        .with_state(state)
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        (self.status_code(), self.message()).into_response()
    }
}
