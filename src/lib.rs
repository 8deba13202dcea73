//! StudySpot Live
//!
//! Shows and updates the occupancy of shared study spots kept in a document store.
//! The [`viewmodel::SpotViewModel`] owns the observable state, the
//! [`repository::SpotRepository`] talks to the [`store::RemoteStore`], and [`api`]
//! exposes both to a presentation layer over HTTP.

pub mod api;
pub mod config;
pub mod errors;
pub mod models;
pub mod repository;
pub mod store;
pub mod viewmodel;

use std::sync::Arc;

use axum::{
    routing::{delete, get, post, put},
    Router,
};
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;

use config::{Config, StoreKind};
use repository::SpotRepository;
use store::{init_database, MemoryStore, RemoteStore, SqliteStore};
use viewmodel::SpotViewModel;

/// Application state shared across all handlers.
#[derive(Clone)]
pub struct AppState {
    pub view_model: SpotViewModel,
}

/// Open the configured document store.
pub async fn open_store(config: &Config) -> Result<Arc<dyn RemoteStore>, sqlx::Error> {
    let store: Arc<dyn RemoteStore> = match config.store {
        StoreKind::Sqlite => {
            let pool = init_database(&config.db_path).await?;
            Arc::new(SqliteStore::new(pool))
        }
        StoreKind::Memory => Arc::new(MemoryStore::new()),
    };
    Ok(store)
}

/// Build the repository described by `config` on top of `store`.
pub fn build_repository(store: Arc<dyn RemoteStore>, config: &Config) -> SpotRepository {
    SpotRepository::new(store, config.collection.clone())
        .with_timeout(config.remote_timeout)
        .with_seed_spot(config.seed_spot_name.clone())
}

/// Create the application router with all routes.
pub fn create_router(state: AppState) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    let api_routes = Router::new()
        .route("/spots", get(api::get_spots))
        .route("/spots", post(api::create_spot))
        .route("/spots/refresh", post(api::refresh_spots))
        .route("/spots/{id}/status", put(api::update_spot_status))
        .route("/error", delete(api::clear_error));

    // Health check
    let health_routes = Router::new().route("/health", get(health_check));

    Router::new()
        .nest("/api", api_routes)
        .merge(health_routes)
        .layer(cors)
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

/// Health check endpoint.
async fn health_check() -> &'static str {
    "OK"
}
