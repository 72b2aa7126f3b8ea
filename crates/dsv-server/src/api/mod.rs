//! Application wiring: state, router and service-level endpoints

pub mod response;

use crate::config::{Config, StorageBackend};
use crate::db;
use crate::error::AppError;
use crate::features;
use crate::mapping::{InMemoryMappingStore, PgMappingStore, SharedMappingStore};
use crate::middleware;
use axum::{extract::State, response::IntoResponse, routing::get, Json, Router};
use serde_json::json;
use sqlx::PgPool;
use std::sync::Arc;
use tower_http::compression::CompressionLayer;

use self::response::ApiResponse;

/// Application state shared across handlers
#[derive(Clone)]
pub struct AppState {
    pub store: SharedMappingStore,
    /// Present when mappings are stored in Postgres
    pub db: Option<PgPool>,
}

impl AppState {
    /// State backed by a fresh in-memory store
    pub fn in_memory() -> Self {
        Self::with_store(Arc::new(InMemoryMappingStore::new()))
    }

    pub fn with_store(store: SharedMappingStore) -> Self {
        Self { store, db: None }
    }

    /// Connect the configured storage backend, applying migrations for Postgres
    pub async fn connect(config: &Config) -> anyhow::Result<Self> {
        match config.storage {
            StorageBackend::Postgres => {
                let pool = db::create_pool(&config.database).await?;
                db::run_migrations(&pool).await?;
                Ok(Self {
                    store: Arc::new(PgMappingStore::new(pool.clone())),
                    db: Some(pool),
                })
            },
            StorageBackend::Memory => {
                tracing::warn!("Using in-memory mapping storage; data is lost on shutdown");
                Ok(Self::in_memory())
            },
        }
    }
}

/// Create the application router with all routes and middleware
pub fn create_router(state: AppState, config: &Config) -> Router {
    let feature_state = features::FeatureState {
        store: state.store.clone(),
    };

    Router::new()
        .route("/", get(root))
        .route("/health", get(health))
        .with_state(state)
        .nest("/api/v1", features::router(feature_state))
        .layer(CompressionLayer::new())
        .layer(middleware::tracing_layer())
        .layer(middleware::cors_layer(&config.cors))
}

async fn root() -> impl IntoResponse {
    Json(json!({
        "name": "DSV Server",
        "version": env!("CARGO_PKG_VERSION"),
        "status": "running"
    }))
}

/// Liveness, plus database connectivity when Postgres is in use
async fn health(State(state): State<AppState>) -> Result<impl IntoResponse, AppError> {
    let database = match &state.db {
        Some(pool) => {
            db::health_check(pool).await?;
            "connected"
        },
        None => "not configured",
    };

    Ok(ApiResponse::success(json!({
        "status": "healthy",
        "database": database
    })))
}
