//! Feature modules implementing the DSV API
//!
//! Each feature is a vertical slice following the CQRS (Command Query
//! Responsibility Segregation) pattern:
//! - `commands/` - Write operations
//! - `queries/` - Read operations
//! - `routes.rs` - HTTP route definitions
//!
//! Commands and queries implement the mediator pattern using the `mediator`
//! crate.
//!
//! # Features
//!
//! - **mappings**: Review and manual resolution of data set version mappings

pub mod mappings;

use axum::Router;

use crate::mapping::SharedMappingStore;

/// Shared state for all feature routes
#[derive(Clone)]
pub struct FeatureState {
    /// Mapping persistence (Postgres or in-memory)
    pub store: SharedMappingStore,
}

/// Creates the API router with all feature routes mounted
///
/// - `/public-data/data-set-versions` - Data set version mappings
pub fn router(state: FeatureState) -> Router<()> {
    Router::new().nest(
        "/public-data/data-set-versions",
        mappings::mappings_routes().with_state(state.store),
    )
}
