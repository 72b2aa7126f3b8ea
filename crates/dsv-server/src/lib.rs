//! DSV Server Library
//!
//! HTTP server for reconciling the structure of successive data set
//! versions.
//!
//! # Overview
//!
//! When a next version of a data set is prepared, every location, filter
//! option and indicator of the previous version is mapped onto the new
//! version. An upstream auto-mapper seeds the mapping; operators then resolve
//! what it could not through this server's API. The server tracks when each
//! dimension is fully resolved and which version number (major or minor
//! bump) publishing the new version implies.
//!
//! # Architecture
//!
//! The server follows a **CQRS (Command Query Responsibility Segregation)** architecture:
//!
//! - **Commands** (`PATCH`): batch updates of one dimension's mappings
//! - **Queries** (`GET`): mapping plans and publish readiness
//!
//! The domain rules live in [`mapping`]; [`features`] exposes them over HTTP.
//!
//! ## Framework Stack
//!
//! - **Axum**: HTTP routing and extraction
//! - **SQLx**: Postgres persistence with JSONB mapping plans
//! - **Tower**: Middleware and service abstractions
//!
//! # Example
//!
//! ```no_run
//! use dsv_server::{api, config::Config};
//!
//! #[tokio::main]
//! async fn main() -> anyhow::Result<()> {
//!     let config = Config::load()?;
//!     let state = api::AppState::connect(&config).await?;
//!     let app = api::create_router(state, &config);
//!     let listener = tokio::net::TcpListener::bind("127.0.0.1:8000").await?;
//!     axum::serve(listener, app).await?;
//!     Ok(())
//! }
//! ```

pub mod api;
pub mod config;
pub mod cqrs;
pub mod db;
pub mod error;
pub mod features;
pub mod mapping;
pub mod middleware;

pub use error::AppError;
