//! DSV Common Library
#![deny(clippy::unwrap_used, clippy::expect_used)]
//!
//! Shared types, utilities, and error handling for the DSV project.
//!
//! # Overview
//!
//! This crate provides common functionality used across all DSV workspace members:
//!
//! - **Error Handling**: Custom error types and result types
//! - **Logging**: Centralized `tracing` subscriber configuration
//! - **Types**: Shared domain vocabulary (semantic versions, geographic levels)
//!
//! # Example
//!
//! ```no_run
//! use dsv_common::{Result, types::Version};
//!
//! fn next_minor(current: &str) -> Result<Version> {
//!     current.parse::<Version>()?.next_minor()
//! }
//! ```

pub mod error;
pub mod logging;
pub mod types;

// Re-export commonly used types
pub use error::{DsvError, Result};
