//! Persistence boundary for data set version mappings
//!
//! [`MappingStore`] is implemented by [`PgMappingStore`] for production and
//! by [`InMemoryMappingStore`] for tests and database-less local runs.

mod memory;
mod postgres;

pub use memory::InMemoryMappingStore;
pub use postgres::PgMappingStore;

use async_trait::async_trait;
use dsv_common::types::Version;
use serde::Serialize;
use std::sync::Arc;
use thiserror::Error;
use uuid::Uuid;

use super::types::DataSetVersionMapping;

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("Database error: {0}")]
    Sqlx(#[from] sqlx::Error),
    #[error("Mapping plan (de)serialization error: {0}")]
    Serde(#[from] serde_json::Error),
    #[error("{0}")]
    NotFound(String),
    #[error("{0}")]
    Duplicate(String),
    #[error(
        "Mapping for data set version '{target_version_id}' was modified concurrently \
         (expected revision {expected_revision})"
    )]
    Conflict {
        target_version_id: Uuid,
        expected_revision: i64,
    },
    #[error("Invalid stored value: {0}")]
    InvalidRow(String),
}

/// A data set version, as far as mapping is concerned
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DataSetVersion {
    pub id: Uuid,
    pub data_set_id: Uuid,
    pub version: Version,
}

/// Everything written by one successful batch
#[derive(Debug, Clone, Copy)]
pub struct MappingCommit<'a> {
    pub mapping: &'a DataSetVersionMapping,
    /// Revision of the snapshot the batch was validated against
    pub expected_revision: i64,
    /// Version number the target data set version will now carry
    pub target_version: Version,
}

#[async_trait]
pub trait MappingStore: Send + Sync {
    async fn find_by_target(
        &self,
        target_version_id: Uuid,
    ) -> Result<Option<DataSetVersionMapping>, StoreError>;

    async fn find_version(&self, id: Uuid) -> Result<Option<DataSetVersion>, StoreError>;

    /// Store a freshly seeded mapping; one per target version
    async fn insert(&self, mapping: &DataSetVersionMapping) -> Result<(), StoreError>;

    /// Atomically persist plans, completeness flags and the target version
    /// number, provided the stored revision still equals
    /// `commit.expected_revision`
    async fn commit(&self, commit: MappingCommit<'_>) -> Result<DataSetVersionMapping, StoreError>;
}

pub type SharedMappingStore = Arc<dyn MappingStore>;
