use async_trait::async_trait;
use chrono::Utc;
use std::collections::HashMap;
use tokio::sync::RwLock;
use tracing::instrument;
use uuid::Uuid;

use super::{DataSetVersion, MappingCommit, MappingStore, StoreError};
use crate::mapping::types::DataSetVersionMapping;

#[derive(Debug, Default)]
struct State {
    versions: HashMap<Uuid, DataSetVersion>,
    mappings: HashMap<Uuid, DataSetVersionMapping>,
}

/// Process-local store guarded by a single lock
#[derive(Debug, Default)]
pub struct InMemoryMappingStore {
    state: RwLock<State>,
}

impl InMemoryMappingStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a data set version, replacing any with the same id
    pub async fn insert_version(&self, version: DataSetVersion) {
        self.state.write().await.versions.insert(version.id, version);
    }
}

#[async_trait]
impl MappingStore for InMemoryMappingStore {
    async fn find_by_target(
        &self,
        target_version_id: Uuid,
    ) -> Result<Option<DataSetVersionMapping>, StoreError> {
        Ok(self.state.read().await.mappings.get(&target_version_id).cloned())
    }

    async fn find_version(&self, id: Uuid) -> Result<Option<DataSetVersion>, StoreError> {
        Ok(self.state.read().await.versions.get(&id).cloned())
    }

    #[instrument(skip_all, fields(target_version_id = %mapping.target_data_set_version_id()))]
    async fn insert(&self, mapping: &DataSetVersionMapping) -> Result<(), StoreError> {
        let mut state = self.state.write().await;
        let target = mapping.target_data_set_version_id();

        for id in [mapping.source_data_set_version_id(), target] {
            if !state.versions.contains_key(&id) {
                return Err(StoreError::NotFound(format!("Data set version '{id}' not found")));
            }
        }
        if state.mappings.contains_key(&target) {
            return Err(StoreError::Duplicate(format!(
                "A mapping already exists for data set version '{target}'"
            )));
        }

        state.mappings.insert(target, mapping.clone());
        Ok(())
    }

    #[instrument(skip_all, fields(
        target_version_id = %commit.mapping.target_data_set_version_id(),
        expected_revision = commit.expected_revision,
    ))]
    async fn commit(&self, commit: MappingCommit<'_>) -> Result<DataSetVersionMapping, StoreError> {
        let mut state = self.state.write().await;
        let target = commit.mapping.target_data_set_version_id();

        let stored_revision = state
            .mappings
            .get(&target)
            .map(DataSetVersionMapping::revision)
            .ok_or_else(|| StoreError::NotFound(format!("No mapping for data set version '{target}'")))?;
        if stored_revision != commit.expected_revision {
            return Err(StoreError::Conflict {
                target_version_id: target,
                expected_revision: commit.expected_revision,
            });
        }

        let version = state
            .versions
            .get_mut(&target)
            .ok_or_else(|| StoreError::NotFound(format!("Data set version '{target}' not found")))?;
        version.version = commit.target_version;

        let saved = commit
            .mapping
            .clone()
            .committed(commit.expected_revision + 1, Utc::now());
        state.mappings.insert(target, saved.clone());
        Ok(saved)
    }
}
