use dsv_common::{types::Version, DsvError};
use mediator::Request;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::mapping::calculator::{self, BreakingChange, BumpType};
use crate::mapping::{SharedMappingStore, StoreError};

/// Publish readiness of a next data set version: the version bump its
/// mappings imply and whether every dimension is resolved
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GetMappingStatusQuery {
    pub target_version_id: Uuid,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct GetMappingStatusResponse {
    pub source_version_id: Uuid,
    pub target_version_id: Uuid,
    pub source_version: Version,
    pub next_version: Version,
    pub bump: BumpType,
    pub location_mappings_complete: bool,
    pub filter_mappings_complete: bool,
    pub indicator_mappings_complete: bool,
    pub complete: bool,
    pub breaking_changes: Vec<BreakingChange>,
    pub revision: i64,
}

#[derive(Debug, thiserror::Error)]
pub enum GetMappingStatusError {
    #[error("No mapping exists for data set version '{0}'")]
    NotFound(Uuid),
    #[error("Source data set version '{0}' not found")]
    SourceVersionNotFound(Uuid),
    #[error("Cannot number the next version: {0}")]
    NextVersion(#[from] DsvError),
    #[error("Storage error: {0}")]
    Store(#[from] StoreError),
}

impl Request<Result<GetMappingStatusResponse, GetMappingStatusError>> for GetMappingStatusQuery {}

impl crate::cqrs::middleware::Query for GetMappingStatusQuery {}

#[tracing::instrument(skip(store))]
pub async fn handle(
    store: SharedMappingStore,
    query: GetMappingStatusQuery,
) -> Result<GetMappingStatusResponse, GetMappingStatusError> {
    let mapping = store
        .find_by_target(query.target_version_id)
        .await?
        .ok_or(GetMappingStatusError::NotFound(query.target_version_id))?;

    let source_id = mapping.source_data_set_version_id();
    let source = store
        .find_version(source_id)
        .await?
        .ok_or(GetMappingStatusError::SourceVersionNotFound(source_id))?;

    let bump = calculator::calculate_bump(&mapping);
    let next_version = bump.apply(&source.version)?;
    let completeness = mapping.completeness();

    Ok(GetMappingStatusResponse {
        source_version_id: source_id,
        target_version_id: mapping.target_data_set_version_id(),
        source_version: source.version,
        next_version,
        bump,
        location_mappings_complete: completeness.locations,
        filter_mappings_complete: completeness.filters,
        indicator_mappings_complete: completeness.indicators,
        complete: completeness.all_complete(),
        breaking_changes: calculator::breaking_changes(&mapping),
        revision: mapping.revision(),
    })
}
