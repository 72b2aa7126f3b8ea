use dsv_common::{
    types::{GeographicLevel, Version},
    DsvError,
};
use mediator::Request;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::mapping::{
    calculator, reconcile, BumpType, Dimension, MappingCommit, OptionMapping, ReconcileError,
    SharedMappingStore, StoreError, ValidationFailure,
};
use crate::mapping::types::PlanKey;

/// Body of a `PATCH .../mapping/{dimension}` request
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MappingUpdatesRequest<U> {
    #[serde(default = "Vec::new")]
    pub updates: Vec<U>,
}

/// Apply a batch of manual mapping updates to one dimension
#[derive(Debug, Clone)]
pub struct UpdateMappingsCommand<D: Dimension> {
    pub target_version_id: Uuid,
    pub updates: Vec<D::Update>,
}

impl<D: Dimension> UpdateMappingsCommand<D> {
    pub fn new(target_version_id: Uuid, request: MappingUpdatesRequest<D::Update>) -> Self {
        Self {
            target_version_id,
            updates: request.updates,
        }
    }
}

/// Resulting mapping of one update, in request order
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct UpdatedMapping<O> {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub level: Option<GeographicLevel>,
    pub source_key: String,
    pub mapping: OptionMapping<O>,
}

#[derive(Debug, Clone)]
pub struct UpdateMappingsResponse<O> {
    pub updates: Vec<UpdatedMapping<O>>,
    pub revision: i64,
    pub dimension_complete: bool,
    pub bump: BumpType,
    pub next_version: Version,
}

#[derive(Debug, thiserror::Error)]
pub enum UpdateMappingsError {
    #[error("No mapping exists for data set version '{0}'")]
    MappingNotFound(Uuid),
    #[error("Source data set version '{0}' not found")]
    SourceVersionNotFound(Uuid),
    #[error("{} mapping update(s) failed validation", .0.len())]
    Validation(Vec<ValidationFailure>),
    #[error("{0}")]
    Conflict(String),
    #[error("Cannot number the next version: {0}")]
    NextVersion(#[from] DsvError),
    #[error("Storage error: {0}")]
    Store(StoreError),
    #[error("Internal error: {0}")]
    Internal(String),
}

impl From<StoreError> for UpdateMappingsError {
    fn from(err: StoreError) -> Self {
        match err {
            StoreError::Conflict { .. } => Self::Conflict(err.to_string()),
            other => Self::Store(other),
        }
    }
}

impl From<ReconcileError> for UpdateMappingsError {
    fn from(err: ReconcileError) -> Self {
        match err {
            ReconcileError::Validation(failures) => Self::Validation(failures),
            other => Self::Internal(other.to_string()),
        }
    }
}

impl<D: Dimension> Request<Result<UpdateMappingsResponse<D::Descriptor>, UpdateMappingsError>>
    for UpdateMappingsCommand<D>
{
}

impl<D: Dimension> crate::cqrs::middleware::Command for UpdateMappingsCommand<D> {}

#[tracing::instrument(
    skip(store, command),
    fields(
        dimension = D::NAME,
        target_version_id = %command.target_version_id,
        updates = command.updates.len()
    )
)]
pub async fn handle<D: Dimension>(
    store: SharedMappingStore,
    command: UpdateMappingsCommand<D>,
) -> Result<UpdateMappingsResponse<D::Descriptor>, UpdateMappingsError> {
    let current = store
        .find_by_target(command.target_version_id)
        .await?
        .ok_or(UpdateMappingsError::MappingNotFound(command.target_version_id))?;

    let reconciliation = reconcile::<D>(&current, &command.updates)?;

    let source_id = current.source_data_set_version_id();
    let source = store
        .find_version(source_id)
        .await?
        .ok_or(UpdateMappingsError::SourceVersionNotFound(source_id))?;

    let bump = calculator::calculate_bump(&reconciliation.mapping);
    let next_version = bump.apply(&source.version)?;

    let saved = store
        .commit(MappingCommit {
            mapping: &reconciliation.mapping,
            expected_revision: current.revision(),
            target_version: next_version,
        })
        .await?;

    tracing::info!(
        revision = saved.revision(),
        %bump,
        %next_version,
        "Mapping updates committed"
    );

    let updates = reconciliation
        .applied
        .into_iter()
        .map(|applied| UpdatedMapping {
            level: applied.key.level(),
            source_key: applied.key.option_key().to_string(),
            mapping: applied.mapping,
        })
        .collect();

    Ok(UpdateMappingsResponse {
        updates,
        revision: saved.revision(),
        dimension_complete: crate::mapping::completeness::is_complete(D::plan(&saved)),
        bump,
        next_version,
    })
}
