use mediator::Request;
use uuid::Uuid;

use crate::mapping::{completeness, Dimension, MappingPlan, SharedMappingStore, StoreError};

/// Fetch the mapping plan of one dimension
#[derive(Debug, Clone)]
pub struct GetMappingPlanQuery<D: Dimension> {
    pub target_version_id: Uuid,
    _dimension: std::marker::PhantomData<D>,
}

impl<D: Dimension> GetMappingPlanQuery<D> {
    pub fn new(target_version_id: Uuid) -> Self {
        Self {
            target_version_id,
            _dimension: std::marker::PhantomData,
        }
    }
}

#[derive(Debug, Clone)]
pub struct GetMappingPlanResponse<D: Dimension> {
    pub plan: MappingPlan<D::Key, D::Descriptor>,
    pub complete: bool,
    pub revision: i64,
}

#[derive(Debug, thiserror::Error)]
pub enum GetMappingsError {
    #[error("No mapping exists for data set version '{0}'")]
    NotFound(Uuid),
    #[error("Storage error: {0}")]
    Store(#[from] StoreError),
}

impl<D: Dimension> Request<Result<GetMappingPlanResponse<D>, GetMappingsError>>
    for GetMappingPlanQuery<D>
{
}

impl<D: Dimension> crate::cqrs::middleware::Query for GetMappingPlanQuery<D> {}

#[tracing::instrument(skip(store), fields(dimension = D::NAME))]
pub async fn handle<D: Dimension>(
    store: SharedMappingStore,
    query: GetMappingPlanQuery<D>,
) -> Result<GetMappingPlanResponse<D>, GetMappingsError> {
    let mapping = store
        .find_by_target(query.target_version_id)
        .await?
        .ok_or(GetMappingsError::NotFound(query.target_version_id))?;

    let plan = D::plan(&mapping).clone();
    Ok(GetMappingPlanResponse {
        complete: completeness::is_complete(&plan),
        revision: mapping.revision(),
        plan,
    })
}
