//! Data set version mapping API routes
//!
//! # Route Structure
//!
//! All routes are relative to
//! `/api/v1/public-data/data-set-versions/:target_version_id/mapping`:
//!
//! - `GET /locations` - Location mapping plan
//! - `PATCH /locations` - Batch update location mappings
//! - `GET /filters` - Filter option mapping plan
//! - `PATCH /filters` - Batch update filter option mappings
//! - `GET /indicators` - Indicator mapping plan
//! - `PATCH /indicators` - Batch update indicator mappings
//! - `GET /status` - Version bump and completeness of the mapping

use crate::api::response::{ApiResponse, ErrorResponse};
use crate::mapping::{Dimension, Filters, Indicators, Locations, SharedMappingStore};
use axum::{
    extract::{rejection::JsonRejection, rejection::PathRejection, Path, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::get,
    Json, Router,
};
use serde::Serialize;
use serde_json::json;
use uuid::Uuid;

use super::{
    commands::{MappingUpdatesRequest, UpdateMappingsCommand, UpdateMappingsError, UpdatedMapping},
    queries::{GetMappingPlanQuery, GetMappingStatusError, GetMappingStatusQuery, GetMappingsError},
};

// ============================================================================
// Router Configuration
// ============================================================================

/// Creates the mapping router, to be nested under `/public-data/data-set-versions`
pub fn mappings_routes() -> Router<SharedMappingStore> {
    Router::new()
        .route(
            "/:target_version_id/mapping/locations",
            get(get_mappings::<Locations>).patch(update_mappings::<Locations>),
        )
        .route(
            "/:target_version_id/mapping/filters",
            get(get_mappings::<Filters>).patch(update_mappings::<Filters>),
        )
        .route(
            "/:target_version_id/mapping/indicators",
            get(get_mappings::<Indicators>).patch(update_mappings::<Indicators>),
        )
        .route("/:target_version_id/mapping/status", get(get_mapping_status))
}

// ============================================================================
// Command Handlers (Write Operations)
// ============================================================================

#[derive(Serialize)]
struct UpdatedMappings<O> {
    updates: Vec<UpdatedMapping<O>>,
}

/// Batch update the mappings of one dimension
///
/// # Request Body
///
/// ```json
/// {
///   "updates": [
///     { "level": "LA", "sourceKey": "barnsley", "type": "ManualMapped", "candidateKey": "barnsley-2" },
///     { "level": "LA", "sourceKey": "old-la", "type": "ManualNone" }
///   ]
/// }
/// ```
///
/// `level` is only present for locations.
///
/// # Response
///
/// - `200 OK` - All updates applied, one result per update in request order
/// - `400 Bad Request` - Malformed body, or validation failures in `error.details.errors`
/// - `404 Not Found` - No mapping for the target version
/// - `409 Conflict` - Mapping changed since it was read
/// - `422 Unprocessable Entity` - Source version number cannot be bumped
/// - `500 Internal Server Error` - Storage error
#[tracing::instrument(skip(store, payload), fields(dimension = D::NAME))]
async fn update_mappings<D: Dimension>(
    State(store): State<SharedMappingStore>,
    path: Result<Path<Uuid>, PathRejection>,
    payload: Result<Json<MappingUpdatesRequest<D::Update>>, JsonRejection>,
) -> Result<Response, MappingApiError> {
    let Path(target_version_id) = path?;
    let Json(request) = payload?;
    let command = UpdateMappingsCommand::<D>::new(target_version_id, request);

    let response = super::commands::update::handle(store, command).await?;

    tracing::info!(
        %target_version_id,
        updates = response.updates.len(),
        revision = response.revision,
        "Mappings updated via API"
    );

    let meta = json!({
        "revision": response.revision,
        "complete": response.dimension_complete,
        "bump": response.bump,
        "nextVersion": response.next_version,
    });
    let data = UpdatedMappings { updates: response.updates };

    Ok((StatusCode::OK, Json(ApiResponse::success_with_meta(data, meta))).into_response())
}

// ============================================================================
// Query Handlers (Read Operations)
// ============================================================================

/// Get the mapping plan of one dimension
///
/// # Response
///
/// - `200 OK` - Plan with every source mapping and candidate
/// - `404 Not Found` - No mapping for the target version
/// - `500 Internal Server Error` - Storage error
#[tracing::instrument(skip(store), fields(dimension = D::NAME))]
async fn get_mappings<D: Dimension>(
    State(store): State<SharedMappingStore>,
    path: Result<Path<Uuid>, PathRejection>,
) -> Result<Response, MappingApiError> {
    let Path(target_version_id) = path?;
    let response =
        super::queries::get_plan::handle(store, GetMappingPlanQuery::<D>::new(target_version_id))
            .await?;

    tracing::debug!(
        %target_version_id,
        mappings = response.plan.len(),
        "Mapping plan retrieved via API"
    );

    let meta = json!({
        "complete": response.complete,
        "revision": response.revision,
    });

    Ok((StatusCode::OK, Json(ApiResponse::success_with_meta(response.plan, meta))).into_response())
}

/// Get the publish readiness of a next data set version
///
/// # Response
///
/// - `200 OK` - Source and next version numbers, bump type and completeness flags
/// - `404 Not Found` - No mapping for the target version
/// - `422 Unprocessable Entity` - Source version number cannot be bumped
/// - `500 Internal Server Error` - Storage error
#[tracing::instrument(skip(store))]
async fn get_mapping_status(
    State(store): State<SharedMappingStore>,
    path: Result<Path<Uuid>, PathRejection>,
) -> Result<Response, MappingApiError> {
    let Path(target_version_id) = path?;
    let response =
        super::queries::get_status::handle(store, GetMappingStatusQuery { target_version_id })
            .await?;

    Ok((StatusCode::OK, Json(ApiResponse::success(response))).into_response())
}

// ============================================================================
// Error Handling
// ============================================================================

/// Unified error type for mapping API endpoints
#[derive(Debug, thiserror::Error)]
enum MappingApiError {
    #[error(transparent)]
    Update(#[from] UpdateMappingsError),
    #[error(transparent)]
    Get(#[from] GetMappingsError),
    #[error(transparent)]
    Status(#[from] GetMappingStatusError),
    #[error("{0}")]
    BadRequest(String),
}

impl From<JsonRejection> for MappingApiError {
    fn from(rejection: JsonRejection) -> Self {
        Self::BadRequest(rejection.body_text())
    }
}

impl From<PathRejection> for MappingApiError {
    fn from(rejection: PathRejection) -> Self {
        Self::BadRequest(rejection.body_text())
    }
}

fn internal_error(context: &str, err: &MappingApiError) -> Response {
    tracing::error!(error = %err, "Storage error during {}", context);
    let error = ErrorResponse::new("INTERNAL_ERROR", "A storage error occurred");
    (StatusCode::INTERNAL_SERVER_ERROR, Json(error)).into_response()
}

impl IntoResponse for MappingApiError {
    fn into_response(self) -> Response {
        match &self {
            MappingApiError::BadRequest(message) => {
                let error = ErrorResponse::new("BAD_REQUEST", message.clone());
                (StatusCode::BAD_REQUEST, Json(error)).into_response()
            },

            // Update errors
            MappingApiError::Update(UpdateMappingsError::Validation(failures)) => {
                let error = ErrorResponse::with_details(
                    "VALIDATION_ERROR",
                    self.to_string(),
                    json!({ "errors": failures }),
                );
                (StatusCode::BAD_REQUEST, Json(error)).into_response()
            },
            MappingApiError::Update(UpdateMappingsError::MappingNotFound(_)) => {
                let error = ErrorResponse::new("NOT_FOUND", self.to_string());
                (StatusCode::NOT_FOUND, Json(error)).into_response()
            },
            MappingApiError::Update(UpdateMappingsError::Conflict(_)) => {
                let error = ErrorResponse::new("CONFLICT", self.to_string());
                (StatusCode::CONFLICT, Json(error)).into_response()
            },
            MappingApiError::Update(UpdateMappingsError::NextVersion(_))
            | MappingApiError::Status(GetMappingStatusError::NextVersion(_)) => {
                let error = ErrorResponse::new("INVALID_VERSION", self.to_string());
                (StatusCode::UNPROCESSABLE_ENTITY, Json(error)).into_response()
            },
            MappingApiError::Update(
                UpdateMappingsError::SourceVersionNotFound(_)
                | UpdateMappingsError::Store(_)
                | UpdateMappingsError::Internal(_),
            ) => internal_error("mapping update", &self),

            // Get errors
            MappingApiError::Get(GetMappingsError::NotFound(_)) => {
                let error = ErrorResponse::new("NOT_FOUND", self.to_string());
                (StatusCode::NOT_FOUND, Json(error)).into_response()
            },
            MappingApiError::Get(GetMappingsError::Store(_)) => {
                internal_error("mapping plan retrieval", &self)
            },

            // Status errors
            MappingApiError::Status(GetMappingStatusError::NotFound(_)) => {
                let error = ErrorResponse::new("NOT_FOUND", self.to_string());
                (StatusCode::NOT_FOUND, Json(error)).into_response()
            },
            MappingApiError::Status(
                GetMappingStatusError::SourceVersionNotFound(_) | GetMappingStatusError::Store(_),
            ) => internal_error("mapping status retrieval", &self),
        }
    }
}
