//! Manual reconciliation of data set version mappings
//!
//! Operators review the auto-mapper's plan for a next data set version and
//! resolve what it could not (or got wrong), one dimension at a time. Every
//! successful batch also refreshes the target version's number from the
//! resulting major/minor bump.

pub mod commands;
pub mod queries;
pub mod routes;

pub use commands::{
    MappingUpdatesRequest, UpdateFilterMappingsCommand, UpdateIndicatorMappingsCommand,
    UpdateLocationMappingsCommand, UpdateMappingsCommand, UpdateMappingsError,
    UpdateMappingsResponse, UpdatedMapping,
};

pub use queries::{
    GetFilterMappingsQuery, GetIndicatorMappingsQuery, GetLocationMappingsQuery,
    GetMappingPlanQuery, GetMappingPlanResponse, GetMappingStatusError, GetMappingStatusQuery,
    GetMappingStatusResponse, GetMappingsError,
};

pub use routes::mappings_routes;
