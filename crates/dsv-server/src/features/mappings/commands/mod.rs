pub mod update;

use crate::mapping::{Filters, Indicators, Locations};

pub use update::{
    MappingUpdatesRequest, UpdateMappingsCommand, UpdateMappingsError, UpdateMappingsResponse,
    UpdatedMapping,
};

pub type UpdateLocationMappingsCommand = UpdateMappingsCommand<Locations>;
pub type UpdateFilterMappingsCommand = UpdateMappingsCommand<Filters>;
pub type UpdateIndicatorMappingsCommand = UpdateMappingsCommand<Indicators>;
