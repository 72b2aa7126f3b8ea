pub mod get_plan;
pub mod get_status;

use crate::mapping::{Filters, Indicators, Locations};

pub use get_plan::{GetMappingsError, GetMappingPlanQuery, GetMappingPlanResponse};
pub use get_status::{GetMappingStatusError, GetMappingStatusQuery, GetMappingStatusResponse};

pub type GetLocationMappingsQuery = GetMappingPlanQuery<Locations>;
pub type GetFilterMappingsQuery = GetMappingPlanQuery<Filters>;
pub type GetIndicatorMappingsQuery = GetMappingPlanQuery<Indicators>;
