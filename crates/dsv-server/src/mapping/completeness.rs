//! Completeness of mapping plans
//!
//! A dimension is complete once no source option is left in the `None` or
//! `AutoNone` state.

use serde::Serialize;

use super::types::{FilterPlan, IndicatorPlan, LocationPlan, MappingPlan, PlanKey};

/// Per-dimension completeness flags stored with the aggregate
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Completeness {
    #[serde(rename = "locationMappingsComplete")]
    pub locations: bool,
    #[serde(rename = "filterMappingsComplete")]
    pub filters: bool,
    #[serde(rename = "indicatorMappingsComplete")]
    pub indicators: bool,
}

impl Completeness {
    pub fn all_complete(&self) -> bool {
        self.locations && self.filters && self.indicators
    }
}

pub fn is_complete<K: PlanKey, O>(plan: &MappingPlan<K, O>) -> bool {
    plan.mappings().all(|(_, option)| !option.mapping.is_unresolved())
}

pub fn evaluate(locations: &LocationPlan, filters: &FilterPlan, indicators: &IndicatorPlan) -> Completeness {
    Completeness {
        locations: is_complete(locations),
        filters: is_complete(filters),
        indicators: is_complete(indicators),
    }
}
