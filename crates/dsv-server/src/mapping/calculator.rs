//! Version bump calculation
//!
//! A next data set version is a major release when any source option has no
//! equivalent in the target (`AutoNone` or `ManualNone`), and a minor release
//! otherwise. Completeness plays no part in the decision.

use dsv_common::{types::Version, DsvError};
use serde::{Deserialize, Serialize};

use super::types::{DataSetVersionMapping, MappingPlan, MappingType, PlanKey};

/// Version bump type, only MAJOR or MINOR
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum BumpType {
    /// Options were removed, consumers may need to update their queries
    Major,
    /// Every source option is still reachable in the target
    Minor,
}

impl BumpType {
    pub fn is_major(&self) -> bool {
        matches!(self, BumpType::Major)
    }

    pub fn is_minor(&self) -> bool {
        matches!(self, BumpType::Minor)
    }

    /// Next version after `version` for this bump
    pub fn apply(&self, version: &Version) -> Result<Version, DsvError> {
        match self {
            BumpType::Major => version.next_major(),
            BumpType::Minor => version.next_minor(),
        }
    }
}

impl std::fmt::Display for BumpType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            BumpType::Major => write!(f, "major"),
            BumpType::Minor => write!(f, "minor"),
        }
    }
}

/// A source option that makes the next version a major release
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct BreakingChange {
    pub dimension: &'static str,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub level: Option<dsv_common::types::GeographicLevel>,
    pub source_key: String,
    #[serde(rename = "type")]
    pub mapping_type: MappingType,
}

fn collect_breaking<K: PlanKey, O>(
    dimension: &'static str,
    plan: &MappingPlan<K, O>,
    out: &mut Vec<BreakingChange>,
) {
    out.extend(plan.mappings().filter(|(_, option)| option.mapping.is_breaking()).map(
        |(key, option)| BreakingChange {
            dimension,
            level: key.level(),
            source_key: key.option_key().to_string(),
            mapping_type: option.mapping.mapping_type(),
        },
    ));
}

/// Every source option with no equivalent in the target version
pub fn breaking_changes(mapping: &DataSetVersionMapping) -> Vec<BreakingChange> {
    let mut changes = Vec::new();
    collect_breaking("locations", mapping.locations(), &mut changes);
    collect_breaking("filters", mapping.filters(), &mut changes);
    collect_breaking("indicators", mapping.indicators(), &mut changes);
    changes
}

fn has_breaking<K: PlanKey, O>(plan: &MappingPlan<K, O>) -> bool {
    plan.mappings().any(|(_, option)| option.mapping.is_breaking())
}

pub fn calculate_bump(mapping: &DataSetVersionMapping) -> BumpType {
    if has_breaking(mapping.locations())
        || has_breaking(mapping.filters())
        || has_breaking(mapping.indicators())
    {
        BumpType::Major
    } else {
        BumpType::Minor
    }
}

/// Version number the target will carry, given the source's number
pub fn next_version(source: &Version, mapping: &DataSetVersionMapping) -> Result<Version, DsvError> {
    calculate_bump(mapping).apply(source)
}
