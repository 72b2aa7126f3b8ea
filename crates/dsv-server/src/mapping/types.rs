//! Core types for data set version mappings
//!
//! A [`DataSetVersionMapping`] pairs a source data set version with its next
//! (target) version and holds, per dimension, a [`MappingPlan`]: one
//! [`OptionMapping`] per source option plus the pool of target-side
//! candidates those options may be mapped onto.

use chrono::{DateTime, Utc};
use dsv_common::types::GeographicLevel;
use serde::{de::DeserializeOwned, Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;
use uuid::Uuid;

use super::completeness::{self, Completeness};
use super::validator::MappingUpdate;

// ============================================================================
// Keys
// ============================================================================

/// Stable identifier of an option within a dimension
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct OptionKey(String);

impl OptionKey {
    pub fn new(key: impl Into<String>) -> Self {
        Self(key.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for OptionKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for OptionKey {
    fn from(key: &str) -> Self {
        Self::new(key)
    }
}

/// Location identity: keys are only unique within a geographic level
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct LocationKey {
    pub level: GeographicLevel,
    pub key: OptionKey,
}

impl LocationKey {
    pub fn new(level: GeographicLevel, key: impl Into<String>) -> Self {
        Self {
            level,
            key: OptionKey::new(key),
        }
    }
}

impl fmt::Display for LocationKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.level, self.key)
    }
}

/// Key type of a mapping plan
///
/// Levelled keys (locations) serialize grouped by geographic level; flat keys
/// (filters, indicators) serialize as a single map.
pub trait PlanKey: Ord + Clone + fmt::Debug + fmt::Display + Send + Sync + 'static {
    const LEVELLED: bool;

    fn level(&self) -> Option<GeographicLevel>;

    fn option_key(&self) -> &OptionKey;

    /// Rebuild a key from its parts, `None` if the parts don't fit this key type
    fn from_parts(level: Option<GeographicLevel>, key: OptionKey) -> Option<Self>;
}

impl PlanKey for OptionKey {
    const LEVELLED: bool = false;

    fn level(&self) -> Option<GeographicLevel> {
        None
    }

    fn option_key(&self) -> &OptionKey {
        self
    }

    fn from_parts(level: Option<GeographicLevel>, key: OptionKey) -> Option<Self> {
        match level {
            None => Some(key),
            Some(_) => None,
        }
    }
}

impl PlanKey for LocationKey {
    const LEVELLED: bool = true;

    fn level(&self) -> Option<GeographicLevel> {
        Some(self.level)
    }

    fn option_key(&self) -> &OptionKey {
        &self.key
    }

    fn from_parts(level: Option<GeographicLevel>, key: OptionKey) -> Option<Self> {
        level.map(|level| LocationKey { level, key })
    }
}

// ============================================================================
// Mapping state
// ============================================================================

/// Discriminant of a mapping's state, as submitted by operators and reported
/// back in responses
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum MappingType {
    /// Not yet reconciled (data set not processed by the auto-mapper)
    None,
    AutoMapped,
    AutoNone,
    ManualMapped,
    ManualNone,
}

impl MappingType {
    /// The only types an operator may submit
    pub const MANUAL: [MappingType; 2] = [MappingType::ManualMapped, MappingType::ManualNone];

    pub fn is_manual(self) -> bool {
        Self::MANUAL.contains(&self)
    }

    pub fn as_str(self) -> &'static str {
        match self {
            MappingType::None => "None",
            MappingType::AutoMapped => "AutoMapped",
            MappingType::AutoNone => "AutoNone",
            MappingType::ManualMapped => "ManualMapped",
            MappingType::ManualNone => "ManualNone",
        }
    }
}

impl fmt::Display for MappingType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// State of a single source option's mapping
///
/// Mapped variants carry the target candidate's key; the others cannot.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum Mapping {
    None,
    AutoMapped {
        #[serde(rename = "candidateKey")]
        candidate_key: OptionKey,
    },
    AutoNone,
    ManualMapped {
        #[serde(rename = "candidateKey")]
        candidate_key: OptionKey,
    },
    ManualNone,
}

impl Mapping {
    pub fn mapping_type(&self) -> MappingType {
        match self {
            Mapping::None => MappingType::None,
            Mapping::AutoMapped { .. } => MappingType::AutoMapped,
            Mapping::AutoNone => MappingType::AutoNone,
            Mapping::ManualMapped { .. } => MappingType::ManualMapped,
            Mapping::ManualNone => MappingType::ManualNone,
        }
    }

    pub fn candidate_key(&self) -> Option<&OptionKey> {
        match self {
            Mapping::AutoMapped { candidate_key } | Mapping::ManualMapped { candidate_key } => {
                Some(candidate_key)
            },
            Mapping::None | Mapping::AutoNone | Mapping::ManualNone => None,
        }
    }

    /// Still awaiting resolution; blocks completeness
    pub fn is_unresolved(&self) -> bool {
        matches!(self, Mapping::None | Mapping::AutoNone)
    }

    /// Source option has no equivalent in the target version
    pub fn is_breaking(&self) -> bool {
        matches!(self, Mapping::AutoNone | Mapping::ManualNone)
    }
}

/// Mapping of one source-side option
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OptionMapping<O> {
    pub source: O,
    #[serde(flatten)]
    pub mapping: Mapping,
}

impl<O> OptionMapping<O> {
    pub fn new(source: O, mapping: Mapping) -> Self {
        Self { source, mapping }
    }
}

// ============================================================================
// Option descriptors
// ============================================================================

/// Descriptor of a location option
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LocationOption {
    pub label: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub code: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub old_code: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub urn: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub la_estab: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub ukprn: Option<String>,
}

impl LocationOption {
    pub fn new(label: impl Into<String>) -> Self {
        Self {
            label: label.into(),
            code: None,
            old_code: None,
            urn: None,
            la_estab: None,
            ukprn: None,
        }
    }

    pub fn with_code(mut self, code: impl Into<String>) -> Self {
        self.code = Some(code.into());
        self
    }
}

/// Descriptor of a filter option
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FilterOption {
    pub label: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub is_aggregate: Option<bool>,
}

impl FilterOption {
    pub fn new(label: impl Into<String>) -> Self {
        Self {
            label: label.into(),
            is_aggregate: None,
        }
    }
}

/// Descriptor of an indicator
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct IndicatorOption {
    pub label: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub unit: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub decimal_places: Option<u8>,
}

impl IndicatorOption {
    pub fn new(label: impl Into<String>) -> Self {
        Self {
            label: label.into(),
            unit: None,
            decimal_places: None,
        }
    }
}

// ============================================================================
// Mapping plans
// ============================================================================

/// Source option mappings plus the candidate pool of one dimension
///
/// There is no public mutator: plans are built once for seeding and changed
/// afterwards only by the reconciliation engine, which produces a new plan.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MappingPlan<K: Ord, O> {
    pub(super) mappings: BTreeMap<K, OptionMapping<O>>,
    pub(super) candidates: BTreeMap<K, O>,
}

impl<K: Ord, O> Default for MappingPlan<K, O> {
    fn default() -> Self {
        Self {
            mappings: BTreeMap::new(),
            candidates: BTreeMap::new(),
        }
    }
}

impl<K: PlanKey, O> MappingPlan<K, O> {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add (or replace) the mapping of a source option
    pub fn with_mapping(mut self, key: K, source: O, mapping: Mapping) -> Self {
        self.mappings.insert(key, OptionMapping::new(source, mapping));
        self
    }

    /// Add (or replace) a target-side candidate
    pub fn with_candidate(mut self, key: K, candidate: O) -> Self {
        self.candidates.insert(key, candidate);
        self
    }

    pub fn mapping(&self, key: &K) -> Option<&OptionMapping<O>> {
        self.mappings.get(key)
    }

    pub fn mappings(&self) -> impl Iterator<Item = (&K, &OptionMapping<O>)> {
        self.mappings.iter()
    }

    pub fn candidate(&self, key: &K) -> Option<&O> {
        self.candidates.get(key)
    }

    pub fn candidates(&self) -> impl Iterator<Item = (&K, &O)> {
        self.candidates.iter()
    }

    pub fn has_candidate(&self, key: &K) -> bool {
        self.candidates.contains_key(key)
    }

    pub fn len(&self) -> usize {
        self.mappings.len()
    }

    pub fn is_empty(&self) -> bool {
        self.mappings.is_empty()
    }

    /// Replace the state of an existing mapping, returning the new entry
    pub(super) fn set_mapping(&mut self, key: &K, mapping: Mapping) -> Option<&OptionMapping<O>> {
        let entry = self.mappings.get_mut(key)?;
        entry.mapping = mapping;
        Some(entry)
    }
}

pub type LocationPlan = MappingPlan<LocationKey, LocationOption>;
pub type FilterPlan = MappingPlan<OptionKey, FilterOption>;
pub type IndicatorPlan = MappingPlan<OptionKey, IndicatorOption>;

// ============================================================================
// Aggregate
// ============================================================================

/// Mapping between a data set version and its next version
///
/// Exactly one exists per target version. The completeness flags are
/// derived from the plans and kept alongside them for fast reads.
#[derive(Debug, Clone, PartialEq)]
pub struct DataSetVersionMapping {
    id: Uuid,
    source_data_set_version_id: Uuid,
    target_data_set_version_id: Uuid,
    locations: LocationPlan,
    filters: FilterPlan,
    indicators: IndicatorPlan,
    completeness: Completeness,
    revision: i64,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl DataSetVersionMapping {
    /// New aggregate as seeded by the auto-mapper, at revision 0
    pub fn new(
        source_data_set_version_id: Uuid,
        target_data_set_version_id: Uuid,
        locations: LocationPlan,
        filters: FilterPlan,
        indicators: IndicatorPlan,
    ) -> Self {
        let now = Utc::now();
        let completeness = completeness::evaluate(&locations, &filters, &indicators);
        Self {
            id: Uuid::new_v4(),
            source_data_set_version_id,
            target_data_set_version_id,
            locations,
            filters,
            indicators,
            completeness,
            revision: 0,
            created_at: now,
            updated_at: now,
        }
    }

    /// Rebuild a stored aggregate
    ///
    /// Completeness is re-derived from the plans rather than trusted from
    /// storage.
    #[allow(clippy::too_many_arguments)]
    pub(crate) fn restore(
        id: Uuid,
        source_data_set_version_id: Uuid,
        target_data_set_version_id: Uuid,
        locations: LocationPlan,
        filters: FilterPlan,
        indicators: IndicatorPlan,
        revision: i64,
        created_at: DateTime<Utc>,
        updated_at: DateTime<Utc>,
    ) -> Self {
        let completeness = completeness::evaluate(&locations, &filters, &indicators);
        Self {
            id,
            source_data_set_version_id,
            target_data_set_version_id,
            locations,
            filters,
            indicators,
            completeness,
            revision,
            created_at,
            updated_at,
        }
    }

    /// Same aggregate after a successful commit
    pub(crate) fn committed(mut self, revision: i64, updated_at: DateTime<Utc>) -> Self {
        self.revision = revision;
        self.updated_at = updated_at;
        self
    }

    pub fn id(&self) -> Uuid {
        self.id
    }

    pub fn source_data_set_version_id(&self) -> Uuid {
        self.source_data_set_version_id
    }

    pub fn target_data_set_version_id(&self) -> Uuid {
        self.target_data_set_version_id
    }

    pub fn locations(&self) -> &LocationPlan {
        &self.locations
    }

    pub fn filters(&self) -> &FilterPlan {
        &self.filters
    }

    pub fn indicators(&self) -> &IndicatorPlan {
        &self.indicators
    }

    pub fn completeness(&self) -> Completeness {
        self.completeness
    }

    pub fn location_mappings_complete(&self) -> bool {
        self.completeness.locations
    }

    pub fn filter_mappings_complete(&self) -> bool {
        self.completeness.filters
    }

    pub fn indicator_mappings_complete(&self) -> bool {
        self.completeness.indicators
    }

    /// Optimistic concurrency counter, incremented on every commit
    pub fn revision(&self) -> i64 {
        self.revision
    }

    pub fn created_at(&self) -> DateTime<Utc> {
        self.created_at
    }

    pub fn updated_at(&self) -> DateTime<Utc> {
        self.updated_at
    }

    fn recompute_completeness(mut self) -> Self {
        self.completeness = completeness::evaluate(&self.locations, &self.filters, &self.indicators);
        self
    }
}

// ============================================================================
// Dimensions
// ============================================================================

/// Permission to replace a dimension's plan wholesale
///
/// Only constructible inside this crate, so a changed aggregate can only come
/// out of [`reconcile`](super::reconcile::reconcile).
#[derive(Debug)]
pub struct PlanSwap(());

impl PlanSwap {
    pub(crate) fn new() -> Self {
        Self(())
    }
}

/// One of the three structural axes of a data set
///
/// Lets the validator, the reconciliation engine and the HTTP handlers be
/// written once for locations, filters and indicators.
pub trait Dimension: fmt::Debug + Clone + Send + Sync + 'static {
    type Key: PlanKey;
    type Descriptor: Clone
        + PartialEq
        + fmt::Debug
        + Serialize
        + DeserializeOwned
        + Send
        + Sync
        + 'static;
    type Update: MappingUpdate<Key = Self::Key>
        + fmt::Debug
        + Clone
        + Serialize
        + DeserializeOwned
        + Send
        + Sync
        + 'static;

    /// Name used in logs and responses
    const NAME: &'static str;

    fn plan(mapping: &DataSetVersionMapping) -> &MappingPlan<Self::Key, Self::Descriptor>;

    /// Copy of `mapping` with this dimension's plan replaced and completeness
    /// recomputed
    fn with_plan(
        mapping: &DataSetVersionMapping,
        plan: MappingPlan<Self::Key, Self::Descriptor>,
        swap: PlanSwap,
    ) -> DataSetVersionMapping;
}

#[derive(Debug, Clone, Copy)]
pub struct Locations;

#[derive(Debug, Clone, Copy)]
pub struct Filters;

#[derive(Debug, Clone, Copy)]
pub struct Indicators;

impl Dimension for Locations {
    type Key = LocationKey;
    type Descriptor = LocationOption;
    type Update = LocationMappingUpdate;

    const NAME: &'static str = "locations";

    fn plan(mapping: &DataSetVersionMapping) -> &LocationPlan {
        &mapping.locations
    }

    fn with_plan(
        mapping: &DataSetVersionMapping,
        plan: LocationPlan,
        _: PlanSwap,
    ) -> DataSetVersionMapping {
        DataSetVersionMapping {
            locations: plan,
            ..mapping.clone()
        }
        .recompute_completeness()
    }
}

impl Dimension for Filters {
    type Key = OptionKey;
    type Descriptor = FilterOption;
    type Update = OptionMappingUpdate;

    const NAME: &'static str = "filters";

    fn plan(mapping: &DataSetVersionMapping) -> &FilterPlan {
        &mapping.filters
    }

    fn with_plan(
        mapping: &DataSetVersionMapping,
        plan: FilterPlan,
        _: PlanSwap,
    ) -> DataSetVersionMapping {
        DataSetVersionMapping {
            filters: plan,
            ..mapping.clone()
        }
        .recompute_completeness()
    }
}

impl Dimension for Indicators {
    type Key = OptionKey;
    type Descriptor = IndicatorOption;
    type Update = OptionMappingUpdate;

    const NAME: &'static str = "indicators";

    fn plan(mapping: &DataSetVersionMapping) -> &IndicatorPlan {
        &mapping.indicators
    }

    fn with_plan(
        mapping: &DataSetVersionMapping,
        plan: IndicatorPlan,
        _: PlanSwap,
    ) -> DataSetVersionMapping {
        DataSetVersionMapping {
            indicators: plan,
            ..mapping.clone()
        }
        .recompute_completeness()
    }
}

// ============================================================================
// Operator updates
// ============================================================================

/// A submitted enum field, kept verbatim when it names no known variant
///
/// Unrecognised values reach the validator, which reports them alongside
/// every other failure in the batch instead of rejecting the whole body.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Submitted<T> {
    Known(T),
    Unknown(String),
}

impl<T: Copy> Submitted<T> {
    pub fn known(&self) -> Option<T> {
        match self {
            Submitted::Known(value) => Some(*value),
            Submitted::Unknown(_) => None,
        }
    }
}

impl<T> From<T> for Submitted<T> {
    fn from(value: T) -> Self {
        Submitted::Known(value)
    }
}

/// Proposed manual change to one location mapping
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LocationMappingUpdate {
    pub level: Submitted<GeographicLevel>,
    pub source_key: String,
    #[serde(rename = "type")]
    pub mapping_type: Submitted<MappingType>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub candidate_key: Option<String>,
}

/// Proposed manual change to one filter option or indicator mapping
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OptionMappingUpdate {
    pub source_key: String,
    #[serde(rename = "type")]
    pub mapping_type: Submitted<MappingType>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub candidate_key: Option<String>,
}

impl MappingUpdate for LocationMappingUpdate {
    type Key = LocationKey;

    fn source_key(&self) -> &str {
        &self.source_key
    }

    fn key(&self, key: &str) -> Option<LocationKey> {
        self.level.known().map(|level| LocationKey::new(level, key))
    }

    fn describe_key(&self, key: &str) -> serde_json::Value {
        serde_json::json!({ "level": self.level, "key": key })
    }

    fn mapping_type(&self) -> &Submitted<MappingType> {
        &self.mapping_type
    }

    fn candidate_key(&self) -> Option<&str> {
        self.candidate_key.as_deref()
    }
}

impl MappingUpdate for OptionMappingUpdate {
    type Key = OptionKey;

    fn source_key(&self) -> &str {
        &self.source_key
    }

    fn key(&self, key: &str) -> Option<OptionKey> {
        Some(OptionKey::new(key))
    }

    fn describe_key(&self, key: &str) -> serde_json::Value {
        serde_json::json!({ "key": key })
    }

    fn mapping_type(&self) -> &Submitted<MappingType> {
        &self.mapping_type
    }

    fn candidate_key(&self) -> Option<&str> {
        self.candidate_key.as_deref()
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use super::*;

    #[test]
    fn test_candidate_key_only_on_mapped_variants() {
        let key = OptionKey::from("target");
        assert_eq!(
            Mapping::AutoMapped { candidate_key: key.clone() }.candidate_key(),
            Some(&key)
        );
        assert_eq!(
            Mapping::ManualMapped { candidate_key: key.clone() }.candidate_key(),
            Some(&key)
        );
        assert_eq!(Mapping::None.candidate_key(), None);
        assert_eq!(Mapping::AutoNone.candidate_key(), None);
        assert_eq!(Mapping::ManualNone.candidate_key(), None);
    }

    #[test]
    fn test_unresolved_and_breaking_classification() {
        let mapped = Mapping::AutoMapped { candidate_key: "a".into() };
        assert!(!mapped.is_unresolved());
        assert!(!mapped.is_breaking());

        assert!(Mapping::None.is_unresolved());
        assert!(!Mapping::None.is_breaking());

        assert!(Mapping::AutoNone.is_unresolved());
        assert!(Mapping::AutoNone.is_breaking());

        assert!(!Mapping::ManualNone.is_unresolved());
        assert!(Mapping::ManualNone.is_breaking());
    }

    #[test]
    fn test_only_manual_types_are_manual() {
        assert!(MappingType::ManualMapped.is_manual());
        assert!(MappingType::ManualNone.is_manual());
        assert!(!MappingType::None.is_manual());
        assert!(!MappingType::AutoMapped.is_manual());
        assert!(!MappingType::AutoNone.is_manual());
    }

    #[test]
    fn test_option_mapping_serializes_flat() {
        let mapping = OptionMapping::new(
            FilterOption::new("Total"),
            Mapping::ManualMapped { candidate_key: "total".into() },
        );

        let json = serde_json::to_value(&mapping).unwrap();
        assert_eq!(
            json,
            serde_json::json!({
                "source": { "label": "Total" },
                "type": "ManualMapped",
                "candidateKey": "total"
            })
        );

        let none = OptionMapping::new(FilterOption::new("Gone"), Mapping::ManualNone);
        let json = serde_json::to_value(&none).unwrap();
        assert_eq!(json["type"], "ManualNone");
        assert!(json.get("candidateKey").is_none());
    }

    #[test]
    fn test_location_keys_are_scoped_by_level() {
        let la = LocationKey::new(GeographicLevel::LocalAuthority, "E08000019");
        let region = LocationKey::new(GeographicLevel::Region, "E08000019");
        assert_ne!(la, region);
        assert_eq!(la.to_string(), "LA:E08000019");

        let plan = LocationPlan::new()
            .with_mapping(la.clone(), LocationOption::new("Sheffield"), Mapping::AutoNone)
            .with_candidate(region.clone(), LocationOption::new("Yorkshire"));

        assert!(plan.mapping(&la).is_some());
        assert!(plan.mapping(&region).is_none());
        assert!(plan.has_candidate(&region));
        assert!(!plan.has_candidate(&la));
    }

    #[test]
    fn test_with_plan_recomputes_completeness() {
        let indicators = IndicatorPlan::new().with_mapping(
            "enrolments".into(),
            IndicatorOption::new("Enrolments"),
            Mapping::AutoNone,
        );
        let mapping = DataSetVersionMapping::new(
            Uuid::new_v4(),
            Uuid::new_v4(),
            LocationPlan::new(),
            FilterPlan::new(),
            indicators,
        );
        assert!(!mapping.indicator_mappings_complete());

        let resolved = IndicatorPlan::new().with_mapping(
            "enrolments".into(),
            IndicatorOption::new("Enrolments"),
            Mapping::ManualNone,
        );
        let updated = Indicators::with_plan(&mapping, resolved, PlanSwap::new());
        assert!(updated.indicator_mappings_complete());
        assert!(!mapping.indicator_mappings_complete());
        assert_eq!(updated.id(), mapping.id());
    }
}
