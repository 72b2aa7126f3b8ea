//! Mapping fixtures
//!
//! Builders for seeding a source/target pair of data set versions and the
//! mapping between them, as the upstream auto-mapper would.

use dsv_common::types::{GeographicLevel, Version};
use dsv_server::mapping::{
    DataSetVersion, DataSetVersionMapping, FilterOption, FilterPlan, IndicatorOption,
    IndicatorPlan, InMemoryMappingStore, LocationKey, LocationOption, LocationPlan, Mapping,
    MappingStore,
};
use uuid::Uuid;

/// Builder for a seeded mapping with fluent API
#[derive(Debug, Clone)]
pub struct MappingFixture {
    source_version: Version,
    target_version: Version,
    locations: LocationPlan,
    filters: FilterPlan,
    indicators: IndicatorPlan,
}

/// Ids of a seeded mapping
#[derive(Debug, Clone, Copy)]
pub struct SeededMapping {
    pub data_set_id: Uuid,
    pub source_version_id: Uuid,
    pub target_version_id: Uuid,
}

impl MappingFixture {
    /// Source `1.0.0`, target provisionally `1.1.0`, empty plans
    pub fn new() -> Self {
        Self {
            source_version: Version::new(1, 0, 0),
            target_version: Version::new(1, 1, 0),
            locations: LocationPlan::new(),
            filters: FilterPlan::new(),
            indicators: IndicatorPlan::new(),
        }
    }

    pub fn with_source_version(mut self, version: Version) -> Self {
        self.source_version = version;
        self
    }

    /// Add a location mapping seeded by the auto-mapper
    pub fn with_location(
        mut self,
        level: GeographicLevel,
        key: &str,
        label: &str,
        mapping: Mapping,
    ) -> Self {
        self.locations = self.locations.with_mapping(
            LocationKey::new(level, key),
            LocationOption::new(label),
            mapping,
        );
        self
    }

    pub fn with_location_candidate(mut self, level: GeographicLevel, key: &str, label: &str) -> Self {
        self.locations = self
            .locations
            .with_candidate(LocationKey::new(level, key), LocationOption::new(label));
        self
    }

    pub fn with_filter(mut self, key: &str, label: &str, mapping: Mapping) -> Self {
        self.filters = self.filters.with_mapping(key.into(), FilterOption::new(label), mapping);
        self
    }

    pub fn with_filter_candidate(mut self, key: &str, label: &str) -> Self {
        self.filters = self.filters.with_candidate(key.into(), FilterOption::new(label));
        self
    }

    pub fn with_indicator(mut self, key: &str, label: &str, mapping: Mapping) -> Self {
        self.indicators = self
            .indicators
            .with_mapping(key.into(), IndicatorOption::new(label), mapping);
        self
    }

    pub fn with_indicator_candidate(mut self, key: &str, label: &str) -> Self {
        self.indicators = self
            .indicators
            .with_candidate(key.into(), IndicatorOption::new(label));
        self
    }

    /// Build the aggregate for the given version ids
    pub fn build(&self, source_version_id: Uuid, target_version_id: Uuid) -> DataSetVersionMapping {
        DataSetVersionMapping::new(
            source_version_id,
            target_version_id,
            self.locations.clone(),
            self.filters.clone(),
            self.indicators.clone(),
        )
    }

    /// Register both versions and insert the mapping
    pub async fn seed(self, store: &InMemoryMappingStore) -> SeededMapping {
        let data_set_id = Uuid::new_v4();
        let source = DataSetVersion {
            id: Uuid::new_v4(),
            data_set_id,
            version: self.source_version,
        };
        let target = DataSetVersion {
            id: Uuid::new_v4(),
            data_set_id,
            version: self.target_version,
        };
        store.insert_version(source.clone()).await;
        store.insert_version(target.clone()).await;

        store
            .insert(&self.build(source.id, target.id))
            .await
            .expect("Failed to seed mapping");

        SeededMapping {
            data_set_id,
            source_version_id: source.id,
            target_version_id: target.id,
        }
    }
}

/// Shorthand for an auto-mapped option
pub fn auto_mapped(candidate_key: &str) -> Mapping {
    Mapping::AutoMapped {
        candidate_key: candidate_key.into(),
    }
}

/// Two indicators both auto-mapped onto same-keyed candidates
pub fn two_auto_mapped_indicators() -> MappingFixture {
    MappingFixture::new()
        .with_indicator("enrolments", "Enrolments", auto_mapped("enrolments"))
        .with_indicator("absence-rate", "Absence rate", auto_mapped("absence-rate"))
        .with_indicator_candidate("enrolments", "Enrolments")
        .with_indicator_candidate("absence-rate", "Absence rate")
}
