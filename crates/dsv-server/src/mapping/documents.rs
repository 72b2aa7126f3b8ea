//! JSON document form of mapping plans
//!
//! The same shape is served over HTTP and stored in the plan JSONB columns:
//!
//! ```text
//! filters / indicators: { "mappings": { "<key>": {..} }, "candidates": { "<key>": {..} } }
//! locations:            { "levels": { "LA": { "mappings": {..}, "candidates": {..} } } }
//! ```

use dsv_common::types::GeographicLevel;
use serde::{de, Deserialize, Deserializer, Serialize, Serializer};
use std::collections::BTreeMap;

use super::types::{MappingPlan, OptionKey, OptionMapping, PlanKey};

#[derive(Serialize)]
struct SectionRef<'a, O> {
    mappings: BTreeMap<&'a OptionKey, &'a OptionMapping<O>>,
    candidates: BTreeMap<&'a OptionKey, &'a O>,
}

impl<O> Default for SectionRef<'_, O> {
    fn default() -> Self {
        Self {
            mappings: BTreeMap::new(),
            candidates: BTreeMap::new(),
        }
    }
}

#[derive(Serialize)]
struct LevelledRef<'a, O> {
    levels: BTreeMap<GeographicLevel, SectionRef<'a, O>>,
}

#[derive(Deserialize)]
#[serde(bound(deserialize = "O: Deserialize<'de>"))]
struct Section<O> {
    #[serde(default = "BTreeMap::new")]
    mappings: BTreeMap<OptionKey, OptionMapping<O>>,
    #[serde(default = "BTreeMap::new")]
    candidates: BTreeMap<OptionKey, O>,
}

#[derive(Deserialize)]
#[serde(bound(deserialize = "O: Deserialize<'de>"))]
struct PlanDocument<O> {
    #[serde(default)]
    levels: Option<BTreeMap<GeographicLevel, Section<O>>>,
    #[serde(flatten)]
    flat: Section<O>,
}

impl<K: PlanKey, O: Serialize> Serialize for MappingPlan<K, O> {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        if !K::LEVELLED {
            return SectionRef {
                mappings: self.mappings.iter().map(|(k, v)| (k.option_key(), v)).collect(),
                candidates: self.candidates.iter().map(|(k, v)| (k.option_key(), v)).collect(),
            }
            .serialize(serializer);
        }

        let mut levels: BTreeMap<GeographicLevel, SectionRef<'_, O>> = BTreeMap::new();
        for (key, mapping) in &self.mappings {
            if let Some(level) = key.level() {
                levels.entry(level).or_default().mappings.insert(key.option_key(), mapping);
            }
        }
        for (key, candidate) in &self.candidates {
            if let Some(level) = key.level() {
                levels.entry(level).or_default().candidates.insert(key.option_key(), candidate);
            }
        }
        LevelledRef { levels }.serialize(serializer)
    }
}

impl<'de, K: PlanKey, O: Deserialize<'de>> Deserialize<'de> for MappingPlan<K, O> {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let document = PlanDocument::<O>::deserialize(deserializer)?;
        let mut plan = MappingPlan::default();

        let sections: Vec<(Option<GeographicLevel>, Section<O>)> = match (K::LEVELLED, document.levels) {
            (true, Some(levels)) => {
                if !document.flat.mappings.is_empty() || !document.flat.candidates.is_empty() {
                    return Err(de::Error::custom(
                        "levelled plan must not carry top-level mappings or candidates",
                    ));
                }
                levels.into_iter().map(|(level, section)| (Some(level), section)).collect()
            },
            (true, None) => {
                if !document.flat.mappings.is_empty() || !document.flat.candidates.is_empty() {
                    return Err(de::Error::missing_field("levels"));
                }
                Vec::new()
            },
            (false, None) => vec![(None, document.flat)],
            (false, Some(_)) => return Err(de::Error::unknown_field("levels", &["mappings", "candidates"])),
        };

        for (level, section) in sections {
            for (key, mapping) in section.mappings {
                let key = K::from_parts(level, key)
                    .ok_or_else(|| de::Error::custom("mapping key does not fit plan key type"))?;
                plan.mappings.insert(key, mapping);
            }
            for (key, candidate) in section.candidates {
                let key = K::from_parts(level, key)
                    .ok_or_else(|| de::Error::custom("candidate key does not fit plan key type"))?;
                plan.candidates.insert(key, candidate);
            }
        }

        Ok(plan)
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use super::super::types::{
        FilterOption, FilterPlan, IndicatorOption, IndicatorPlan, LocationKey, LocationOption,
        LocationPlan, Mapping,
    };
    use super::*;
    use serde_json::json;

    #[test]
    fn test_filter_plan_document_shape() {
        let plan = FilterPlan::new()
            .with_mapping(
                "total".into(),
                FilterOption::new("Total"),
                Mapping::AutoMapped { candidate_key: "total".into() },
            )
            .with_candidate("total".into(), FilterOption::new("Total"));

        assert_eq!(
            serde_json::to_value(&plan).unwrap(),
            json!({
                "mappings": {
                    "total": {
                        "source": { "label": "Total" },
                        "type": "AutoMapped",
                        "candidateKey": "total"
                    }
                },
                "candidates": {
                    "total": { "label": "Total" }
                }
            })
        );
    }

    #[test]
    fn test_location_plan_grouped_by_level() {
        let plan = LocationPlan::new()
            .with_mapping(
                LocationKey::new(GeographicLevel::LocalAuthority, "sheffield"),
                LocationOption::new("Sheffield").with_code("E08000019"),
                Mapping::AutoNone,
            )
            .with_candidate(
                LocationKey::new(GeographicLevel::Region, "yorkshire"),
                LocationOption::new("Yorkshire and The Humber"),
            );

        let json = serde_json::to_value(&plan).unwrap();
        assert_eq!(json["levels"]["LA"]["mappings"]["sheffield"]["type"], "AutoNone");
        assert_eq!(json["levels"]["LA"]["mappings"]["sheffield"]["source"]["code"], "E08000019");
        assert_eq!(json["levels"]["LA"]["candidates"], json!({}));
        assert_eq!(
            json["levels"]["REG"]["candidates"]["yorkshire"]["label"],
            "Yorkshire and The Humber"
        );

        let back: LocationPlan = serde_json::from_value(json).unwrap();
        assert_eq!(back, plan);
    }

    #[test]
    fn test_missing_sections_default_to_empty() {
        let plan: FilterPlan = serde_json::from_value(json!({})).unwrap();
        assert!(plan.is_empty());

        let plan: LocationPlan = serde_json::from_value(json!({ "levels": {} })).unwrap();
        assert!(plan.is_empty());
    }

    #[test]
    fn test_rejects_document_of_the_wrong_shape() {
        let levelled = json!({ "levels": { "LA": { "mappings": {}, "candidates": {} } } });
        assert!(serde_json::from_value::<FilterPlan>(levelled).is_err());

        let flat = json!({ "mappings": { "a": { "source": { "label": "A" }, "type": "None" } } });
        assert!(serde_json::from_value::<LocationPlan>(flat).is_err());
    }

    #[test]
    fn test_mapped_type_requires_candidate_key() {
        let missing = json!({
            "mappings": { "a": { "source": { "label": "A" }, "type": "ManualMapped" } }
        });
        assert!(serde_json::from_value::<FilterPlan>(missing).is_err());
    }

    #[test]
    fn test_indicator_plan_read_back_from_stored_text() {
        let plan = IndicatorPlan::new()
            .with_mapping(
                "enrolments".into(),
                IndicatorOption::new("Enrolments"),
                Mapping::ManualMapped { candidate_key: "headcount".into() },
            )
            .with_candidate("headcount".into(), IndicatorOption::new("Headcount"));

        let stored = serde_json::to_string(&plan).unwrap();
        let back: IndicatorPlan = serde_json::from_str(&stored).unwrap();

        assert_eq!(back, plan);
    }
}
