//! Validation of operator mapping updates
//!
//! Every update in a batch is checked independently against the same
//! unmodified plan snapshot and all failures are collected. A batch is only
//! applied when the failure list is empty.

use serde::Serialize;
use serde_json::json;
use std::collections::BTreeSet;
use std::fmt;

use super::types::{Mapping, MappingPlan, MappingType, OptionKey, PlanKey, Submitted};

/// A proposed change to one source option's mapping
pub trait MappingUpdate {
    type Key: PlanKey;

    /// Key of the source option being updated, as submitted
    fn source_key(&self) -> &str;

    /// Plan key for `key` in the update's scope (same level for locations),
    /// or `None` when the scope itself is unknown
    fn key(&self, key: &str) -> Option<Self::Key>;

    /// `detail` payload naming `key` in the update's scope
    fn describe_key(&self, key: &str) -> serde_json::Value;

    fn mapping_type(&self) -> &Submitted<MappingType>;

    fn candidate_key(&self) -> Option<&str>;
}

/// Machine readable reason an update was rejected
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub enum ValidationCode {
    NotEmpty,
    SourcePathDoesNotExist,
    SourceKeyDuplicated,
    ManualMappingTypeInvalid,
    CandidateKeyMustBeSpecifiedWithMappedMappingType,
    CandidatePathDoesNotExist,
    CandidateKeyMustBeEmptyWithNoneMappingType,
}

impl ValidationCode {
    pub fn message(self) -> &'static str {
        match self {
            ValidationCode::NotEmpty => "At least one mapping update must be provided.",
            ValidationCode::SourcePathDoesNotExist => "The source mapping does not exist.",
            ValidationCode::SourceKeyDuplicated => {
                "The source mapping is updated more than once in the same request."
            },
            ValidationCode::ManualMappingTypeInvalid => {
                "The mapping type must be one of ManualMapped or ManualNone."
            },
            ValidationCode::CandidateKeyMustBeSpecifiedWithMappedMappingType => {
                "A candidate key must be specified when the mapping type is ManualMapped."
            },
            ValidationCode::CandidatePathDoesNotExist => "The candidate does not exist.",
            ValidationCode::CandidateKeyMustBeEmptyWithNoneMappingType => {
                "The candidate key must be empty when the mapping type is ManualNone."
            },
        }
    }
}

impl fmt::Display for ValidationCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Debug::fmt(self, f)
    }
}

/// One rejected field of one update
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ValidationFailure {
    pub path: String,
    pub code: ValidationCode,
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub detail: Option<serde_json::Value>,
}

impl ValidationFailure {
    fn new(path: String, code: ValidationCode) -> Self {
        Self {
            path,
            code,
            message: code.message().to_string(),
            detail: None,
        }
    }

    fn with_detail(mut self, detail: serde_json::Value) -> Self {
        self.detail = Some(detail);
        self
    }
}

/// An update that passed validation, with its mapping state already typed
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ValidatedUpdate<K> {
    pub key: K,
    pub mapping: Mapping,
}

/// Validate a batch of updates against a plan
///
/// Returns the typed updates in request order, or every failure found.
pub fn validate<U, O>(
    plan: &MappingPlan<U::Key, O>,
    updates: &[U],
) -> Result<Vec<ValidatedUpdate<U::Key>>, Vec<ValidationFailure>>
where
    U: MappingUpdate,
{
    if updates.is_empty() {
        return Err(vec![ValidationFailure::new("updates".to_string(), ValidationCode::NotEmpty)]);
    }

    let mut failures = Vec::new();
    let mut validated = Vec::with_capacity(updates.len());
    let mut seen = BTreeSet::new();

    for (index, update) in updates.iter().enumerate() {
        let failed_before = failures.len();
        let source_path = format!("updates[{index}].sourceKey");
        let source = update
            .key(update.source_key())
            .filter(|key| plan.mapping(key).is_some());

        match &source {
            None => failures.push(
                ValidationFailure::new(source_path, ValidationCode::SourcePathDoesNotExist)
                    .with_detail(update.describe_key(update.source_key())),
            ),
            Some(key) if !seen.insert(key.clone()) => failures.push(
                ValidationFailure::new(source_path, ValidationCode::SourceKeyDuplicated)
                    .with_detail(update.describe_key(update.source_key())),
            ),
            Some(_) => {},
        }

        let candidate_path = format!("updates[{index}].candidateKey");
        let mapping = match (update.mapping_type().known(), update.candidate_key()) {
            (Some(MappingType::ManualMapped), None | Some("")) => {
                failures.push(ValidationFailure::new(
                    candidate_path,
                    ValidationCode::CandidateKeyMustBeSpecifiedWithMappedMappingType,
                ));
                None
            },
            (Some(MappingType::ManualMapped), Some(candidate_key)) => {
                let exists = update
                    .key(candidate_key)
                    .is_some_and(|candidate| plan.has_candidate(&candidate));
                if exists {
                    Some(Mapping::ManualMapped {
                        candidate_key: OptionKey::new(candidate_key),
                    })
                } else {
                    failures.push(
                        ValidationFailure::new(candidate_path, ValidationCode::CandidatePathDoesNotExist)
                            .with_detail(update.describe_key(candidate_key)),
                    );
                    None
                }
            },
            (Some(MappingType::ManualNone), None | Some("")) => Some(Mapping::ManualNone),
            (Some(MappingType::ManualNone), Some(candidate_key)) => {
                failures.push(
                    ValidationFailure::new(
                        candidate_path,
                        ValidationCode::CandidateKeyMustBeEmptyWithNoneMappingType,
                    )
                    .with_detail(json!({ "candidateKey": candidate_key })),
                );
                None
            },
            _ => {
                failures.push(
                    ValidationFailure::new(
                        format!("updates[{index}].type"),
                        ValidationCode::ManualMappingTypeInvalid,
                    )
                    .with_detail(json!({
                        "value": update.mapping_type(),
                        "allowed": MappingType::MANUAL,
                    })),
                );
                None
            },
        };

        if let (Some(key), Some(mapping)) = (source, mapping) {
            if failures.len() == failed_before {
                validated.push(ValidatedUpdate { key, mapping });
            }
        }
    }

    if failures.is_empty() {
        Ok(validated)
    } else {
        Err(failures)
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use super::super::types::{
        FilterOption, FilterPlan, LocationKey, LocationMappingUpdate, LocationOption,
        LocationPlan, OptionMappingUpdate,
    };
    use super::*;
    use dsv_common::types::GeographicLevel;

    fn filter_plan() -> FilterPlan {
        FilterPlan::new()
            .with_mapping(
                "male".into(),
                FilterOption::new("Male"),
                Mapping::AutoMapped { candidate_key: "male".into() },
            )
            .with_mapping("unknown".into(), FilterOption::new("Unknown"), Mapping::AutoNone)
            .with_candidate("male".into(), FilterOption::new("Male"))
            .with_candidate("not-recorded".into(), FilterOption::new("Not recorded"))
    }

    fn update(source: &str, mapping_type: MappingType, candidate: Option<&str>) -> OptionMappingUpdate {
        OptionMappingUpdate {
            source_key: source.to_string(),
            mapping_type: mapping_type.into(),
            candidate_key: candidate.map(str::to_string),
        }
    }

    fn codes(failures: &[ValidationFailure]) -> Vec<(&str, ValidationCode)> {
        failures.iter().map(|f| (f.path.as_str(), f.code)).collect()
    }

    #[test]
    fn test_valid_batch_yields_typed_updates_in_order() {
        let updates = [
            update("unknown", MappingType::ManualMapped, Some("not-recorded")),
            update("male", MappingType::ManualNone, None),
        ];

        let validated = validate(&filter_plan(), &updates).unwrap();
        assert_eq!(
            validated,
            vec![
                ValidatedUpdate {
                    key: "unknown".into(),
                    mapping: Mapping::ManualMapped { candidate_key: "not-recorded".into() },
                },
                ValidatedUpdate { key: "male".into(), mapping: Mapping::ManualNone },
            ]
        );
    }

    #[test]
    fn test_empty_batch_is_rejected() {
        let failures = validate::<OptionMappingUpdate, _>(&filter_plan(), &[]).unwrap_err();
        assert_eq!(codes(&failures), vec![("updates", ValidationCode::NotEmpty)]);
    }

    #[test]
    fn test_unknown_source_key() {
        let updates = [update("female", MappingType::ManualNone, None)];
        let failures = validate(&filter_plan(), &updates).unwrap_err();
        assert_eq!(
            codes(&failures),
            vec![("updates[0].sourceKey", ValidationCode::SourcePathDoesNotExist)]
        );
        assert_eq!(failures[0].detail, Some(json!({ "key": "female" })));
    }

    #[test]
    fn test_mapped_requires_candidate_key() {
        for candidate in [None, Some("")] {
            let updates = [update("unknown", MappingType::ManualMapped, candidate)];
            let failures = validate(&filter_plan(), &updates).unwrap_err();
            assert_eq!(
                codes(&failures),
                vec![(
                    "updates[0].candidateKey",
                    ValidationCode::CandidateKeyMustBeSpecifiedWithMappedMappingType
                )]
            );
        }
    }

    #[test]
    fn test_mapped_requires_existing_candidate() {
        let updates = [update("unknown", MappingType::ManualMapped, Some("female"))];
        let failures = validate(&filter_plan(), &updates).unwrap_err();
        assert_eq!(
            codes(&failures),
            vec![("updates[0].candidateKey", ValidationCode::CandidatePathDoesNotExist)]
        );
    }

    #[test]
    fn test_none_forbids_candidate_key() {
        let updates = [update("unknown", MappingType::ManualNone, Some("male"))];
        let failures = validate(&filter_plan(), &updates).unwrap_err();
        assert_eq!(
            codes(&failures),
            vec![("updates[0].candidateKey", ValidationCode::CandidateKeyMustBeEmptyWithNoneMappingType)]
        );
    }

    #[test]
    fn test_operators_cannot_submit_automatic_types() {
        for mapping_type in [MappingType::None, MappingType::AutoMapped, MappingType::AutoNone] {
            let updates = [update("unknown", mapping_type, Some("male"))];
            let failures = validate(&filter_plan(), &updates).unwrap_err();
            assert_eq!(
                codes(&failures),
                vec![("updates[0].type", ValidationCode::ManualMappingTypeInvalid)]
            );
        }
    }

    #[test]
    fn test_unrecognised_type_is_reported_with_other_failures() {
        let updates: Vec<OptionMappingUpdate> = serde_json::from_value(json!([
            { "sourceKey": "missing", "type": "ManualNone" },
            { "sourceKey": "male", "type": "Removed" }
        ]))
        .unwrap();

        let failures = validate(&filter_plan(), &updates).unwrap_err();
        assert_eq!(
            codes(&failures),
            vec![
                ("updates[0].sourceKey", ValidationCode::SourcePathDoesNotExist),
                ("updates[1].type", ValidationCode::ManualMappingTypeInvalid),
            ]
        );
        assert_eq!(failures[1].detail.as_ref().unwrap()["value"], "Removed");
    }

    #[test]
    fn test_unknown_level_has_no_source() {
        let plan = LocationPlan::new().with_mapping(
            LocationKey::new(GeographicLevel::LocalAuthority, "barnsley"),
            LocationOption::new("Barnsley"),
            Mapping::AutoNone,
        );
        let updates: Vec<LocationMappingUpdate> = serde_json::from_value(json!([
            { "level": "XYZ", "sourceKey": "barnsley", "type": "ManualNone" }
        ]))
        .unwrap();

        let failures = validate(&plan, &updates).unwrap_err();
        assert_eq!(
            codes(&failures),
            vec![("updates[0].sourceKey", ValidationCode::SourcePathDoesNotExist)]
        );
        assert_eq!(failures[0].detail, Some(json!({ "level": "XYZ", "key": "barnsley" })));
    }

    #[test]
    fn test_duplicate_source_key_rejected_after_first() {
        let updates = [
            update("unknown", MappingType::ManualNone, None),
            update("male", MappingType::ManualNone, None),
            update("unknown", MappingType::ManualMapped, Some("male")),
        ];
        let failures = validate(&filter_plan(), &updates).unwrap_err();
        assert_eq!(
            codes(&failures),
            vec![("updates[2].sourceKey", ValidationCode::SourceKeyDuplicated)]
        );
    }

    #[test]
    fn test_failures_are_collected_across_updates() {
        let updates = [
            update("female", MappingType::ManualNone, None),
            update("male", MappingType::ManualMapped, Some("male")),
            update("unknown", MappingType::AutoNone, None),
            update("missing", MappingType::ManualMapped, None),
        ];
        let failures = validate(&filter_plan(), &updates).unwrap_err();
        assert_eq!(
            codes(&failures),
            vec![
                ("updates[0].sourceKey", ValidationCode::SourcePathDoesNotExist),
                ("updates[2].type", ValidationCode::ManualMappingTypeInvalid),
                ("updates[3].sourceKey", ValidationCode::SourcePathDoesNotExist),
                (
                    "updates[3].candidateKey",
                    ValidationCode::CandidateKeyMustBeSpecifiedWithMappedMappingType
                ),
            ]
        );
    }

    #[test]
    fn test_location_candidate_must_be_in_same_level() {
        let plan = LocationPlan::new()
            .with_mapping(
                LocationKey::new(GeographicLevel::LocalAuthority, "barnsley"),
                LocationOption::new("Barnsley"),
                Mapping::AutoNone,
            )
            .with_candidate(
                LocationKey::new(GeographicLevel::Region, "yorkshire"),
                LocationOption::new("Yorkshire"),
            )
            .with_candidate(
                LocationKey::new(GeographicLevel::LocalAuthority, "barnsley-new"),
                LocationOption::new("Barnsley"),
            );

        let cross_level = [LocationMappingUpdate {
            level: GeographicLevel::LocalAuthority.into(),
            source_key: "barnsley".to_string(),
            mapping_type: MappingType::ManualMapped.into(),
            candidate_key: Some("yorkshire".to_string()),
        }];
        let failures = validate(&plan, &cross_level).unwrap_err();
        assert_eq!(failures[0].code, ValidationCode::CandidatePathDoesNotExist);
        assert_eq!(failures[0].detail, Some(json!({ "level": "LA", "key": "yorkshire" })));

        let same_level = [LocationMappingUpdate {
            candidate_key: Some("barnsley-new".to_string()),
            ..cross_level[0].clone()
        }];
        let validated = validate(&plan, &same_level).unwrap();
        assert_eq!(
            validated[0].key,
            LocationKey::new(GeographicLevel::LocalAuthority, "barnsley")
        );
    }

    #[test]
    fn test_failure_serializes_for_clients() {
        let updates = [update("female", MappingType::ManualNone, None)];
        let failures = validate(&filter_plan(), &updates).unwrap_err();
        let json = serde_json::to_value(&failures[0]).unwrap();
        assert_eq!(json["path"], "updates[0].sourceKey");
        assert_eq!(json["code"], "SourcePathDoesNotExist");
        assert_eq!(json["message"], "The source mapping does not exist.");
    }
}
