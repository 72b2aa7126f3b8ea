//! Application of validated updates to a mapping plan
//!
//! The current aggregate is treated as an immutable snapshot: validation runs
//! against it, and a successful batch produces a new plan value with only the
//! named mappings replaced.

use thiserror::Error;
use tracing::debug;

use super::types::{DataSetVersionMapping, Dimension, MappingPlan, OptionMapping, PlanKey, PlanSwap};
use super::validator::{self, ValidatedUpdate, ValidationFailure};

#[derive(Debug, Error)]
pub enum ReconcileError {
    #[error("{} mapping update(s) failed validation", .0.len())]
    Validation(Vec<ValidationFailure>),
    #[error("Source option '{0}' is not part of the mapping plan")]
    UnknownSource(String),
}

/// Resulting mapping of one applied update
#[derive(Debug, Clone, PartialEq)]
pub struct AppliedUpdate<K, O> {
    pub key: K,
    pub mapping: OptionMapping<O>,
}

/// Outcome of a successful batch on one dimension
#[derive(Debug, Clone)]
pub struct Reconciliation<D: Dimension> {
    /// The aggregate with the new plan and recomputed completeness
    pub mapping: DataSetVersionMapping,
    /// One entry per update, in request order
    pub applied: Vec<AppliedUpdate<D::Key, D::Descriptor>>,
}

/// Produce a copy of `plan` with validated updates applied
pub fn apply_updates<K, O>(
    plan: &MappingPlan<K, O>,
    updates: Vec<ValidatedUpdate<K>>,
) -> Result<(MappingPlan<K, O>, Vec<AppliedUpdate<K, O>>), ReconcileError>
where
    K: PlanKey,
    O: Clone,
{
    let mut next = plan.clone();
    let mut applied = Vec::with_capacity(updates.len());

    for update in updates {
        let mapping = next
            .set_mapping(&update.key, update.mapping)
            .cloned()
            .ok_or_else(|| ReconcileError::UnknownSource(update.key.to_string()))?;
        applied.push(AppliedUpdate {
            key: update.key,
            mapping,
        });
    }

    Ok((next, applied))
}

/// Validate and apply a batch of updates to one dimension of `current`
pub fn reconcile<D: Dimension>(
    current: &DataSetVersionMapping,
    updates: &[D::Update],
) -> Result<Reconciliation<D>, ReconcileError> {
    let plan = D::plan(current);
    let validated = validator::validate(plan, updates).map_err(ReconcileError::Validation)?;
    let (next, applied) = apply_updates(plan, validated)?;

    debug!(
        dimension = D::NAME,
        applied = applied.len(),
        "Applied mapping updates"
    );

    Ok(Reconciliation {
        mapping: D::with_plan(current, next, PlanSwap::new()),
        applied,
    })
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use super::super::types::{
        FilterPlan, Filters, IndicatorOption, IndicatorPlan, Indicators, LocationPlan, Mapping,
        MappingType, OptionKey, OptionMappingUpdate, Submitted,
    };
    use super::*;
    use proptest::prelude::*;
    use std::collections::BTreeSet;
    use uuid::Uuid;

    fn aggregate(indicators: IndicatorPlan) -> DataSetVersionMapping {
        DataSetVersionMapping::new(
            Uuid::new_v4(),
            Uuid::new_v4(),
            LocationPlan::new(),
            FilterPlan::new(),
            indicators,
        )
    }

    fn two_auto_mapped() -> IndicatorPlan {
        IndicatorPlan::new()
            .with_mapping(
                "a".into(),
                IndicatorOption::new("A"),
                Mapping::AutoMapped { candidate_key: "a".into() },
            )
            .with_mapping(
                "b".into(),
                IndicatorOption::new("B"),
                Mapping::AutoMapped { candidate_key: "b".into() },
            )
            .with_candidate("a".into(), IndicatorOption::new("A"))
            .with_candidate("b".into(), IndicatorOption::new("B"))
    }

    #[test]
    fn test_reconcile_replaces_only_named_mapping() {
        let current = aggregate(two_auto_mapped());
        let updates = [OptionMappingUpdate {
            source_key: "b".to_string(),
            mapping_type: MappingType::ManualNone.into(),
            candidate_key: None,
        }];

        let result = reconcile::<Indicators>(&current, &updates).unwrap();

        assert_eq!(result.applied.len(), 1);
        assert_eq!(result.applied[0].key, OptionKey::from("b"));
        assert_eq!(result.applied[0].mapping.mapping, Mapping::ManualNone);

        let plan = result.mapping.indicators();
        assert_eq!(
            plan.mapping(&"a".into()).unwrap().mapping,
            Mapping::AutoMapped { candidate_key: "a".into() }
        );
        assert_eq!(plan.mapping(&"b".into()).unwrap().mapping, Mapping::ManualNone);
        assert!(result.mapping.indicator_mappings_complete());

        // snapshot untouched
        assert_eq!(
            current.indicators().mapping(&"b".into()).unwrap().mapping,
            Mapping::AutoMapped { candidate_key: "b".into() }
        );
    }

    #[test]
    fn test_invalid_batch_applies_nothing() {
        let current = aggregate(two_auto_mapped());
        let updates = [
            OptionMappingUpdate {
                source_key: "a".to_string(),
                mapping_type: MappingType::ManualNone.into(),
                candidate_key: None,
            },
            OptionMappingUpdate {
                source_key: "zzz".to_string(),
                mapping_type: MappingType::ManualNone.into(),
                candidate_key: None,
            },
        ];

        let err = reconcile::<Indicators>(&current, &updates).unwrap_err();
        match err {
            ReconcileError::Validation(failures) => {
                assert_eq!(failures.len(), 1);
                assert_eq!(failures[0].path, "updates[1].sourceKey");
            },
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn test_filters_dimension_leaves_others_alone() {
        let current = aggregate(two_auto_mapped());
        let updates = [OptionMappingUpdate {
            source_key: "a".to_string(),
            mapping_type: MappingType::ManualNone.into(),
            candidate_key: None,
        }];

        // "a" is an indicator, not a filter
        assert!(matches!(
            reconcile::<Filters>(&current, &updates),
            Err(ReconcileError::Validation(_))
        ));
    }

    #[test]
    fn test_apply_rejects_unvalidated_key() {
        let plan = two_auto_mapped();
        let err = apply_updates(
            &plan,
            vec![ValidatedUpdate {
                key: OptionKey::from("missing"),
                mapping: Mapping::ManualNone,
            }],
        )
        .unwrap_err();
        assert!(matches!(err, ReconcileError::UnknownSource(key) if key == "missing"));
    }

    fn arb_mapping() -> impl Strategy<Value = Mapping> {
        prop_oneof![
            Just(Mapping::None),
            Just(Mapping::AutoNone),
            Just(Mapping::AutoMapped { candidate_key: "c0".into() }),
        ]
    }

    proptest! {
        #[test]
        fn prop_batch_changes_only_named_keys(
            states in proptest::collection::vec(arb_mapping(), 1..12),
            picks in proptest::collection::btree_set(0usize..12, 1..6),
            map_to_candidate in any::<bool>(),
        ) {
            let mut plan = IndicatorPlan::new()
                .with_candidate("c0".into(), IndicatorOption::new("C0"))
                .with_candidate("c1".into(), IndicatorOption::new("C1"));
            for (i, state) in states.iter().enumerate() {
                plan = plan.with_mapping(format!("s{i}").as_str().into(), IndicatorOption::new(format!("S{i}")), state.clone());
            }
            let current = aggregate(plan);

            let named: BTreeSet<usize> = picks.into_iter().filter(|i| *i < states.len()).collect();
            prop_assume!(!named.is_empty());

            let updates: Vec<OptionMappingUpdate> = named
                .iter()
                .map(|i| OptionMappingUpdate {
                    source_key: format!("s{i}"),
                    mapping_type: Submitted::from(if map_to_candidate { MappingType::ManualMapped } else { MappingType::ManualNone }),
                    candidate_key: map_to_candidate.then(|| "c1".to_string()),
                })
                .collect();

            let result = reconcile::<Indicators>(&current, &updates).unwrap();
            let before = current.indicators();
            let after = result.mapping.indicators();

            prop_assert_eq!(before.len(), after.len());
            prop_assert_eq!(before.candidates().count(), after.candidates().count());
            for (i, _) in states.iter().enumerate() {
                let key = OptionKey::new(format!("s{i}"));
                let old = before.mapping(&key).unwrap();
                let new = after.mapping(&key).unwrap();
                prop_assert_eq!(&old.source, &new.source);
                if named.contains(&i) {
                    prop_assert_eq!(Some(new.mapping.mapping_type()), updates[0].mapping_type.known());
                } else {
                    prop_assert_eq!(old, new);
                }
            }
        }
    }
}
