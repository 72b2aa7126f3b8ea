use async_trait::async_trait;
use chrono::{DateTime, Utc};
use dsv_common::types::Version;
use sqlx::{postgres::PgRow, PgPool, Row};
use tracing::{debug, instrument, warn};
use uuid::Uuid;

use super::{DataSetVersion, MappingCommit, MappingStore, StoreError};
use crate::mapping::types::{DataSetVersionMapping, FilterPlan, IndicatorPlan, LocationPlan};

/// Postgres store; plans live in JSONB columns of `data_set_version_mappings`
#[derive(Debug, Clone)]
pub struct PgMappingStore {
    pool: PgPool,
}

impl PgMappingStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

fn version_part(row: &PgRow, column: &str) -> Result<u32, StoreError> {
    let value: i32 = row.try_get(column)?;
    u32::try_from(value).map_err(|_| StoreError::InvalidRow(format!("{column} = {value}")))
}

fn version_column(value: u32) -> Result<i32, StoreError> {
    i32::try_from(value).map_err(|_| StoreError::InvalidRow(format!("version component {value}")))
}

fn mapping_from_row(row: &PgRow) -> Result<DataSetVersionMapping, StoreError> {
    let locations: LocationPlan = serde_json::from_value(row.try_get("location_mapping_plan")?)?;
    let filters: FilterPlan = serde_json::from_value(row.try_get("filter_mapping_plan")?)?;
    let indicators: IndicatorPlan = serde_json::from_value(row.try_get("indicator_mapping_plan")?)?;

    let mapping = DataSetVersionMapping::restore(
        row.try_get("id")?,
        row.try_get("source_data_set_version_id")?,
        row.try_get("target_data_set_version_id")?,
        locations,
        filters,
        indicators,
        row.try_get("revision")?,
        row.try_get("created_at")?,
        row.try_get("updated_at")?,
    );

    let stored_flags = (
        row.try_get::<bool, _>("location_mappings_complete")?,
        row.try_get::<bool, _>("filter_mappings_complete")?,
        row.try_get::<bool, _>("indicator_mappings_complete")?,
    );
    let derived = mapping.completeness();
    if stored_flags != (derived.locations, derived.filters, derived.indicators) {
        warn!(
            target_version_id = %mapping.target_data_set_version_id(),
            "Stored completeness flags disagree with mapping plans"
        );
    }

    Ok(mapping)
}

const SELECT_MAPPING: &str = r#"
    SELECT id, source_data_set_version_id, target_data_set_version_id,
           location_mapping_plan, filter_mapping_plan, indicator_mapping_plan,
           location_mappings_complete, filter_mappings_complete, indicator_mappings_complete,
           revision, created_at, updated_at
    FROM data_set_version_mappings
    WHERE target_data_set_version_id = $1
"#;

#[async_trait]
impl MappingStore for PgMappingStore {
    #[instrument(skip(self))]
    async fn find_by_target(
        &self,
        target_version_id: Uuid,
    ) -> Result<Option<DataSetVersionMapping>, StoreError> {
        let row = sqlx::query(SELECT_MAPPING)
            .bind(target_version_id)
            .fetch_optional(&self.pool)
            .await?;

        row.as_ref().map(mapping_from_row).transpose()
    }

    #[instrument(skip(self))]
    async fn find_version(&self, id: Uuid) -> Result<Option<DataSetVersion>, StoreError> {
        let row = sqlx::query(
            r#"
            SELECT id, data_set_id, version_major, version_minor, version_patch
            FROM data_set_versions
            WHERE id = $1
            "#,
        )
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;

        row.map(|row| {
            Ok(DataSetVersion {
                id: row.try_get("id")?,
                data_set_id: row.try_get("data_set_id")?,
                version: Version::new(
                    version_part(&row, "version_major")?,
                    version_part(&row, "version_minor")?,
                    version_part(&row, "version_patch")?,
                ),
            })
        })
        .transpose()
    }

    #[instrument(skip_all, fields(target_version_id = %mapping.target_data_set_version_id()))]
    async fn insert(&self, mapping: &DataSetVersionMapping) -> Result<(), StoreError> {
        let completeness = mapping.completeness();

        sqlx::query(
            r#"
            INSERT INTO data_set_version_mappings (
                id, source_data_set_version_id, target_data_set_version_id,
                location_mapping_plan, filter_mapping_plan, indicator_mapping_plan,
                location_mappings_complete, filter_mappings_complete, indicator_mappings_complete,
                revision, created_at, updated_at
            )
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12)
            "#,
        )
        .bind(mapping.id())
        .bind(mapping.source_data_set_version_id())
        .bind(mapping.target_data_set_version_id())
        .bind(serde_json::to_value(mapping.locations())?)
        .bind(serde_json::to_value(mapping.filters())?)
        .bind(serde_json::to_value(mapping.indicators())?)
        .bind(completeness.locations)
        .bind(completeness.filters)
        .bind(completeness.indicators)
        .bind(mapping.revision())
        .bind(mapping.created_at())
        .bind(mapping.updated_at())
        .execute(&self.pool)
        .await
        .map_err(|e| {
            if let sqlx::Error::Database(ref db_err) = e {
                if db_err.is_unique_violation() {
                    return StoreError::Duplicate(format!(
                        "A mapping already exists for data set version '{}'",
                        mapping.target_data_set_version_id()
                    ));
                }
                if db_err.is_foreign_key_violation() {
                    return StoreError::NotFound(
                        "Source or target data set version not found".to_string(),
                    );
                }
            }
            StoreError::Sqlx(e)
        })?;

        debug!("Inserted data set version mapping");
        Ok(())
    }

    #[instrument(skip_all, fields(
        target_version_id = %commit.mapping.target_data_set_version_id(),
        expected_revision = commit.expected_revision,
    ))]
    async fn commit(&self, commit: MappingCommit<'_>) -> Result<DataSetVersionMapping, StoreError> {
        let mapping = commit.mapping;
        let target = mapping.target_data_set_version_id();
        let completeness = mapping.completeness();

        let locations = serde_json::to_value(mapping.locations())?;
        let filters = serde_json::to_value(mapping.filters())?;
        let indicators = serde_json::to_value(mapping.indicators())?;

        // Dropping the transaction without commit rolls it back
        let mut tx = self.pool.begin().await?;

        let row = sqlx::query(
            r#"
            UPDATE data_set_version_mappings
            SET location_mapping_plan = $3,
                filter_mapping_plan = $4,
                indicator_mapping_plan = $5,
                location_mappings_complete = $6,
                filter_mappings_complete = $7,
                indicator_mappings_complete = $8,
                revision = revision + 1,
                updated_at = NOW()
            WHERE target_data_set_version_id = $1 AND revision = $2
            RETURNING revision, updated_at
            "#,
        )
        .bind(target)
        .bind(commit.expected_revision)
        .bind(locations)
        .bind(filters)
        .bind(indicators)
        .bind(completeness.locations)
        .bind(completeness.filters)
        .bind(completeness.indicators)
        .fetch_optional(&mut *tx)
        .await?;

        let Some(row) = row else {
            let exists: bool = sqlx::query_scalar(
                "SELECT EXISTS (SELECT 1 FROM data_set_version_mappings WHERE target_data_set_version_id = $1)",
            )
            .bind(target)
            .fetch_one(&mut *tx)
            .await?;

            return Err(if exists {
                StoreError::Conflict {
                    target_version_id: target,
                    expected_revision: commit.expected_revision,
                }
            } else {
                StoreError::NotFound(format!("No mapping for data set version '{target}'"))
            });
        };
        let revision: i64 = row.try_get("revision")?;
        let updated_at: DateTime<Utc> = row.try_get("updated_at")?;

        let updated = sqlx::query(
            r#"
            UPDATE data_set_versions
            SET version_major = $2, version_minor = $3, version_patch = $4, updated_at = NOW()
            WHERE id = $1
            "#,
        )
        .bind(target)
        .bind(version_column(commit.target_version.major)?)
        .bind(version_column(commit.target_version.minor)?)
        .bind(version_column(commit.target_version.patch)?)
        .execute(&mut *tx)
        .await?;

        if updated.rows_affected() == 0 {
            return Err(StoreError::NotFound(format!("Data set version '{target}' not found")));
        }

        tx.commit().await?;

        debug!(revision, version = %commit.target_version, "Committed mapping updates");
        Ok(mapping.clone().committed(revision, updated_at))
    }
}
