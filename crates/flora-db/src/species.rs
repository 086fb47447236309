//! Species repository implementation.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::Serialize;
use sqlx::{Pool, Postgres, Row};
use tracing::{debug, trace};

use flora_core::defaults::SPECIES_TABLE;
use flora_core::{
    CanonicalField, Error, FieldValue, InsertOutcome, Result, SpeciesStore, StorageType,
};

/// Subset of a stored species row read back by the retrieval probe.
#[derive(Debug, Clone, Serialize, sqlx::FromRow)]
pub struct StoredSpecies {
    pub id: i64,
    pub common_name: Option<String>,
    pub scientific_name: Option<String>,
    pub slug: Option<String>,
    pub family: Option<String>,
    pub edible_part: Option<String>,
    pub growth_habit: Option<String>,
    pub last_updated: DateTime<Utc>,
}

impl StoredSpecies {
    /// Decoded `edible_part` list, if present and well-formed.
    pub fn edible_parts(&self) -> Option<Vec<String>> {
        self.edible_part
            .as_deref()
            .and_then(|text| serde_json::from_str(text).ok())
    }
}

/// Build the insert-if-absent statement for `columns`.
///
/// Column names come from the canonical registry only and are always
/// quoted, so `rank` and `year` need no special casing.
pub fn insert_sql(columns: &[&'static CanonicalField]) -> String {
    let names = columns
        .iter()
        .map(|f| format!("\"{}\"", f.name))
        .collect::<Vec<_>>()
        .join(", ");
    let placeholders = (1..=columns.len())
        .map(|i| format!("${}", i))
        .collect::<Vec<_>>()
        .join(", ");
    format!(
        "INSERT INTO {} ({}) VALUES ({}) ON CONFLICT (id) DO NOTHING",
        SPECIES_TABLE, names, placeholders
    )
}

/// PostgreSQL implementation of SpeciesStore plus read-back queries.
#[derive(Clone)]
pub struct PgSpeciesRepository {
    pool: Pool<Postgres>,
}

impl PgSpeciesRepository {
    /// Create a new PgSpeciesRepository with the given connection pool.
    pub fn new(pool: Pool<Postgres>) -> Self {
        Self { pool }
    }

    /// Most recent row (highest id) with the given scientific name.
    pub async fn find_by_scientific_name(&self, name: &str) -> Result<Option<StoredSpecies>> {
        let row = sqlx::query_as::<_, StoredSpecies>(
            r#"
            SELECT id, common_name, scientific_name, slug, family,
                   edible_part, growth_habit, last_updated
            FROM species
            WHERE scientific_name = $1
            ORDER BY id DESC
            LIMIT 1
            "#,
        )
        .bind(name)
        .fetch_optional(&self.pool)
        .await
        .map_err(Error::Database)?;

        debug!(
            subsystem = "db",
            component = "species",
            op = "find_by_scientific_name",
            query = name,
            found = row.is_some(),
            "Probe lookup"
        );
        Ok(row)
    }

    /// Total number of stored species rows.
    pub async fn count(&self) -> Result<i64> {
        let row = sqlx::query("SELECT COUNT(*) AS total FROM species")
            .fetch_one(&self.pool)
            .await
            .map_err(Error::Database)?;
        Ok(row.get("total"))
    }

    /// Whether a row with `id` exists.
    pub async fn exists(&self, id: i64) -> Result<bool> {
        let row = sqlx::query("SELECT EXISTS(SELECT 1 FROM species WHERE id = $1) AS present")
            .bind(id)
            .fetch_one(&self.pool)
            .await
            .map_err(Error::Database)?;
        Ok(row.get("present"))
    }

    /// Store-maintained timestamp of row `id`.
    pub async fn last_updated(&self, id: i64) -> Result<Option<DateTime<Utc>>> {
        let row = sqlx::query("SELECT last_updated FROM species WHERE id = $1")
            .bind(id)
            .fetch_optional(&self.pool)
            .await
            .map_err(Error::Database)?;
        Ok(row.map(|r| r.get("last_updated")))
    }

    /// Delete rows by id. Used by integration tests to clean up after themselves.
    pub async fn delete(&self, ids: &[i64]) -> Result<u64> {
        let result = sqlx::query("DELETE FROM species WHERE id = ANY($1)")
            .bind(ids)
            .execute(&self.pool)
            .await
            .map_err(Error::Database)?;
        Ok(result.rows_affected())
    }
}

#[async_trait]
impl SpeciesStore for PgSpeciesRepository {
    async fn insert_if_absent(
        &self,
        columns: &[&'static CanonicalField],
        values: &[FieldValue],
    ) -> Result<InsertOutcome> {
        if columns.len() != values.len() {
            return Err(Error::Mapping(format!(
                "{} columns but {} values",
                columns.len(),
                values.len()
            )));
        }

        let sql = insert_sql(columns);
        trace!(subsystem = "db", component = "species", sql = %sql, "Insert statement");

        let mut query = sqlx::query(&sql);
        for (field, value) in columns.iter().zip(values) {
            query = match (field.kind.storage(), value) {
                (StorageType::Integer, FieldValue::Int(n)) => query.bind(*n),
                (StorageType::Integer, FieldValue::Null) => query.bind(None::<i64>),
                (StorageType::Float, FieldValue::Float(f)) => query.bind(*f),
                (StorageType::Float, FieldValue::Null) => query.bind(None::<f64>),
                (StorageType::Text, FieldValue::Text(s)) => query.bind(s.as_str()),
                (StorageType::Text, FieldValue::Null) => query.bind(None::<String>),
                (storage, other) => {
                    return Err(Error::Mapping(format!(
                        "value {:?} cannot be bound to {:?} column '{}'",
                        other, storage, field.name
                    )))
                }
            };
        }

        let result = query.execute(&self.pool).await.map_err(Error::Database)?;
        if result.rows_affected() == 0 {
            Ok(InsertOutcome::Duplicate)
        } else {
            Ok(InsertOutcome::Inserted)
        }
    }
}
