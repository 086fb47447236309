//! Subcommand implementations.
//!
//! Each command prints a JSON summary on stdout. Per-record and per-key
//! failures are part of the summary; only configuration and connection
//! failures are returned as errors.

use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use serde::Serialize;
use serde_json::json;
use tracing::info;

use flora_core::defaults::{PERMAPEOPLE_OUTPUT_FILE, QUERY_KEYS, TREFLE_OUTPUT_FILE};
use flora_core::{Error, Provider, SpeciesBatch};
use flora_db::{Database, PersistSummary, PoolConfig};
use flora_providers::{adapter_from_env, harvest, request_interval_from_env, FixedInterval};

/// Database URL from the environment; missing or empty is a config error.
pub fn database_url() -> Result<String> {
    std::env::var("DATABASE_URL")
        .ok()
        .filter(|url| !url.trim().is_empty())
        .ok_or_else(|| Error::Config("DATABASE_URL is not set".to_string()).into())
}

/// Explicit keys, or the default query list when none were given.
pub fn query_keys(keys: Vec<String>) -> Vec<String> {
    if keys.is_empty() {
        QUERY_KEYS.iter().map(|k| k.to_string()).collect()
    } else {
        keys
    }
}

/// Interchange file a provider's harvest is written to by default.
pub fn default_output(provider: Provider) -> PathBuf {
    PathBuf::from(match provider {
        Provider::Trefle => TREFLE_OUTPUT_FILE,
        Provider::Permapeople => PERMAPEOPLE_OUTPUT_FILE,
    })
}

/// Records are written one at a time, so a small pool is enough.
const CLI_MAX_CONNECTIONS: u32 = 2;

async fn connect() -> Result<Database> {
    let config = PoolConfig::new().max_connections(CLI_MAX_CONNECTIONS);
    Database::connect_with_config(&database_url()?, config)
        .await
        .context("Failed to connect to database")
}

fn print_json(value: &impl Serialize) -> Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}

pub async fn cmd_migrate() -> Result<()> {
    let db = connect().await?;
    db.migrate().await.context("Failed to run migrations")?;
    info!(subsystem = "cli", op = "migrate", "Migrations applied");
    print_json(&json!({ "migrated": true }))
}

pub async fn cmd_fetch(provider: Provider, output: Option<PathBuf>, keys: Vec<String>) -> Result<()> {
    let adapter = adapter_from_env(provider)?;
    let mut pacer = FixedInterval::new(request_interval_from_env()?);
    let keys = query_keys(keys);
    let output = output.unwrap_or_else(|| default_output(provider));

    let report = harvest(adapter.as_ref(), &keys, &mut pacer).await;
    report
        .batch
        .save(&output)
        .with_context(|| format!("Failed to write {}", output.display()))?;

    print_json(&json!({
        "provider": provider,
        "queried": keys.len(),
        "mapped": report.mapped(),
        "not_found": report.not_found,
        "failures": report
            .failures
            .iter()
            .map(|(key, message)| json!({ "query": key, "error": message }))
            .collect::<Vec<_>>(),
        "output": output.display().to_string(),
    }))
}

/// Summary printed by `load`.
#[derive(Debug, Serialize)]
pub struct LoadSummary<'a> {
    pub file: String,
    pub records: usize,
    pub inserted: usize,
    pub skipped: usize,
    pub errored: usize,
    pub errors: &'a [flora_db::RecordError],
}

impl<'a> LoadSummary<'a> {
    pub fn new(file: &Path, records: usize, summary: &'a PersistSummary) -> Self {
        Self {
            file: file.display().to_string(),
            records,
            inserted: summary.inserted,
            skipped: summary.skipped,
            errored: summary.errored(),
            errors: &summary.errors,
        }
    }
}

pub async fn cmd_load(file: &Path) -> Result<()> {
    let batch = SpeciesBatch::load(file)?;
    let db = connect().await?;

    let summary = db.persister().insert_all(batch.records()).await?;
    print_json(&LoadSummary::new(file, batch.len(), &summary))
}

pub async fn cmd_probe(names: Vec<String>) -> Result<()> {
    let db = connect().await?;

    let mut rows = Vec::new();
    for name in query_keys(names) {
        let row = db.species.find_by_scientific_name(&name).await?;
        rows.push(match row {
            Some(species) => json!({
                "query": name,
                "found": true,
                "id": species.id,
                "common_name": species.common_name,
                "scientific_name": species.scientific_name,
                "slug": species.slug,
                "family": species.family,
                "growth_habit": species.growth_habit,
                "edible_part": species.edible_parts(),
                "last_updated": species.last_updated,
            }),
            None => json!({ "query": name, "found": false }),
        });
    }

    let total = db.species.count().await?;
    print_json(&json!({ "species": rows, "total_rows": total }))
}

#[cfg(test)]
mod tests {
    use super::*;
    use flora_core::{FieldValue, SparseRecord};
    use flora_db::{RecordError, RecordErrorKind};

    #[test]
    fn test_query_keys_default_list() {
        assert_eq!(query_keys(Vec::new()).len(), QUERY_KEYS.len());
        assert_eq!(
            query_keys(vec!["Rubus idaeus".into()]),
            vec!["Rubus idaeus".to_string()]
        );
    }

    #[test]
    fn test_default_output_per_provider() {
        assert_eq!(default_output(Provider::Trefle), PathBuf::from("trefle_data.json"));
        assert_eq!(
            default_output(Provider::Permapeople),
            PathBuf::from("permapeople_data.json")
        );
    }

    #[test]
    fn test_load_summary_serializes_counts() {
        let summary = PersistSummary {
            inserted: 2,
            skipped: 1,
            errors: vec![RecordError {
                identity: "3 (Allium sativum)".into(),
                kind: RecordErrorKind::Store,
                message: "check constraint".into(),
            }],
        };
        let rendered =
            serde_json::to_value(LoadSummary::new(Path::new("batch.json"), 4, &summary)).unwrap();
        assert_eq!(rendered["inserted"], 2);
        assert_eq!(rendered["errored"], 1);
        assert_eq!(rendered["errors"][0]["kind"], "store");
    }

    #[tokio::test]
    async fn test_load_missing_file_fails_before_connecting() {
        let dir = tempfile::tempdir().unwrap();
        let err = cmd_load(&dir.path().join("absent.json")).await.unwrap_err();
        assert!(err.to_string().contains("absent.json"));
    }

    #[test]
    fn test_fetched_batch_file_round_trips() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join(TREFLE_OUTPUT_FILE);
        let mut record = SparseRecord::new();
        record.insert("id", FieldValue::Int(1)).unwrap();
        record.insert("edible", FieldValue::flag(true)).unwrap();
        let batch = SpeciesBatch::from(vec![record]);

        batch.save(&path).unwrap();
        assert_eq!(SpeciesBatch::load(&path).unwrap(), batch);
    }
}
