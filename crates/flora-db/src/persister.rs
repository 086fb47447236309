//! Batch persister: idempotent insert of sparse canonical records.
//!
//! The column set for a batch is fixed once from its first record and the
//! bind type of each column comes from the registry kind, not from sampled
//! data. Records are written one at a time and the batch is not
//! transactional: rows inserted before a failure stay committed.

use std::time::Instant;

use serde::Serialize;
use tracing::{debug, info, warn};

use flora_core::{
    CanonicalField, Error, FieldValue, InsertOutcome, Result, SparseRecord, SpeciesStore,
    ID_FIELD,
};

/// Why a single record was not written.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum RecordErrorKind {
    /// Values could not be aligned to the batch columns.
    Mapping,
    /// The store rejected the row.
    Store,
}

/// A per-record failure; processing continued past it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RecordError {
    pub identity: String,
    pub kind: RecordErrorKind,
    pub message: String,
}

/// Outcome of one `insert_all` call.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct PersistSummary {
    pub inserted: usize,
    pub skipped: usize,
    pub errors: Vec<RecordError>,
}

impl PersistSummary {
    pub fn errored(&self) -> usize {
        self.errors.len()
    }
}

/// Columns to insert for a batch led by `first`: its keys in registry order.
///
/// Fails when the first record carries no canonical field or no `id`,
/// since nothing could be keyed.
pub fn plan_columns(first: &SparseRecord) -> Result<Vec<&'static CanonicalField>> {
    let columns: Vec<_> = first.iter().map(|(field, _)| field).collect();
    if columns.is_empty() {
        return Err(Error::InvalidInput(
            "no valid columns to insert in the first record".to_string(),
        ));
    }
    if !columns.iter().any(|f| f.name == ID_FIELD) {
        return Err(Error::InvalidInput(
            "first record has no 'id'; rows cannot be keyed".to_string(),
        ));
    }
    Ok(columns)
}

/// Assemble positional values for `record` aligned to `columns`.
///
/// Absent fields become `Null`. Values whose variant does not match the
/// column's storage class are converted where a lossless conversion exists.
pub fn assemble_row(
    columns: &[&'static CanonicalField],
    record: &SparseRecord,
) -> Result<Vec<FieldValue>> {
    let mut values = Vec::with_capacity(columns.len());
    for field in columns {
        let value = record.get(field.name).cloned().unwrap_or(FieldValue::Null);
        let storage = field.kind.storage();
        if value.fits(storage) {
            values.push(value);
            continue;
        }
        match value.clone().into_storage(storage) {
            Some(converted) => values.push(converted),
            None => {
                return Err(Error::Mapping(format!(
                    "field '{}' holds {:?}, which is not a valid {}",
                    field.name, value, field.kind
                )))
            }
        }
    }

    Ok(values)
}

/// Writes batches of sparse records into a [`SpeciesStore`].
pub struct BatchPersister<'a, S: SpeciesStore + ?Sized> {
    store: &'a S,
}

impl<'a, S: SpeciesStore + ?Sized> BatchPersister<'a, S> {
    pub fn new(store: &'a S) -> Self {
        Self { store }
    }

    /// Insert every record that is not already stored.
    ///
    /// Duplicate ids are counted as skipped. Mapping and store failures are
    /// collected per record; only a batch with no usable column set fails
    /// as a whole.
    pub async fn insert_all(&self, records: &[SparseRecord]) -> Result<PersistSummary> {
        let mut summary = PersistSummary::default();
        let Some(first) = records.first() else {
            info!(
                subsystem = "db",
                component = "persister",
                "Empty batch, nothing to insert"
            );
            return Ok(summary);
        };

        let start = Instant::now();
        let columns = plan_columns(first)?;
        debug!(
            subsystem = "db",
            component = "persister",
            op = "plan",
            column_count = columns.len(),
            columns = ?columns.iter().map(|f| f.name).collect::<Vec<_>>(),
            "Planned insert columns"
        );

        for record in records {
            let identity = record.identity();

            let extra: Vec<_> = record
                .field_names()
                .filter(|name| !columns.iter().any(|c| c.name == *name))
                .collect();
            if !extra.is_empty() {
                debug!(
                    subsystem = "db",
                    component = "persister",
                    species_id = record.id(),
                    ignored = ?extra,
                    "Fields outside the batch column set are ignored"
                );
            }

            let values = match assemble_row(&columns, record) {
                Ok(values) => values,
                Err(e) => {
                    warn!(
                        subsystem = "db",
                        component = "persister",
                        op = "assemble",
                        identity = %identity,
                        error = %e,
                        "Skipping record"
                    );
                    summary.errors.push(RecordError {
                        identity,
                        kind: RecordErrorKind::Mapping,
                        message: e.to_string(),
                    });
                    continue;
                }
            };

            match self.store.insert_if_absent(&columns, &values).await {
                Ok(InsertOutcome::Inserted) => {
                    info!(
                        subsystem = "db",
                        component = "persister",
                        op = "insert",
                        identity = %identity,
                        "Inserted species"
                    );
                    summary.inserted += 1;
                }
                Ok(InsertOutcome::Duplicate) => {
                    info!(
                        subsystem = "db",
                        component = "persister",
                        op = "insert",
                        identity = %identity,
                        "Skipped species, id already stored"
                    );
                    summary.skipped += 1;
                }
                Err(e) => {
                    warn!(
                        subsystem = "db",
                        component = "persister",
                        op = "insert",
                        identity = %identity,
                        error = %e,
                        "Failed to insert species"
                    );
                    let kind = match e {
                        Error::Mapping(_) => RecordErrorKind::Mapping,
                        _ => RecordErrorKind::Store,
                    };
                    summary.errors.push(RecordError {
                        identity,
                        kind,
                        message: e.to_string(),
                    });
                }
            }
        }

        info!(
            subsystem = "db",
            component = "persister",
            op = "insert_all",
            record_count = records.len(),
            inserted = summary.inserted,
            skipped = summary.skipped,
            errored = summary.errored(),
            duration_ms = start.elapsed().as_millis() as u64,
            "Batch persisted"
        );
        Ok(summary)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use std::collections::BTreeMap;
    use std::sync::Mutex;

    /// In-memory store that enforces the same uniqueness and JSON validity
    /// rules as the `species` table.
    #[derive(Default)]
    struct MemoryStore {
        rows: Mutex<BTreeMap<i64, Vec<(&'static str, FieldValue)>>>,
        writes: Mutex<usize>,
    }

    impl MemoryStore {
        fn row_count(&self) -> usize {
            self.rows.lock().unwrap().len()
        }

        fn value(&self, id: i64, column: &str) -> Option<FieldValue> {
            self.rows.lock().unwrap().get(&id).and_then(|row| {
                row.iter()
                    .find(|(name, _)| *name == column)
                    .map(|(_, v)| v.clone())
            })
        }
    }

    #[async_trait]
    impl SpeciesStore for MemoryStore {
        async fn insert_if_absent(
            &self,
            columns: &[&'static CanonicalField],
            values: &[FieldValue],
        ) -> Result<InsertOutcome> {
            let mut id = None;
            for (field, value) in columns.iter().zip(values) {
                if field.name == ID_FIELD {
                    id = value.as_i64();
                }
                if let (true, FieldValue::Text(text)) = (field.kind.is_json(), value) {
                    serde_json::from_str::<serde_json::Value>(text).map_err(|e| {
                        Error::InvalidInput(format!(
                            "check constraint on '{}' violated: {}",
                            field.name, e
                        ))
                    })?;
                }
            }
            let id = id.ok_or_else(|| {
                Error::InvalidInput("null value in column \"id\" violates not-null".into())
            })?;

            let mut rows = self.rows.lock().unwrap();
            if rows.contains_key(&id) {
                return Ok(InsertOutcome::Duplicate);
            }
            let row = columns
                .iter()
                .zip(values)
                .map(|(f, v)| (f.name, v.clone()))
                .collect();
            rows.insert(id, row);
            *self.writes.lock().unwrap() += 1;
            Ok(InsertOutcome::Inserted)
        }
    }

    fn record(id: i64, name: &str) -> SparseRecord {
        let mut r = SparseRecord::new();
        r.insert("id", FieldValue::Int(id)).unwrap();
        r.insert("scientific_name", FieldValue::Text(name.into()))
            .unwrap();
        r.insert("edible_part", FieldValue::Text(r#"["leaves"]"#.into()))
            .unwrap();
        r
    }

    #[tokio::test]
    async fn test_empty_batch_is_a_no_op() {
        let store = MemoryStore::default();
        let summary = BatchPersister::new(&store).insert_all(&[]).await.unwrap();
        assert_eq!(summary, PersistSummary::default());
    }

    #[tokio::test]
    async fn test_reinserting_same_record_in_a_second_run_is_skipped() {
        let store = MemoryStore::default();
        let batch = vec![record(1, "Malus domestica")];

        let first = BatchPersister::new(&store).insert_all(&batch).await.unwrap();
        let second = BatchPersister::new(&store).insert_all(&batch).await.unwrap();

        assert_eq!((first.inserted, first.skipped), (1, 0));
        assert_eq!((second.inserted, second.skipped), (0, 1));
        assert!(second.errors.is_empty());
        assert_eq!(store.row_count(), 1);
    }

    #[tokio::test]
    async fn test_malformed_record_does_not_halt_batch() {
        let store = MemoryStore::default();
        let mut batch: Vec<_> = (1..=5).map(|i| record(i, "Allium sativum")).collect();
        batch[2]
            .insert("edible_part", FieldValue::Text("[leaves".into()))
            .unwrap();

        let summary = BatchPersister::new(&store).insert_all(&batch).await.unwrap();

        assert_eq!(summary.inserted, 4);
        assert_eq!(summary.skipped, 0);
        assert_eq!(summary.errored(), 1);
        assert_eq!(summary.errors[0].kind, RecordErrorKind::Store);
        assert!(summary.errors[0].identity.starts_with("3"));
        assert!(store.value(4, "id").is_some());
        assert!(store.value(5, "id").is_some());
    }

    #[tokio::test]
    async fn test_cross_provider_id_collision_first_writer_wins() {
        let store = MemoryStore::default();
        let trefle = record(77, "Malus domestica");
        let permapeople = record(77, "Lavandula angustifolia");

        let summary = BatchPersister::new(&store)
            .insert_all(&[trefle, permapeople])
            .await
            .unwrap();

        assert_eq!((summary.inserted, summary.skipped), (1, 1));
        assert_eq!(
            store.value(77, "scientific_name"),
            Some(FieldValue::Text("Malus domestica".into()))
        );
    }

    #[tokio::test]
    async fn test_columns_come_from_first_record_and_absent_values_are_null() {
        let store = MemoryStore::default();
        let mut first = record(1, "Malus domestica");
        first.insert("edible", FieldValue::flag(true)).unwrap();
        let mut second = SparseRecord::new();
        second.insert("id", FieldValue::Int(2)).unwrap();
        second
            .insert("toxicity", FieldValue::Text("none".into()))
            .unwrap();

        let summary = BatchPersister::new(&store)
            .insert_all(&[first, second])
            .await
            .unwrap();

        assert_eq!(summary.inserted, 2);
        assert_eq!(store.value(2, "edible"), Some(FieldValue::Null));
        assert_eq!(store.value(2, "toxicity"), None);
    }

    #[tokio::test]
    async fn test_first_record_without_id_fails_the_batch() {
        let store = MemoryStore::default();
        let mut first = SparseRecord::new();
        first
            .insert("common_name", FieldValue::Text("Apple".into()))
            .unwrap();

        let err = BatchPersister::new(&store)
            .insert_all(&[first])
            .await
            .unwrap_err();
        assert!(matches!(err, Error::InvalidInput(_)));
    }

    #[tokio::test]
    async fn test_unconvertible_value_is_a_mapping_error() {
        let store = MemoryStore::default();
        let mut first = record(1, "Malus domestica");
        first.insert("light", FieldValue::Int(8)).unwrap();
        let mut second = record(2, "Allium sativum");
        second
            .insert("light", FieldValue::Text("Full sun".into()))
            .unwrap();

        let summary = BatchPersister::new(&store)
            .insert_all(&[first, second])
            .await
            .unwrap();

        assert_eq!(summary.inserted, 1);
        assert_eq!(summary.errors.len(), 1);
        assert_eq!(summary.errors[0].kind, RecordErrorKind::Mapping);
        assert_eq!(*store.writes.lock().unwrap(), 1);
    }

    /// Store that refuses every row as misaligned.
    struct MisalignedStore;

    #[async_trait]
    impl SpeciesStore for MisalignedStore {
        async fn insert_if_absent(
            &self,
            columns: &[&'static CanonicalField],
            values: &[FieldValue],
        ) -> Result<InsertOutcome> {
            Err(Error::Mapping(format!(
                "{} columns but {} values",
                columns.len(),
                values.len() + 1
            )))
        }
    }

    #[tokio::test]
    async fn test_store_side_arity_mismatch_is_a_mapping_error() {
        let store = MisalignedStore;
        let batch = vec![record(1, "Malus domestica"), record(2, "Allium sativum")];

        let summary = BatchPersister::new(&store).insert_all(&batch).await.unwrap();

        assert_eq!(summary.inserted, 0);
        assert_eq!(summary.errored(), 2);
        assert!(summary
            .errors
            .iter()
            .all(|e| e.kind == RecordErrorKind::Mapping));
    }

    #[test]
    fn test_assemble_row_converts_numeric_text() {
        let mut r = record(9, "Lavandula angustifolia");
        r.insert("ph_minimum", FieldValue::Text("6.5".into()))
            .unwrap();
        let columns = plan_columns(&r).unwrap();
        let values = assemble_row(&columns, &r).unwrap();
        let ph = columns.iter().position(|f| f.name == "ph_minimum").unwrap();
        assert_eq!(values[ph], FieldValue::Float(6.5));
    }

    #[test]
    fn test_plan_columns_follows_registry_order() {
        let r = record(1, "Malus domestica");
        let names: Vec<_> = plan_columns(&r).unwrap().iter().map(|f| f.name).collect();
        assert_eq!(names, vec!["id", "scientific_name", "edible_part"]);
    }
}
