//! PostgreSQL integration tests for the species repository and persister.
//!
//! Run with `cargo test -p flora-db -- --ignored` against a database
//! reachable at `DATABASE_URL` (or the default test URL).

use flora_db::test_fixtures::{species_record, test_database_url, unique_species_id};
use flora_db::{BatchPersister, Database, FieldValue, InsertOutcome, SpeciesStore};

async fn setup_test_db() -> Database {
    let _ = dotenvy::dotenv();
    let db = Database::connect(&test_database_url())
        .await
        .expect("Failed to connect to test database");
    sqlx::migrate!("../../migrations")
        .run(&db.pool)
        .await
        .expect("Failed to run migrations");
    db
}

#[tokio::test]
#[ignore = "requires PostgreSQL"]
async fn test_apple_record_round_trips_with_flag_and_json_list() {
    let db = setup_test_db().await;
    let id = unique_species_id();
    let name = format!("Malus domestica {}", id);

    let mut apple = species_record(id, "Apple", &name);
    apple.insert("edible", FieldValue::flag(true)).unwrap();
    apple
        .insert("edible_part", FieldValue::Text(r#"["fruit"]"#.into()))
        .unwrap();

    let summary = db.persister().insert_all(&[apple]).await.unwrap();
    assert_eq!(summary.inserted, 1);

    let edible: Option<i16> = sqlx::query_scalar("SELECT edible FROM species WHERE id = $1")
        .bind(id)
        .fetch_one(&db.pool)
        .await
        .unwrap();
    assert_eq!(edible, Some(1));

    let stored = db
        .species
        .find_by_scientific_name(&name)
        .await
        .unwrap()
        .expect("row should be found");
    assert_eq!(stored.common_name.as_deref(), Some("Apple"));
    assert_eq!(stored.edible_part.as_deref(), Some(r#"["fruit"]"#));
    assert_eq!(stored.edible_parts(), Some(vec!["fruit".to_string()]));

    db.species.delete(&[id]).await.unwrap();
}

#[tokio::test]
#[ignore = "requires PostgreSQL"]
async fn test_second_run_skips_and_keeps_last_updated() {
    let db = setup_test_db().await;
    let id = unique_species_id();
    let batch = vec![species_record(id, "Garlic", "Allium sativum")];

    let first = BatchPersister::new(&db.species)
        .insert_all(&batch)
        .await
        .unwrap();
    let stamp = db.species.last_updated(id).await.unwrap();

    let second = BatchPersister::new(&db.species)
        .insert_all(&batch)
        .await
        .unwrap();

    assert_eq!((first.inserted, first.skipped), (1, 0));
    assert_eq!((second.inserted, second.skipped), (0, 1));
    assert!(second.errors.is_empty());
    assert_eq!(db.species.last_updated(id).await.unwrap(), stamp);

    db.species.delete(&[id]).await.unwrap();
}

#[tokio::test]
#[ignore = "requires PostgreSQL"]
async fn test_malformed_json_is_rejected_by_check_constraint() {
    let db = setup_test_db().await;
    let ids: Vec<i64> = (0..5).map(|_| unique_species_id()).collect();
    let mut batch: Vec<_> = ids
        .iter()
        .map(|id| {
            let mut r = species_record(*id, "Lavender", "Lavandula angustifolia");
            r.insert("flower_color", FieldValue::Text(r#"["purple"]"#.into()))
                .unwrap();
            r
        })
        .collect();
    batch[2]
        .insert("flower_color", FieldValue::Text("purple, blue".into()))
        .unwrap();

    let summary = db.persister().insert_all(&batch).await.unwrap();

    assert_eq!(summary.inserted, 4);
    assert_eq!(summary.errors.len(), 1);
    assert!(summary.errors[0].identity.starts_with(&ids[2].to_string()));
    assert!(!db.species.exists(ids[2]).await.unwrap());
    assert!(db.species.exists(ids[4]).await.unwrap());

    db.species.delete(&ids).await.unwrap();
}

#[tokio::test]
#[ignore = "requires PostgreSQL"]
async fn test_insert_if_absent_reports_duplicate() {
    let db = setup_test_db().await;
    let id = unique_species_id();
    let record = species_record(id, "Apple", "Malus domestica");
    let columns = flora_db::plan_columns(&record).unwrap();
    let values = flora_db::assemble_row(&columns, &record).unwrap();

    let first = db.species.insert_if_absent(&columns, &values).await.unwrap();
    let second = db.species.insert_if_absent(&columns, &values).await.unwrap();

    assert_eq!(first, InsertOutcome::Inserted);
    assert_eq!(second, InsertOutcome::Duplicate);
    assert!(db.species.count().await.unwrap() >= 1);

    db.species.delete(&[id]).await.unwrap();
}
