//! # flora-db
//!
//! PostgreSQL storage layer for the flora species ingester.
//!
//! This crate provides:
//! - Connection pool management
//! - The `species` table migration
//! - `PgSpeciesRepository`, the insert-if-absent store plus probe queries
//! - `BatchPersister`, which writes sparse canonical records idempotently
//!
//! ## Example
//!
//! ```rust,ignore
//! use flora_db::{BatchPersister, Database, SpeciesBatch};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let db = Database::connect("postgres://localhost/flora").await?;
//!     let batch = SpeciesBatch::load("trefle_data.json".as_ref())?;
//!
//!     let summary = BatchPersister::new(&db.species)
//!         .insert_all(batch.records())
//!         .await?;
//!     println!("inserted {} skipped {}", summary.inserted, summary.skipped);
//!     Ok(())
//! }
//! ```

pub mod persister;
pub mod pool;
pub mod species;

// Test fixtures for integration tests
// Note: Always compiled so integration tests (in tests/) can use DEFAULT_TEST_DATABASE_URL
pub mod test_fixtures;

// Re-export core types
pub use flora_core::*;

pub use persister::{
    assemble_row, plan_columns, BatchPersister, PersistSummary, RecordError, RecordErrorKind,
};
pub use pool::{create_pool, create_pool_with_config, PoolConfig};
pub use species::{insert_sql, PgSpeciesRepository, StoredSpecies};

/// Database context holding the pool and the species repository.
#[derive(Clone)]
pub struct Database {
    /// The underlying connection pool.
    pub pool: sqlx::Pool<sqlx::Postgres>,
    /// Species repository: insert-if-absent writes and probe reads.
    pub species: PgSpeciesRepository,
}

impl Database {
    /// Create a new Database instance from an existing pool.
    pub fn new(pool: sqlx::Pool<sqlx::Postgres>) -> Self {
        Self {
            species: PgSpeciesRepository::new(pool.clone()),
            pool,
        }
    }

    /// Create a new Database instance by connecting to the given URL.
    pub async fn connect(url: &str) -> Result<Self> {
        let pool = create_pool(url).await?;
        Ok(Self::new(pool))
    }

    /// Create with custom pool configuration.
    pub async fn connect_with_config(url: &str, config: PoolConfig) -> Result<Self> {
        let pool = create_pool_with_config(url, config).await?;
        Ok(Self::new(pool))
    }

    /// Run pending migrations.
    #[cfg(feature = "migrations")]
    pub async fn migrate(&self) -> Result<()> {
        sqlx::migrate!("../../migrations")
            .run(&self.pool)
            .await
            .map_err(|e| Error::Database(sqlx::Error::Migrate(Box::new(e))))?;
        Ok(())
    }

    /// Get the underlying connection pool.
    pub fn pool(&self) -> &sqlx::Pool<sqlx::Postgres> {
        &self.pool
    }

    /// A persister writing through this database's species repository.
    pub fn persister(&self) -> BatchPersister<'_, PgSpeciesRepository> {
        BatchPersister::new(&self.species)
    }
}
