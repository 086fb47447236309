//! Core traits for flora abstractions.
//!
//! These traits define the seams between provider adapters, the batch
//! persister and the backing store, so each side can be swapped in tests.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};
use crate::record::{FieldValue, SparseRecord};
use crate::schema::CanonicalField;

// =============================================================================
// PROVIDERS
// =============================================================================

/// External species data providers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Provider {
    Trefle,
    Permapeople,
}

impl Provider {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Trefle => "trefle",
            Self::Permapeople => "permapeople",
        }
    }
}

impl std::fmt::Display for Provider {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for Provider {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.to_ascii_lowercase().as_str() {
            "trefle" => Ok(Self::Trefle),
            "permapeople" => Ok(Self::Permapeople),
            other => Err(Error::InvalidInput(format!("unknown provider '{}'", other))),
        }
    }
}

/// Maps one provider's records into the canonical schema.
#[async_trait]
pub trait SourceAdapter: Send + Sync {
    /// Provider this adapter talks to.
    fn provider(&self) -> Provider;

    /// Resolve `query_key`, fetch its full record and map it.
    ///
    /// `Ok(None)` means the provider has no match (expected, non-fatal);
    /// `Err` means the lookup could not be completed for this key only.
    async fn fetch_and_map(&self, query_key: &str) -> Result<Option<SparseRecord>>;
}

// =============================================================================
// STORE
// =============================================================================

/// Result of an insert-if-absent write.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InsertOutcome {
    /// A new row was written.
    Inserted,
    /// A row with the same id already exists; nothing was written.
    Duplicate,
}

/// Uniquely-keyed species store.
#[async_trait]
pub trait SpeciesStore: Send + Sync {
    /// Insert one row conditioned on its `id` not already existing.
    ///
    /// `values` is positionally aligned with `columns`. Any failure other
    /// than an id collision is returned as an error.
    async fn insert_if_absent(
        &self,
        columns: &[&'static CanonicalField],
        values: &[FieldValue],
    ) -> Result<InsertOutcome>;
}
