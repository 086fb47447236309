//! # flora-core
//!
//! Core types, traits, and abstractions for the flora species ingester.
//!
//! This crate provides the canonical schema registry, the sparse record
//! type every provider adapter produces, the batch interchange format, and
//! the trait seams the provider and database crates implement.

pub mod batch;
pub mod defaults;
pub mod error;
pub mod logging;
pub mod record;
pub mod schema;
pub mod traits;

// Re-export commonly used types at crate root
pub use batch::SpeciesBatch;
pub use error::{Error, Result};
pub use record::{FieldValue, SparseRecord};
pub use schema::{CanonicalField, FieldKind, StorageType, ID_FIELD};
pub use traits::*;
