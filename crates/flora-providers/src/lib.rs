//! # flora-providers
//!
//! Provider adapters for the flora species ingester.
//!
//! This crate provides:
//! - The field mapping engine shared by all adapters
//! - `TrefleAdapter` and `PermapeopleAdapter`, both implementing
//!   `flora_core::SourceAdapter`
//! - Injectable pacing policies for provider rate limits
//! - The `harvest` driver that runs an adapter over a list of query keys

pub mod client;
pub mod config;
pub mod harvest;
pub mod mapping;
pub mod pacing;
pub mod permapeople;
pub mod trefle;

pub use client::ProviderClient;
pub use config::{request_interval_from_env, PermapeopleConfig, TrefleConfig};
pub use harvest::{harvest, HarvestReport};
pub use mapping::RecordBuilder;
pub use pacing::{FixedInterval, Pacer, Unpaced};
pub use permapeople::PermapeopleAdapter;
pub use trefle::TrefleAdapter;

use flora_core::{Provider, Result, SourceAdapter};

/// Build the adapter for `provider` from environment configuration.
///
/// Fails with `Error::Config` when the provider's credentials are missing.
pub fn adapter_from_env(provider: Provider) -> Result<Box<dyn SourceAdapter>> {
    Ok(match provider {
        Provider::Trefle => Box::new(TrefleAdapter::from_env()?),
        Provider::Permapeople => Box::new(PermapeopleAdapter::from_env()?),
    })
}
