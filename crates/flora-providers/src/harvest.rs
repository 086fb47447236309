//! Harvest driver: runs one adapter over a list of query keys.

use std::time::Instant;

use serde::Serialize;
use tracing::{info, warn};

use flora_core::{Provider, SourceAdapter, SpeciesBatch};

use crate::pacing::Pacer;

/// Outcome of one harvest run.
#[derive(Debug, Serialize)]
pub struct HarvestReport {
    pub provider: Provider,
    /// Mapped records, in query-key order.
    pub batch: SpeciesBatch,
    /// Keys the provider had no match for.
    pub not_found: Vec<String>,
    /// Keys whose lookup failed, with the error message.
    pub failures: Vec<(String, String)>,
}

impl HarvestReport {
    fn new(provider: Provider) -> Self {
        Self {
            provider,
            batch: SpeciesBatch::new(),
            not_found: Vec::new(),
            failures: Vec::new(),
        }
    }

    pub fn mapped(&self) -> usize {
        self.batch.len()
    }
}

/// Resolve, fetch and map every key in order, pacing between keys.
///
/// Keys are processed strictly one after another. A not-found or failed key
/// is recorded and the run moves on to the next key.
pub async fn harvest<A, P, K>(adapter: &A, keys: &[K], pacer: &mut P) -> HarvestReport
where
    A: SourceAdapter + ?Sized,
    P: Pacer + ?Sized,
    K: AsRef<str>,
{
    let provider = adapter.provider();
    let start = Instant::now();
    let mut report = HarvestReport::new(provider);

    info!(
        subsystem = "providers",
        component = "harvest",
        op = "start",
        provider = %provider,
        key_count = keys.len(),
        "Starting harvest"
    );

    for key in keys {
        let key = key.as_ref();
        pacer.pace().await;

        match adapter.fetch_and_map(key).await {
            Ok(Some(record)) => report.batch.push(record),
            Ok(None) => {
                warn!(
                    subsystem = "providers",
                    component = "harvest",
                    provider = %provider,
                    query = key,
                    "Not found"
                );
                report.not_found.push(key.to_string());
            }
            Err(e) => {
                warn!(
                    subsystem = "providers",
                    component = "harvest",
                    provider = %provider,
                    query = key,
                    error = %e,
                    "Lookup failed"
                );
                report.failures.push((key.to_string(), e.to_string()));
            }
        }
    }

    info!(
        subsystem = "providers",
        component = "harvest",
        op = "finish",
        provider = %provider,
        mapped = report.mapped(),
        not_found = report.not_found.len(),
        failed = report.failures.len(),
        duration_ms = start.elapsed().as_millis() as u64,
        "Harvest finished"
    );
    report
}
