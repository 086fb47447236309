//! Structured logging field name constants for flora.
//!
//! All crates use these names for structured `tracing` fields so log
//! aggregation can query a harvest or load run consistently.
//!
//! ## Log Level Contract
//!
//! | Level | Usage |
//! |-------|-------|
//! | ERROR | Fatal condition, the run stops |
//! | WARN  | Per-item failure or skip, the run continues |
//! | INFO  | Run lifecycle, per-record outcomes |
//! | DEBUG | Decision points (alias fallbacks, coercion drops, column choice) |
//! | TRACE | Raw payload sizes and per-field detail |

// ─── Identity fields ───────────────────────────────────────────────────────

/// Subsystem originating the log event.
/// Values: "providers", "db", "cli"
pub const SUBSYSTEM: &str = "subsystem";

/// Component within a subsystem.
/// Examples: "trefle", "permapeople", "persister", "pool", "pacer"
pub const COMPONENT: &str = "component";

/// Logical operation name.
/// Examples: "resolve", "fetch_detail", "insert", "harvest"
pub const OPERATION: &str = "op";

// ─── Entity fields ─────────────────────────────────────────────────────────

/// Provider name ("trefle", "permapeople").
pub const PROVIDER: &str = "provider";

/// Query key being resolved.
pub const QUERY: &str = "query";

/// Species identifier (provider native id, reused as primary key).
pub const SPECIES_ID: &str = "species_id";

/// Canonical field name.
pub const FIELD: &str = "field";

// ─── Measurement fields ────────────────────────────────────────────────────

/// Wall-clock duration in milliseconds.
pub const DURATION_MS: &str = "duration_ms";

/// Number of records in a batch.
pub const RECORD_COUNT: &str = "record_count";

/// Number of columns selected for insertion.
pub const COLUMN_COUNT: &str = "column_count";

/// HTTP status code returned by a provider.
pub const HTTP_STATUS: &str = "http_status";

// ─── Outcome fields ────────────────────────────────────────────────────────

/// Rows inserted.
pub const INSERTED: &str = "inserted";

/// Rows skipped as duplicates.
pub const SKIPPED: &str = "skipped";

/// Error message when an operation fails.
pub const ERROR_MSG: &str = "error";
