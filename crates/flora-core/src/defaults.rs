//! Centralized default constants for flora.
//!
//! All crates and the CLI reference these constants instead of defining
//! their own magic numbers.

// =============================================================================
// PROVIDERS
// =============================================================================

/// Default Trefle API base URL.
pub const TREFLE_URL: &str = "https://trefle.io";

/// Default Permapeople API base URL.
pub const PERMAPEOPLE_URL: &str = "https://permapeople.org";

/// Timeout for a single provider HTTP request in seconds.
pub const HTTP_TIMEOUT_SECS: u64 = 30;

/// Minimum spacing between successive provider queries in milliseconds.
pub const REQUEST_INTERVAL_MS: u64 = 1000;

/// Query keys used when `fetch` is run without explicit names.
pub const QUERY_KEYS: &[&str] = &[
    "Malus domestica",
    "Allium sativum",
    "Lavandula angustifolia",
];

// =============================================================================
// STORAGE
// =============================================================================

/// Name of the canonical species table.
pub const SPECIES_TABLE: &str = "species";

// =============================================================================
// INTERCHANGE
// =============================================================================

/// Default output file for a Trefle harvest.
pub const TREFLE_OUTPUT_FILE: &str = "trefle_data.json";

/// Default output file for a Permapeople harvest.
pub const PERMAPEOPLE_OUTPUT_FILE: &str = "permapeople_data.json";
