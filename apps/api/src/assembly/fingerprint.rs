//! Content fingerprint of an assembly run's inputs.
//!
//! Assembly is deterministic, so a hash of `(units, history, budget)` is a valid
//! cache key for its output.

use serde::Serialize;
use sha2::{Digest, Sha256};

use crate::layout::LayoutBudget;
use crate::models::content::ContentUnit;
use crate::models::history::CareerHistory;

/// Bumped whenever assembly semantics change, so stale cache entries miss.
const ENGINE_VERSION: &str = "assembly-v1";

#[derive(Serialize)]
struct FingerprintInput<'a> {
    engine: &'static str,
    units: &'a [ContentUnit],
    history: &'a CareerHistory,
    budget: &'a LayoutBudget,
}

/// Hex-encoded SHA-256 over the canonical JSON of the inputs.
pub fn fingerprint(
    units: &[ContentUnit],
    history: &CareerHistory,
    budget: &LayoutBudget,
) -> Result<String, serde_json::Error> {
    let canonical = serde_json::to_vec(&FingerprintInput {
        engine: ENGINE_VERSION,
        units,
        history,
        budget,
    })?;

    let mut hasher = Sha256::new();
    hasher.update(&canonical);
    Ok(hex::encode(hasher.finalize()))
}
