use std::sync::Arc;

use crate::cache::AssemblyCache;
use crate::config::Config;

/// Shared application state injected into all route handlers via Axum extractors.
#[derive(Clone)]
pub struct AppState {
    pub config: Config,
    /// Fingerprint-keyed memo of assembly responses. Redis or in-process.
    pub cache: Arc<dyn AssemblyCache>,
}
