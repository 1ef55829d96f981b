// Résumé content assembly engine.
// Synchronous and pure: history normalization, source matching, dedup, budgeted selection.
// Any I/O (fetching inputs, caching, persistence) belongs to the caller.

pub mod dates;
pub mod dedup;
pub mod fingerprint;
pub mod handlers;
pub mod matcher;
pub mod pipeline;
pub mod resume;
pub mod selector;
pub mod text;

use thiserror::Error;

pub use pipeline::assemble;
pub use resume::AssembledResume;

/// Structurally invalid top-level input. Data-quality problems never surface here.
#[derive(Debug, Error)]
pub enum AssemblyError {
    #[error("content units must be a JSON array")]
    NotAList,

    #[error("content unit #{index} is malformed: {reason}")]
    MalformedUnit { index: usize, reason: String },
}
