pub mod content;
pub mod history;
pub(crate) mod lenient;
