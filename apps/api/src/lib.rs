pub mod assembly;
pub mod cache;
pub mod config;
pub mod diagnostics;
pub mod errors;
pub mod layout;
pub mod models;
pub mod routes;
pub mod state;
