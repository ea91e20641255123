//! `leadsync-engine`: bulk lead upsert reconciliation core.
//!
//! Pure engine crate: submits leads through a `LeadApi` implementation,
//! maps the platform's chunked batch responses back onto input positions,
//! optionally resolves ambiguous duplicates, and returns bucketed results.
//! No HTTP or terminal IO dependencies.

pub mod aggregate;
pub mod api;
pub mod classify;
pub mod config;
pub mod engine;
pub mod error;
pub mod model;
pub mod resolve;
pub mod walker;

pub use api::{ApiError, LeadApi, LeadMatch, LookupResponse, UpdateResponse};
pub use config::SyncConfig;
pub use engine::{run_bulk, run_single};
pub use error::SyncError;
pub use model::{
    BatchResponse, CsvSidecar, FieldMap, ItemResult, Outcome, RunReport, RunStatus, RunSummary,
};
