//! Workspace umbrella crate for the CSP report ingest service.
//!
//! The `csp-ingest` crate re-exports the parser, pipeline, storage, and
//! server layers so applications and tests can drive the whole service
//! through a single dependency. The binary in `src/main.rs` is the
//! production entry point: it loads configuration from the environment and
//! hands off to [`start_server`].
//!
//! ```text
//! HTTP body ──▶ report::parse ──▶ BatchPipeline ──▶ Storage (bulk index)
//! ```
//!
//! Each layer is usable on its own: [`parse`] is a pure function from bytes
//! and transport metadata to canonical records, [`BatchPipeline`] batches
//! any record stream into a [`Storage`] sink, and [`build_router`] exposes
//! the HTTP surface over a prepared state for in-process testing.

pub use pipeline::{BatchPipeline, PipelineConfig, Stats, StatsSnapshot};
pub use report::{parse, BrowserType, CspReport, ParseError, ParsedViolation};
pub use server::{build_router, start_server, AppState, ServiceConfig};
pub use storage::{
    ElasticsearchConfig, ElasticsearchStorage, MemoryStorage, Storage, StorageError,
};
