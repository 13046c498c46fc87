//! HTTP Front End for the CSP Report Ingest Service
//!
//! This crate wires the parser and pipeline behind an axum router:
//!
//! - `POST /csp-report` and `POST /csp` accept any supported report dialect
//!   and always answer quickly: the handler never waits on storage and never
//!   blocks on a full queue.
//! - `GET /health` and `GET /metrics` expose the pipeline counters.
//!
//! A global token-bucket rate limiter guards every endpoint, and
//! [`start_server`] owns the full lifecycle: sink connection (with fatal
//! index-template install), pipeline startup, graceful listener shutdown on
//! SIGINT/SIGTERM, and a deadline-bounded pipeline drain.

mod config;
mod error;
mod middleware;
mod routes;
mod server;
mod state;

pub use crate::config::ServiceConfig;
pub use crate::error::{ServerError, ServerResult};
pub use crate::server::{build_router, start_server};
pub use crate::state::AppState;
