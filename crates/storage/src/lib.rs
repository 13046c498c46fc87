//! Storage Sinks - Persistence Layer for Canonical CSP Reports
//!
//! The pipeline's worker pool hands fully parsed report batches to a
//! [`Storage`] implementation. A batch is atomic from the pipeline's point of
//! view: the sink either reports success (every record durable) or failure
//! (every record in the batch lost). Sinks own their retry semantics; the
//! workers never retry.
//!
//! Two implementations ship with the crate:
//!
//! - [`ElasticsearchStorage`]: the production sink. Bulk-indexes batches into
//!   one index per UTC day and installs an index template at startup so the
//!   canonical keyword/text/integer field kinds are honored by the cluster.
//! - [`MemoryStorage`]: an in-process sink for pipeline and server tests,
//!   with optional failure injection.
use async_trait::async_trait;

use report::CspReport;

mod elasticsearch;
mod error;
mod memory;

pub use crate::elasticsearch::{ElasticsearchConfig, ElasticsearchStorage};
pub use crate::error::StorageError;
pub use crate::memory::MemoryStorage;

/// A destination for parsed report batches.
#[async_trait]
pub trait Storage: Send + Sync {
    /// Persist one batch. Atomic at the batch boundary: partial per-record
    /// success inside the backend is reported as failure of the whole batch.
    async fn store_batch(&self, reports: &[CspReport]) -> Result<(), StorageError>;

    /// Flush and release backend resources during shutdown.
    async fn close(&self) -> Result<(), StorageError>;
}
