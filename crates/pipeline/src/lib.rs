//! Ingest Pipeline - Staging, Batching, and Bulk-Index Workers
//!
//! This crate sits between the HTTP front end and the storage sink:
//!
//! ```text
//! handlers ──▶ staging queue ──▶ batcher ──▶ batch channel ──▶ workers ──▶ sink
//!               (bounded)                     (bounded)
//! ```
//!
//! The pipeline never applies backpressure to HTTP. Overload shows up as
//! deterministic drops at two points, both counted in `errors_total`: the
//! staging queue (per record, at submit) and the batch channel (per batch, at
//! flush). The aggregator flushes on both a size and a time threshold, and a
//! single cancellation token drives an orderly drain on shutdown: the
//! aggregator flushes its partial batch and exits, which closes the batch
//! channel, and the workers finish everything already enqueued before
//! stopping.
use std::sync::Arc;
use std::sync::Mutex;
use std::time::Duration;

use thiserror::Error;
use tokio::sync::mpsc;
use tokio::sync::mpsc::error::TrySendError;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};

use report::CspReport;
use storage::Storage;

mod batcher;
mod stats;
mod worker;

pub use crate::stats::{Stats, StatsSnapshot};

/// Sizing knobs for the pipeline.
#[derive(Debug, Clone)]
pub struct PipelineConfig {
    /// Number of concurrent bulk-indexing workers.
    pub worker_count: usize,
    /// Flush a batch once it reaches this many records.
    pub batch_size: usize,
    /// Capacity of the staging queue between handlers and the batcher.
    pub queue_size: usize,
    /// Flush a non-empty partial batch at least this often.
    pub flush_interval: Duration,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            worker_count: 10,
            batch_size: 100,
            queue_size: 10_000,
            flush_interval: Duration::from_secs(5),
        }
    }
}

impl PipelineConfig {
    /// Validate at startup; every knob must be at least one.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.worker_count == 0 {
            return Err(ConfigError::ZeroWorkers);
        }
        if self.batch_size == 0 {
            return Err(ConfigError::ZeroBatchSize);
        }
        if self.queue_size == 0 {
            return Err(ConfigError::ZeroQueueSize);
        }
        if self.flush_interval.is_zero() {
            return Err(ConfigError::ZeroFlushInterval);
        }
        Ok(())
    }
}

/// Invalid pipeline configuration.
#[derive(Error, Debug, PartialEq, Eq)]
#[non_exhaustive]
pub enum ConfigError {
    #[error("worker_count must be >= 1")]
    ZeroWorkers,
    #[error("batch_size must be >= 1")]
    ZeroBatchSize,
    #[error("queue_size must be >= 1")]
    ZeroQueueSize,
    #[error("flush_interval must be non-zero")]
    ZeroFlushInterval,
}

/// Handle to a running pipeline: submit records, read counters, shut down.
pub struct BatchPipeline {
    tx: mpsc::Sender<CspReport>,
    stats: Arc<Stats>,
    cancel: CancellationToken,
    batcher: Mutex<Option<JoinHandle<()>>>,
    workers: Mutex<Vec<JoinHandle<()>>>,
}

impl BatchPipeline {
    /// Spawn the batcher and worker tasks and return the submit handle.
    ///
    /// The batch channel capacity is `worker_count * 2` so a healthy worker
    /// pool keeps the batcher from ever blocking, while an unhealthy one
    /// surfaces as counted batch drops instead of unbounded memory growth.
    pub fn start(config: PipelineConfig, sink: Arc<dyn Storage>) -> Self {
        let (tx, rx) = mpsc::channel(config.queue_size);
        let (batch_tx, batch_rx) = async_channel::bounded(config.worker_count * 2);
        let stats = Arc::new(Stats::default());
        let cancel = CancellationToken::new();

        let batcher = tokio::spawn(batcher::run(
            rx,
            batch_tx,
            config.batch_size,
            config.flush_interval,
            Arc::clone(&stats),
            cancel.clone(),
        ));

        let workers = (0..config.worker_count)
            .map(|id| {
                tokio::spawn(worker::run(
                    id,
                    batch_rx.clone(),
                    Arc::clone(&sink),
                    Arc::clone(&stats),
                ))
            })
            .collect();

        info!(
            workers = config.worker_count,
            batch_size = config.batch_size,
            queue_size = config.queue_size,
            "batch pipeline started"
        );

        Self {
            tx,
            stats,
            cancel,
            batcher: Mutex::new(Some(batcher)),
            workers: Mutex::new(workers),
        }
    }

    /// Non-blocking submit. A full staging queue drops the record and bumps
    /// `errors_total`; the caller never waits and never sees the drop.
    pub fn submit(&self, csp_report: CspReport) {
        match self.tx.try_send(csp_report) {
            Ok(()) => self.stats.record_enqueued(),
            Err(TrySendError::Full(_)) => {
                self.stats.record_submit_dropped();
                warn!("staging queue full, dropping report");
            }
            Err(TrySendError::Closed(_)) => {
                self.stats.record_submit_dropped();
                warn!("pipeline stopped, dropping report");
            }
        }
    }

    pub fn stats(&self) -> StatsSnapshot {
        self.stats.snapshot()
    }

    /// Orderly drain: cancel, wait for the batcher to flush its partial
    /// batch, then wait for the workers to clear the batch channel.
    pub async fn shutdown(&self) {
        info!("stopping batch pipeline");
        self.cancel.cancel();

        let batcher = self
            .batcher
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .take();
        if let Some(handle) = batcher {
            let _ = handle.await;
        }

        let workers: Vec<_> = self
            .workers
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .drain(..)
            .collect();
        for handle in workers {
            let _ = handle.await;
        }

        info!("batch pipeline stopped");
    }
}
