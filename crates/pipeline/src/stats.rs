//! Shared atomic counters for the ingest pipeline.
//!
//! Updated lock-free by HTTP handlers, the aggregator, and the workers; read
//! by the `/health` and `/metrics` handlers.
use std::sync::atomic::{AtomicI64, AtomicU64, Ordering};

use serde::Serialize;

#[derive(Debug, Default)]
pub struct Stats {
    queue_size: AtomicI64,
    processed_total: AtomicU64,
    errors_total: AtomicU64,
    batches_total: AtomicU64,
}

impl Stats {
    /// A record entered the staging queue.
    pub(crate) fn record_enqueued(&self) {
        self.queue_size.fetch_add(1, Ordering::Relaxed);
    }

    /// A record was dropped at submit time (staging queue full). It never
    /// entered the queue, so only the error counter moves.
    pub(crate) fn record_submit_dropped(&self) {
        self.errors_total.fetch_add(1, Ordering::Relaxed);
    }

    /// A whole batch was dropped at the aggregator boundary (batch channel
    /// full). The gauge must come down too or it drifts.
    pub(crate) fn record_batch_dropped(&self, count: usize) {
        self.errors_total.fetch_add(count as u64, Ordering::Relaxed);
        self.queue_size.fetch_sub(count as i64, Ordering::Relaxed);
    }

    /// A worker finished a batch, successfully or not.
    pub(crate) fn record_batch_done(&self, count: usize, success: bool) {
        self.queue_size.fetch_sub(count as i64, Ordering::Relaxed);
        self.batches_total.fetch_add(1, Ordering::Relaxed);
        if success {
            self.processed_total.fetch_add(count as u64, Ordering::Relaxed);
        } else {
            self.errors_total.fetch_add(count as u64, Ordering::Relaxed);
        }
    }

    pub fn snapshot(&self) -> StatsSnapshot {
        StatsSnapshot {
            queue_size: self.queue_size.load(Ordering::Relaxed),
            processed_total: self.processed_total.load(Ordering::Relaxed),
            errors_total: self.errors_total.load(Ordering::Relaxed),
            batches_total: self.batches_total.load(Ordering::Relaxed),
        }
    }
}

/// Point-in-time view of the pipeline counters.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct StatsSnapshot {
    pub queue_size: i64,
    pub processed_total: u64,
    pub errors_total: u64,
    pub batches_total: u64,
}
