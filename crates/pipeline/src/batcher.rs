//! Batch aggregator: coalesces individual reports into size- or time-bounded
//! batches.
use std::sync::Arc;
use std::time::Duration;

use async_channel::TrySendError;
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;
use tracing::{debug, warn};

use report::CspReport;

use crate::stats::Stats;

/// Aggregator loop. Waits on shutdown, new records, and the flush timer:
///
/// - a new record is appended; reaching `batch_size` flushes immediately
/// - a timer tick flushes a non-empty buffer
/// - cancellation flushes the partial buffer once and exits
///
/// A flush hands the buffer off without blocking: if the batch channel is
/// full the batch is dropped and counted, because blocking here would stall
/// the ingest path.
pub(crate) async fn run(
    mut rx: mpsc::Receiver<CspReport>,
    batch_tx: async_channel::Sender<Vec<CspReport>>,
    batch_size: usize,
    flush_interval: Duration,
    stats: Arc<Stats>,
    cancel: CancellationToken,
) {
    let mut buffer: Vec<CspReport> = Vec::with_capacity(batch_size);
    // First tick lands one interval from now, not immediately.
    let mut ticker = tokio::time::interval_at(
        tokio::time::Instant::now() + flush_interval,
        flush_interval,
    );
    ticker.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Skip);
    debug!(batch_size, flush_interval_ms = flush_interval.as_millis() as u64, "batcher started");

    loop {
        tokio::select! {
            _ = cancel.cancelled() => {
                if !buffer.is_empty() {
                    flush(&mut buffer, &batch_tx, &stats);
                }
                break;
            }
            received = rx.recv() => {
                match received {
                    Some(csp_report) => {
                        buffer.push(csp_report);
                        if buffer.len() >= batch_size {
                            flush(&mut buffer, &batch_tx, &stats);
                        }
                    }
                    None => {
                        // Every producer is gone; drain what we have.
                        if !buffer.is_empty() {
                            flush(&mut buffer, &batch_tx, &stats);
                        }
                        break;
                    }
                }
            }
            _ = ticker.tick() => {
                if !buffer.is_empty() {
                    flush(&mut buffer, &batch_tx, &stats);
                }
            }
        }
    }

    debug!("batcher stopped");
}

fn flush(
    buffer: &mut Vec<CspReport>,
    batch_tx: &async_channel::Sender<Vec<CspReport>>,
    stats: &Stats,
) {
    let batch = std::mem::replace(buffer, Vec::with_capacity(buffer.capacity()));
    match batch_tx.try_send(batch) {
        Ok(()) => {}
        Err(TrySendError::Full(batch)) => {
            stats.record_batch_dropped(batch.len());
            warn!(batch_size = batch.len(), "batch channel full, dropping batch");
        }
        Err(TrySendError::Closed(batch)) => {
            stats.record_batch_dropped(batch.len());
            warn!(batch_size = batch.len(), "batch channel closed, dropping batch");
        }
    }
}
