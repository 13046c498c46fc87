//! Worker pool: pulls batches and invokes the storage sink.
use std::sync::Arc;
use std::time::Instant;

use tracing::{debug, warn};

use report::CspReport;
use storage::Storage;

use crate::stats::Stats;

/// One worker loop. Runs until the batch channel is closed and drained, so a
/// shutdown never strands batches that were already enqueued. Sink failures
/// are counted, not retried; retry semantics belong to the sink.
pub(crate) async fn run(
    id: usize,
    rx: async_channel::Receiver<Vec<CspReport>>,
    sink: Arc<dyn Storage>,
    stats: Arc<Stats>,
) {
    debug!(worker_id = id, "worker started");

    while let Ok(batch) = rx.recv().await {
        if batch.is_empty() {
            continue;
        }

        let size = batch.len();
        let start = Instant::now();
        let result = sink.store_batch(&batch).await;
        let elapsed_ms = start.elapsed().as_millis() as u64;

        stats.record_batch_done(size, result.is_ok());
        match result {
            Ok(()) => {
                debug!(worker_id = id, batch_size = size, elapsed_ms, "batch stored");
            }
            Err(error) => {
                warn!(
                    worker_id = id,
                    batch_size = size,
                    elapsed_ms,
                    error = %error,
                    "failed to store batch"
                );
            }
        }
    }

    debug!(worker_id = id, "worker stopped");
}
