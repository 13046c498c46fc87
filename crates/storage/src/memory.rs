//! In-memory sink used by pipeline and server tests.
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Mutex;

use async_trait::async_trait;

use report::CspReport;

use crate::error::StorageError;
use crate::Storage;

/// Collects stored batches in memory. `failing()` flips every `store_batch`
/// into an error so worker accounting can be exercised.
#[derive(Debug, Default)]
pub struct MemoryStorage {
    reports: Mutex<Vec<CspReport>>,
    fail: AtomicBool,
    closed: AtomicBool,
}

impl MemoryStorage {
    pub fn new() -> Self {
        Self::default()
    }

    /// A sink that rejects every batch.
    pub fn failing() -> Self {
        let storage = Self::default();
        storage.fail.store(true, Ordering::Relaxed);
        storage
    }

    /// Snapshot of everything stored so far.
    pub fn stored(&self) -> Vec<CspReport> {
        self.reports
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .clone()
    }

    pub fn len(&self) -> usize {
        self.reports
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn is_closed(&self) -> bool {
        self.closed.load(Ordering::Relaxed)
    }
}

#[async_trait]
impl Storage for MemoryStorage {
    async fn store_batch(&self, reports: &[CspReport]) -> Result<(), StorageError> {
        if self.fail.load(Ordering::Relaxed) {
            return Err(StorageError::BulkRejected);
        }
        self.reports
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .extend_from_slice(reports);
        Ok(())
    }

    async fn close(&self) -> Result<(), StorageError> {
        self.closed.store(true, Ordering::Relaxed);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_report() -> CspReport {
        let mut reports =
            report::parse(br#"{"csp-report":{"document-uri":"https://ex.com/","violated-directive":"img-src"}}"#, "test", "127.0.0.1")
                .expect("sample parses");
        reports.remove(0)
    }

    #[tokio::test]
    async fn stores_batches_in_order() {
        let storage = MemoryStorage::new();
        storage
            .store_batch(&[sample_report(), sample_report()])
            .await
            .unwrap();
        storage.store_batch(&[sample_report()]).await.unwrap();
        assert_eq!(storage.len(), 3);
    }

    #[tokio::test]
    async fn failing_sink_rejects_batches() {
        let storage = MemoryStorage::failing();
        let result = storage.store_batch(&[sample_report()]).await;
        assert!(matches!(result, Err(StorageError::BulkRejected)));
        assert!(storage.is_empty());
    }

    #[tokio::test]
    async fn close_is_observable() {
        let storage = MemoryStorage::new();
        assert!(!storage.is_closed());
        storage.close().await.unwrap();
        assert!(storage.is_closed());
    }
}
