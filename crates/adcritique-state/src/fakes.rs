//! In-memory fakes for storage traits (testing only)
//!
//! `MemoryReportStore` satisfies the `ReportStore` contract without touching
//! the filesystem.

use std::collections::BTreeMap;
use std::sync::Mutex;

use async_trait::async_trait;
use chrono::Utc;

use crate::error::StorageError;
use crate::storage_traits::*;

/// In-memory report store backed by a `BTreeMap<ReportKey, StoredReport>`.
#[derive(Debug, Default)]
pub struct MemoryReportStore {
    reports: Mutex<BTreeMap<ReportKey, StoredReport>>,
}

impl MemoryReportStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of reports held across all runs.
    pub fn len(&self) -> usize {
        self.reports.lock().map(|r| r.len()).unwrap_or(0)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

fn poisoned() -> StorageError {
    StorageError::Io(std::io::Error::new(
        std::io::ErrorKind::Other,
        "report store lock poisoned",
    ))
}

#[async_trait]
impl ReportStore for MemoryReportStore {
    async fn put_report(
        &self,
        key: &ReportKey,
        body: serde_json::Value,
    ) -> StorageResult<ContentDigest> {
        let digest = ContentDigest::from_json(&body)?;
        let mut reports = self.reports.lock().map_err(|_| poisoned())?;
        if reports.contains_key(key) {
            return Err(StorageError::DuplicateReport {
                run_id: key.run_id.0.clone(),
                attempt: key.attempt,
            });
        }
        reports.insert(
            key.clone(),
            StoredReport {
                key: key.clone(),
                digest: digest.clone(),
                body,
                stored_at: Utc::now(),
            },
        );
        Ok(digest)
    }

    async fn get_report(&self, key: &ReportKey) -> StorageResult<StoredReport> {
        let reports = self.reports.lock().map_err(|_| poisoned())?;
        reports
            .get(key)
            .cloned()
            .ok_or_else(|| StorageError::ReportNotFound {
                run_id: key.run_id.0.clone(),
                attempt: key.attempt,
            })
    }

    async fn list_reports(&self, run_id: &RunId) -> StorageResult<Vec<ReportKey>> {
        let reports = self.reports.lock().map_err(|_| poisoned())?;
        Ok(reports
            .keys()
            .filter(|k| &k.run_id == run_id)
            .cloned()
            .collect())
    }

    async fn delete_run(&self, run_id: &RunId) -> StorageResult<usize> {
        let mut reports = self.reports.lock().map_err(|_| poisoned())?;
        let before = reports.len();
        reports.retain(|k, _| &k.run_id != run_id);
        Ok(before - reports.len())
    }
}
