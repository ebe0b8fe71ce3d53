//! Storage trait definitions for critique persistence
//!
//! - `RunId`: identifier for one end-to-end critique run
//! - `ContentDigest`: SHA-256 of a persisted report body
//! - `ReportStore`: write-once storage of critique reports, keyed by
//!   run identifier and critique attempt number
//!
//! Traits are async and backend-agnostic. An in-memory fake lives in the
//! `fakes` module and a filesystem backend in `fs_store`.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sha2::Sha256;

use crate::error::StorageError;

/// Result type for storage operations
pub type StorageResult<T> = std::result::Result<T, StorageError>;

// ---------------------------------------------------------------------------
// ContentDigest
// ---------------------------------------------------------------------------

/// Content digest (SHA-256 hex string).
///
/// The inner field is private to guarantee the string is always valid
/// lowercase hex produced by `from_bytes` or validated via `TryFrom<String>`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ContentDigest(String);

impl ContentDigest {
    /// Compute the SHA-256 digest of the given bytes.
    pub fn from_bytes(data: &[u8]) -> Self {
        use sha2::Digest;
        let mut hasher = Sha256::new();
        hasher.update(data);
        ContentDigest(hex::encode(hasher.finalize()))
    }

    /// Digest of the canonical (compact) JSON encoding of `value`.
    pub fn from_json(value: &serde_json::Value) -> StorageResult<Self> {
        let bytes = serde_json::to_vec(value)?;
        Ok(Self::from_bytes(&bytes))
    }

    /// Return the full hex string.
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Short form (first 12 hex chars).
    pub fn short(&self) -> &str {
        &self.0[..12.min(self.0.len())]
    }
}

impl TryFrom<String> for ContentDigest {
    type Error = StorageError;

    fn try_from(s: String) -> std::result::Result<Self, Self::Error> {
        if s.len() != 64 || !s.chars().all(|c| c.is_ascii_hexdigit()) {
            return Err(StorageError::InvalidDigest { digest: s });
        }
        Ok(ContentDigest(s.to_ascii_lowercase()))
    }
}

impl std::fmt::Display for ContentDigest {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

// ---------------------------------------------------------------------------
// RunId
// ---------------------------------------------------------------------------

/// Unique identifier for a critique run
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct RunId(pub String);

impl RunId {
    /// Generate a new random RunId
    pub fn new() -> Self {
        RunId(uuid::Uuid::new_v4().to_string())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Whether the id can be used verbatim as a path component.
    pub fn is_storage_safe(&self) -> bool {
        !self.0.is_empty()
            && self
                .0
                .chars()
                .all(|c| c.is_ascii_alphanumeric() || c == '-' || c == '_')
    }
}

impl Default for RunId {
    fn default() -> Self {
        Self::new()
    }
}

impl From<&str> for RunId {
    fn from(s: &str) -> Self {
        RunId(s.to_string())
    }
}

impl std::fmt::Display for RunId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

// ---------------------------------------------------------------------------
// ReportStore
// ---------------------------------------------------------------------------

/// Key of a persisted report: one per critique attempt of a run.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct ReportKey {
    pub run_id: RunId,
    /// 1-based critique attempt number within the run
    pub attempt: u32,
}

impl ReportKey {
    pub fn new(run_id: RunId, attempt: u32) -> Self {
        Self { run_id, attempt }
    }
}

impl std::fmt::Display for ReportKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}#{}", self.run_id, self.attempt)
    }
}

/// A report as it was persisted.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StoredReport {
    pub key: ReportKey,
    /// Digest of `body` at write time
    pub digest: ContentDigest,
    pub body: serde_json::Value,
    pub stored_at: DateTime<Utc>,
}

/// Write-once critique report storage.
///
/// Guarantees:
/// - `put_report` rejects a second write for the same key.
/// - `get_report` returns the exact body previously stored together with
///   the digest computed at write time.
/// - `list_reports` returns keys for one run ordered by attempt.
#[async_trait]
pub trait ReportStore: Send + Sync {
    /// Persist a report body, returning its content digest.
    async fn put_report(
        &self,
        key: &ReportKey,
        body: serde_json::Value,
    ) -> StorageResult<ContentDigest>;

    /// Retrieve a report. Returns `StorageError::ReportNotFound` if absent.
    async fn get_report(&self, key: &ReportKey) -> StorageResult<StoredReport>;

    /// Keys stored for `run_id`, ascending by attempt.
    async fn list_reports(&self, run_id: &RunId) -> StorageResult<Vec<ReportKey>>;

    /// Most recent attempt for `run_id`, if any.
    async fn latest_report(&self, run_id: &RunId) -> StorageResult<Option<StoredReport>> {
        match self.list_reports(run_id).await?.pop() {
            Some(key) => self.get_report(&key).await.map(Some),
            None => Ok(None),
        }
    }

    /// Remove every report of a run. Returns how many were removed.
    async fn delete_run(&self, run_id: &RunId) -> StorageResult<usize>;
}
