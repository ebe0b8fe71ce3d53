//! Error types for adcritique-state

use thiserror::Error;

/// Errors produced by report stores.
#[derive(Error, Debug)]
pub enum StorageError {
    /// No report exists for the requested run/attempt
    #[error("report not found: run {run_id} attempt {attempt}")]
    ReportNotFound { run_id: String, attempt: u32 },

    /// Reports are write-once per (run, attempt)
    #[error("report already exists: run {run_id} attempt {attempt}")]
    DuplicateReport { run_id: String, attempt: u32 },

    /// Digest string is not 64 lowercase hex chars
    #[error("invalid digest: {digest}")]
    InvalidDigest { digest: String },

    /// Run identifier cannot be used as a storage key
    #[error("invalid run id: {run_id:?}")]
    InvalidRunId { run_id: String },

    /// Stored bytes no longer match their recorded digest
    #[error("digest mismatch for run {run_id} attempt {attempt}: expected {expected}, got {actual}")]
    DigestMismatch {
        run_id: String,
        attempt: u32,
        expected: String,
        actual: String,
    },

    /// Serialization error
    #[error("serialization failed: {0}")]
    Serialization(#[from] serde_json::Error),

    /// Filesystem error
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
}
