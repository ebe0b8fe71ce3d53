//! adcritique-state: persistence for the critique engine
//!
//! Lowest layer of the workspace. Owns run identifiers, content digests and
//! the write-once `ReportStore` that keeps one critique report per attempt.
//!
//! ## Key Components
//!
//! - `ReportStore`: async storage trait, keyed by `(RunId, attempt)`
//! - `FsReportStore`: JSON files under `<root>/reports/<run_id>/`
//! - `fakes::MemoryReportStore`: in-memory implementation for tests

mod error;
pub mod fakes;
pub mod fs_store;
pub mod storage_traits;

pub use error::StorageError;
pub use fs_store::FsReportStore;
pub use storage_traits::{
    ContentDigest, ReportKey, ReportStore, RunId, StorageResult, StoredReport,
};
