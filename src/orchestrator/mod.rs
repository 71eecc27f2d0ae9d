//! Reference-following validation runs
//!
//! A run validates one root document, then every document it references
//! (allowed-amount and in-network files from a table of contents, provider
//! references from in-network files), and records each attempt in a
//! [`ProcessedLog`] that becomes the index report.
mod error;
mod job;
mod log;
mod report;
mod walk;

pub use error::RunError;
pub use job::{JobState, JobStateError, ValidationJob};
pub use log::{INDEX_FILE, ProcessedEntry, ProcessedLog};
pub use report::{NEGOTIATED_TYPE_REPORT, frequency_map, publish_reports};
pub use walk::{Orchestrator, RunOptions, RunReport};
