use std::fmt::Write as _;
use std::path::Path;

use super::job::{JobState, ValidationJob};
use crate::schema::SchemaName;

pub const INDEX_FILE: &str = "index.txt";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProcessedEntry {
    /// 1-based position in the run.
    pub sequence: usize,
    pub uri: String,
    pub schema: SchemaName,
    pub byte_size: Option<u64>,
    pub state: JobState,
}

impl ProcessedEntry {
    pub fn passed(&self) -> bool {
        self.state == JobState::Passed
    }
}

/// Append-only record of every job attempted in one run, in completion order.
#[derive(Debug, Default)]
pub struct ProcessedLog {
    entries: Vec<ProcessedEntry>,
}

impl ProcessedLog {
    pub fn new() -> Self {
        Self::default()
    }

    /// Sequence number the next recorded job will get.
    pub fn next_sequence(&self) -> usize {
        self.entries.len() + 1
    }

    pub fn record(&mut self, job: &ValidationJob) -> usize {
        let sequence = self.next_sequence();
        self.entries.push(ProcessedEntry {
            sequence,
            uri: job.source.clone(),
            schema: job.schema,
            byte_size: job.byte_size,
            state: job.state().clone(),
        });
        sequence
    }

    pub fn entries(&self) -> &[ProcessedEntry] {
        &self.entries
    }

    pub fn into_entries(self) -> Vec<ProcessedEntry> {
        self.entries
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// One line per job: `<seq>\t\t<schema>\t\t<uri>`, with a trailing
    /// `\t\tfailed: <reason>` column for failed jobs.
    pub fn render_index(&self) -> String {
        let mut out = String::new();
        for entry in &self.entries {
            let _ = write!(out, "{}\t\t{}\t\t{}", entry.sequence, entry.schema, entry.uri);
            if let JobState::Failed(reason) = &entry.state {
                let _ = write!(out, "\t\tfailed: {}", reason.replace(['\n', '\r'], " "));
            }
            out.push('\n');
        }
        out
    }

    pub fn write_index(&self, output_dir: &Path) -> std::io::Result<std::path::PathBuf> {
        let path = output_dir.join(INDEX_FILE);
        std::fs::write(&path, self.render_index())?;
        Ok(path)
    }
}
