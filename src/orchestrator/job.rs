use std::fmt;

use thiserror::Error;

use crate::schema::SchemaName;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum JobState {
    Pending,
    Running,
    Passed,
    Failed(String),
}

impl JobState {
    pub fn is_terminal(&self) -> bool {
        matches!(self, JobState::Passed | JobState::Failed(_))
    }

    fn label(&self) -> &'static str {
        match self {
            JobState::Pending => "pending",
            JobState::Running => "running",
            JobState::Passed => "passed",
            JobState::Failed(_) => "failed",
        }
    }
}

impl fmt::Display for JobState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            JobState::Failed(reason) => write!(f, "failed: {reason}"),
            other => f.write_str(other.label()),
        }
    }
}

#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("invalid job transition from {from} to {to}")]
pub struct JobStateError {
    pub from: &'static str,
    pub to: &'static str,
}

/// One (source, schema) validation attempt.
#[derive(Debug, Clone)]
pub struct ValidationJob {
    pub source: String,
    pub schema: SchemaName,
    /// Size of the local payload once fetched.
    pub byte_size: Option<u64>,
    state: JobState,
}

impl ValidationJob {
    pub fn new(source: impl Into<String>, schema: SchemaName) -> Self {
        Self {
            source: source.into(),
            schema,
            byte_size: None,
            state: JobState::Pending,
        }
    }

    pub fn state(&self) -> &JobState {
        &self.state
    }

    /// Pending → Running. Only called once the schema is resolved.
    pub fn start(&mut self) -> Result<(), JobStateError> {
        match self.state {
            JobState::Pending => {
                self.state = JobState::Running;
                Ok(())
            }
            _ => Err(self.invalid("running")),
        }
    }

    /// Running → Passed.
    pub fn pass(&mut self) -> Result<(), JobStateError> {
        match self.state {
            JobState::Running => {
                self.state = JobState::Passed;
                Ok(())
            }
            _ => Err(self.invalid("passed")),
        }
    }

    /// Pending or Running → Failed.
    pub fn fail(&mut self, reason: impl Into<String>) -> Result<(), JobStateError> {
        if self.state.is_terminal() {
            return Err(self.invalid("failed"));
        }
        self.state = JobState::Failed(reason.into());
        Ok(())
    }

    fn invalid(&self, to: &'static str) -> JobStateError {
        JobStateError {
            from: self.state.label(),
            to,
        }
    }
}
