use std::collections::HashSet;
use std::fmt;
use std::path::{Path, PathBuf};

use tracing::{debug, info, warn};

use super::error::RunError;
use super::job::{JobStateError, ValidationJob};
use super::log::{ProcessedEntry, ProcessedLog};
use super::report::publish_reports;
use crate::detect::{DetectionError, VersionDetector};
use crate::fetch::{FetchError, Fetched, Fetcher};
use crate::repository::{RepositoryError, VersionRepository};
use crate::schema::{SchemaCache, SchemaError, SchemaName};
use crate::validator::{Validator, ValidatorError, ValidatorOutcome};
use crate::workspace::RunWorkspace;

/// Caller-controlled knobs for one run.
#[derive(Debug, Clone)]
pub struct RunOptions {
    /// Version to use for every job instead of detecting it.
    pub schema_version: Option<String>,
    pub strict: bool,
    pub follow_references: bool,
    /// Archive member to use when the root is an archive with several payloads.
    pub archive_entry: Option<String>,
    pub output_dir: PathBuf,
}

impl RunOptions {
    pub fn new(output_dir: impl Into<PathBuf>) -> Self {
        Self {
            schema_version: None,
            strict: false,
            follow_references: true,
            archive_entry: None,
            output_dir: output_dir.into(),
        }
    }
}

/// Outcome of a run that was not aborted.
#[derive(Debug)]
pub struct RunReport {
    pub entries: Vec<ProcessedEntry>,
    pub index_path: PathBuf,
    pub reports: Vec<PathBuf>,
}

impl RunReport {
    pub fn passed(&self) -> bool {
        self.entries.iter().all(ProcessedEntry::passed)
    }

    pub fn failed_count(&self) -> usize {
        self.entries.iter().filter(|entry| !entry.passed()).count()
    }
}

/// Why a single job did not pass.
#[derive(Debug)]
enum JobFailure {
    Fetch(FetchError),
    Ambiguous(Vec<String>),
    Detection(DetectionError),
    Repository(RepositoryError),
    SchemaUnavailable(String),
    Schema(SchemaError),
    Validator(ValidatorError),
    Workspace(std::io::Error),
    Transition(JobStateError),
}

impl JobFailure {
    /// Failures that end the run wherever they happen.
    fn is_run_fatal(&self) -> bool {
        matches!(
            self,
            JobFailure::Repository(RepositoryError::Unavailable { .. })
                | JobFailure::Validator(ValidatorError::Unavailable { .. })
                | JobFailure::Workspace(_)
                | JobFailure::Transition(_)
        )
    }

    /// Failures that abort the run when they hit the root job. Only a
    /// validator that ran and then misbehaved is recorded instead.
    fn aborts_root(&self) -> bool {
        match self {
            JobFailure::Validator(ValidatorError::Unavailable { .. }) => true,
            JobFailure::Validator(_) => false,
            _ => true,
        }
    }

    fn into_run_error(self, job: &ValidationJob) -> RunError {
        let uri = job.source.clone();
        match self {
            JobFailure::Fetch(source) => RunError::Fetch { uri, source },
            JobFailure::Ambiguous(candidates) => RunError::AmbiguousArchive { uri, candidates },
            JobFailure::Detection(source) => RunError::VersionUndetermined { uri, source },
            JobFailure::Repository(e) => RunError::Repository(e),
            JobFailure::SchemaUnavailable(version) => RunError::SchemaUnavailable {
                schema: job.schema,
                version,
            },
            JobFailure::Schema(e) => RunError::Schema(e),
            JobFailure::Validator(e @ ValidatorError::Unavailable { .. }) => {
                RunError::ValidatorUnavailable(e)
            }
            JobFailure::Validator(source) => RunError::Validator { uri, source },
            JobFailure::Workspace(e) => RunError::Workspace(e),
            JobFailure::Transition(e) => RunError::InvalidTransition(e),
        }
    }
}

impl fmt::Display for JobFailure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            JobFailure::Fetch(e) => write!(f, "{e}"),
            JobFailure::Ambiguous(candidates) => write!(
                f,
                "archive holds several JSON payloads: {}",
                candidates.join(", ")
            ),
            JobFailure::Detection(e) => write!(f, "{e}"),
            JobFailure::Repository(e) => write!(f, "{e}"),
            JobFailure::SchemaUnavailable(version) => {
                write!(f, "schema not published at version {version}")
            }
            JobFailure::Schema(e) => write!(f, "{e}"),
            JobFailure::Validator(e) => write!(f, "{e}"),
            JobFailure::Workspace(e) => write!(f, "workspace error: {e}"),
            JobFailure::Transition(e) => write!(f, "{e}"),
        }
    }
}

/// Validates a root file and every file reachable from it by reference.
pub struct Orchestrator {
    repository: Box<dyn VersionRepository>,
    validator: Box<dyn Validator>,
    fetcher: Box<dyn Fetcher>,
    detector: VersionDetector,
    options: RunOptions,
}

impl Orchestrator {
    pub fn new(
        repository: Box<dyn VersionRepository>,
        validator: Box<dyn Validator>,
        fetcher: Box<dyn Fetcher>,
        options: RunOptions,
    ) -> Self {
        Self {
            repository,
            validator,
            fetcher,
            detector: VersionDetector::default(),
            options,
        }
    }

    pub fn with_detector(mut self, detector: VersionDetector) -> Self {
        self.detector = detector;
        self
    }

    /// Run the walk from `root`, validated against `schema`.
    ///
    /// Consumes the orchestrator so the run's scratch storage is gone by the
    /// time a result or an error reaches the caller.
    pub async fn run(mut self, root: &str, schema: SchemaName) -> Result<RunReport, RunError> {
        self.repository.ensure().await?;

        let output_dir = self.options.output_dir.clone();
        std::fs::create_dir_all(&output_dir).map_err(|e| RunError::Output {
            path: output_dir.clone(),
            source: e,
        })?;

        let workspace = RunWorkspace::new().map_err(RunError::Workspace)?;
        let schemas_dir = workspace.schemas_dir().map_err(RunError::Workspace)?;
        let mut run = Run {
            orchestrator: &mut self,
            workspace: &workspace,
            cache: SchemaCache::new(schemas_dir),
            log: ProcessedLog::new(),
            reports: Vec::new(),
        };

        let outcome = run.walk(root, schema).await;
        let Run { log, reports, .. } = run;

        // The index is written whenever at least one job was attempted, even
        // if the walk was cut short.
        let index_path = if log.is_empty() {
            None
        } else {
            Some(log.write_index(&output_dir).map_err(|e| RunError::Output {
                path: output_dir.clone(),
                source: e,
            })?)
        };

        outcome?;
        let index_path = index_path.unwrap_or_else(|| output_dir.join(super::INDEX_FILE));
        Ok(RunReport {
            entries: log.into_entries(),
            index_path,
            reports,
        })
    }
}

/// State owned by one in-flight run.
struct Run<'a> {
    orchestrator: &'a mut Orchestrator,
    workspace: &'a RunWorkspace,
    cache: SchemaCache,
    log: ProcessedLog,
    reports: Vec<PathBuf>,
}

impl Run<'_> {
    /// Depth-first over an explicit stack; every URI is visited at most once.
    async fn walk(&mut self, root: &str, schema: SchemaName) -> Result<(), RunError> {
        let mut pending = vec![ValidationJob::new(root, schema)];
        let mut seen: HashSet<String> = HashSet::from([root.to_string()]);

        while let Some(mut job) = pending.pop() {
            let sequence = self.log.next_sequence();
            let is_root = sequence == 1;
            info!("[{sequence}] Validating {} as {}", job.source, job.schema);

            match self.process(&mut job, sequence, is_root).await {
                Ok(outcome) => {
                    if outcome.pass {
                        job.pass()?;
                        info!("[{sequence}] {} passed", job.source);
                    } else {
                        job.fail("document does not conform to the schema")?;
                        warn!("[{sequence}] {} failed validation", job.source);
                    }
                    self.log.record(&job);

                    let published = publish_reports(
                        &outcome.reports,
                        sequence,
                        &self.orchestrator.options.output_dir,
                    )
                    .map_err(|e| RunError::Output {
                        path: self.orchestrator.options.output_dir.clone(),
                        source: e,
                    })?;
                    self.reports.extend(published);

                    if self.orchestrator.options.follow_references {
                        let discovered = discover(&job, &outcome, &mut seen);
                        debug!("[{sequence}] discovered {} reference(s)", discovered.len());
                        // Reversed so siblings pop in discovery order.
                        pending.extend(discovered.into_iter().rev());
                    }
                }
                Err(failure) if is_root && failure.aborts_root() => {
                    return Err(failure.into_run_error(&job));
                }
                Err(failure) => {
                    warn!("[{sequence}] {}: {failure}", job.source);
                    job.fail(failure.to_string())?;
                    self.log.record(&job);
                    if failure.is_run_fatal() {
                        return Err(failure.into_run_error(&job));
                    }
                }
            }
        }

        Ok(())
    }

    /// Fetch, resolve version and schema, then validate one job.
    async fn process(
        &mut self,
        job: &mut ValidationJob,
        sequence: usize,
        is_root: bool,
    ) -> Result<ValidatorOutcome, JobFailure> {
        let (data_dir, output_dir) = self
            .workspace
            .job_dirs(sequence)
            .map_err(JobFailure::Workspace)?;

        let entry = if is_root {
            self.orchestrator.options.archive_entry.as_deref()
        } else {
            None
        };
        let payload = match self
            .orchestrator
            .fetcher
            .fetch(&job.source, &data_dir, entry)
            .await
            .map_err(JobFailure::Fetch)?
        {
            Fetched::Payload(path) => path,
            Fetched::Ambiguous(candidates) => return Err(JobFailure::Ambiguous(candidates)),
        };
        job.byte_size = std::fs::metadata(&payload).ok().map(|meta| meta.len());

        let version = self.resolve_version(&payload).await?;
        let repository = &mut self.orchestrator.repository;
        repository
            .checkout(&version)
            .await
            .map_err(JobFailure::Repository)?;

        let schema_path = self
            .cache
            .use_schema(&**repository, job.schema, self.orchestrator.options.strict)
            .map_err(|e| match e {
                SchemaError::Repository(e) => JobFailure::Repository(e),
                other => JobFailure::Schema(other),
            })?
            .ok_or_else(|| JobFailure::SchemaUnavailable(version.clone()))?;

        job.start().map_err(JobFailure::Transition)?;
        debug!(
            "Validating {} with {} ({version})",
            payload.display(),
            schema_path.display()
        );

        self.orchestrator
            .validator
            .run(&schema_path, &payload, &output_dir)
            .await
            .map_err(JobFailure::Validator)
    }

    async fn resolve_version(&self, payload: &Path) -> Result<String, JobFailure> {
        if let Some(version) = &self.orchestrator.options.schema_version {
            return Ok(version.clone());
        }
        self.orchestrator
            .detector
            .detect(payload)
            .await
            .map_err(JobFailure::Detection)
    }
}

/// New jobs for the locations `job`'s schema kind refers to.
fn discover(
    job: &ValidationJob,
    outcome: &ValidatorOutcome,
    seen: &mut HashSet<String>,
) -> Vec<ValidationJob> {
    let mut discovered = Vec::new();
    for role in job.schema.followed_roles() {
        for location in outcome.locations.for_role(*role) {
            if seen.insert(location.clone()) {
                discovered.push(ValidationJob::new(location.clone(), role.schema()));
            }
        }
    }
    discovered
}
