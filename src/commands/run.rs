use std::path::PathBuf;
use std::process::ExitCode;

use anyhow::Result;
use clap::Args;
use colored::Colorize;

use mrfcheck::config::Settings;
use mrfcheck::fetch::HttpFetcher;
use mrfcheck::orchestrator::{JobState, Orchestrator, RunOptions, RunReport};
use mrfcheck::schema::SchemaName;

/// Options shared by `validate` and `from-url`.
#[derive(Debug, Args)]
pub struct RunArgs {
    /// Validate every file against this schema version instead of detecting it
    #[arg(long = "schema-version", value_name = "VERSION")]
    pub schema_version: Option<String>,

    /// Schema the root file is validated against
    #[arg(long, value_enum, default_value_t = SchemaName::InNetworkRates)]
    pub target: SchemaName,

    /// Reject properties the schemas do not declare
    #[arg(long)]
    pub strict: bool,

    /// Directory receiving index.txt and the per-file reports
    #[arg(short, long, default_value = "mrfcheck-results")]
    pub output_dir: PathBuf,

    /// Validate only the root file, without following its references
    #[arg(long)]
    pub no_follow: bool,

    /// Archive member to validate when the root is an archive with several JSON files
    #[arg(long, value_name = "NAME")]
    pub entry: Option<String>,
}

impl RunArgs {
    fn options(&self) -> RunOptions {
        RunOptions {
            schema_version: self.schema_version.clone(),
            strict: self.strict,
            follow_references: !self.no_follow,
            archive_entry: self.entry.clone(),
            output_dir: self.output_dir.clone(),
        }
    }
}

/// Exit status for an aborted run.
pub const EXIT_ABORTED: u8 = 2;
const EXIT_FAILED: u8 = 1;

pub async fn run_command(root: &str, args: RunArgs, settings: &Settings) -> Result<ExitCode> {
    let orchestrator = Orchestrator::new(
        settings.repository(),
        settings.validator(),
        Box::new(HttpFetcher::new()?),
        args.options(),
    );

    match orchestrator.run(root, args.target).await {
        Ok(report) => {
            print_summary(&report);
            if report.passed() {
                Ok(ExitCode::SUCCESS)
            } else {
                Ok(ExitCode::from(EXIT_FAILED))
            }
        }
        Err(err) => {
            eprintln!("{:?}", miette::Report::new(err));
            Ok(ExitCode::from(EXIT_ABORTED))
        }
    }
}

fn print_summary(report: &RunReport) {
    for entry in &report.entries {
        let mark = match &entry.state {
            JobState::Passed => "✓".green(),
            _ => "✗".red(),
        };
        println!("{mark} {:>3}  {:<18} {}", entry.sequence, entry.schema.as_str(), entry.uri);
        if let JobState::Failed(reason) = &entry.state {
            println!("        {}", reason.dimmed());
        }
    }

    let total = report.entries.len();
    let failed = report.failed_count();
    println!();
    if failed == 0 {
        println!("{}", format!("✅ All {total} file(s) passed").green());
    } else {
        println!(
            "{}",
            format!("❌ {failed} of {total} file(s) failed").red()
        );
    }
    println!("Index written to {}", report.index_path.display());
}
