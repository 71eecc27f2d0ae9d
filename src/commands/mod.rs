mod run;
mod update;
mod versions;

pub use run::{EXIT_ABORTED, RunArgs, run_command};
pub use update::update_command;
pub use versions::versions_command;
