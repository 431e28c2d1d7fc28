use crate::core::{CliError, Project};
use clap::Args;
use std::path::PathBuf;

#[derive(Debug, Clone, Args)]
pub struct ProjectArgs {
    /// Directory containing tolk.toml (defaults to current directory).
    #[arg(short, long)]
    pub path: Option<PathBuf>,
}

impl ProjectArgs {
    pub fn load(&self) -> Result<Project, CliError> {
        Project::load(self.path.as_deref())
    }
}
