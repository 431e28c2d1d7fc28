//! CLI command implementations.

mod common;
mod extract;
mod merge;

pub use common::ProjectArgs;
pub use extract::{ExtractArgs, extract_project, run_extract};
pub use merge::{MergeArgs, merge_project, run_merge};
