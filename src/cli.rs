//! CLI argument parsing for the stagekit toolkit.
//!
//! The CLI is a thin wrapper over the library API so the same batch and
//! contract logic is reusable by orchestration code directly.
use clap::{Parser, Subcommand};
use std::path::PathBuf;

use stagekit::batch::DEFAULT_EXECUTOR;

/// Root CLI entrypoint.
#[derive(Parser, Debug)]
#[command(
    name = "stagekit",
    version,
    about = "Batch execution and output-contract checks for pipeline stages",
    subcommand_required = true,
    arg_required_else_help = true
)]
pub struct RootArgs {
    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    RunBatch(RunBatchArgs),
    VerifyOutputs(VerifyOutputsArgs),
    Archive(ArchiveArgs),
}

#[derive(Parser, Debug)]
#[command(about = "Run a file of shell commands under bounded parallelism")]
pub struct RunBatchArgs {
    /// File with one shell command per line
    #[arg(long, value_name = "PATH")]
    pub commands: PathBuf,

    /// Directory for generated job scripts and the manifest
    #[arg(long, value_name = "DIR")]
    pub work_dir: PathBuf,

    /// Maximum number of jobs run concurrently
    #[arg(long, default_value_t = 1)]
    pub jobs: usize,

    /// Split each line into argv tokens instead of running it verbatim
    #[arg(long)]
    pub argv: bool,

    /// Executor program handed the manifest
    #[arg(long, default_value = DEFAULT_EXECUTOR)]
    pub executor: String,
}

#[derive(Parser, Debug)]
#[command(about = "Check a stage's output directory against its contract")]
pub struct VerifyOutputsArgs {
    /// Stage name (hmmcopy, alignment, breakpoint_calling, variant_calling, snv_genotyping)
    #[arg(long)]
    pub stage: String,

    /// Directory holding the stage's output files
    #[arg(long, value_name = "DIR")]
    pub dir: PathBuf,

    /// Sample identifier for per-sample contracts (repeatable)
    #[arg(long = "sample", value_name = "ID")]
    pub samples: Vec<String>,

    /// Emit a machine-readable JSON report
    #[arg(long)]
    pub json: bool,
}

#[derive(Parser, Debug)]
#[command(about = "Pack a directory into a gzip-compressed tar archive")]
pub struct ArchiveArgs {
    /// Directory to archive
    #[arg(long, value_name = "DIR")]
    pub source: PathBuf,

    /// Output path; must end in .tar.gz
    #[arg(long, value_name = "PATH")]
    pub output: PathBuf,
}
