//! Operational tooling for genomics pipeline stages: run flat batches of
//! shell commands under bounded parallelism, open data files by sniffed
//! storage format, package directories into `.tar.gz` archives, and validate
//! stage outputs against per-stage contracts.

pub mod archive;
pub mod batch;
pub mod contracts;
pub mod fileio;

pub use archive::{archive_directory, ArchiveError};
pub use batch::{run_cmd, stage_batch, BatchError, BatchRunner, CommandSpec};
pub use contracts::{validate_outputs, OutputsError, Stage, UnknownStage, VerificationReport};
pub use fileio::{FileFormat, OpenError, TypedOpener, TypedReader, TypedWriter};
