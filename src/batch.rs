//! Job-script batch runner.
//!
//! Each submitted command is materialized as a standalone shell script under a
//! work directory, a manifest enumerates one `sh <script>` invocation per job,
//! and a single external executor call (GNU parallel by default) runs the
//! manifest under a concurrency bound. The runner prepares inputs and
//! delegates; it does no in-process concurrency of its own.

use std::fs::{self, File};
use std::io;
use std::path::{Path, PathBuf};
use std::process::{Command, ExitStatus, Stdio};
use thiserror::Error;

/// Manifest file name written into the batch work directory.
pub const MANIFEST_NAME: &str = "commands.txt";

/// Executor handed the manifest when none is configured explicitly.
pub const DEFAULT_EXECUTOR: &str = "parallel";

const SHEBANG: &str = "#!/bin/bash\n";

/// One shell invocation submitted to a batch.
///
/// A command is immutable once submitted and identified only by its position
/// in the batch (its tag), never by content.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CommandSpec {
    /// An ordered token sequence, joined with single spaces when rendered.
    Argv(Vec<String>),
    /// A pre-formed command string, written verbatim.
    Raw(String),
}

impl CommandSpec {
    fn render(&self) -> String {
        match self {
            CommandSpec::Argv(tokens) => {
                let mut line = tokens.join(" ");
                line.push('\n');
                line
            }
            CommandSpec::Raw(text) => text.clone(),
        }
    }
}

#[derive(Debug, Error)]
pub enum BatchError {
    #[error("create batch work dir {path}: {source}")]
    CreateDir {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
    #[error("write job script {path}: {source}")]
    WriteScript {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
    #[error("write batch manifest {path}: {source}")]
    WriteManifest {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
    #[error("open batch manifest {path}: {source}")]
    OpenManifest {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
    #[error("executor `{program}` not found on PATH: {source}")]
    ExecutorMissing {
        program: String,
        #[source]
        source: which::Error,
    },
    #[error("spawn `{program}`: {source}")]
    Spawn {
        program: String,
        #[source]
        source: io::Error,
    },
    #[error("executor `{program}` exited with {status}")]
    ExecutorFailed { program: String, status: ExitStatus },
    #[error("empty command")]
    EmptyCommand,
    #[error("command `{program}` exited with {status}; stderr: {stderr}")]
    CommandFailed {
        program: String,
        status: ExitStatus,
        stderr: String,
    },
    #[error("create stdout file {path}: {source}")]
    CreateOutput {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
}

/// Materialize a batch without executing it: write one `{tag}.sh` script per
/// command plus the manifest, and return the manifest path.
///
/// The work directory is created recursively; an already-existing directory
/// is fine. Tags are assigned in submission order, so the manifest preserves
/// submission order even though the executor may run lines in any order.
pub fn stage_batch(commands: &[CommandSpec], work_dir: &Path) -> Result<PathBuf, BatchError> {
    fs::create_dir_all(work_dir).map_err(|source| BatchError::CreateDir {
        path: work_dir.to_path_buf(),
        source,
    })?;

    let mut manifest = String::new();
    for (tag, command) in commands.iter().enumerate() {
        let script_path = work_dir.join(format!("{tag}.sh"));
        let mut body = String::from(SHEBANG);
        body.push_str(&command.render());
        fs::write(&script_path, body).map_err(|source| BatchError::WriteScript {
            path: script_path.clone(),
            source,
        })?;
        manifest.push_str(&format!("sh {}\n", script_path.display()));
    }

    let manifest_path = work_dir.join(MANIFEST_NAME);
    fs::write(&manifest_path, manifest).map_err(|source| BatchError::WriteManifest {
        path: manifest_path.clone(),
        source,
    })?;
    tracing::debug!(
        jobs = commands.len(),
        work_dir = %work_dir.display(),
        "staged batch scripts and manifest"
    );
    Ok(manifest_path)
}

/// Runs staged batches through an external bounded-parallelism executor.
#[derive(Debug, Clone)]
pub struct BatchRunner {
    executor: String,
}

impl Default for BatchRunner {
    fn default() -> Self {
        Self::new()
    }
}

impl BatchRunner {
    pub fn new() -> Self {
        Self {
            executor: DEFAULT_EXECUTOR.to_string(),
        }
    }

    /// Substitute the executor program (absolute path or PATH name). The
    /// invocation shape is fixed: `<program> --jobs <N>` with the manifest
    /// fed on stdin.
    pub fn with_executor(program: impl Into<String>) -> Self {
        Self {
            executor: program.into(),
        }
    }

    /// Stage `commands` under `work_dir` and run them, at most `max_parallel`
    /// at a time, via one blocking executor invocation.
    ///
    /// Only the executor's aggregate exit status is checked: a non-zero exit
    /// fails the whole batch, and there is no per-job failure isolation,
    /// retry, or partial-success reporting.
    pub fn run_batch(
        &self,
        commands: &[CommandSpec],
        work_dir: &Path,
        max_parallel: usize,
    ) -> Result<(), BatchError> {
        let manifest_path = stage_batch(commands, work_dir)?;

        let program = which::which(&self.executor).map_err(|source| BatchError::ExecutorMissing {
            program: self.executor.clone(),
            source,
        })?;
        let manifest = File::open(&manifest_path).map_err(|source| BatchError::OpenManifest {
            path: manifest_path.clone(),
            source,
        })?;

        tracing::info!(
            executor = %program.display(),
            jobs = commands.len(),
            max_parallel,
            "running batch"
        );
        let status = Command::new(&program)
            .args(["--jobs", &max_parallel.to_string()])
            .stdin(Stdio::from(manifest))
            .status()
            .map_err(|source| BatchError::Spawn {
                program: self.executor.clone(),
                source,
            })?;
        if !status.success() {
            return Err(BatchError::ExecutorFailed {
                program: self.executor.clone(),
                status,
            });
        }
        Ok(())
    }
}

/// Run a single command directly, without script materialization, optionally
/// redirecting its stdout to `stdout_to`. Non-zero exit fails with the
/// captured stderr.
pub fn run_cmd(argv: &[String], stdout_to: Option<&Path>) -> Result<(), BatchError> {
    let (program, args) = argv.split_first().ok_or(BatchError::EmptyCommand)?;

    let mut cmd = Command::new(program);
    cmd.args(args);
    if let Some(path) = stdout_to {
        let file = File::create(path).map_err(|source| BatchError::CreateOutput {
            path: path.to_path_buf(),
            source,
        })?;
        cmd.stdout(Stdio::from(file));
    }
    let output = cmd.output().map_err(|source| BatchError::Spawn {
        program: program.clone(),
        source,
    })?;
    if !output.status.success() {
        return Err(BatchError::CommandFailed {
            program: program.clone(),
            status: output.status,
            stderr: String::from_utf8_lossy(&output.stderr).trim_end().to_string(),
        });
    }
    Ok(())
}
