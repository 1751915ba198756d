//! Directory packaging into gzip-compressed tar archives.

use flate2::write::GzEncoder;
use flate2::Compression;
use std::fs::File;
use std::io;
use std::path::{Path, PathBuf};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ArchiveError {
    #[error("archive output `{0}` must end in .tar.gz")]
    BadExtension(PathBuf),
    #[error("source directory `{0}` has no base name")]
    BadSource(PathBuf),
    #[error("write archive {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
}

/// Compress `source_dir` into a single `.tar.gz` at `output`.
///
/// The archived entry name is the base name of `source_dir`, so extracting
/// reproduces exactly one top-level directory. The output name is checked
/// before any archiving work begins.
pub fn archive_directory(source_dir: &Path, output: &Path) -> Result<(), ArchiveError> {
    let output_name = output
        .file_name()
        .and_then(|name| name.to_str())
        .unwrap_or_default();
    if !output_name.ends_with(".tar.gz") {
        return Err(ArchiveError::BadExtension(output.to_path_buf()));
    }
    let arcname = source_dir
        .file_name()
        .ok_or_else(|| ArchiveError::BadSource(source_dir.to_path_buf()))?;

    let io_err = |source| ArchiveError::Io {
        path: output.to_path_buf(),
        source,
    };
    let file = File::create(output).map_err(io_err)?;
    let encoder = GzEncoder::new(file, Compression::default());
    let mut builder = tar::Builder::new(encoder);
    builder.append_dir_all(arcname, source_dir).map_err(io_err)?;
    let encoder = builder.into_inner().map_err(io_err)?;
    encoder.finish().map_err(io_err)?;
    tracing::debug!(
        source = %source_dir.display(),
        output = %output.display(),
        "archived directory"
    );
    Ok(())
}
