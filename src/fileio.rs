//! Extension-based typed file I/O.
//!
//! Storage format is sniffed from the file name (with a trailing `.tmp`
//! stripped first): `.csv`/`.yaml` are plain text, `.gz` is transparent gzip,
//! `.h5`/`.hdf5` mark a table-store container. Unrecognized extensions fall
//! back to plain text after a diagnostic through the opener's sink.

use flate2::read::GzDecoder;
use flate2::write::GzEncoder;
use flate2::Compression;
use std::fs::File;
use std::io::{self, BufRead, BufReader, BufWriter, Read, Write};
use std::path::{Path, PathBuf};
use thiserror::Error;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FileFormat {
    PlainText,
    Gzip,
    /// Tabular container (`.h5`/`.hdf5`). Opened as a raw byte stream;
    /// callers needing structured table access branch on the sniffed format.
    TableStore,
}

#[derive(Debug, Error)]
pub enum OpenError {
    #[error("open {path}: {source}")]
    Open {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
    #[error("create {path}: {source}")]
    Create {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
}

/// Opens files with a transparent decompression/container strategy chosen
/// from the file name. Owns the unknown-extension diagnostic sink so format
/// fallbacks are observable without ambient global state.
pub struct TypedOpener {
    on_unknown: Box<dyn Fn(&Path) + Send + Sync>,
}

impl Default for TypedOpener {
    fn default() -> Self {
        Self {
            on_unknown: Box::new(|path| {
                tracing::warn!(
                    path = %path.display(),
                    "could not detect file format from extension, treating as plain text"
                );
            }),
        }
    }
}

impl TypedOpener {
    pub fn new() -> Self {
        Self::default()
    }

    /// Route unknown-extension diagnostics to `sink` instead of the default
    /// tracing warning.
    pub fn with_diagnostic_sink(sink: impl Fn(&Path) + Send + Sync + 'static) -> Self {
        Self {
            on_unknown: Box::new(sink),
        }
    }

    /// Infer the storage format from the file name. A single trailing `.tmp`
    /// is stripped before the extension is inspected, so `foo.csv.tmp` is
    /// treated as `foo.csv`.
    pub fn sniff(&self, path: &Path) -> FileFormat {
        let name = path
            .file_name()
            .and_then(|name| name.to_str())
            .unwrap_or_default();
        let name = name.strip_suffix(".tmp").unwrap_or(name);
        match Path::new(name).extension().and_then(|ext| ext.to_str()) {
            Some("csv") | Some("yaml") => FileFormat::PlainText,
            Some("gz") => FileFormat::Gzip,
            Some("h5") | Some("hdf5") => FileFormat::TableStore,
            _ => {
                (self.on_unknown)(path);
                FileFormat::PlainText
            }
        }
    }

    /// Open `path` for reading behind the format-appropriate stream wrapper.
    pub fn open_read(&self, path: &Path) -> Result<TypedReader, OpenError> {
        let format = self.sniff(path);
        let file = File::open(path).map_err(|source| OpenError::Open {
            path: path.to_path_buf(),
            source,
        })?;
        Ok(match format {
            FileFormat::Gzip => TypedReader::Gzip(BufReader::new(GzDecoder::new(file))),
            FileFormat::PlainText | FileFormat::TableStore => {
                TypedReader::Plain(BufReader::new(file))
            }
        })
    }

    /// Open `path` for writing behind the format-appropriate stream wrapper.
    /// Gzip writers should be closed with [`TypedWriter::finish`] so encoder
    /// trailer errors surface instead of being dropped.
    pub fn open_write(&self, path: &Path) -> Result<TypedWriter, OpenError> {
        let format = self.sniff(path);
        let file = File::create(path).map_err(|source| OpenError::Create {
            path: path.to_path_buf(),
            source,
        })?;
        Ok(match format {
            FileFormat::Gzip => TypedWriter::Gzip(GzEncoder::new(file, Compression::default())),
            FileFormat::PlainText | FileFormat::TableStore => {
                TypedWriter::Plain(BufWriter::new(file))
            }
        })
    }
}

/// Uniform read handle; resources release on drop on every exit path.
pub enum TypedReader {
    Plain(BufReader<File>),
    Gzip(BufReader<GzDecoder<File>>),
}

impl Read for TypedReader {
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        match self {
            TypedReader::Plain(reader) => reader.read(buf),
            TypedReader::Gzip(reader) => reader.read(buf),
        }
    }
}

impl BufRead for TypedReader {
    fn fill_buf(&mut self) -> io::Result<&[u8]> {
        match self {
            TypedReader::Plain(reader) => reader.fill_buf(),
            TypedReader::Gzip(reader) => reader.fill_buf(),
        }
    }

    fn consume(&mut self, amt: usize) {
        match self {
            TypedReader::Plain(reader) => reader.consume(amt),
            TypedReader::Gzip(reader) => reader.consume(amt),
        }
    }
}

/// Uniform write handle.
pub enum TypedWriter {
    Plain(BufWriter<File>),
    Gzip(GzEncoder<File>),
}

impl TypedWriter {
    /// Flush buffered data and, for gzip, write the stream trailer.
    pub fn finish(self) -> io::Result<()> {
        match self {
            TypedWriter::Plain(mut writer) => writer.flush(),
            TypedWriter::Gzip(encoder) => encoder.finish().map(|_| ()),
        }
    }
}

impl Write for TypedWriter {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        match self {
            TypedWriter::Plain(writer) => writer.write(buf),
            TypedWriter::Gzip(writer) => writer.write(buf),
        }
    }

    fn flush(&mut self) -> io::Result<()> {
        match self {
            TypedWriter::Plain(writer) => writer.flush(),
            TypedWriter::Gzip(writer) => writer.flush(),
        }
    }
}
