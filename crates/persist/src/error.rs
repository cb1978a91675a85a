use std::fmt;
use std::io;
use std::path::{Path, PathBuf};

/// The step of a blob operation that failed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum IoStep {
    OpenForInput,
    ReadInput,
    /// Decompressing the buffered input failed (corrupt data or wrong codec).
    DecodeInput,
    OpenForOutput,
    /// Compressing caller bytes into the in-memory buffer failed.
    EncodeOutput,
    WriteOutput,
    /// Writing the container trailer into the in-memory buffer failed.
    FinalizeCodec,
    Delete,
    ReadMetadata,
}

impl fmt::Display for IoStep {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            IoStep::OpenForInput => "open for input",
            IoStep::ReadInput => "read input",
            IoStep::DecodeInput => "decode input",
            IoStep::OpenForOutput => "open for output",
            IoStep::EncodeOutput => "encode output",
            IoStep::WriteOutput => "write output",
            IoStep::FinalizeCodec => "finalize codec",
            IoStep::Delete => "delete",
            IoStep::ReadMetadata => "read metadata",
        })
    }
}

/// Errors from blob file operations.
///
/// Platform I/O errors never escape an [`NbtFile`](crate::NbtFile) method in
/// raw form; they are wrapped in [`NbtFileError::Io`] with the failing step
/// and kept reachable through [`std::error::Error::source`].
#[derive(Debug, thiserror::Error)]
pub enum NbtFileError {
    #[error("failed to {step} {}", path.display())]
    Io {
        step: IoStep,
        path: PathBuf,
        #[source]
        source: io::Error,
    },
    #[error("invalid compression type: {0}")]
    InvalidCompression(String),
}

impl NbtFileError {
    pub(crate) fn io(step: IoStep, path: &Path, source: io::Error) -> Self {
        NbtFileError::Io {
            step,
            path: path.to_path_buf(),
            source,
        }
    }

    /// The failing step, if this is an I/O failure.
    pub fn step(&self) -> Option<IoStep> {
        match self {
            NbtFileError::Io { step, .. } => Some(*step),
            NbtFileError::InvalidCompression(_) => None,
        }
    }

    /// The kind of the wrapped I/O error, if any.
    pub fn io_kind(&self) -> Option<io::ErrorKind> {
        match self {
            NbtFileError::Io { source, .. } => Some(source.kind()),
            NbtFileError::InvalidCompression(_) => None,
        }
    }
}

pub type Result<T> = std::result::Result<T, NbtFileError>;
