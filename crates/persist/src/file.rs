//! File handle for a single compressed blob.

use std::fmt;
use std::fs::File;
use std::io::{Read, Write};
use std::path::{Path, PathBuf};
use std::time::{SystemTime, UNIX_EPOCH};

use flate2::Compression;
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::compression::{CompressionType, DEFAULT_COMPRESSION};
use crate::error::{IoStep, NbtFileError, Result};
use crate::stream::{DataInputStream, DataOutputStream};

/// Initial capacity of the in-memory write buffer.
pub const DEFAULT_BUFFER_CAPACITY: usize = 8096;

/// Default deflate level, the zlib default.
pub const DEFAULT_LEVEL: u32 = 6;

/// Per-handle stream settings.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NbtFileOptions {
    /// Compression used by the stream methods that take no explicit type.
    pub compression: CompressionType,
    /// Deflate level 0-9; larger values are clamped to 9.
    pub level: u32,
    /// Initial capacity of the write buffer. The buffer grows as needed.
    pub buffer_capacity: usize,
}

impl Default for NbtFileOptions {
    fn default() -> Self {
        Self {
            compression: DEFAULT_COMPRESSION,
            level: DEFAULT_LEVEL,
            buffer_capacity: DEFAULT_BUFFER_CAPACITY,
        }
    }
}

impl NbtFileOptions {
    fn flate_level(&self) -> Compression {
        Compression::new(self.level.min(9))
    }
}

/// Modification time in whole seconds since the Unix epoch.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct Timestamp(pub i64);

impl Timestamp {
    /// Truncates toward zero; times before the epoch are negative.
    pub fn from_system_time(time: SystemTime) -> Self {
        match time.duration_since(UNIX_EPOCH) {
            Ok(since) => Self(since.as_secs() as i64),
            Err(before) => Self(-(before.duration().as_secs() as i64)),
        }
    }

    pub fn now() -> Self {
        Self::from_system_time(SystemTime::now())
    }

    pub fn as_secs(self) -> i64 {
        self.0
    }
}

impl fmt::Display for Timestamp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Handle to one compressed blob on disk.
///
/// The handle only names a path. It caches nothing and holds no open file
/// between calls, so every method observes the current filesystem state.
#[derive(Debug, Clone)]
pub struct NbtFile {
    path: PathBuf,
    options: NbtFileOptions,
}

impl NbtFile {
    pub fn new(path: impl AsRef<Path>) -> Self {
        Self::with_options(path, NbtFileOptions::default())
    }

    pub fn with_options(path: impl AsRef<Path>, options: NbtFileOptions) -> Self {
        Self {
            path: path.as_ref().to_path_buf(),
            options,
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn options(&self) -> &NbtFileOptions {
        &self.options
    }

    /// Whether anything exists at the path.
    pub fn exists(&self) -> bool {
        self.path.exists()
    }

    /// Remove the file. Removing a file that does not exist is an error.
    pub fn delete(&self) -> Result<()> {
        std::fs::remove_file(&self.path)
            .map_err(|e| NbtFileError::io(IoStep::Delete, &self.path, e))?;
        debug!(path = %self.path.display(), "blob deleted");
        Ok(())
    }

    /// Last modification time of the file.
    pub fn modified_time(&self) -> Result<Timestamp> {
        let modified = std::fs::metadata(&self.path)
            .and_then(|meta| meta.modified())
            .map_err(|e| NbtFileError::io(IoStep::ReadMetadata, &self.path, e))?;
        Ok(Timestamp::from_system_time(modified))
    }

    /// Open the blob for reading with the handle's default compression.
    pub fn data_input_stream(&self) -> Result<DataInputStream> {
        self.data_input_stream_with(self.options.compression)
    }

    /// Read the whole file into memory and return a decompressing reader over it.
    ///
    /// The file is closed before this returns.
    pub fn data_input_stream_with(&self, compression: CompressionType) -> Result<DataInputStream> {
        let mut file = File::open(&self.path)
            .map_err(|e| NbtFileError::io(IoStep::OpenForInput, &self.path, e))?;
        let mut data = Vec::new();
        file.read_to_end(&mut data)
            .map_err(|e| NbtFileError::io(IoStep::ReadInput, &self.path, e))?;
        drop(file);

        debug!(
            path = %self.path.display(),
            %compression,
            bytes = data.len(),
            "blob read"
        );
        Ok(DataInputStream::new(&self.path, data, compression))
    }

    /// Open the blob for writing with the handle's default compression.
    #[must_use = "call finish() to write the blob"]
    pub fn data_output_stream(&self) -> DataOutputStream {
        self.data_output_stream_with(self.options.compression)
    }

    /// Start a buffered write. The file is only written by
    /// [`DataOutputStream::finish`].
    #[must_use = "call finish() to write the blob"]
    pub fn data_output_stream_with(&self, compression: CompressionType) -> DataOutputStream {
        DataOutputStream::new(
            &self.path,
            compression,
            self.options.flate_level(),
            self.options.buffer_capacity,
        )
    }

    /// Read and decompress the whole blob.
    pub fn read_data(&self) -> Result<Vec<u8>> {
        self.read_data_with(self.options.compression)
    }

    pub fn read_data_with(&self, compression: CompressionType) -> Result<Vec<u8>> {
        self.data_input_stream_with(compression)?.read_to_vec()
    }

    /// Compress `data` and write it as the blob's new contents.
    pub fn write_data(&self, data: &[u8]) -> Result<u64> {
        self.write_data_with(self.options.compression, data)
    }

    pub fn write_data_with(&self, compression: CompressionType, data: &[u8]) -> Result<u64> {
        self.write_with(compression, |out| {
            out.write_all(data)
                .map_err(|e| NbtFileError::io(IoStep::EncodeOutput, &self.path, e))
        })
        .map(|(_, written)| written)
    }

    /// Run `write` against a fresh output stream and materialize the result.
    ///
    /// The file is written only if `write` returns `Ok`; on error the buffer
    /// is dropped and the destination is left as it was. Returns the
    /// closure's value and the number of bytes written to disk.
    pub fn write_with<T, E, F>(
        &self,
        compression: CompressionType,
        write: F,
    ) -> std::result::Result<(T, u64), E>
    where
        F: FnOnce(&mut DataOutputStream) -> std::result::Result<T, E>,
        E: From<NbtFileError>,
    {
        let mut out = self.data_output_stream_with(compression);
        let value = write(&mut out)?;
        let written = out.finish()?;
        Ok((value, written))
    }
}
