//! Read and write streams handed out by [`NbtFile`](crate::NbtFile).

use std::fs::File;
use std::io::{self, Cursor, Read, Write};
use std::path::{Path, PathBuf};

use flate2::Compression;
use tracing::{debug, warn};

use crate::compression::{CompressionType, Decoder, Encoder};
use crate::error::{IoStep, NbtFileError, Result};

/// Decompressing reader over a fully buffered blob.
///
/// The file has already been read and closed when this is constructed;
/// decompression happens lazily as the caller reads.
pub struct DataInputStream {
    path: PathBuf,
    inner: Decoder<Cursor<Vec<u8>>>,
}

impl DataInputStream {
    pub(crate) fn new(path: &Path, data: Vec<u8>, compression: CompressionType) -> Self {
        Self {
            path: path.to_path_buf(),
            inner: compression.decoder(Cursor::new(data)),
        }
    }

    pub fn compression(&self) -> CompressionType {
        self.inner.compression()
    }

    /// Path the data was read from.
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Decompress everything that remains.
    pub fn read_to_vec(mut self) -> Result<Vec<u8>> {
        let mut out = Vec::new();
        self.inner
            .read_to_end(&mut out)
            .map_err(|e| NbtFileError::io(IoStep::DecodeInput, &self.path, e))?;
        Ok(out)
    }
}

impl Read for DataInputStream {
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        self.inner.read(buf)
    }
}

/// Compressing writer that buffers in memory and writes the file on [`finish`].
///
/// Nothing reaches the destination until [`finish`] is called. Dropping the
/// stream without finishing discards the buffer and leaves any existing file
/// untouched.
///
/// [`finish`]: DataOutputStream::finish
#[must_use = "call finish() to write the blob"]
pub struct DataOutputStream {
    path: PathBuf,
    compression: CompressionType,
    encoder: Encoder<Vec<u8>>,
    finished: bool,
}

impl DataOutputStream {
    pub(crate) fn new(
        path: &Path,
        compression: CompressionType,
        level: Compression,
        capacity: usize,
    ) -> Self {
        Self {
            path: path.to_path_buf(),
            compression,
            encoder: compression.encoder(Vec::with_capacity(capacity), level),
            finished: false,
        }
    }

    /// Path the data will be written to.
    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn compression(&self) -> CompressionType {
        self.compression
    }

    /// Finalize the codec and write the buffered bytes to the destination.
    ///
    /// The destination is created or truncated and written in a single pass.
    /// Returns the number of bytes written to disk.
    pub fn finish(mut self) -> Result<u64> {
        // `Drop` forbids moving the encoder out, so swap in an empty one.
        let encoder = std::mem::replace(&mut self.encoder, Encoder::None(Vec::new()));
        self.finished = true;
        let _span = tracing::debug_span!(
            "materialize",
            path = %self.path.display(),
            compression = %self.compression
        )
        .entered();

        let buffer = encoder
            .finish()
            .map_err(|e| NbtFileError::io(IoStep::FinalizeCodec, &self.path, e))?;

        let mut file = File::create(&self.path)
            .map_err(|e| NbtFileError::io(IoStep::OpenForOutput, &self.path, e))?;
        file.write_all(&buffer)
            .and_then(|()| file.flush())
            .map_err(|e| NbtFileError::io(IoStep::WriteOutput, &self.path, e))?;
        drop(file);

        debug!(bytes = buffer.len(), "blob written");
        Ok(buffer.len() as u64)
    }
}

impl Write for DataOutputStream {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        self.encoder.write(buf)
    }

    fn flush(&mut self) -> io::Result<()> {
        self.encoder.flush()
    }
}

impl Drop for DataOutputStream {
    fn drop(&mut self) {
        if !self.finished {
            warn!(path = %self.path.display(), "discarding unfinished blob write");
        }
    }
}
