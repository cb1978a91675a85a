//! Compressed blob persistence for tagged-tree world files.
//!
//! An [`NbtFile`] names one file on disk whose contents are stored in one of
//! four encodings (see [`CompressionType`]). Callers read and write plaintext
//! streams; the encoding is applied transparently.
//!
//! # Invariants
//! - A handle holds no open file between calls.
//! - Reads load the whole file and close it before returning a stream.
//! - Writes are buffered in memory and reach disk only on
//!   [`DataOutputStream::finish`]; an unfinished stream never writes.
//! - Every I/O failure is reported as [`NbtFileError::Io`] with the failing step.

pub mod compression;
pub mod error;
pub mod file;
pub mod stream;

pub use compression::{CompressionType, DEFAULT_COMPRESSION, Decoder, Encoder};
pub use error::{IoStep, NbtFileError, Result};
pub use file::{DEFAULT_BUFFER_CAPACITY, DEFAULT_LEVEL, NbtFile, NbtFileOptions, Timestamp};
pub use stream::{DataInputStream, DataOutputStream};

pub fn crate_info() -> &'static str {
    "mcmt-persist v0.1.0"
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn crate_loads() {
        assert!(crate_info().contains("persist"));
    }

    #[test]
    fn handles_and_streams_are_send() {
        fn assert_send<T: Send>() {}
        assert_send::<NbtFile>();
        assert_send::<DataInputStream>();
        assert_send::<DataOutputStream>();
    }
}
