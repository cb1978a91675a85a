//! Compression codecs for blob files.
//!
//! The set of encodings is closed: every dispatch below is an exhaustive
//! `match` so a new variant cannot be added without handling it everywhere.

use std::fmt;
use std::io::{self, Read, Write};
use std::str::FromStr;

use flate2::Compression;
use flate2::read::{DeflateDecoder, GzDecoder, ZlibDecoder};
use flate2::write::{DeflateEncoder, GzEncoder, ZlibEncoder};
use serde::{Deserialize, Serialize};

use crate::error::NbtFileError;

/// Compression used when the caller does not select one.
pub const DEFAULT_COMPRESSION: CompressionType = CompressionType::Gzip;

/// On-disk encoding of a blob file.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CompressionType {
    /// Bytes are stored verbatim.
    None,
    /// gzip container (RFC 1952).
    Gzip,
    /// zlib container (RFC 1950): deflate body plus adler32 trailer.
    Zlib,
    /// Raw deflate body (RFC 1951) without framing or checksum.
    Deflate,
}

impl CompressionType {
    pub const ALL: [CompressionType; 4] = [
        CompressionType::None,
        CompressionType::Gzip,
        CompressionType::Zlib,
        CompressionType::Deflate,
    ];

    /// Canonical lowercase name, accepted back by [`FromStr`].
    pub fn name(self) -> &'static str {
        match self {
            CompressionType::None => "none",
            CompressionType::Gzip => "gzip",
            CompressionType::Zlib => "zlib",
            CompressionType::Deflate => "deflate",
        }
    }

    /// Compression id used in region file chunk headers.
    ///
    /// Raw deflate has no region id.
    pub fn region_id(self) -> Option<u8> {
        match self {
            CompressionType::Gzip => Some(1),
            CompressionType::Zlib => Some(2),
            CompressionType::None => Some(3),
            CompressionType::Deflate => None,
        }
    }

    /// Guess the encoding of `data` from its container header.
    ///
    /// Only gzip and zlib carry a recognisable header; raw deflate and
    /// uncompressed bytes both return `None`.
    pub fn detect(data: &[u8]) -> Option<CompressionType> {
        match data {
            [0x1f, 0x8b, ..] => Some(CompressionType::Gzip),
            [cmf, flg, ..]
                if *cmf & 0x0f == 8
                    && *cmf >> 4 <= 7
                    && (u16::from(*cmf) << 8 | u16::from(*flg)) % 31 == 0 =>
            {
                Some(CompressionType::Zlib)
            }
            _ => None,
        }
    }

    /// Wrap `inner` so that reads yield decompressed bytes.
    pub fn decoder<R: Read>(self, inner: R) -> Decoder<R> {
        match self {
            CompressionType::None => Decoder::None(inner),
            CompressionType::Gzip => Decoder::Gzip(GzDecoder::new(inner)),
            CompressionType::Zlib => Decoder::Zlib(ZlibDecoder::new(inner)),
            CompressionType::Deflate => Decoder::Deflate(DeflateDecoder::new(inner)),
        }
    }

    /// Wrap `inner` so that written bytes are compressed before they reach it.
    ///
    /// The container is only complete after [`Encoder::finish`].
    pub fn encoder<W: Write>(self, inner: W, level: Compression) -> Encoder<W> {
        match self {
            CompressionType::None => Encoder::None(inner),
            CompressionType::Gzip => Encoder::Gzip(GzEncoder::new(inner, level)),
            CompressionType::Zlib => Encoder::Zlib(ZlibEncoder::new(inner, level)),
            CompressionType::Deflate => Encoder::Deflate(DeflateEncoder::new(inner, level)),
        }
    }
}

impl Default for CompressionType {
    fn default() -> Self {
        DEFAULT_COMPRESSION
    }
}

impl fmt::Display for CompressionType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for CompressionType {
    type Err = NbtFileError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "none" => Ok(CompressionType::None),
            "gzip" | "gz" => Ok(CompressionType::Gzip),
            "zlib" => Ok(CompressionType::Zlib),
            "deflate" | "raw-deflate" => Ok(CompressionType::Deflate),
            _ => Err(NbtFileError::InvalidCompression(s.to_string())),
        }
    }
}

impl TryFrom<u8> for CompressionType {
    type Error = NbtFileError;

    /// Parse a region chunk header compression id.
    fn try_from(id: u8) -> Result<Self, Self::Error> {
        match id {
            1 => Ok(CompressionType::Gzip),
            2 => Ok(CompressionType::Zlib),
            3 => Ok(CompressionType::None),
            other => Err(NbtFileError::InvalidCompression(format!("region id {other}"))),
        }
    }
}

/// Decompressing reader produced by [`CompressionType::decoder`].
pub enum Decoder<R: Read> {
    None(R),
    Gzip(GzDecoder<R>),
    Zlib(ZlibDecoder<R>),
    Deflate(DeflateDecoder<R>),
}

impl<R: Read> Decoder<R> {
    pub fn compression(&self) -> CompressionType {
        match self {
            Decoder::None(_) => CompressionType::None,
            Decoder::Gzip(_) => CompressionType::Gzip,
            Decoder::Zlib(_) => CompressionType::Zlib,
            Decoder::Deflate(_) => CompressionType::Deflate,
        }
    }
}

impl<R: Read> Read for Decoder<R> {
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        match self {
            Decoder::None(r) => r.read(buf),
            Decoder::Gzip(r) => r.read(buf),
            Decoder::Zlib(r) => r.read(buf),
            Decoder::Deflate(r) => r.read(buf),
        }
    }
}

/// Compressing writer produced by [`CompressionType::encoder`].
pub enum Encoder<W: Write> {
    None(W),
    Gzip(GzEncoder<W>),
    Zlib(ZlibEncoder<W>),
    Deflate(DeflateEncoder<W>),
}

impl<W: Write> Encoder<W> {
    pub fn compression(&self) -> CompressionType {
        match self {
            Encoder::None(_) => CompressionType::None,
            Encoder::Gzip(_) => CompressionType::Gzip,
            Encoder::Zlib(_) => CompressionType::Zlib,
            Encoder::Deflate(_) => CompressionType::Deflate,
        }
    }

    /// Write the container trailer and return the inner writer.
    pub fn finish(self) -> io::Result<W> {
        match self {
            Encoder::None(w) => Ok(w),
            Encoder::Gzip(w) => w.finish(),
            Encoder::Zlib(w) => w.finish(),
            Encoder::Deflate(w) => w.finish(),
        }
    }
}

impl<W: Write> Write for Encoder<W> {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        match self {
            Encoder::None(w) => w.write(buf),
            Encoder::Gzip(w) => w.write(buf),
            Encoder::Zlib(w) => w.write(buf),
            Encoder::Deflate(w) => w.write(buf),
        }
    }

    fn flush(&mut self) -> io::Result<()> {
        match self {
            Encoder::None(w) => w.flush(),
            Encoder::Gzip(w) => w.flush(),
            Encoder::Zlib(w) => w.flush(),
            Encoder::Deflate(w) => w.flush(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Cursor;

    fn encode(compression: CompressionType, data: &[u8]) -> Vec<u8> {
        let mut enc = compression.encoder(Vec::new(), Compression::default());
        enc.write_all(data).unwrap();
        enc.finish().unwrap()
    }

    fn decode(compression: CompressionType, data: Vec<u8>) -> Vec<u8> {
        let mut out = Vec::new();
        compression
            .decoder(Cursor::new(data))
            .read_to_end(&mut out)
            .unwrap();
        out
    }

    #[test]
    fn default_is_gzip() {
        assert_eq!(CompressionType::default(), CompressionType::Gzip);
        assert_eq!(DEFAULT_COMPRESSION, CompressionType::Gzip);
    }

    #[test]
    fn every_type_roundtrips_in_memory() {
        let data = b"tagged tree payload".repeat(50);
        for compression in CompressionType::ALL {
            let encoded = encode(compression, &data);
            assert_eq!(decode(compression, encoded), data, "{compression}");
        }
    }

    #[test]
    fn none_is_identity() {
        assert_eq!(encode(CompressionType::None, b"abc"), b"abc");
    }

    #[test]
    fn container_headers_are_native() {
        let gz = encode(CompressionType::Gzip, b"abc");
        assert_eq!(&gz[..2], &[0x1f, 0x8b]);

        let zlib = encode(CompressionType::Zlib, b"abc");
        assert_eq!(zlib[0] & 0x0f, 8);
        assert_eq!((u16::from(zlib[0]) << 8 | u16::from(zlib[1])) % 31, 0);
    }

    #[test]
    fn detect_recognises_framed_containers() {
        let gz = encode(CompressionType::Gzip, b"abc");
        let zlib = encode(CompressionType::Zlib, b"abc");
        assert_eq!(CompressionType::detect(&gz), Some(CompressionType::Gzip));
        assert_eq!(CompressionType::detect(&zlib), Some(CompressionType::Zlib));
        assert_eq!(CompressionType::detect(b"abc"), None);
        assert_eq!(CompressionType::detect(&[]), None);
    }

    #[test]
    fn parse_names() {
        for compression in CompressionType::ALL {
            assert_eq!(compression.name().parse::<CompressionType>().unwrap(), compression);
        }
        assert_eq!("GZ".parse::<CompressionType>().unwrap(), CompressionType::Gzip);
        assert_eq!(
            "raw-deflate".parse::<CompressionType>().unwrap(),
            CompressionType::Deflate
        );
    }

    #[test]
    fn parse_rejects_unknown_name() {
        match "lz4".parse::<CompressionType>() {
            Err(NbtFileError::InvalidCompression(value)) => assert_eq!(value, "lz4"),
            other => panic!("expected InvalidCompression, got {other:?}"),
        }
    }

    #[test]
    fn region_ids() {
        for compression in CompressionType::ALL {
            if let Some(id) = compression.region_id() {
                assert_eq!(CompressionType::try_from(id).unwrap(), compression);
            }
        }
        assert_eq!(CompressionType::Deflate.region_id(), None);
        assert!(matches!(
            CompressionType::try_from(0),
            Err(NbtFileError::InvalidCompression(_))
        ));
        assert!(matches!(
            CompressionType::try_from(4),
            Err(NbtFileError::InvalidCompression(_))
        ));
    }

    #[test]
    fn wrappers_report_their_type() {
        for compression in CompressionType::ALL {
            assert_eq!(compression.decoder(Cursor::new(Vec::<u8>::new())).compression(), compression);
            assert_eq!(
                compression
                    .encoder(Vec::<u8>::new(), Compression::fast())
                    .compression(),
                compression
            );
        }
    }
}
