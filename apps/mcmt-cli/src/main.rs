use std::io::Write;
use std::path::{Path, PathBuf};

use anyhow::Context;
use clap::{Parser, Subcommand};
use mcmt_persist::{CompressionType, NbtFile, NbtFileOptions, Timestamp};
use serde::Serialize;
use sha2::{Digest, Sha256};
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "mcmt", about = "Inspect and rewrite compressed world blob files")]
struct Cli {
    /// Enable verbose logging
    #[arg(short, long)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Print tool version and crate info
    Info,
    /// Show existence, size, timestamp and detected encoding of a blob
    Stat {
        path: PathBuf,
        /// Print as JSON
        #[arg(long)]
        json: bool,
    },
    /// Decompress a blob to stdout
    Cat {
        path: PathBuf,
        /// none, gzip, zlib or deflate
        #[arg(short, long, default_value = "gzip")]
        compression: CompressionType,
    },
    /// Compress a plain file into a blob
    Pack {
        input: PathBuf,
        output: PathBuf,
        #[arg(short, long, default_value = "gzip")]
        compression: CompressionType,
        /// Deflate level 0-9
        #[arg(short, long, default_value = "6")]
        level: u32,
    },
    /// Re-encode a blob with a different compression
    Convert {
        path: PathBuf,
        #[arg(long)]
        from: CompressionType,
        #[arg(long)]
        to: CompressionType,
        /// Write here instead of replacing the input
        #[arg(short, long)]
        output: Option<PathBuf>,
    },
    /// Delete a blob
    Rm {
        path: PathBuf,
        /// Do not fail if the file is missing
        #[arg(short, long)]
        force: bool,
    },
}

/// Summary printed by `stat`.
#[derive(Debug, Serialize)]
struct BlobStat {
    path: PathBuf,
    exists: bool,
    size: Option<u64>,
    modified: Option<Timestamp>,
    detected: Option<CompressionType>,
    sha256: Option<String>,
}

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    let filter = if cli.verbose { "debug" } else { "info" };
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::new(filter))
        .with_writer(std::io::stderr)
        .init();

    match cli.command {
        Commands::Info => {
            println!("mcmt v{}", env!("CARGO_PKG_VERSION"));
            println!("persist: {}", mcmt_persist::crate_info());
            println!(
                "default options: {}",
                serde_json::to_string(&NbtFileOptions::default())?
            );
        }
        Commands::Stat { path, json } => {
            let stat = stat_blob(&path)?;
            if json {
                println!("{}", serde_json::to_string_pretty(&stat)?);
            } else {
                print_stat(&stat);
            }
        }
        Commands::Cat { path, compression } => {
            let data = NbtFile::new(&path)
                .read_data_with(compression)
                .with_context(|| format!("reading {} as {compression}", path.display()))?;
            let mut stdout = std::io::stdout().lock();
            stdout.write_all(&data)?;
            stdout.flush()?;
        }
        Commands::Pack {
            input,
            output,
            compression,
            level,
        } => {
            let written = pack(&input, &output, compression, level)?;
            println!(
                "packed {} -> {} ({compression}, {written} bytes)",
                input.display(),
                output.display()
            );
        }
        Commands::Convert {
            path,
            from,
            to,
            output,
        } => {
            let output = output.unwrap_or_else(|| path.clone());
            let written = convert(&path, &output, from, to)?;
            println!(
                "converted {} ({from}) -> {} ({to}, {written} bytes)",
                path.display(),
                output.display()
            );
        }
        Commands::Rm { path, force } => {
            if remove(&path, force)? {
                println!("removed {}", path.display());
            }
        }
    }

    Ok(())
}

fn stat_blob(path: &Path) -> anyhow::Result<BlobStat> {
    let file = NbtFile::new(path);
    if !file.exists() {
        return Ok(BlobStat {
            path: path.to_path_buf(),
            exists: false,
            size: None,
            modified: None,
            detected: None,
            sha256: None,
        });
    }

    let raw = file
        .read_data_with(CompressionType::None)
        .with_context(|| format!("reading {}", path.display()))?;
    let modified = file
        .modified_time()
        .with_context(|| format!("reading {}", path.display()))?;

    Ok(BlobStat {
        path: path.to_path_buf(),
        exists: true,
        size: Some(raw.len() as u64),
        modified: Some(modified),
        detected: CompressionType::detect(&raw),
        sha256: Some(sha256_hex(&raw)),
    })
}

fn print_stat(stat: &BlobStat) {
    println!("path:     {}", stat.path.display());
    println!("exists:   {}", stat.exists);
    if let Some(size) = stat.size {
        println!("size:     {size}");
    }
    if let Some(modified) = stat.modified {
        println!("modified: {modified}");
    }
    if stat.exists {
        match stat.detected {
            Some(compression) => println!("encoding: {compression}"),
            None => println!("encoding: none or deflate"),
        }
    }
    if let Some(hash) = &stat.sha256 {
        println!("sha256:   {hash}");
    }
}

fn pack(
    input: &Path,
    output: &Path,
    compression: CompressionType,
    level: u32,
) -> anyhow::Result<u64> {
    let data = std::fs::read(input).with_context(|| format!("reading {}", input.display()))?;
    let options = NbtFileOptions {
        compression,
        level,
        ..NbtFileOptions::default()
    };
    let written = NbtFile::with_options(output, options)
        .write_data(&data)
        .with_context(|| format!("writing {}", output.display()))?;
    Ok(written)
}

/// Decode with `from` and re-encode with `to`. `input` and `output` may be the same path.
fn convert(
    input: &Path,
    output: &Path,
    from: CompressionType,
    to: CompressionType,
) -> anyhow::Result<u64> {
    let data = NbtFile::new(input)
        .read_data_with(from)
        .with_context(|| format!("reading {} as {from}", input.display()))?;
    let written = NbtFile::new(output)
        .write_data_with(to, &data)
        .with_context(|| format!("writing {} as {to}", output.display()))?;
    tracing::debug!(plain = data.len(), written, "converted blob");
    Ok(written)
}

/// Returns whether a file was removed.
fn remove(path: &Path, force: bool) -> anyhow::Result<bool> {
    let file = NbtFile::new(path);
    if force && !file.exists() {
        return Ok(false);
    }
    file.delete()
        .with_context(|| format!("removing {}", path.display()))?;
    Ok(true)
}

fn sha256_hex(data: &[u8]) -> String {
    let mut hasher = Sha256::new();
    hasher.update(data);
    format!("{:x}", hasher.finalize())
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn cli_definition_is_valid() {
        Cli::command().debug_assert();
    }

    #[test]
    fn unknown_compression_is_rejected_by_parser() {
        let parsed = Cli::try_parse_from(["mcmt", "cat", "level.dat", "-c", "lz4"]);
        assert!(parsed.is_err());
    }

    #[test]
    fn pack_then_stat() {
        let tmp = tempfile::tempdir().unwrap();
        let input = tmp.path().join("plain.bin");
        let output = tmp.path().join("level.dat");
        std::fs::write(&input, b"tagged tree bytes").unwrap();

        pack(&input, &output, CompressionType::Gzip, 9).unwrap();

        let stat = stat_blob(&output).unwrap();
        assert!(stat.exists);
        assert_eq!(stat.detected, Some(CompressionType::Gzip));
        assert_eq!(stat.size, Some(std::fs::metadata(&output).unwrap().len()));
        assert_eq!(stat.sha256.unwrap().len(), 64);
        assert_eq!(
            NbtFile::new(&output).read_data().unwrap(),
            b"tagged tree bytes"
        );
    }

    #[test]
    fn stat_missing_file() {
        let tmp = tempfile::tempdir().unwrap();
        let stat = stat_blob(&tmp.path().join("missing.dat")).unwrap();
        assert!(!stat.exists);
        assert!(stat.size.is_none());
        let json = serde_json::to_value(&stat).unwrap();
        assert_eq!(json["exists"], false);
    }

    #[test]
    fn convert_in_place() {
        let tmp = tempfile::tempdir().unwrap();
        let path = tmp.path().join("chunk.dat");
        NbtFile::new(&path)
            .write_data_with(CompressionType::Gzip, b"chunk payload")
            .unwrap();

        convert(&path, &path, CompressionType::Gzip, CompressionType::Zlib).unwrap();

        let raw = std::fs::read(&path).unwrap();
        assert_eq!(CompressionType::detect(&raw), Some(CompressionType::Zlib));
        assert_eq!(
            NbtFile::new(&path)
                .read_data_with(CompressionType::Zlib)
                .unwrap(),
            b"chunk payload"
        );
    }

    #[test]
    fn convert_with_wrong_source_codec_leaves_file() {
        let tmp = tempfile::tempdir().unwrap();
        let path = tmp.path().join("chunk.dat");
        NbtFile::new(&path)
            .write_data_with(CompressionType::Zlib, b"chunk payload")
            .unwrap();
        let before = std::fs::read(&path).unwrap();

        assert!(convert(&path, &path, CompressionType::Gzip, CompressionType::None).is_err());
        assert_eq!(std::fs::read(&path).unwrap(), before);
    }

    #[test]
    fn remove_respects_force() {
        let tmp = tempfile::tempdir().unwrap();
        let path = tmp.path().join("gone.dat");

        assert!(remove(&path, false).is_err());
        assert!(!remove(&path, true).unwrap());

        std::fs::write(&path, b"x").unwrap();
        assert!(remove(&path, false).unwrap());
        assert!(!path.exists());
    }
}
