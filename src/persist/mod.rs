//! Persistence manager: multi-format, streaming, atomic save/load
//!
//! Saves write to a temporary file in the destination directory and
//! rename into place only after the full write (and optional gzip)
//! succeeds, so a crash mid-write never clobbers the previous valid file.
//! Loads materialize a complete snapshot before any engine state changes.

pub mod format;
pub mod snapshot;

pub use format::Format;
pub use snapshot::{Snapshot, SnapshotMeta, SNAPSHOT_VERSION};

use crate::config::PersistenceConfig;
use crate::graph::GraphCore;
use flate2::read::GzDecoder;
use flate2::write::GzEncoder;
use flate2::Compression;
use std::fs::File;
use std::io::{self, BufReader, BufWriter, Read, Write};
use std::path::{Path, PathBuf};
use std::time::Instant;
use tempfile::NamedTempFile;
use thiserror::Error;
use tracing::info;

/// Failures while saving, loading, or translating snapshots
#[derive(Error, Debug)]
pub enum PersistenceError {
    #[error("i/o failure on '{path}': {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("unsupported format '{name}' (supported: msgpack, json, bincode)")]
    UnsupportedFormat { name: String },

    #[error("cannot detect format of '{path}'")]
    UnknownFormat { path: PathBuf },

    #[error("malformed snapshot in '{path}': {detail}")]
    Malformed { path: PathBuf, detail: String },

    #[error("truncated snapshot in '{path}': {detail}")]
    Truncated { path: PathBuf, detail: String },

    #[error("cannot encode snapshot for '{path}': {detail}")]
    Encode { path: PathBuf, detail: String },
}

pub type PersistResult<T> = Result<T, PersistenceError>;

pub(crate) fn io_err(path: &Path, source: io::Error) -> PersistenceError {
    PersistenceError::Io {
        path: path.to_path_buf(),
        source,
    }
}

/// Resolves format names, applies compression defaults, and performs the
/// actual file work.
#[derive(Debug, Clone)]
pub struct PersistenceManager {
    default_format: Format,
    compress_override: Option<bool>,
    chunk_size: usize,
}

impl PersistenceManager {
    pub fn new(default_format: Format, compress_override: Option<bool>, chunk_size: usize) -> Self {
        Self {
            default_format,
            compress_override,
            chunk_size: chunk_size.max(1),
        }
    }

    pub fn from_config(config: &PersistenceConfig) -> PersistResult<Self> {
        Ok(Self::new(
            Format::from_name(&config.default_format)?,
            config.compress,
            config.chunk_size,
        ))
    }

    pub fn default_format(&self) -> Format {
        self.default_format
    }

    /// Pick the format for a save: explicit name, then target extension,
    /// then the configured default.
    fn resolve_save_format(&self, path: &Path, name: Option<&str>) -> PersistResult<Format> {
        match name {
            Some(name) => Format::from_name(name),
            None => Ok(Format::from_extension(path).unwrap_or(self.default_format)),
        }
    }

    fn resolve_compress(&self, format: Format, compress: Option<bool>) -> bool {
        compress
            .or(self.compress_override)
            .unwrap_or_else(|| format.default_compress())
    }

    /// Serialize the full graph state to `path`. Returns the location
    /// actually written.
    pub fn save(
        &self,
        core: &GraphCore,
        path: &Path,
        format: Option<&str>,
        compress: Option<bool>,
    ) -> PersistResult<PathBuf> {
        let format = self.resolve_save_format(path, format)?;
        let compress = self.resolve_compress(format, compress);
        let meta = SnapshotMeta {
            format_version: SNAPSHOT_VERSION,
            name: core.name().to_string(),
            node_count: core.node_count() as u64,
            edge_count: core.edge_count() as u64,
            created_at_ms: chrono::Utc::now().timestamp_millis(),
        };

        let start = Instant::now();
        self.write_atomic(path, format, compress, &meta, core)?;
        info!(
            path = %path.display(),
            format = format.name(),
            compress,
            nodes = meta.node_count,
            edges = meta.edge_count,
            elapsed_ms = start.elapsed().as_millis() as u64,
            "saved graph"
        );
        Ok(path.to_path_buf())
    }

    fn write_atomic(
        &self,
        path: &Path,
        format: Format,
        compress: bool,
        meta: &SnapshotMeta,
        core: &GraphCore,
    ) -> PersistResult<()> {
        let dir = match path.parent() {
            Some(parent) if !parent.as_os_str().is_empty() => parent.to_path_buf(),
            _ => PathBuf::from("."),
        };
        let mut tmp = NamedTempFile::new_in(&dir).map_err(|e| io_err(path, e))?;

        {
            let file = tmp.as_file_mut();
            if compress {
                let mut writer =
                    GzEncoder::new(BufWriter::new(file), Compression::default());
                self.write_payload(path, &mut writer, format, meta, core)?;
                writer
                    .finish()
                    .and_then(|mut inner| inner.flush())
                    .map_err(|e| io_err(path, e))?;
            } else {
                let mut writer = BufWriter::new(file);
                self.write_payload(path, &mut writer, format, meta, core)?;
                writer.flush().map_err(|e| io_err(path, e))?;
            }
        }

        // Rename only after a fully successful write.
        tmp.persist(path).map_err(|e| io_err(path, e.error))?;
        Ok(())
    }

    fn write_payload<W: Write>(
        &self,
        path: &Path,
        writer: &mut W,
        format: Format,
        meta: &SnapshotMeta,
        core: &GraphCore,
    ) -> PersistResult<()> {
        match format {
            Format::MsgPack => snapshot::write_msgpack(
                path,
                writer,
                meta,
                core.nodes().map(|(id, attrs)| (id.clone(), attrs.clone())),
                core.edges()
                    .map(|(key, attrs)| crate::graph::Edge::from_key(key.clone(), attrs.clone())),
                self.chunk_size,
            ),
            Format::Json | Format::Bincode => {
                let snapshot = Snapshot {
                    meta: meta.clone(),
                    nodes: core
                        .nodes()
                        .map(|(id, attrs)| (id.clone(), attrs.clone()))
                        .collect(),
                    edges: core
                        .edges()
                        .map(|(key, attrs)| {
                            crate::graph::Edge::from_key(key.clone(), attrs.clone())
                        })
                        .collect(),
                };
                match format {
                    Format::Json => snapshot::write_json(path, writer, &snapshot),
                    _ => snapshot::write_bincode(path, writer, &snapshot),
                }
            }
        }
    }

    /// Read a full snapshot from `path`. Format comes from the explicit
    /// name when given, otherwise from extension/signature detection;
    /// gzip is recognized transparently either way.
    pub fn load(&self, path: &Path, format: Option<&str>) -> PersistResult<Snapshot> {
        let format = match format {
            Some(name) => Format::from_name(name)?,
            None => format::detect(path)?,
        };

        let start = Instant::now();
        let file = File::open(path).map_err(|e| io_err(path, e))?;
        let reader = BufReader::new(file);
        let snapshot = if format::is_gzipped(path)? {
            self.read_payload(path, GzDecoder::new(reader), format)?
        } else {
            self.read_payload(path, reader, format)?
        };

        info!(
            path = %path.display(),
            format = format.name(),
            nodes = snapshot.meta.node_count,
            edges = snapshot.meta.edge_count,
            elapsed_ms = start.elapsed().as_millis() as u64,
            "loaded graph"
        );
        Ok(snapshot)
    }

    fn read_payload<R: Read>(&self, path: &Path, reader: R, format: Format) -> PersistResult<Snapshot> {
        match format {
            Format::MsgPack => snapshot::read_msgpack(path, reader),
            Format::Json => snapshot::read_json(path, reader),
            Format::Bincode => snapshot::read_bincode(path, reader),
        }
    }

    /// Re-encode a snapshot file into another format/location without
    /// touching any live graph.
    pub fn translate(
        &self,
        source: &Path,
        target: &Path,
        source_format: Option<&str>,
        target_format: Option<&str>,
    ) -> PersistResult<PathBuf> {
        let snapshot = self.load(source, source_format)?;
        let format = self.resolve_save_format(target, target_format)?;
        let compress = self.resolve_compress(format, None);

        let dir = match target.parent() {
            Some(parent) if !parent.as_os_str().is_empty() => parent.to_path_buf(),
            _ => PathBuf::from("."),
        };
        let mut tmp = NamedTempFile::new_in(&dir).map_err(|e| io_err(target, e))?;
        {
            let file = tmp.as_file_mut();
            if compress {
                let mut writer = GzEncoder::new(BufWriter::new(file), Compression::default());
                self.write_snapshot_payload(target, &mut writer, format, &snapshot)?;
                writer
                    .finish()
                    .and_then(|mut inner| inner.flush())
                    .map_err(|e| io_err(target, e))?;
            } else {
                let mut writer = BufWriter::new(file);
                self.write_snapshot_payload(target, &mut writer, format, &snapshot)?;
                writer.flush().map_err(|e| io_err(target, e))?;
            }
        }
        tmp.persist(target).map_err(|e| io_err(target, e.error))?;

        info!(
            source = %source.display(),
            target = %target.display(),
            format = format.name(),
            "translated snapshot"
        );
        Ok(target.to_path_buf())
    }

    fn write_snapshot_payload<W: Write>(
        &self,
        path: &Path,
        writer: &mut W,
        format: Format,
        snapshot: &Snapshot,
    ) -> PersistResult<()> {
        match format {
            Format::MsgPack => snapshot::write_msgpack(
                path,
                writer,
                &snapshot.meta,
                snapshot.nodes.iter().cloned(),
                snapshot.edges.iter().cloned(),
                self.chunk_size,
            ),
            Format::Json => snapshot::write_json(path, writer, snapshot),
            Format::Bincode => snapshot::write_bincode(path, writer, snapshot),
        }
    }
}
