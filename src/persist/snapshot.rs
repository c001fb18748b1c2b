//! Logical snapshot model and the concrete encoders/decoders
//!
//! Every format carries the same logical payload: metadata (counts and
//! format version), the node list, and the edge list. The chunked
//! msgpack encoding streams fixed-size frames so peak memory during save
//! and load is bounded by the chunk size, not the graph size.

use super::format::{MAGIC_BINCODE, MAGIC_MSGPACK};
use super::{PersistenceError, PersistResult};
use crate::graph::{AttrMap, AttrValue, Edge, NodeId};
use serde::{Deserialize, Serialize};
use serde_json::{json, Map as JsonMap, Value};
use std::io::{Read, Write};
use std::path::Path;

/// Bumped when the logical payload layout changes
pub const SNAPSHOT_VERSION: u32 = 1;

const HEADER_VERSION: u16 = 1;

/// Snapshot header: counts let a loader cross-check for truncation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SnapshotMeta {
    pub format_version: u32,
    pub name: String,
    pub node_count: u64,
    pub edge_count: u64,
    pub created_at_ms: i64,
}

/// Fully materialized graph state as read from disk
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Snapshot {
    pub meta: SnapshotMeta,
    pub nodes: Vec<(NodeId, AttrMap)>,
    pub edges: Vec<Edge>,
}

impl Snapshot {
    fn check_counts(self, path: &Path) -> PersistResult<Self> {
        if self.meta.node_count != self.nodes.len() as u64
            || self.meta.edge_count != self.edges.len() as u64
        {
            return Err(PersistenceError::Truncated {
                path: path.to_path_buf(),
                detail: format!(
                    "header claims {} nodes / {} edges, payload has {} / {}",
                    self.meta.node_count,
                    self.meta.edge_count,
                    self.nodes.len(),
                    self.edges.len()
                ),
            });
        }
        Ok(self)
    }
}

// ============================================================
// Chunked msgpack
// ============================================================

#[derive(Debug, Serialize, Deserialize)]
enum Frame {
    Meta(SnapshotMeta),
    Nodes(Vec<(NodeId, AttrMap)>),
    Edges(Vec<Edge>),
    End,
}

pub(crate) fn write_msgpack<W: Write>(
    path: &Path,
    writer: &mut W,
    meta: &SnapshotMeta,
    nodes: impl Iterator<Item = (NodeId, AttrMap)>,
    edges: impl Iterator<Item = Edge>,
    chunk_size: usize,
) -> PersistResult<()> {
    let chunk_size = chunk_size.max(1);
    writer
        .write_all(MAGIC_MSGPACK)
        .and_then(|_| writer.write_all(&HEADER_VERSION.to_be_bytes()))
        .map_err(|e| super::io_err(path, e))?;

    write_frame(path, writer, &Frame::Meta(meta.clone()))?;

    let mut chunk = Vec::with_capacity(chunk_size);
    for node in nodes {
        chunk.push(node);
        if chunk.len() == chunk_size {
            write_frame(path, writer, &Frame::Nodes(std::mem::take(&mut chunk)))?;
        }
    }
    if !chunk.is_empty() {
        write_frame(path, writer, &Frame::Nodes(chunk))?;
    }

    let mut chunk = Vec::with_capacity(chunk_size);
    for edge in edges {
        chunk.push(edge);
        if chunk.len() == chunk_size {
            write_frame(path, writer, &Frame::Edges(std::mem::take(&mut chunk)))?;
        }
    }
    if !chunk.is_empty() {
        write_frame(path, writer, &Frame::Edges(chunk))?;
    }

    write_frame(path, writer, &Frame::End)
}

fn write_frame<W: Write>(path: &Path, writer: &mut W, frame: &Frame) -> PersistResult<()> {
    rmp_serde::encode::write(writer, frame).map_err(|e| PersistenceError::Encode {
        path: path.to_path_buf(),
        detail: e.to_string(),
    })
}

pub(crate) fn read_msgpack<R: Read>(path: &Path, mut reader: R) -> PersistResult<Snapshot> {
    check_header(path, &mut reader, MAGIC_MSGPACK)?;

    let malformed = |detail: String| PersistenceError::Malformed {
        path: path.to_path_buf(),
        detail,
    };

    let mut de = rmp_serde::Deserializer::new(reader);
    let mut meta: Option<SnapshotMeta> = None;
    let mut nodes = Vec::new();
    let mut edges = Vec::new();

    loop {
        let frame = Frame::deserialize(&mut de).map_err(|e| malformed(e.to_string()))?;
        match frame {
            Frame::Meta(m) => meta = Some(m),
            Frame::Nodes(chunk) => nodes.extend(chunk),
            Frame::Edges(chunk) => edges.extend(chunk),
            Frame::End => break,
        }
    }

    let meta = meta.ok_or_else(|| malformed("missing metadata frame".to_string()))?;
    Snapshot { meta, nodes, edges }.check_counts(path)
}

// ============================================================
// Native-object bincode
// ============================================================

pub(crate) fn write_bincode<W: Write>(
    path: &Path,
    writer: &mut W,
    snapshot: &Snapshot,
) -> PersistResult<()> {
    writer
        .write_all(MAGIC_BINCODE)
        .and_then(|_| writer.write_all(&HEADER_VERSION.to_be_bytes()))
        .map_err(|e| super::io_err(path, e))?;
    bincode::serialize_into(writer, snapshot).map_err(|e| PersistenceError::Encode {
        path: path.to_path_buf(),
        detail: e.to_string(),
    })
}

pub(crate) fn read_bincode<R: Read>(path: &Path, mut reader: R) -> PersistResult<Snapshot> {
    check_header(path, &mut reader, MAGIC_BINCODE)?;
    let snapshot: Snapshot =
        bincode::deserialize_from(reader).map_err(|e| PersistenceError::Malformed {
            path: path.to_path_buf(),
            detail: e.to_string(),
        })?;
    snapshot.check_counts(path)
}

fn check_header<R: Read>(path: &Path, reader: &mut R, magic: &[u8; 4]) -> PersistResult<()> {
    let mut header = [0u8; 6];
    reader
        .read_exact(&mut header)
        .map_err(|e| super::io_err(path, e))?;
    if &header[..4] != magic {
        return Err(PersistenceError::Malformed {
            path: path.to_path_buf(),
            detail: "bad magic bytes".to_string(),
        });
    }
    let version = u16::from_be_bytes([header[4], header[5]]);
    if version > HEADER_VERSION {
        return Err(PersistenceError::Malformed {
            path: path.to_path_buf(),
            detail: format!("unsupported header version {}", version),
        });
    }
    Ok(())
}

// ============================================================
// Human-readable JSON
// ============================================================

pub(crate) fn write_json<W: Write>(
    path: &Path,
    writer: &mut W,
    snapshot: &Snapshot,
) -> PersistResult<()> {
    let encode_err = |detail: String| PersistenceError::Encode {
        path: path.to_path_buf(),
        detail,
    };

    let mut nodes = JsonMap::new();
    for (id, attrs) in &snapshot.nodes {
        nodes.insert(id.as_str().to_string(), attrs_to_json(attrs).map_err(&encode_err)?);
    }

    let mut edges = Vec::with_capacity(snapshot.edges.len());
    for edge in &snapshot.edges {
        edges.push(json!({
            "src": edge.src.as_str(),
            "dst": edge.dst.as_str(),
            "rel": edge.rel.as_str(),
            "attrs": attrs_to_json(&edge.attrs).map_err(&encode_err)?,
        }));
    }

    let doc = json!({
        "metadata": {
            "format_version": snapshot.meta.format_version,
            "name": snapshot.meta.name,
            "node_count": snapshot.meta.node_count,
            "edge_count": snapshot.meta.edge_count,
            "created_at_ms": snapshot.meta.created_at_ms,
        },
        "nodes": Value::Object(nodes),
        "edges": edges,
    });

    serde_json::to_writer_pretty(writer, &doc).map_err(|e| encode_err(e.to_string()))
}

pub(crate) fn read_json<R: Read>(path: &Path, reader: R) -> PersistResult<Snapshot> {
    let malformed = |detail: String| PersistenceError::Malformed {
        path: path.to_path_buf(),
        detail,
    };

    let doc: Value = serde_json::from_reader(reader).map_err(|e| malformed(e.to_string()))?;
    let meta_value = doc
        .get("metadata")
        .cloned()
        .ok_or_else(|| malformed("missing 'metadata' object".to_string()))?;
    let meta: SnapshotMeta =
        serde_json::from_value(meta_value).map_err(|e| malformed(e.to_string()))?;

    let node_obj = doc
        .get("nodes")
        .and_then(Value::as_object)
        .ok_or_else(|| malformed("missing 'nodes' object".to_string()))?;
    let mut nodes = Vec::with_capacity(node_obj.len());
    for (id, attrs) in node_obj {
        nodes.push((NodeId::new(id.clone()), json_to_attrs(attrs).map_err(&malformed)?));
    }

    let edge_arr = doc
        .get("edges")
        .and_then(Value::as_array)
        .ok_or_else(|| malformed("missing 'edges' array".to_string()))?;
    let mut edges = Vec::with_capacity(edge_arr.len());
    for entry in edge_arr {
        let field = |key: &str| {
            entry
                .get(key)
                .and_then(Value::as_str)
                .ok_or_else(|| malformed(format!("edge entry missing '{}'", key)))
        };
        let src = field("src")?;
        let dst = field("dst")?;
        let rel = field("rel")?;
        let attrs = match entry.get("attrs") {
            Some(value) => json_to_attrs(value).map_err(&malformed)?,
            None => AttrMap::new(),
        };
        edges.push(Edge::new(src, dst, rel, attrs));
    }

    Snapshot { meta, nodes, edges }.check_counts(path)
}

fn attrs_to_json(attrs: &AttrMap) -> Result<Value, String> {
    let mut out = JsonMap::new();
    for (key, value) in attrs {
        out.insert(key.clone(), value_to_json(value)?);
    }
    Ok(Value::Object(out))
}

fn value_to_json(value: &AttrValue) -> Result<Value, String> {
    Ok(match value {
        AttrValue::Null => Value::Null,
        AttrValue::Bool(b) => Value::Bool(*b),
        AttrValue::Int(i) => Value::from(*i),
        AttrValue::Float(f) => serde_json::Number::from_f64(*f)
            .map(Value::Number)
            .ok_or_else(|| format!("non-finite float {} has no JSON form", f))?,
        AttrValue::Str(s) => Value::String(s.clone()),
        AttrValue::List(list) => Value::Array(
            list.iter()
                .map(value_to_json)
                .collect::<Result<Vec<_>, _>>()?,
        ),
        AttrValue::Map(map) => {
            let mut out = JsonMap::new();
            for (key, item) in map {
                out.insert(key.clone(), value_to_json(item)?);
            }
            Value::Object(out)
        }
    })
}

fn json_to_attrs(value: &Value) -> Result<AttrMap, String> {
    let obj = value
        .as_object()
        .ok_or_else(|| "attribute set is not a JSON object".to_string())?;
    obj.iter()
        .map(|(key, item)| Ok((key.clone(), json_to_value(item)?)))
        .collect()
}

fn json_to_value(value: &Value) -> Result<AttrValue, String> {
    Ok(match value {
        Value::Null => AttrValue::Null,
        Value::Bool(b) => AttrValue::Bool(*b),
        Value::Number(n) => {
            if let Some(i) = n.as_i64() {
                AttrValue::Int(i)
            } else if let Some(f) = n.as_f64() {
                AttrValue::Float(f)
            } else {
                return Err(format!("number {} fits neither i64 nor f64", n));
            }
        }
        Value::String(s) => AttrValue::Str(s.clone()),
        Value::Array(items) => AttrValue::List(
            items
                .iter()
                .map(json_to_value)
                .collect::<Result<Vec<_>, _>>()?,
        ),
        Value::Object(obj) => AttrValue::Map(
            obj.iter()
                .map(|(key, item)| Ok((key.clone(), json_to_value(item)?)))
                .collect::<Result<_, String>>()?,
        ),
    })
}
