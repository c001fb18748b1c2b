//! Persistence format names and detection
//!
//! Format names are free-form strings resolved here. Detection goes by
//! file extension first, then by content signature (magic bytes, gzip
//! header, leading JSON brace) when the extension says nothing.

use super::{io_err, PersistenceError, PersistResult};
use flate2::read::GzDecoder;
use serde::{Deserialize, Serialize};
use std::fs::File;
use std::io::Read;
use std::path::Path;

/// Magic prefix of the chunked compact binary encoding
pub const MAGIC_MSGPACK: &[u8; 4] = b"TNTU";
/// Magic prefix of the native-object snapshot encoding
pub const MAGIC_BINCODE: &[u8; 4] = b"TNTB";
/// gzip signature
pub const MAGIC_GZIP: &[u8; 2] = &[0x1f, 0x8b];

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Format {
    /// Compact binary, written as framed chunks so large graphs stream
    /// with bounded memory. Compressed by default.
    MsgPack,
    /// Human-readable pretty JSON. Uncompressed by default so the file
    /// stays inspectable.
    Json,
    /// The whole snapshot object serialized in one buffer. Compressed by
    /// default.
    Bincode,
}

impl Format {
    pub fn from_name(name: &str) -> PersistResult<Format> {
        match name.to_ascii_lowercase().as_str() {
            "msgpack" | "mpk" | "messagepack" => Ok(Format::MsgPack),
            "json" => Ok(Format::Json),
            "bincode" | "bin" | "binary" | "native" => Ok(Format::Bincode),
            _ => Err(PersistenceError::UnsupportedFormat {
                name: name.to_string(),
            }),
        }
    }

    /// Recognize a format from a file extension, looking through a
    /// trailing `.gz`.
    pub fn from_extension(path: &Path) -> Option<Format> {
        let mut path = path.to_path_buf();
        if path.extension().map_or(false, |ext| ext.eq_ignore_ascii_case("gz")) {
            path.set_extension("");
        }
        match path.extension()?.to_str()?.to_ascii_lowercase().as_str() {
            "mpk" | "msgpack" => Some(Format::MsgPack),
            "json" => Some(Format::Json),
            "bin" | "bincode" => Some(Format::Bincode),
            _ => None,
        }
    }

    pub fn name(&self) -> &'static str {
        match self {
            Format::MsgPack => "msgpack",
            Format::Json => "json",
            Format::Bincode => "bincode",
        }
    }

    pub fn extension(&self) -> &'static str {
        match self {
            Format::MsgPack => "mpk",
            Format::Json => "json",
            Format::Bincode => "bin",
        }
    }

    /// Compact binary encodings compress by default; the readable one
    /// does not. Always overridable per call.
    pub fn default_compress(&self) -> bool {
        !matches!(self, Format::Json)
    }

    pub fn supported_names() -> &'static [&'static str] {
        &["msgpack", "json", "bincode"]
    }
}

/// Detect the format of an existing file: extension first, then content
/// signature (descending into gzip if needed).
pub fn detect(path: &Path) -> PersistResult<Format> {
    if let Some(format) = Format::from_extension(path) {
        return Ok(format);
    }
    sniff(path)
}

fn sniff(path: &Path) -> PersistResult<Format> {
    let mut file = File::open(path).map_err(|e| io_err(path, e))?;
    let mut head = [0u8; 4];
    let n = file.read(&mut head).map_err(|e| io_err(path, e))?;

    if n >= 2 && &head[..2] == MAGIC_GZIP {
        // Re-open and sniff inside the compressed stream.
        let file = File::open(path).map_err(|e| io_err(path, e))?;
        let mut decoder = GzDecoder::new(file);
        let mut inner = [0u8; 4];
        let n = decoder.read(&mut inner).map_err(|e| io_err(path, e))?;
        return classify(&inner[..n]).ok_or_else(|| PersistenceError::UnknownFormat {
            path: path.to_path_buf(),
        });
    }

    classify(&head[..n]).ok_or_else(|| PersistenceError::UnknownFormat {
        path: path.to_path_buf(),
    })
}

fn classify(head: &[u8]) -> Option<Format> {
    if head.len() >= 4 && head == MAGIC_MSGPACK.as_slice() {
        Some(Format::MsgPack)
    } else if head.len() >= 4 && head == MAGIC_BINCODE.as_slice() {
        Some(Format::Bincode)
    } else if head.first().map_or(false, |b| b.is_ascii_whitespace() || *b == b'{') {
        Some(Format::Json)
    } else {
        None
    }
}

/// Whether the file starts with the gzip signature.
pub fn is_gzipped(path: &Path) -> PersistResult<bool> {
    let mut file = File::open(path).map_err(|e| io_err(path, e))?;
    let mut head = [0u8; 2];
    let n = file.read(&mut head).map_err(|e| io_err(path, e))?;
    Ok(n == 2 && &head == MAGIC_GZIP)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_from_name_aliases() {
        assert_eq!(Format::from_name("MsgPack").unwrap(), Format::MsgPack);
        assert_eq!(Format::from_name("bin").unwrap(), Format::Bincode);
        assert_eq!(Format::from_name("native").unwrap(), Format::Bincode);
        assert_eq!(Format::from_name("json").unwrap(), Format::Json);
        assert!(matches!(
            Format::from_name("parquet"),
            Err(PersistenceError::UnsupportedFormat { .. })
        ));
    }

    #[test]
    fn test_from_extension() {
        assert_eq!(Format::from_extension(Path::new("g.mpk")), Some(Format::MsgPack));
        assert_eq!(Format::from_extension(Path::new("g.json")), Some(Format::Json));
        assert_eq!(Format::from_extension(Path::new("g.bin.gz")), Some(Format::Bincode));
        assert_eq!(Format::from_extension(Path::new("g.dat")), None);
        assert_eq!(Format::from_extension(Path::new("g")), None);
    }

    #[test]
    fn test_default_compression() {
        assert!(Format::MsgPack.default_compress());
        assert!(Format::Bincode.default_compress());
        assert!(!Format::Json.default_compress());
    }

    #[test]
    fn test_classify() {
        assert_eq!(classify(b"TNTU"), Some(Format::MsgPack));
        assert_eq!(classify(b"TNTB"), Some(Format::Bincode));
        assert_eq!(classify(b"{\"me"), Some(Format::Json));
        assert_eq!(classify(b"  {\""), Some(Format::Json));
        assert_eq!(classify(b"\x00\x01\x02\x03"), None);
        assert_eq!(classify(b""), None);
    }
}
