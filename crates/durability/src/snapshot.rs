//! Snapshot writer/reader.
//!
//! File layout:
//!
//! ```text
//! magic "GRVS" | version u32 LE | body crc32 u32 LE | gzip(body)
//! ```
//!
//! The body is a length-prefixed, type-tagged encoding of the whole
//! `{global name → TreeNode}` map:
//!
//! ```text
//! body    := u32 global_count, global*
//! global  := u32 name_len, name bytes, node
//! node    := value, u32 child_count, child*
//! child   := subscript, node
//! value   := 0x00 | 0x01 i64 | 0x02 f64 | 0x03 u32 len bytes
//! subscript := 0x01 i64 | 0x03 u32 len bytes
//! ```
//!
//! Writes go to a temp file in the target directory and are renamed
//! into place, so a failed write leaves the previous snapshot intact.

use flate2::read::GzDecoder;
use flate2::write::GzEncoder;
use flate2::Compression;
use grove_core::{Error, Result, Subscript, Value};
use grove_engine::TreeNode;
use std::collections::HashMap;
use std::fs::File;
use std::io::{Read, Write};
use std::path::Path as FsPath;
use tracing::{info, warn};

const MAGIC: &[u8; 4] = b"GRVS";
const FORMAT_VERSION: u32 = 1;

const VALUE_NULL: u8 = 0x00;
const TAG_INT: u8 = 0x01;
const TAG_FLOAT: u8 = 0x02;
const TAG_STR: u8 = 0x03;

/// Serialize the store image and atomically replace the snapshot file.
/// Returns the number of globals written.
pub fn write_snapshot(path: impl AsRef<FsPath>, image: &HashMap<String, TreeNode>) -> Result<usize> {
    let path = path.as_ref();
    let body = encode_body(image);
    let crc = crc32fast::hash(&body);

    let tmp_path = path.with_extension("snapshot.tmp");
    {
        let mut file = File::create(&tmp_path)?;
        file.write_all(MAGIC)?;
        file.write_all(&FORMAT_VERSION.to_le_bytes())?;
        file.write_all(&crc.to_le_bytes())?;
        let mut encoder = GzEncoder::new(&mut file, Compression::default());
        encoder.write_all(&body)?;
        encoder.finish()?;
        file.sync_all()?;
    }
    if let Err(e) = std::fs::rename(&tmp_path, path) {
        // the half-written temp file must not linger
        let _ = std::fs::remove_file(&tmp_path);
        return Err(e.into());
    }

    info!(
        target: "grove::snapshot",
        file = %path.display(),
        globals = image.len(),
        bytes = body.len(),
        "snapshot written"
    );
    Ok(image.len())
}

/// Load a snapshot. `Ok(None)` when the file does not exist; corrupt
/// magic, version, CRC or truncated bodies are [`Error::SnapshotFormat`].
pub fn load_snapshot(path: impl AsRef<FsPath>) -> Result<Option<HashMap<String, TreeNode>>> {
    let path = path.as_ref();
    let mut file = match File::open(path) {
        Ok(f) => f,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
            info!(target: "grove::snapshot", file = %path.display(), "no snapshot found");
            return Ok(None);
        }
        Err(e) => return Err(e.into()),
    };

    let mut header = [0u8; 12];
    file.read_exact(&mut header)
        .map_err(|_| Error::SnapshotFormat("truncated header".to_string()))?;
    if &header[0..4] != MAGIC {
        return Err(Error::SnapshotFormat("bad magic".to_string()));
    }
    let version = u32::from_le_bytes([header[4], header[5], header[6], header[7]]);
    if version != FORMAT_VERSION {
        return Err(Error::SnapshotFormat(format!(
            "unsupported version {}",
            version
        )));
    }
    let expected_crc = u32::from_le_bytes([header[8], header[9], header[10], header[11]]);

    let mut body = Vec::new();
    GzDecoder::new(file)
        .read_to_end(&mut body)
        .map_err(|e| Error::SnapshotFormat(format!("decompress failed: {}", e)))?;

    let actual_crc = crc32fast::hash(&body);
    if actual_crc != expected_crc {
        warn!(
            target: "grove::snapshot",
            expected = expected_crc,
            actual = actual_crc,
            "snapshot checksum mismatch"
        );
        return Err(Error::SnapshotFormat("checksum mismatch".to_string()));
    }

    let image = decode_body(&body)?;
    info!(
        target: "grove::snapshot",
        file = %path.display(),
        globals = image.len(),
        "snapshot loaded"
    );
    Ok(Some(image))
}

// =========================================================================
// Encoding
// =========================================================================

fn encode_body(image: &HashMap<String, TreeNode>) -> Vec<u8> {
    let mut out = Vec::new();
    // sorted for deterministic bytes
    let mut names: Vec<&String> = image.keys().collect();
    names.sort();
    write_u32(&mut out, names.len() as u32);
    for name in names {
        write_bytes(&mut out, name.as_bytes());
        encode_node(&mut out, &image[name]);
    }
    out
}

fn encode_node(out: &mut Vec<u8>, node: &TreeNode) {
    match node.data() {
        None => out.push(VALUE_NULL),
        Some(Value::Null) => out.push(VALUE_NULL),
        Some(Value::Int(n)) => {
            out.push(TAG_INT);
            out.extend_from_slice(&n.to_le_bytes());
        }
        Some(Value::Float(f)) => {
            out.push(TAG_FLOAT);
            out.extend_from_slice(&f.to_le_bytes());
        }
        Some(Value::Str(s)) => {
            out.push(TAG_STR);
            write_bytes(out, s.as_bytes());
        }
    }
    let children: Vec<_> = node.children().collect();
    write_u32(out, children.len() as u32);
    for (sub, child) in children {
        match sub {
            Subscript::Int(n) => {
                out.push(TAG_INT);
                out.extend_from_slice(&n.to_le_bytes());
            }
            Subscript::Str(s) => {
                out.push(TAG_STR);
                write_bytes(out, s.as_bytes());
            }
        }
        encode_node(out, child);
    }
}

fn write_u32(out: &mut Vec<u8>, n: u32) {
    out.extend_from_slice(&n.to_le_bytes());
}

fn write_bytes(out: &mut Vec<u8>, bytes: &[u8]) {
    write_u32(out, bytes.len() as u32);
    out.extend_from_slice(bytes);
}

// =========================================================================
// Decoding
// =========================================================================

struct Cursor<'a> {
    bytes: &'a [u8],
    pos: usize,
}

impl<'a> Cursor<'a> {
    fn new(bytes: &'a [u8]) -> Cursor<'a> {
        Cursor { bytes, pos: 0 }
    }

    fn take(&mut self, n: usize) -> Result<&'a [u8]> {
        if self.pos + n > self.bytes.len() {
            return Err(Error::SnapshotFormat("truncated body".to_string()));
        }
        let slice = &self.bytes[self.pos..self.pos + n];
        self.pos += n;
        Ok(slice)
    }

    fn u8(&mut self) -> Result<u8> {
        Ok(self.take(1)?[0])
    }

    fn u32(&mut self) -> Result<u32> {
        let b = self.take(4)?;
        Ok(u32::from_le_bytes([b[0], b[1], b[2], b[3]]))
    }

    fn i64(&mut self) -> Result<i64> {
        let b = self.take(8)?;
        Ok(i64::from_le_bytes([
            b[0], b[1], b[2], b[3], b[4], b[5], b[6], b[7],
        ]))
    }

    fn f64(&mut self) -> Result<f64> {
        let b = self.take(8)?;
        Ok(f64::from_le_bytes([
            b[0], b[1], b[2], b[3], b[4], b[5], b[6], b[7],
        ]))
    }

    fn string(&mut self) -> Result<String> {
        let len = self.u32()? as usize;
        let bytes = self.take(len)?;
        String::from_utf8(bytes.to_vec())
            .map_err(|_| Error::SnapshotFormat("invalid UTF-8".to_string()))
    }
}

fn decode_body(bytes: &[u8]) -> Result<HashMap<String, TreeNode>> {
    let mut cursor = Cursor::new(bytes);
    let count = cursor.u32()? as usize;
    let mut image = HashMap::with_capacity(count);
    for _ in 0..count {
        let name = cursor.string()?;
        let node = decode_node(&mut cursor)?;
        image.insert(name, node);
    }
    if cursor.pos != bytes.len() {
        return Err(Error::SnapshotFormat("trailing bytes".to_string()));
    }
    Ok(image)
}

fn decode_node(cursor: &mut Cursor<'_>) -> Result<TreeNode> {
    let mut node = TreeNode::new();
    match cursor.u8()? {
        VALUE_NULL => {}
        TAG_INT => node.set(&[], Value::Int(cursor.i64()?)),
        TAG_FLOAT => node.set(&[], Value::Float(cursor.f64()?)),
        TAG_STR => node.set(&[], Value::Str(cursor.string()?)),
        tag => return Err(Error::SnapshotFormat(format!("bad value tag {:#04x}", tag))),
    }
    let child_count = cursor.u32()? as usize;
    for _ in 0..child_count {
        let sub = match cursor.u8()? {
            TAG_INT => Subscript::Int(cursor.i64()?),
            TAG_STR => Subscript::Str(cursor.string()?),
            tag => {
                return Err(Error::SnapshotFormat(format!(
                    "bad subscript tag {:#04x}",
                    tag
                )))
            }
        };
        let child = decode_node(cursor)?;
        node.graft(sub, child);
    }
    Ok(node)
}
