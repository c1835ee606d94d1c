//! Saving and loading of built indexes.
//!
//! An index serializes to a single self-contained byte stream: a fixed
//! header, the raw vector data, one degree-prefixed adjacency list per
//! point, and a CRC32 checksum footer. The format is little-endian and
//! versioned; see [`format`] for the exact layout.
//!
//! Loading validates everything it reads. A truncated stream, a stray
//! neighbor id, or a checksum mismatch surfaces as
//! [`CorruptIndex`](crate::error::VamanaError::CorruptIndex) rather than a
//! partially constructed index.

pub mod error;
pub mod format;

use std::fs::File;
use std::io::{BufReader, BufWriter, Cursor, Read, Write};
use std::path::Path;

pub use self::error::{FormatError, FormatResult};

use crate::distance::Metric;
use crate::error::Result;
use crate::graph::Graph;
use crate::store::VectorStore;

/// Serializes an index into an owned byte buffer.
pub(crate) fn to_vec(
    store: &VectorStore,
    graph: &Graph,
    metric: Metric,
    entry: u32,
) -> Result<Vec<u8>> {
    let mut bytes = Vec::with_capacity(format::HEADER_SIZE + store.as_flat().len() * 4);
    format::write_index(&mut bytes, store, graph, metric, entry)?;
    Ok(bytes)
}

/// Deserializes an index from a byte slice.
///
/// The slice must contain exactly one serialized index; trailing bytes are
/// treated as corruption.
pub(crate) fn from_slice(bytes: &[u8]) -> Result<(VectorStore, Graph, Metric, u32)> {
    let mut cursor = Cursor::new(bytes);
    let raw = format::read_index(&mut cursor)?;
    if cursor.position() != bytes.len() as u64 {
        let trailing = bytes.len() as u64 - cursor.position();
        return Err(FormatError::LengthMismatch(format!(
            "{trailing} trailing bytes after index data"
        ))
        .into());
    }
    Ok(format::assemble(raw)?)
}

/// Serializes an index to a writer.
pub(crate) fn write_to<W: Write>(
    writer: &mut W,
    store: &VectorStore,
    graph: &Graph,
    metric: Metric,
    entry: u32,
) -> Result<()> {
    format::write_index(writer, store, graph, metric, entry)?;
    Ok(())
}

/// Deserializes an index from a reader.
///
/// The reader must end exactly where the index data ends; anything left
/// over is treated as corruption.
pub(crate) fn read_from<R: Read>(reader: &mut R) -> Result<(VectorStore, Graph, Metric, u32)> {
    let raw = format::read_index(reader)?;
    let mut probe = [0u8; 1];
    let extra = reader.read(&mut probe).map_err(FormatError::Io)?;
    if extra != 0 {
        return Err(
            FormatError::LengthMismatch("trailing bytes after index data".to_string()).into(),
        );
    }
    Ok(format::assemble(raw)?)
}

/// Serializes an index to a file, creating or truncating it.
pub(crate) fn save_file<P: AsRef<Path>>(
    path: P,
    store: &VectorStore,
    graph: &Graph,
    metric: Metric,
    entry: u32,
) -> Result<()> {
    let file = File::create(path)?;
    let mut writer = BufWriter::new(file);
    format::write_index(&mut writer, store, graph, metric, entry)?;
    writer.flush()?;
    Ok(())
}

/// Deserializes an index from a file.
pub(crate) fn load_file<P: AsRef<Path>>(path: P) -> Result<(VectorStore, Graph, Metric, u32)> {
    let file = File::open(path)?;
    let mut reader = BufReader::new(file);
    read_from(&mut reader)
}
