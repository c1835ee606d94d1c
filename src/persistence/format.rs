//! Binary index format.
//!
//! A saved index is one self-contained blob. Everything a search needs is in
//! it: the raw vectors, the adjacency lists with explicit per-point degree
//! counts, the metric, and the entry point, so a loaded index reproduces
//! bit-identical results.
//!
//! # Layout
//!
//! All integers are little-endian.
//!
//! ```text
//! ┌──────────────────────────────────────────┐
//! │ Header (28 bytes)                        │
//! │   magic      b"VMNA"              (4B)   │
//! │   version    u32 = 1              (4B)   │
//! │   metric     u32 tag              (4B)   │
//! │   dimension  u32                  (4B)   │
//! │   count      u32                  (4B)   │
//! │   entry      u32                  (4B)   │
//! │   max_degree u32                  (4B)   │
//! ├──────────────────────────────────────────┤
//! │ Vectors: count * dimension * f32         │
//! ├──────────────────────────────────────────┤
//! │ Adjacency, per point in id order:        │
//! │   degree     u32                         │
//! │   neighbors  degree * u32                │
//! ├──────────────────────────────────────────┤
//! │ Footer (4 bytes)                         │
//! │   crc32      u32 over all prior bytes    │
//! └──────────────────────────────────────────┘
//! ```
//!
//! The reader validates structure as it goes: magic, version, header field
//! ranges, degree bounds, neighbor id ranges, self-loops, duplicates, exact
//! payload length, and finally the checksum.

use std::io::{Read, Write};

use crc32fast::Hasher;
use tracing::debug;

use crate::distance::Metric;
use crate::graph::{Graph, NeighborList};
use crate::store::VectorStore;

use super::error::{FormatError, FormatResult};

/// Magic bytes identifying a serialized index.
pub(crate) const INDEX_MAGIC: &[u8; 4] = b"VMNA";

/// Current format version.
pub(crate) const FORMAT_VERSION: u32 = 1;

/// Serialized header size in bytes.
pub(crate) const HEADER_SIZE: usize = 28;

/// Decoded index payload, ready to be assembled into a `VamanaIndex`.
#[derive(Debug)]
pub(crate) struct RawIndex {
    pub metric: Metric,
    pub dimension: usize,
    pub data: Vec<f32>,
    pub lists: Vec<NeighborList>,
    pub entry: u32,
    pub max_degree: usize,
}

/// Serialize an index into `writer`.
pub(crate) fn write_index<W: Write>(
    writer: &mut W,
    store: &VectorStore,
    graph: &Graph,
    metric: Metric,
    entry: u32,
) -> FormatResult<()> {
    let checksum = {
        let mut out = ChecksumWriter::new(&mut *writer);

        out.write_all(INDEX_MAGIC)?;
        write_u32(&mut out, FORMAT_VERSION)?;
        write_u32(&mut out, u32::from(metric.tag()))?;
        write_u32(&mut out, store.dimension() as u32)?;
        write_u32(&mut out, store.len() as u32)?;
        write_u32(&mut out, entry)?;
        write_u32(&mut out, graph.max_degree() as u32)?;

        let mut row = Vec::with_capacity(store.dimension() * 4);
        for id in 0..store.len() as u32 {
            row.clear();
            for &x in store.vector(id) {
                row.extend_from_slice(&x.to_le_bytes());
            }
            out.write_all(&row)?;
        }

        for list in graph.lists() {
            write_u32(&mut out, list.len() as u32)?;
            for &neighbor in list.iter() {
                write_u32(&mut out, neighbor)?;
            }
        }

        out.checksum()
    };
    writer.write_all(&checksum.to_le_bytes())?;
    Ok(())
}

/// Deserialize and validate an index from `reader`.
///
/// Consumes exactly the serialized length; callers that require "nothing
/// after the footer" (e.g. loading from a byte slice) check for trailing
/// bytes themselves.
pub(crate) fn read_index<R: Read>(reader: &mut R) -> FormatResult<RawIndex> {
    let (raw, actual) = {
        let mut input = ChecksumReader::new(&mut *reader);

        let mut magic = [0u8; 4];
        read_exact(&mut input, &mut magic)?;
        if &magic != INDEX_MAGIC {
            return Err(FormatError::BadMagic);
        }
        let version = read_u32(&mut input)?;
        if version != FORMAT_VERSION {
            return Err(FormatError::UnsupportedVersion {
                found: version,
                supported: FORMAT_VERSION,
            });
        }

        let metric_tag = read_u32(&mut input)?;
        let metric = u8::try_from(metric_tag)
            .ok()
            .and_then(Metric::from_tag)
            .ok_or_else(|| {
                FormatError::InvalidHeader(format!("unknown metric tag {metric_tag}"))
            })?;
        let dimension = read_u32(&mut input)? as usize;
        if dimension == 0 {
            return Err(FormatError::InvalidHeader(
                "dimension must be at least 1".to_string(),
            ));
        }
        let count = read_u32(&mut input)? as usize;
        if count == 0 {
            return Err(FormatError::InvalidHeader(
                "point count must be at least 1".to_string(),
            ));
        }
        let entry = read_u32(&mut input)?;
        if entry as usize >= count {
            return Err(FormatError::InvalidHeader(format!(
                "entry point {entry} out of range for {count} points"
            )));
        }
        let max_degree = read_u32(&mut input)? as usize;
        if max_degree == 0 {
            return Err(FormatError::InvalidHeader(
                "max_degree must be at least 1".to_string(),
            ));
        }

        let total = count.checked_mul(dimension).ok_or_else(|| {
            FormatError::LengthMismatch("vector payload size overflows".to_string())
        })?;
        let mut data = Vec::with_capacity(total.min(1 << 24));
        let mut row = vec![0u8; dimension * 4];
        for _ in 0..count {
            read_exact(&mut input, &mut row)?;
            for bytes in row.chunks_exact(4) {
                data.push(f32::from_le_bytes([bytes[0], bytes[1], bytes[2], bytes[3]]));
            }
        }

        let mut lists = Vec::with_capacity(count.min(1 << 24));
        for id in 0..count as u32 {
            let degree = read_u32(&mut input)? as usize;
            if degree > max_degree {
                return Err(FormatError::InvalidNeighborList {
                    id,
                    reason: format!("degree {degree} exceeds bound {max_degree}"),
                });
            }
            let mut list = NeighborList::with_capacity(degree);
            for _ in 0..degree {
                let neighbor = read_u32(&mut input)?;
                if neighbor as usize >= count {
                    return Err(FormatError::InvalidNeighborList {
                        id,
                        reason: format!("neighbor {neighbor} out of range for {count} points"),
                    });
                }
                if neighbor == id {
                    return Err(FormatError::InvalidNeighborList {
                        id,
                        reason: "self-loop".to_string(),
                    });
                }
                if list.contains(&neighbor) {
                    return Err(FormatError::InvalidNeighborList {
                        id,
                        reason: format!("duplicate neighbor {neighbor}"),
                    });
                }
                list.push(neighbor);
            }
            lists.push(list);
        }

        (
            RawIndex {
                metric,
                dimension,
                data,
                lists,
                entry,
                max_degree,
            },
            input.checksum(),
        )
    };

    let expected = {
        let mut footer = [0u8; 4];
        read_exact(&mut *reader, &mut footer)?;
        u32::from_le_bytes(footer)
    };
    if expected != actual {
        return Err(FormatError::ChecksumMismatch { expected, actual });
    }
    Ok(raw)
}

/// Convert a loaded payload into store + graph (re-using the validated data).
pub(crate) fn assemble(raw: RawIndex) -> FormatResult<(VectorStore, Graph, Metric, u32)> {
    let store = VectorStore::from_flat(raw.data, raw.dimension)
        .map_err(|e| FormatError::LengthMismatch(e.to_string()))?;
    let graph = Graph::new(raw.lists, raw.max_degree);
    debug!(
        points = store.len(),
        dimension = store.dimension(),
        edges = graph.edge_count(),
        "index loaded"
    );
    Ok((store, graph, raw.metric, raw.entry))
}

fn write_u32<W: Write>(writer: &mut W, value: u32) -> FormatResult<()> {
    writer.write_all(&value.to_le_bytes())?;
    Ok(())
}

fn read_u32<R: Read>(reader: &mut R) -> FormatResult<u32> {
    let mut buf = [0u8; 4];
    read_exact(reader, &mut buf)?;
    Ok(u32::from_le_bytes(buf))
}

/// `read_exact` with truncation reported as a format error, not plain I/O.
fn read_exact<R: Read>(reader: &mut R, buf: &mut [u8]) -> FormatResult<()> {
    reader.read_exact(buf).map_err(|e| {
        if e.kind() == std::io::ErrorKind::UnexpectedEof {
            FormatError::LengthMismatch("unexpected end of data".to_string())
        } else {
            FormatError::Io(e)
        }
    })
}

/// Forwards writes while feeding every byte into a CRC32 hasher.
struct ChecksumWriter<'a, W: Write> {
    inner: &'a mut W,
    hasher: Hasher,
}

impl<'a, W: Write> ChecksumWriter<'a, W> {
    fn new(inner: &'a mut W) -> Self {
        Self {
            inner,
            hasher: Hasher::new(),
        }
    }

    fn checksum(self) -> u32 {
        self.hasher.finalize()
    }
}

impl<W: Write> Write for ChecksumWriter<'_, W> {
    fn write(&mut self, buf: &[u8]) -> std::io::Result<usize> {
        let written = self.inner.write(buf)?;
        self.hasher.update(&buf[..written]);
        Ok(written)
    }

    fn flush(&mut self) -> std::io::Result<()> {
        self.inner.flush()
    }
}

/// Forwards reads while feeding every byte into a CRC32 hasher.
struct ChecksumReader<'a, R: Read> {
    inner: &'a mut R,
    hasher: Hasher,
}

impl<'a, R: Read> ChecksumReader<'a, R> {
    fn new(inner: &'a mut R) -> Self {
        Self {
            inner,
            hasher: Hasher::new(),
        }
    }

    fn checksum(self) -> u32 {
        self.hasher.finalize()
    }
}

impl<R: Read> Read for ChecksumReader<'_, R> {
    fn read(&mut self, buf: &mut [u8]) -> std::io::Result<usize> {
        let n = self.inner.read(buf)?;
        self.hasher.update(&buf[..n]);
        Ok(n)
    }
}
