//! `.caw` template file encoding and decoding.
//!
//! # Layout (little-endian, no padding)
//! - Bytes 0-2: magic `"caw"`
//! - Byte 3: format version (1)
//! - Bytes 4-31: seven `i32` vertex counts, `[+X, +Y, +Z, -X, -Y, -Z, REMAIN]`
//! - Bytes 32..: vertex records of each group, in the same order
//!
//! Group byte ranges come from the header counts and [`VERTEX_SIZE`]; the file
//! length is only used to check that the two agree.

use std::path::Path;

use half::f16;

use crate::core::{FaceGroup, Template, Vertex, VERTEX_SIZE};
use crate::error::{FormatError, MeshError, Result};

/// File identification bytes.
pub const MAGIC: [u8; 3] = *b"caw";
/// Current (and only accepted) format version.
pub const FORMAT_VERSION: u8 = 1;
/// Header size: magic + version + seven counts.
pub const HEADER_SIZE: usize = 4 + FaceGroup::COUNT * 4;
/// File extension used for templates.
pub const FILE_EXTENSION: &str = "caw";

/// Encoded size of a template in bytes.
pub fn encoded_len(template: &Template) -> usize {
    HEADER_SIZE + template.total_vertices() * VERTEX_SIZE
}

/// Encode a template into `.caw` bytes.
///
/// # Errors
/// Returns `InvalidInput` if a group holds more vertices than an `i32` count
/// can describe.
pub fn encode(template: &Template) -> Result<Vec<u8>> {
    let mut out = Vec::with_capacity(encoded_len(template));
    out.extend_from_slice(&MAGIC);
    out.push(FORMAT_VERSION);

    for (group, vertices) in template.iter() {
        let count = i32::try_from(vertices.len()).map_err(|_| {
            MeshError::invalid(format!(
                "group {group} has {} vertices, exceeding the format limit",
                vertices.len()
            ))
        })?;
        out.extend_from_slice(&count.to_le_bytes());
    }

    for (_, vertices) in template.iter() {
        for vertex in vertices {
            write_vertex(vertex, &mut out);
        }
    }

    debug_assert_eq!(out.len(), encoded_len(template));
    Ok(out)
}

/// Decode `.caw` bytes into a template.
///
/// # Errors
/// Returns a [`FormatError`] for a short header, wrong magic, unsupported
/// version, negative counts, or a file size that disagrees with the counts.
pub fn decode(bytes: &[u8]) -> Result<Template> {
    let counts = read_header(bytes)?;

    let total: u64 = counts.iter().map(|&c| c as u64).sum();
    let expected = HEADER_SIZE as u64 + total * VERTEX_SIZE as u64;
    if expected != bytes.len() as u64 {
        return Err(FormatError::SizeMismatch {
            expected,
            actual: bytes.len() as u64,
        }
        .into());
    }

    let mut groups: [Vec<Vertex>; FaceGroup::COUNT] = Default::default();
    let mut cursor = HEADER_SIZE;
    for group in FaceGroup::ALL {
        let count = counts[group.index()];
        let end = cursor + count * VERTEX_SIZE;
        groups[group.index()] = bytes[cursor..end]
            .chunks_exact(VERTEX_SIZE)
            .map(read_vertex)
            .collect();
        cursor = end;

        if count % 3 != 0 {
            log::warn!("decoded group {group} has {count} vertices, not whole triangles");
        }
    }

    Ok(Template::from_groups(groups))
}

/// Read only the header, returning the per-group vertex counts.
///
/// Useful for inspecting a template without decoding its payload.
pub fn read_header(bytes: &[u8]) -> Result<[usize; FaceGroup::COUNT]> {
    if bytes.len() < HEADER_SIZE {
        return Err(FormatError::Truncated {
            len: bytes.len(),
            header: HEADER_SIZE,
        }
        .into());
    }

    let found = [bytes[0], bytes[1], bytes[2]];
    if found != MAGIC {
        return Err(FormatError::BadMagic { found }.into());
    }
    if bytes[3] != FORMAT_VERSION {
        return Err(FormatError::UnsupportedVersion {
            found: bytes[3],
            supported: FORMAT_VERSION,
        }
        .into());
    }

    let mut counts = [0usize; FaceGroup::COUNT];
    for group in FaceGroup::ALL {
        let at = 4 + group.index() * 4;
        let raw = i32::from_le_bytes([bytes[at], bytes[at + 1], bytes[at + 2], bytes[at + 3]]);
        if raw < 0 {
            return Err(FormatError::NegativeCount { group, count: raw }.into());
        }
        counts[group.index()] = raw as usize;
    }
    Ok(counts)
}

/// Read and decode a template file.
pub fn read_template(path: impl AsRef<Path>) -> Result<Template> {
    let path = path.as_ref();
    let bytes = std::fs::read(path).map_err(|e| MeshError::io(path, e))?;
    let template = decode(&bytes)?;
    log::debug!(
        "loaded template {} ({} vertices, counts {:?})",
        path.display(),
        template.total_vertices(),
        template.counts()
    );
    Ok(template)
}

/// Encode a template and write it to `path`, replacing any existing file.
pub fn write_template(path: impl AsRef<Path>, template: &Template) -> Result<()> {
    let path = path.as_ref();
    let bytes = encode(template)?;
    std::fs::write(path, &bytes).map_err(|e| MeshError::io(path, e))?;
    log::debug!("saved template to {} ({} bytes)", path.display(), bytes.len());
    Ok(())
}

/// File name for a template authored from the mesh `mesh_name`.
pub fn template_file_name(mesh_name: &str) -> String {
    format!("{mesh_name}.{FILE_EXTENSION}")
}

fn push_halves(values: &[f16], out: &mut Vec<u8>) {
    for value in values {
        out.extend_from_slice(&value.to_le_bytes());
    }
}

fn write_vertex(vertex: &Vertex, out: &mut Vec<u8>) {
    push_halves(&vertex.position, out);
    push_halves(&vertex.normal, out);
    push_halves(&vertex.tangent, out);
    out.extend_from_slice(&vertex.color);
    push_halves(&vertex.uv, out);
}

/// Little-endian field reader over one vertex record.
struct RecordReader<'a> {
    bytes: &'a [u8],
    at: usize,
}

impl RecordReader<'_> {
    fn halves<const N: usize>(&mut self) -> [f16; N] {
        let mut out = [f16::ZERO; N];
        for value in &mut out {
            *value = f16::from_le_bytes([self.bytes[self.at], self.bytes[self.at + 1]]);
            self.at += 2;
        }
        out
    }

    fn bytes4(&mut self) -> [u8; 4] {
        let out = [
            self.bytes[self.at],
            self.bytes[self.at + 1],
            self.bytes[self.at + 2],
            self.bytes[self.at + 3],
        ];
        self.at += 4;
        out
    }
}

fn read_vertex(record: &[u8]) -> Vertex {
    debug_assert_eq!(record.len(), VERTEX_SIZE);
    let mut reader = RecordReader { bytes: record, at: 0 };
    Vertex {
        position: reader.halves(),
        normal: reader.halves(),
        tangent: reader.halves(),
        color: reader.bytes4(),
        uv: reader.halves(),
    }
}
