//! Builders for NBT buffers and region images used by tests.
use crate::nbt::TagKind;
use crate::region::{REGION_CHUNKS, REGION_SECTOR_BYTES_LENGTH};
use byteorder::{BigEndian, WriteBytesExt};
use flate2::write::ZlibEncoder;
use flate2::Compression;
use std::io::Write;

/// Writes NBT bytes in order, without checking structure.
pub struct NbtBuilder {
    buffer: Vec<u8>,
}

impl NbtBuilder {
    pub fn new() -> Self {
        NbtBuilder { buffer: Vec::new() }
    }

    fn header(mut self, kind: TagKind, name: &str) -> Self {
        self.buffer.write_u8(kind.id()).unwrap();
        self.buffer.write_u16::<BigEndian>(name.len() as u16).unwrap();
        self.buffer.extend_from_slice(name.as_bytes());
        self
    }

    pub fn byte(mut self, name: &str, value: i8) -> Self {
        self = self.header(TagKind::Byte, name);
        self.buffer.write_i8(value).unwrap();
        self
    }

    pub fn short(mut self, name: &str, value: i16) -> Self {
        self = self.header(TagKind::Short, name);
        self.buffer.write_i16::<BigEndian>(value).unwrap();
        self
    }

    pub fn int(mut self, name: &str, value: i32) -> Self {
        self = self.header(TagKind::Int, name);
        self.buffer.write_i32::<BigEndian>(value).unwrap();
        self
    }

    pub fn long(mut self, name: &str, value: i64) -> Self {
        self = self.header(TagKind::Long, name);
        self.buffer.write_i64::<BigEndian>(value).unwrap();
        self
    }

    pub fn float(mut self, name: &str, value: f32) -> Self {
        self = self.header(TagKind::Float, name);
        self.buffer.write_f32::<BigEndian>(value).unwrap();
        self
    }

    pub fn double(mut self, name: &str, value: f64) -> Self {
        self = self.header(TagKind::Double, name);
        self.buffer.write_f64::<BigEndian>(value).unwrap();
        self
    }

    pub fn string(mut self, name: &str, value: &str) -> Self {
        self = self.header(TagKind::String, name);
        self.buffer.write_u16::<BigEndian>(value.len() as u16).unwrap();
        self.buffer.extend_from_slice(value.as_bytes());
        self
    }

    pub fn byte_array(mut self, name: &str, values: &[i8]) -> Self {
        self = self.header(TagKind::ByteArray, name);
        self.buffer.write_i32::<BigEndian>(values.len() as i32).unwrap();
        self.buffer.extend(values.iter().map(|&v| v as u8));
        self
    }

    pub fn int_array(mut self, name: &str, values: &[i32]) -> Self {
        self = self.header(TagKind::IntArray, name);
        self.buffer.write_i32::<BigEndian>(values.len() as i32).unwrap();

        for &value in values {
            self.buffer.write_i32::<BigEndian>(value).unwrap();
        }

        self
    }

    pub fn begin_compound(self, name: &str) -> Self {
        self.header(TagKind::Compound, name)
    }

    /// List header only, element payloads follow.
    pub fn begin_list(mut self, name: &str, kind: TagKind, count: i32) -> Self {
        self = self.header(TagKind::List, name);
        self.buffer.write_u8(kind.id()).unwrap();
        self.buffer.write_i32::<BigEndian>(count).unwrap();
        self
    }

    pub fn end(mut self) -> Self {
        self.buffer.write_u8(TagKind::End.id()).unwrap();
        self
    }

    pub fn raw(mut self, bytes: &[u8]) -> Self {
        self.buffer.extend_from_slice(bytes);
        self
    }

    pub fn build(self) -> Vec<u8> {
        self.buffer
    }
}

/// Section blocks where `Blocks[i] = i mod 256`.
pub fn ramp_blocks() -> Vec<i8> {
    (0..4096).map(|i| (i % 256) as u8 as i8).collect()
}

/// Chunk NBT with a `Level` compound holding the given `(Y, Blocks)` sections.
pub fn chunk_nbt(sections: &[(i8, Vec<i8>)]) -> Vec<u8> {
    let mut builder = NbtBuilder::new()
        .begin_compound("")
        .int("DataVersion", 1343)
        .begin_compound("Level")
        .int("xPos", 0)
        .int("zPos", 0)
        .begin_list("Sections", TagKind::Compound, sections.len() as i32);

    for (y, blocks) in sections {
        builder = builder.byte("Y", *y).byte_array("Blocks", blocks).end();
    }

    builder.end().end().build()
}

pub fn zlib(data: &[u8]) -> Vec<u8> {
    let mut encoder = ZlibEncoder::new(Vec::new(), Compression::default());
    encoder.write_all(data).unwrap();
    encoder.finish().unwrap()
}

/// Chunk blob: declared length, compression scheme, payload.
pub fn chunk_blob(compression_scheme: u8, payload: &[u8]) -> Vec<u8> {
    let mut blob = Vec::new();
    blob.write_u32::<BigEndian>(payload.len() as u32 + 1).unwrap();
    blob.write_u8(compression_scheme).unwrap();
    blob.extend_from_slice(payload);
    blob
}

/// Region image with blobs placed in consecutive sectors after the header.
///
/// Timestamp of slot `i` is `1_500_000_000 + i`.
pub fn region_bytes(blobs: &[(usize, Vec<u8>)]) -> Vec<u8> {
    let sector = REGION_SECTOR_BYTES_LENGTH as usize;
    let mut locations = vec![0u32; REGION_CHUNKS];
    let mut body = Vec::new();
    let mut next_sector = 2u32;

    for (index, blob) in blobs {
        let sectors = (blob.len() + sector - 1) / sector;
        locations[*index] = (next_sector << 8) | sectors as u32;

        body.extend_from_slice(blob);
        body.resize(body.len() + sectors * sector - blob.len(), 0);
        next_sector += sectors as u32;
    }

    let mut bytes = Vec::with_capacity(2 * sector + body.len());

    for location in locations {
        bytes.write_u32::<BigEndian>(location).unwrap();
    }

    for index in 0..REGION_CHUNKS {
        bytes.write_u32::<BigEndian>(1_500_000_000 + index as u32).unwrap();
    }

    bytes.extend_from_slice(&body);
    bytes
}
