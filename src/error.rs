use crate::nbt::TagKind;
use crate::position::RegionChunkPosition;
use std::{error::Error, fmt::Display, io};

/// Possible errors while reading a single chunk.
///
/// None of these abort a region load: the chunk is left unloaded and loading
/// continues with the next slot.
#[derive(Debug)]
pub enum ChunkReadError {
    /// Chunk at specified coordinates inside region not found.
    ChunkNotFound { position: RegionChunkPosition },
    /// Chunk sectors start inside the header or end past the source.
    ///
    /// Region file are corrupted or truncated.
    SectorsOutOfBounds {
        position: RegionChunkPosition,
        start_sector_index: u32,
        sectors: u8,
    },
    /// Chunk sectors end before the 4-byte length prefix.
    TruncatedChunkHeader {
        position: RegionChunkPosition,
        /// Bytes available in the chunk sectors.
        length: usize,
    },
    /// Declared chunk length overlaps the sectors allocated to the chunk.
    ///
    /// This should not occur under normal conditions.
    LengthExceedsMaximum {
        /// Chunk length.
        length: u32,
        /// Chunk maximum expected length.
        maximum_length: u32,
    },
    /// Only zlib compressed chunks are supported.
    UnsupportedCompressionScheme {
        /// Compression scheme type id.
        compression_scheme: u8,
    },
    /// Compressed stream is corrupted.
    DecompressionError { io_error: io::Error },
    /// Decompressed chunk does not fit in the configured limit.
    DecompressedLengthExceedsLimit { limit: usize },
    /// I/O Error which happened while were reading chunk data from region file.
    IOError { io_error: io::Error },
    /// Error while decoding binary data to NBT tag.
    TagDecodeError { tag_decode_error: DecodeError },
    /// Chunk tree lacks a tag required to extract blocks.
    MalformedChunk { compound_tag_error: CompoundTagError },
    /// Section can not be mapped into the block volume.
    MalformedSection {
        section_y: Option<i8>,
        reason: &'static str,
    },
}

impl From<io::Error> for ChunkReadError {
    fn from(io_error: io::Error) -> Self {
        ChunkReadError::IOError { io_error }
    }
}

impl From<DecodeError> for ChunkReadError {
    fn from(tag_decode_error: DecodeError) -> Self {
        ChunkReadError::TagDecodeError { tag_decode_error }
    }
}

impl From<CompoundTagError> for ChunkReadError {
    fn from(compound_tag_error: CompoundTagError) -> Self {
        ChunkReadError::MalformedChunk { compound_tag_error }
    }
}

impl Error for ChunkReadError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        use ChunkReadError::*;
        match self {
            DecompressionError { io_error } => Some(io_error),
            IOError { io_error } => Some(io_error),
            TagDecodeError { tag_decode_error } => Some(tag_decode_error),
            MalformedChunk { compound_tag_error } => Some(compound_tag_error),
            _ => None,
        }
    }
}

impl Display for ChunkReadError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        use ChunkReadError::*;
        match self {
            ChunkNotFound { position } => {
                write!(f, "Chunk {}, {} not found", position.x, position.z)
            }
            SectorsOutOfBounds {
                position,
                start_sector_index,
                sectors,
            } => write!(
                f,
                "Chunk {}, {} sectors {}..{} are out of bounds",
                position.x,
                position.z,
                start_sector_index,
                *start_sector_index as u64 + *sectors as u64
            ),
            TruncatedChunkHeader { position, length } => write!(
                f,
                "Chunk {}, {} header is truncated to {} bytes",
                position.x, position.z, length
            ),
            LengthExceedsMaximum {
                length,
                maximum_length,
            } => write!(
                f,
                "Chunk length of {} exceeds maximum ({})",
                length, maximum_length
            ),
            UnsupportedCompressionScheme { compression_scheme } => {
                write!(f, "Unsupported compression scheme: {}", compression_scheme)
            }
            DecompressionError { .. } => write!(f, "Failed to decompress chunk"),
            DecompressedLengthExceedsLimit { limit } => {
                write!(f, "Decompressed chunk exceeds {} bytes", limit)
            }
            IOError { .. } => write!(f, "IO Error"),
            TagDecodeError { .. } => write!(f, "Failed to decode nbt"),
            MalformedChunk { .. } => write!(f, "Malformed chunk"),
            MalformedSection { section_y, reason } => match section_y {
                Some(y) => write!(f, "Malformed section {}: {}", y, reason),
                None => write!(f, "Malformed section: {}", reason),
            },
        }
    }
}

/// Unrecoverable NBT decoding failure.
#[derive(Debug, Clone, Eq, PartialEq)]
pub enum DecodeError {
    /// Compound member with a type id outside of known tags.
    UnknownTagType { type_id: u8, offset: usize },
    /// Lists and compounds nested deeper than allowed.
    NestingTooDeep { offset: usize },
}

impl Error for DecodeError {}

impl Display for DecodeError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            DecodeError::UnknownTagType { type_id, offset } => {
                write!(f, "Unknown tag type {} at offset {}", type_id, offset)
            }
            DecodeError::NestingTooDeep { offset } => {
                write!(f, "Tags nested too deep at offset {}", offset)
            }
        }
    }
}

/// Possible errors while looking up a compound member.
#[derive(Debug, Clone, Eq, PartialEq)]
pub enum CompoundTagError {
    /// Compound has no member with the name.
    TagNotFound { name: String },
    /// Member exists but holds another kind of tag.
    TagWrongType { name: String, actual: TagKind },
}

impl CompoundTagError {
    pub(crate) fn not_found(name: &str) -> Self {
        CompoundTagError::TagNotFound {
            name: name.to_owned(),
        }
    }

    pub(crate) fn wrong_type(name: &str, actual: TagKind) -> Self {
        CompoundTagError::TagWrongType {
            name: name.to_owned(),
            actual,
        }
    }
}

impl Error for CompoundTagError {}

impl Display for CompoundTagError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            CompoundTagError::TagNotFound { name } => write!(f, "Tag {} not found", name),
            CompoundTagError::TagWrongType { name, actual } => {
                write!(f, "Tag {} has wrong type {:?}", name, actual)
            }
        }
    }
}
