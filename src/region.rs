use crate::error::ChunkReadError;
use crate::loader::LoadOptions;
use crate::nbt::{self, Compound};
use crate::position::RegionChunkPosition;
use bitvec::prelude::*;
use byteorder::{BigEndian, ByteOrder, ReadBytesExt};
use flate2::read::ZlibDecoder;
use log::debug;
use std::io;
use std::io::{Error, Read, Seek, SeekFrom};

/// Amount of chunks in region.
pub const REGION_CHUNKS: usize = 1024;
/// Length of chunks metadata in region.
const REGION_CHUNKS_METADATA_LENGTH: usize = 2 * REGION_CHUNKS;
/// Region sector length in bytes.
pub const REGION_SECTOR_BYTES_LENGTH: u64 = 4096;
/// Region header length in bytes.
pub const REGION_HEADER_BYTES_LENGTH: u64 = 2 * REGION_SECTOR_BYTES_LENGTH;
/// Sectors occupied by the header.
const REGION_HEADER_SECTORS: usize = 2;

/// Zlib compression type value.
pub const ZLIB_COMPRESSION_TYPE: u8 = 2;

/// Chunk location stored in the header.
///
/// Packed on disk as a big-endian `u32`: upper three bytes are the start
/// sector, the low byte is the amount of sectors.
#[derive(Copy, Clone, Default, Debug, Eq, PartialEq)]
pub struct ChunkLocation {
    /// Sector index from which starts chunk data.
    start_sector_index: u32,
    /// Amount of sectors used to store chunk.
    sectors: u8,
}

impl ChunkLocation {
    pub fn new(start_sector_index: u32, sectors: u8) -> Self {
        ChunkLocation {
            start_sector_index,
            sectors,
        }
    }

    pub fn from_packed(value: u32) -> Self {
        ChunkLocation::new(value >> 8, (value & 0xFF) as u8)
    }

    pub fn start_sector_index(&self) -> u32 {
        self.start_sector_index
    }

    pub fn sectors(&self) -> u8 {
        self.sectors
    }

    pub fn byte_offset(&self) -> u64 {
        self.start_sector_index as u64 * REGION_SECTOR_BYTES_LENGTH
    }

    pub fn byte_length(&self) -> u64 {
        self.sectors as u64 * REGION_SECTOR_BYTES_LENGTH
    }

    pub fn is_empty(&self) -> bool {
        self.start_sector_index == 0 || self.sectors == 0
    }

    fn end_sector_index(&self) -> usize {
        self.start_sector_index as usize + self.sectors as usize
    }
}

/// Region file opened for reading raw chunk trees.
pub struct RegionFile<S> {
    /// Source in which region are stored.
    source: S,
    locations: [ChunkLocation; REGION_CHUNKS],
    /// Last modification time of every chunk, in seconds.
    timestamps: [u32; REGION_CHUNKS],
    /// Sectors claimed by the header and chunks.
    used_sectors: BitVec,
    /// Chunks whose sectors are already claimed, with the first shared sector.
    shared_sectors: Vec<(RegionChunkPosition, u32)>,
    options: LoadOptions,
}

impl<S> RegionFile<S> {
    pub fn location(&self, position: RegionChunkPosition) -> ChunkLocation {
        self.locations[position.index()]
    }

    pub fn timestamp(&self, position: RegionChunkPosition) -> u32 {
        self.timestamps[position.index()]
    }

    pub fn locations(&self) -> &[ChunkLocation] {
        &self.locations
    }

    pub fn timestamps(&self) -> &[u32] {
        &self.timestamps
    }

    /// Total sectors in the source, header included.
    pub fn total_sectors(&self) -> usize {
        self.used_sectors.len()
    }

    /// Chunks sharing sectors with the header or a chunk of a lower slot.
    ///
    /// They are still readable, but their data may belong to another chunk.
    pub fn shared_sectors(&self) -> &[(RegionChunkPosition, u32)] {
        &self.shared_sectors
    }

    pub fn into_inner(self) -> S {
        self.source
    }
}

/// Calculates used sectors.
///
/// Chunks which do not fit into `total_sectors` are left out. Chunks which
/// share sectors with the header or an earlier chunk are returned along with
/// the first shared sector.
fn used_sectors(
    total_sectors: usize,
    locations: &[ChunkLocation],
) -> (BitVec, Vec<(RegionChunkPosition, u32)>) {
    // First two sectors are used to store header.
    let mut used_sectors = bitvec![0; total_sectors.max(REGION_HEADER_SECTORS)];
    let mut shared_sectors = Vec::new();

    for index in 0..REGION_HEADER_SECTORS {
        used_sectors.set(index, true);
    }

    for (slot, location) in locations.iter().enumerate() {
        if location.is_empty() || location.end_sector_index() > used_sectors.len() {
            continue;
        }

        let start_index = location.start_sector_index as usize;
        let end_index = location.end_sector_index();

        if let Some(index) = (start_index..end_index).find(|&index| used_sectors[index]) {
            shared_sectors.push((RegionChunkPosition::from_index(slot), index as u32));
        }

        for index in start_index..end_index {
            used_sectors.set(index, true);
        }
    }

    (used_sectors, shared_sectors)
}

impl<S: Read + Seek> RegionFile<S> {
    pub fn open(source: S) -> Result<Self, io::Error> {
        Self::open_with_options(source, LoadOptions::default())
    }

    pub fn open_with_options(mut source: S, options: LoadOptions) -> Result<Self, io::Error> {
        let source_len = source.len()?;
        let (locations, timestamps) = Self::read_header(&mut source, source_len)?;

        let total_sectors = ((source_len + (REGION_SECTOR_BYTES_LENGTH - 1))
            / REGION_SECTOR_BYTES_LENGTH) as usize;

        let (used_sectors, shared_sectors) = used_sectors(total_sectors, &locations);

        for (position, sector) in &shared_sectors {
            debug!(
                target: "anvil-voxel",
                "Chunk x: {}, z: {} shares sector {}",
                position.x, position.z, sector
            );
        }

        Ok(RegionFile {
            source,
            locations,
            timestamps,
            used_sectors,
            shared_sectors,
            options,
        })
    }

    /// First 8KB of source are header of 1024 locations and 1024 timestamps.
    ///
    /// A source shorter than the header has no chunks.
    fn read_header(
        source: &mut S,
        source_len: u64,
    ) -> Result<([ChunkLocation; REGION_CHUNKS], [u32; REGION_CHUNKS]), io::Error> {
        let mut locations = [ChunkLocation::default(); REGION_CHUNKS];
        let mut timestamps = [0u32; REGION_CHUNKS];

        if REGION_HEADER_BYTES_LENGTH > source_len {
            debug!(
                target: "anvil-voxel",
                "Source of {} bytes is shorter than region header",
                source_len
            );
            return Ok((locations, timestamps));
        }

        source.seek(SeekFrom::Start(0))?;

        let mut values = [0u32; REGION_CHUNKS_METADATA_LENGTH];
        source.read_u32_into::<BigEndian>(&mut values)?;

        for index in 0..REGION_CHUNKS {
            locations[index] = ChunkLocation::from_packed(values[index]);
            timestamps[index] = values[REGION_CHUNKS + index];
        }

        Ok((locations, timestamps))
    }

    /// Reads and decodes the NBT tree of a chunk.
    pub fn read_chunk(&mut self, position: RegionChunkPosition) -> Result<Compound, ChunkReadError> {
        let data = self.read_chunk_data(position)?;

        Ok(nbt::parse_root(&data)?)
    }

    /// Reads chunk payload and decompresses it.
    pub fn read_chunk_data(
        &mut self,
        position: RegionChunkPosition,
    ) -> Result<Vec<u8>, ChunkReadError> {
        let location = self.location(position);

        if location.is_empty() {
            return Err(ChunkReadError::ChunkNotFound { position });
        }

        if REGION_HEADER_SECTORS > location.start_sector_index as usize
            || location.end_sector_index() > self.total_sectors()
        {
            return Err(ChunkReadError::SectorsOutOfBounds {
                position,
                start_sector_index: location.start_sector_index,
                sectors: location.sectors,
            });
        }

        self.source.seek(SeekFrom::Start(location.byte_offset()))?;

        // Last sector of a file may be cut short.
        let mut blob = Vec::with_capacity(location.byte_length() as usize);
        (&mut self.source)
            .take(location.byte_length())
            .read_to_end(&mut blob)?;

        if blob.len() < 4 {
            return Err(ChunkReadError::TruncatedChunkHeader {
                position,
                length: blob.len(),
            });
        }

        // A non-zero length within the blob also covers the scheme byte.
        let length = BigEndian::read_u32(&blob[..4]);
        let maximum_length = (blob.len() - 4) as u32;

        if length == 0 {
            return Err(ChunkReadError::ChunkNotFound { position });
        }

        if length > maximum_length {
            return Err(ChunkReadError::LengthExceedsMaximum {
                length,
                maximum_length,
            });
        }

        let compression_scheme = blob[4];

        if compression_scheme != ZLIB_COMPRESSION_TYPE {
            return Err(ChunkReadError::UnsupportedCompressionScheme { compression_scheme });
        }

        inflate(&blob[5..4 + length as usize], self.options.max_decompressed_length())
    }
}

/// Inflates a zlib stream into a buffer growing up to `limit` bytes.
fn inflate(compressed: &[u8], limit: usize) -> Result<Vec<u8>, ChunkReadError> {
    let mut data = Vec::new();

    ZlibDecoder::new(compressed)
        .take(limit as u64 + 1)
        .read_to_end(&mut data)
        .map_err(|io_error| ChunkReadError::DecompressionError { io_error })?;

    if data.len() > limit {
        return Err(ChunkReadError::DecompressedLengthExceedsLimit { limit });
    }

    Ok(data)
}

/// Trait adds additional helper methods for `Seek`.
trait SeekExt {
    fn len(&mut self) -> Result<u64, io::Error>;
}

impl<S: Seek> SeekExt for S {
    fn len(&mut self) -> Result<u64, Error> {
        let old_pos = self.seek(SeekFrom::Current(0))?;
        let len = self.seek(SeekFrom::End(0))?;

        if old_pos != len {
            self.seek(SeekFrom::Start(old_pos))?;
        }

        Ok(len)
    }
}

#[cfg(test)]
mod tests {
    use crate::error::ChunkReadError;
    use crate::fixtures::{chunk_blob, chunk_nbt, ramp_blocks, region_bytes, zlib};
    use crate::loader::LoadOptions;
    use crate::position::RegionChunkPosition;
    use crate::region::{
        self, ChunkLocation, RegionFile, SeekExt, REGION_HEADER_BYTES_LENGTH,
        ZLIB_COMPRESSION_TYPE,
    };
    use byteorder::{BigEndian, ByteOrder};
    use std::io::Cursor;

    fn open(bytes: Vec<u8>) -> RegionFile<Cursor<Vec<u8>>> {
        RegionFile::open(Cursor::new(bytes)).unwrap()
    }

    #[test]
    fn test_location_decode() {
        let location = ChunkLocation::from_packed(BigEndian::read_u32(&[0x00, 0x00, 0x02, 0x01]));

        assert_eq!(location.byte_offset(), 8192);
        assert_eq!(location.byte_length(), 4096);
        assert!(!location.is_empty());

        let location = ChunkLocation::from_packed(BigEndian::read_u32(&[0x01, 0x02, 0x03, 0x04]));

        assert_eq!(location.start_sector_index(), 0x010203);
        assert_eq!(location.sectors(), 4);
    }

    #[test]
    fn test_empty_locations() {
        assert!(ChunkLocation::new(0, 1).is_empty());
        assert!(ChunkLocation::new(2, 0).is_empty());
    }

    #[test]
    fn test_header_read() {
        let blob = chunk_blob(ZLIB_COMPRESSION_TYPE, &zlib(&chunk_nbt(&[])));
        let region = open(region_bytes(&[(3, blob.clone()), (40, blob)]));

        assert_eq!(
            region.location(RegionChunkPosition::from_index(3)),
            ChunkLocation::new(2, 1)
        );
        assert_eq!(
            region.location(RegionChunkPosition::from_index(40)),
            ChunkLocation::new(3, 1)
        );
        assert!(region.location(RegionChunkPosition::new(0, 0)).is_empty());
        assert_eq!(region.timestamp(RegionChunkPosition::new(8, 1)), 1_500_000_040);
        assert_eq!(region.total_sectors(), 4);
    }

    #[test]
    fn test_source_shorter_than_header() {
        let region = open(vec![0xFF; 100]);

        assert!(region.locations().iter().all(ChunkLocation::is_empty));
        assert!(region.timestamps().iter().all(|&t| t == 0));
    }

    #[test]
    fn test_read_chunk() {
        let nbt = chunk_nbt(&[(0, ramp_blocks())]);
        let blob = chunk_blob(ZLIB_COMPRESSION_TYPE, &zlib(&nbt));
        let mut region = open(region_bytes(&[(97, blob)]));

        let root = region.read_chunk(RegionChunkPosition::new(1, 3)).unwrap();
        let level = root.get_compound("Level").unwrap();

        assert_eq!(level.get_i32("xPos").unwrap(), 0);
        assert_eq!(level.get_list("Sections").unwrap().len(), 1);
        assert_eq!(
            region.read_chunk_data(RegionChunkPosition::new(1, 3)).unwrap(),
            nbt
        );
    }

    #[test]
    fn test_read_chunk_not_found() {
        let mut region = open(region_bytes(&[]));
        let load_error = region.read_chunk(RegionChunkPosition::new(14, 12)).err().unwrap();

        match load_error {
            ChunkReadError::ChunkNotFound { position } => {
                assert_eq!(position, RegionChunkPosition::new(14, 12));
            }
            _ => panic!("Expected `ChunkNotFound` but got `{:?}`", load_error),
        }
    }

    #[test]
    fn test_read_chunk_unsupported_compression() {
        let blob = chunk_blob(1, &zlib(&chunk_nbt(&[])));
        let mut region = open(region_bytes(&[(0, blob)]));

        match region.read_chunk(RegionChunkPosition::new(0, 0)) {
            Err(ChunkReadError::UnsupportedCompressionScheme {
                compression_scheme: 1,
            }) => {}
            other => panic!("Expected `UnsupportedCompressionScheme` but got `{:?}`", other),
        }
    }

    #[test]
    fn test_read_chunk_corrupt_stream() {
        let blob = chunk_blob(ZLIB_COMPRESSION_TYPE, &[0x78, 0x9C, 0xFF, 0xFF, 0xFF, 0x00]);
        let mut region = open(region_bytes(&[(0, blob)]));

        match region.read_chunk(RegionChunkPosition::new(0, 0)) {
            Err(ChunkReadError::DecompressionError { .. }) => {}
            other => panic!("Expected `DecompressionError` but got `{:?}`", other),
        }
    }

    #[test]
    fn test_read_chunk_length_exceeds_maximum() {
        let mut blob = chunk_blob(ZLIB_COMPRESSION_TYPE, &zlib(&chunk_nbt(&[])));
        BigEndian::write_u32(&mut blob[..4], 5000);
        let mut region = open(region_bytes(&[(0, blob)]));

        match region.read_chunk(RegionChunkPosition::new(0, 0)) {
            Err(ChunkReadError::LengthExceedsMaximum {
                length: 5000,
                maximum_length: 4092,
            }) => {}
            other => panic!("Expected `LengthExceedsMaximum` but got `{:?}`", other),
        }
    }

    #[test]
    fn test_read_chunk_sectors_out_of_bounds() {
        let mut bytes = region_bytes(&[]);
        // Slot 0 points to sectors 2..4 of a header-only source.
        BigEndian::write_u32(&mut bytes[..4], (2 << 8) | 2);
        // Slot 1 points into the header.
        BigEndian::write_u32(&mut bytes[4..8], (1 << 8) | 1);
        let mut region = open(bytes);

        for index in 0..2 {
            match region.read_chunk(RegionChunkPosition::from_index(index)) {
                Err(ChunkReadError::SectorsOutOfBounds { .. }) => {}
                other => panic!("Expected `SectorsOutOfBounds` but got `{:?}`", other),
            }
        }
    }

    #[test]
    fn test_decompressed_length_limit() {
        let blob = chunk_blob(ZLIB_COMPRESSION_TYPE, &zlib(&chunk_nbt(&[(0, ramp_blocks())])));
        let options = LoadOptions::default().with_max_decompressed_length(1024);
        let mut region =
            RegionFile::open_with_options(Cursor::new(region_bytes(&[(0, blob)])), options)
                .unwrap();

        match region.read_chunk(RegionChunkPosition::new(0, 0)) {
            Err(ChunkReadError::DecompressedLengthExceedsLimit { limit: 1024 }) => {}
            other => panic!("Expected `DecompressedLengthExceedsLimit` but got `{:?}`", other),
        }
    }

    #[test]
    fn test_read_chunk_truncated_header() {
        let mut bytes = region_bytes(&[]);
        // Slot 0 points to a last sector cut to two bytes.
        BigEndian::write_u32(&mut bytes[..4], (2 << 8) | 1);
        bytes.extend_from_slice(&[0, 0]);
        let mut region = open(bytes);

        match region.read_chunk(RegionChunkPosition::new(0, 0)) {
            Err(ChunkReadError::TruncatedChunkHeader { length: 2, .. }) => {}
            other => panic!("Expected `TruncatedChunkHeader` but got `{:?}`", other),
        }
    }

    #[test]
    fn test_read_chunk_length_exceeds_short_sector() {
        let mut bytes = region_bytes(&[]);
        BigEndian::write_u32(&mut bytes[..4], (2 << 8) | 1);
        // Declared length of 3 with only the scheme byte present.
        bytes.extend_from_slice(&[0, 0, 0, 3, ZLIB_COMPRESSION_TYPE]);
        let mut region = open(bytes);

        match region.read_chunk(RegionChunkPosition::new(0, 0)) {
            Err(ChunkReadError::LengthExceedsMaximum {
                length: 3,
                maximum_length: 1,
            }) => {}
            other => panic!("Expected `LengthExceedsMaximum` but got `{:?}`", other),
        }
    }

    #[test]
    fn test_used_sectors_only_header() {
        let (used_sectors, shared_sectors) = region::used_sectors(8, &[]);

        assert!(shared_sectors.is_empty());
        assert_eq!(used_sectors.len(), 8);
        assert!(used_sectors[0] && used_sectors[1]);
        assert!((2..8).all(|index| !used_sectors[index]));
    }

    #[test]
    fn test_used_sectors_partially() {
        let locations = vec![
            ChunkLocation::new(3, 3),
            ChunkLocation::new(8, 1),
            // Does not fit and is left out.
            ChunkLocation::new(9, 4),
        ];

        let (used_sectors, shared_sectors) = region::used_sectors(10, &locations);
        let used: Vec<usize> = (0..10).filter(|&index| used_sectors[index]).collect();

        assert_eq!(used, vec![0, 1, 3, 4, 5, 8]);
        assert!(shared_sectors.is_empty());
    }

    #[test]
    fn test_used_sectors_shared() {
        let locations = vec![
            ChunkLocation::new(2, 2),
            ChunkLocation::new(3, 2),
            ChunkLocation::new(1, 1),
            ChunkLocation::new(6, 1),
        ];

        let (used_sectors, shared_sectors) = region::used_sectors(8, &locations);
        let used: Vec<usize> = (0..8).filter(|&index| used_sectors[index]).collect();

        assert_eq!(used, vec![0, 1, 2, 3, 4, 6]);
        assert_eq!(
            shared_sectors,
            vec![
                (RegionChunkPosition::from_index(1), 3),
                (RegionChunkPosition::from_index(2), 1),
            ]
        );
    }

    #[test]
    fn test_len() {
        let mut cursor = Cursor::new(vec![1, 2, 3, 4, 5]);
        cursor.set_position(2);
        let len = cursor.len().unwrap();

        assert_eq!(len, 5);
        assert_eq!(cursor.position(), 2);
    }

    #[test]
    fn test_header_length() {
        assert_eq!(REGION_HEADER_BYTES_LENGTH, 8192);
        assert_eq!(region_bytes(&[]).len() as u64, REGION_HEADER_BYTES_LENGTH);
    }
}
