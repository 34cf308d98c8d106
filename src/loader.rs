use crate::chunk::{self, Chunk};
use crate::diagnostics::{Diagnostics, LogDiagnostics};
use crate::error::ChunkReadError;
use crate::position::RegionChunkPosition;
use crate::region::{ChunkLocation, RegionFile, REGION_CHUNKS};
use log::debug;
use std::fs::File;
use std::io;
use std::io::{Read, Seek};
use std::path::Path;

/// Default cap of a decompressed chunk.
const DEFAULT_MAX_DECOMPRESSED_LENGTH: usize = 16 * 1024 * 1024;

/// Settings of a region load.
#[derive(Debug, Copy, Clone, Eq, PartialEq)]
pub struct LoadOptions {
    max_decompressed_length: usize,
}

impl Default for LoadOptions {
    fn default() -> Self {
        LoadOptions {
            max_decompressed_length: DEFAULT_MAX_DECOMPRESSED_LENGTH,
        }
    }
}

impl LoadOptions {
    /// Chunks inflating to more than `length` bytes are skipped.
    pub fn with_max_decompressed_length(mut self, length: usize) -> Self {
        self.max_decompressed_length = length;
        self
    }

    pub fn max_decompressed_length(&self) -> usize {
        self.max_decompressed_length
    }
}

/// Region with every chunk decoded into a block volume.
#[derive(Debug, Clone)]
pub struct Region {
    locations: Vec<ChunkLocation>,
    timestamps: Vec<u32>,
    chunks: Vec<Chunk>,
}

impl Region {
    /// Loads region file at `path`, logging skipped chunks.
    ///
    /// Fails only when the file can not be opened or its header read.
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self, io::Error> {
        Self::load_with(path, LoadOptions::default(), &mut LogDiagnostics)
    }

    pub fn load_with<P: AsRef<Path>>(
        path: P,
        options: LoadOptions,
        diagnostics: &mut dyn Diagnostics,
    ) -> Result<Self, io::Error> {
        let file = File::open(path)?;

        Self::from_source(file, options, diagnostics)
    }

    /// Decodes every slot of the source in index order.
    pub fn from_source<S: Read + Seek>(
        source: S,
        options: LoadOptions,
        diagnostics: &mut dyn Diagnostics,
    ) -> Result<Self, io::Error> {
        let mut region_file = RegionFile::open_with_options(source, options)?;
        let mut chunks = Vec::with_capacity(REGION_CHUNKS);

        for &(position, sector) in region_file.shared_sectors() {
            diagnostics.sectors_shared(position, sector);
        }

        for index in 0..REGION_CHUNKS {
            let position = RegionChunkPosition::from_index(index);

            let chunk = match Self::decode_chunk(&mut region_file, position) {
                Ok(blocks) => {
                    diagnostics.chunk_loaded(position);
                    Chunk::from_blocks(blocks)
                }
                Err(ChunkReadError::ChunkNotFound { .. }) => Chunk::empty(),
                Err(error) => {
                    diagnostics.chunk_skipped(position, &error);
                    Chunk::empty()
                }
            };

            chunks.push(chunk);
        }

        let region = Region {
            locations: region_file.locations().to_vec(),
            timestamps: region_file.timestamps().to_vec(),
            chunks,
        };

        debug!(
            target: "anvil-voxel",
            "Region loaded with {} of {} chunks",
            region.loaded_count(),
            REGION_CHUNKS
        );

        Ok(region)
    }

    fn decode_chunk<S: Read + Seek>(
        region_file: &mut RegionFile<S>,
        position: RegionChunkPosition,
    ) -> Result<Vec<u8>, ChunkReadError> {
        let root = region_file.read_chunk(position)?;

        chunk::extract_blocks(&root)
    }

    pub fn chunk(&self, position: RegionChunkPosition) -> &Chunk {
        &self.chunks[position.index()]
    }

    /// All chunks in slot order.
    pub fn chunks(&self) -> &[Chunk] {
        &self.chunks
    }

    pub fn location(&self, position: RegionChunkPosition) -> ChunkLocation {
        self.locations[position.index()]
    }

    pub fn timestamp(&self, position: RegionChunkPosition) -> u32 {
        self.timestamps[position.index()]
    }

    pub fn loaded_count(&self) -> usize {
        self.chunks.iter().filter(|chunk| chunk.is_loaded()).count()
    }
}
