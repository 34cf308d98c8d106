//! Projection of chunk trees into flat block-id volumes.
use crate::error::{ChunkReadError, CompoundTagError};
use crate::nbt::{Compound, Value};

pub const CHUNK_SIZE_X: usize = 16;
pub const CHUNK_SIZE_Y: usize = 256;
pub const CHUNK_SIZE_Z: usize = 16;
/// Blocks in a whole chunk column.
pub const CHUNK_VOLUME: usize = CHUNK_SIZE_X * CHUNK_SIZE_Y * CHUNK_SIZE_Z;
/// Blocks in a 16x16x16 section.
pub const SECTION_VOLUME: usize = 16 * 16 * 16;
/// Sections stacked in a chunk column.
pub const CHUNK_SECTIONS: usize = CHUNK_SIZE_Y / 16;

/// Decoded chunk column.
///
/// Unloaded chunks have no blocks and are rendered as air.
#[derive(Debug, Clone, Default, Eq, PartialEq)]
pub struct Chunk {
    blocks: Vec<u8>,
    loaded: bool,
}

impl Chunk {
    pub fn empty() -> Chunk {
        Chunk::default()
    }

    pub(crate) fn from_blocks(blocks: Vec<u8>) -> Chunk {
        debug_assert_eq!(blocks.len(), CHUNK_VOLUME);

        Chunk {
            blocks,
            loaded: true,
        }
    }

    pub fn is_loaded(&self) -> bool {
        self.loaded
    }

    /// Flat volume laid out by [`voxel_index`], empty when not loaded.
    pub fn blocks(&self) -> &[u8] {
        &self.blocks
    }

    /// Block id at chunk-local coordinates, `y` counts blocks from the bottom.
    ///
    /// Returns `None` outside of the chunk. Unloaded chunks are air.
    pub fn block(&self, x: usize, y: usize, z: usize) -> Option<u8> {
        if x >= CHUNK_SIZE_X || y >= CHUNK_SIZE_Y || z >= CHUNK_SIZE_Z {
            return None;
        }

        if !self.loaded {
            return Some(0);
        }

        self.blocks.get(voxel_index(y / 16, x, y % 16, z)).copied()
    }
}

/// Index into the flat volume of a block inside section `section_y`.
///
/// Sections and the rows within a section are stored top to bottom.
pub fn voxel_index(section_y: usize, x: usize, y: usize, z: usize) -> usize {
    debug_assert!(CHUNK_SECTIONS > section_y && 16 > x && 16 > y && 16 > z);

    (15 - section_y) * SECTION_VOLUME + (15 - y) * 256 + z * 16 + x
}

/// Index into a section's `Blocks` array.
fn section_index(x: usize, y: usize, z: usize) -> usize {
    y * 256 + z * 16 + x
}

/// Returns the compound holding chunk data.
///
/// That is `Level`, or the first compound member when there is no `Level`.
pub fn level_compound(root: &Compound) -> Option<&Compound> {
    match root.get_compound("Level") {
        Ok(level) => Some(level),
        Err(_) => root.iter().find_map(|tag| tag.value().as_compound()),
    }
}

/// Builds the block volume of a chunk from its `Sections`.
pub fn extract_blocks(root: &Compound) -> Result<Vec<u8>, ChunkReadError> {
    let level = level_compound(root).ok_or_else(|| CompoundTagError::TagNotFound {
        name: "Level".to_owned(),
    })?;

    let sections = level.get_list("Sections")?;
    let mut blocks = vec![0u8; CHUNK_VOLUME];

    for section in sections.iter() {
        let section = match section {
            Value::Compound(section) => section,
            _ => {
                return Err(ChunkReadError::MalformedSection {
                    section_y: None,
                    reason: "section is not a compound",
                })
            }
        };

        copy_section(section, &mut blocks)?;
    }

    Ok(blocks)
}

fn copy_section(section: &Compound, blocks: &mut [u8]) -> Result<(), ChunkReadError> {
    let section_y = section.get_i8("Y")?;
    let section_blocks = section.get_i8_vec("Blocks")?;

    if section_y < 0 || section_y as usize >= CHUNK_SECTIONS {
        return Err(ChunkReadError::MalformedSection {
            section_y: Some(section_y),
            reason: "Y is outside of the chunk",
        });
    }

    if section_blocks.len() < SECTION_VOLUME {
        return Err(ChunkReadError::MalformedSection {
            section_y: Some(section_y),
            reason: "Blocks is shorter than a section",
        });
    }

    let section_y = section_y as usize;

    for z in 0..16 {
        for y in 0..16 {
            for x in 0..16 {
                blocks[voxel_index(section_y, x, y, z)] =
                    section_blocks[section_index(x, y, z)] as u8;
            }
        }
    }

    Ok(())
}
