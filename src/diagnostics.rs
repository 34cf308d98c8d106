use crate::error::ChunkReadError;
use crate::position::RegionChunkPosition;
use log::{debug, warn};

/// Receives per-chunk outcomes of a region load.
pub trait Diagnostics {
    fn chunk_loaded(&mut self, _position: RegionChunkPosition) {}

    /// Chunk was present in the header but could not be decoded.
    fn chunk_skipped(&mut self, _position: RegionChunkPosition, _error: &ChunkReadError) {}

    /// Chunk sector `sector` is already claimed by the header or a lower
    /// slot. Reported before any chunk is decoded.
    fn sectors_shared(&mut self, _position: RegionChunkPosition, _sector: u32) {}
}

/// Discards everything.
impl Diagnostics for () {}

/// Forwards outcomes to the `log` facade.
#[derive(Debug, Default, Copy, Clone)]
pub struct LogDiagnostics;

impl Diagnostics for LogDiagnostics {
    fn chunk_loaded(&mut self, position: RegionChunkPosition) {
        debug!(target: "anvil-voxel", "Chunk x: {}, z: {} loaded", position.x, position.z);
    }

    fn chunk_skipped(&mut self, position: RegionChunkPosition, error: &ChunkReadError) {
        warn!(
            target: "anvil-voxel",
            "Chunk x: {}, z: {} skipped: {}",
            position.x, position.z, error
        );
    }

    fn sectors_shared(&mut self, position: RegionChunkPosition, sector: u32) {
        warn!(
            target: "anvil-voxel",
            "Chunk x: {}, z: {} shares sector {} with another chunk or the header",
            position.x, position.z, sector
        );
    }
}
