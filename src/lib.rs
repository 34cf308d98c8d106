//! Read-only loader for Anvil region files.
//!
//! A region file holds up to 1024 zlib compressed chunks behind an 8KB header
//! of locations and timestamps. [`Region::load`] decodes every chunk's NBT
//! tree and projects its `Sections` into a flat volume of block ids. Broken
//! chunks are skipped and reported to a [`Diagnostics`] sink, only failing to
//! open the file fails the load.
//!
//! ```no_run
//! use anvil_voxel::{Region, RegionChunkPosition};
//!
//! let region = Region::load("world/region/r.0.0.mca")?;
//! let chunk = region.chunk(RegionChunkPosition::new(4, 7));
//!
//! if let Some(block) = chunk.block(0, 64, 0) {
//!     println!("block at 0, 64, 0: {}", block);
//! }
//! # Ok::<(), std::io::Error>(())
//! ```
pub mod chunk;
pub mod diagnostics;
pub mod error;
pub mod loader;
pub mod nbt;
pub mod position;
pub mod provider;
pub mod region;
#[cfg(feature = "zip")]
pub mod zip_region_provider;

#[cfg(test)]
mod fixtures;

pub use chunk::Chunk;
pub use diagnostics::{Diagnostics, LogDiagnostics};
pub use error::{ChunkReadError, CompoundTagError, DecodeError};
pub use loader::{LoadOptions, Region};
pub use position::{RegionChunkPosition, RegionPosition};
pub use provider::{FolderRegionProvider, RegionProvider};
pub use region::{ChunkLocation, RegionFile};
#[cfg(feature = "zip")]
pub use zip_region_provider::{ZipProviderError, ZipRegionProvider};
