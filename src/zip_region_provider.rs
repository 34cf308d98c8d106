use crate::diagnostics::Diagnostics;
use crate::loader::{LoadOptions, Region};
use crate::position::RegionPosition;
use crate::provider::region_position_filename;
use std::fs::{File, OpenOptions};
use std::io;
use std::io::{Cursor, Read, Seek};
use std::path::Path;
use zip::ZipArchive;

pub use zip::result::ZipError;

/// The regions are read from a zipped world.
#[derive(Debug)]
pub struct ZipRegionProvider<R: Read + Seek> {
    zip_archive: ZipArchive<R>,
    // Prefix for the region folder. Must end with "/".
    // For example: "region/", "world/region/" or "saves/world/region/"
    region_prefix: String,
    options: LoadOptions,
}

#[derive(Debug)]
pub enum ZipProviderError {
    Io(io::Error),
    Zip(ZipError),
    RegionFolderNotFound,
    MoreThanOneRegionFolder,
    RegionNotFound { position: RegionPosition },
}

impl From<io::Error> for ZipProviderError {
    fn from(e: io::Error) -> Self {
        Self::Io(e)
    }
}

impl From<ZipError> for ZipProviderError {
    fn from(e: ZipError) -> Self {
        Self::Zip(e)
    }
}

impl std::error::Error for ZipProviderError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            ZipProviderError::Io(e) => Some(e),
            ZipProviderError::Zip(e) => Some(e),
            _ => None,
        }
    }
}

impl std::fmt::Display for ZipProviderError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ZipProviderError::Io(_) => write!(f, "IO Error"),
            ZipProviderError::Zip(e) => write!(f, "Zip error: {}", e),
            ZipProviderError::RegionFolderNotFound => write!(f, "Region folder not found"),
            ZipProviderError::MoreThanOneRegionFolder => {
                write!(f, "More than one region folder found")
            }
            ZipProviderError::RegionNotFound { position } => {
                write!(f, "Region {}, {} not found", position.x, position.z)
            }
        }
    }
}

// Find the path of the region folder inside the zip archive.
// For example: "region/", "world/region/" or "saves/world/region/"
fn find_region_folder_path<R: Read + Seek>(
    zip_archive: &mut ZipArchive<R>,
) -> Result<String, ZipProviderError> {
    let mut region_prefix = String::from("/");
    let mut found_region_count = 0;

    for i in 0..zip_archive.len() {
        let file = zip_archive.by_index(i)?;
        let full_path = file.sanitized_name();
        // file_name() returns None when the path ends with "/.."
        // we handle that case as an empty string
        let folder_name = full_path.file_name().unwrap_or_default();

        if file.is_dir() && folder_name == "region" {
            found_region_count += 1;
            region_prefix = file.name().to_string();
            // Keep searching after finding the first folder, to make sure
            // there is only one region/ folder
        }
    }

    match found_region_count {
        0 => Err(ZipProviderError::RegionFolderNotFound),
        1 => Ok(region_prefix),
        _ => Err(ZipProviderError::MoreThanOneRegionFolder),
    }
}

impl<R: Read + Seek> ZipRegionProvider<R> {
    pub fn new(reader: R) -> Result<Self, ZipProviderError> {
        Self::with_options(reader, LoadOptions::default())
    }

    pub fn with_options(reader: R, options: LoadOptions) -> Result<Self, ZipProviderError> {
        let mut zip_archive = ZipArchive::new(reader)?;
        let region_prefix = find_region_folder_path(&mut zip_archive)?;

        Ok(ZipRegionProvider {
            zip_archive,
            region_prefix,
            options,
        })
    }

    fn region_path(&self, position: RegionPosition) -> String {
        format!("{}{}", self.region_prefix, region_position_filename(position))
    }

    /// Uncompresses region file into memory and decodes it.
    pub fn get_region(
        &mut self,
        position: RegionPosition,
        diagnostics: &mut dyn Diagnostics,
    ) -> Result<Region, ZipProviderError> {
        let region_path = self.region_path(position);

        let mut region_file = match self.zip_archive.by_name(&region_path) {
            Ok(x) => x,
            Err(ZipError::FileNotFound) => {
                return Err(ZipProviderError::RegionNotFound { position })
            }
            Err(e) => return Err(e.into()),
        };

        let mut buf = Vec::with_capacity(region_file.size() as usize);
        region_file.read_to_end(&mut buf)?;

        Ok(Region::from_source(Cursor::new(buf), self.options, diagnostics)?)
    }
}

impl ZipRegionProvider<File> {
    pub fn file<P: AsRef<Path>>(path: P) -> Result<Self, ZipProviderError> {
        let file = OpenOptions::new().read(true).open(path)?;

        Self::new(file)
    }
}
