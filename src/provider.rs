use crate::diagnostics::Diagnostics;
use crate::loader::{LoadOptions, Region};
use crate::position::RegionPosition;
use std::collections::BTreeMap;
use std::fs::read_dir;
use std::io;
use std::path::Path;
use std::str::FromStr;

pub trait RegionProvider {
    fn get_region(
        &mut self,
        position: RegionPosition,
        diagnostics: &mut dyn Diagnostics,
    ) -> Result<Region, io::Error>;
}

/// Region files of a world's `region/` folder.
pub struct FolderRegionProvider<'a> {
    /// Folder where region files located.
    folder_path: &'a Path,
    options: LoadOptions,
}

impl<'a> FolderRegionProvider<'a> {
    pub fn new(folder: &'a str) -> FolderRegionProvider<'a> {
        Self::with_options(Path::new(folder), LoadOptions::default())
    }

    pub fn with_options(folder_path: &'a Path, options: LoadOptions) -> FolderRegionProvider<'a> {
        FolderRegionProvider {
            folder_path,
            options,
        }
    }

    /// Positions of all region files in the folder, in no particular order.
    pub fn iter_positions(&self) -> Result<impl Iterator<Item = RegionPosition>, io::Error> {
        let positions: Vec<_> = read_dir(self.folder_path)?
            .filter_map(|dir| dir.ok())
            .filter_map(|dir| region_pos_from_filename(&dir.path()).ok())
            .collect();

        Ok(positions.into_iter())
    }

    /// Loads every region of the folder.
    pub fn load_all(
        &mut self,
        diagnostics: &mut dyn Diagnostics,
    ) -> Result<BTreeMap<RegionPosition, Region>, io::Error> {
        let mut regions = BTreeMap::new();

        for position in self.iter_positions()? {
            let region = self.get_region(position, diagnostics)?;
            regions.insert(position, region);
        }

        Ok(regions)
    }
}

impl<'a> RegionProvider for FolderRegionProvider<'a> {
    fn get_region(
        &mut self,
        position: RegionPosition,
        diagnostics: &mut dyn Diagnostics,
    ) -> Result<Region, io::Error> {
        let region_path = self.folder_path.join(region_position_filename(position));

        Region::load_with(region_path, self.options, diagnostics)
    }
}

fn region_pos_from_filename(path: &Path) -> Result<RegionPosition, io::Error> {
    // we can use lossy because of the bound check later
    let filename = path.file_name().unwrap_or_default().to_string_lossy();
    let parts: Vec<_> = filename.split('.').collect();

    let (x, z) = parse_coords(parts).ok_or(io::ErrorKind::InvalidInput)?;

    Ok(RegionPosition::new(x, z))
}

pub(crate) fn region_position_filename(pos: RegionPosition) -> String {
    format!("r.{}.{}.mca", pos.x, pos.z)
}

fn parse_coords(parts: Vec<&str>) -> Option<(i32, i32)> {
    let incorrect_format = parts.len() != 4 || parts[0] != "r" || parts[3] != "mca";

    if incorrect_format {
        return None;
    }

    Some((i32::from_str(parts[1]).ok()?, i32::from_str(parts[2]).ok()?))
}
