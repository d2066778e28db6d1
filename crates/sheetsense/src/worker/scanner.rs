//! Startup scan of the watched folder.

use std::path::{Path, PathBuf};

use log::{debug, info};
use walkdir::WalkDir;

use crate::db::{analysis_repo, Database};
use crate::raster::DocumentKind;
use crate::worker::descriptor::{AnalysisStatus, DatasheetDescriptor};

pub struct DirectoryScanner {
    watch_directory: PathBuf,
}

impl DirectoryScanner {
    pub fn new<P: AsRef<Path>>(watch_directory: P) -> Self {
        Self {
            watch_directory: watch_directory.as_ref().to_path_buf(),
        }
    }

    pub fn watch_directory(&self) -> &Path {
        &self.watch_directory
    }

    /// Enumerates recognized files directly in the watched folder and
    /// builds a descriptor per file. Files that already have a store record
    /// start as Finish, everything else as Ready.
    pub fn scan(&self, db: &Database) -> crate::error::Result<Vec<DatasheetDescriptor>> {
        let mut descriptors = Vec::new();

        for entry in WalkDir::new(&self.watch_directory)
            .min_depth(1)
            .max_depth(1) // Only scan top level, not the results subfolder
            .into_iter()
            .filter_map(|e| e.ok())
        {
            let path = entry.path();

            if path.is_dir() {
                continue;
            }

            if DocumentKind::from_path(path).is_none() {
                continue;
            }

            let Some(filename) = path.file_name().and_then(|n| n.to_str()) else {
                continue;
            };

            debug!("Found datasheet: {}", path.display());
            let mut descriptor = DatasheetDescriptor::new(filename, &self.watch_directory);
            if analysis_repo::find_by_filename(db, filename)?.is_some() {
                descriptor.status = AnalysisStatus::Finish;
            }
            descriptors.push(descriptor);
        }

        info!(
            "Scanned {} datasheet(s) in {}",
            descriptors.len(),
            self.watch_directory.display()
        );
        Ok(descriptors)
    }
}
