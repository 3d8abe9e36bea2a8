//! Known-surface data file (`discovered-surface.yaml`).

use crate::files::KnownSurfaceStore;
use crate::surface::validation::validate_surface;
use crate::surface::Surface;
use crate::types::{Result, SurfmapError};
use serde::Deserialize;
use std::path::{Path, PathBuf};
use tracing::{info, warn};

pub const KNOWN_SURFACE_FILE_NAME: &str = "discovered-surface.yaml";
const DATA_FILE_HEADER: &str = "## This is a program-generated data file. Do not edit. ##\n";

#[derive(Debug, Default, Deserialize)]
struct KnownSurfaceFileData {
    #[serde(default)]
    known_surface: Surface,
}

/// The known-surface file inside a data folder.
#[derive(Debug, Clone)]
pub struct KnownSurfaceFile {
    path: PathBuf,
    created: bool,
}

impl KnownSurfaceFile {
    /// Open the data file, creating it with only a header when missing.
    ///
    /// The data folder itself must already exist.
    pub fn open(data_folder: &Path) -> Result<Self> {
        if !data_folder.is_dir() {
            return Err(SurfmapError::Config(format!(
                "data directory does not exist: {}",
                data_folder.display()
            )));
        }

        let path = data_folder.join(KNOWN_SURFACE_FILE_NAME);
        let created = !path.exists();
        if created {
            std::fs::write(&path, DATA_FILE_HEADER).map_err(|source| SurfmapError::Io {
                path: path.clone(),
                source,
            })?;
            warn!(
                "Known-surface file was missing and has been created at {}. \
                 If this is not the first execution, make sure the data folder is being saved properly.",
                path.display()
            );
        }

        Ok(Self { path, created })
    }

    /// Whether `open` had to create the file.
    pub fn was_created(&self) -> bool {
        self.created
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Read, parse and validate the known surface.
    pub fn parse(&self) -> Result<Surface> {
        let path = self.path.display();

        let content = std::fs::read_to_string(&self.path).map_err(|source| SurfmapError::Io {
            path: self.path.clone(),
            source,
        })?;

        // A header-only file is a comment-only YAML document.
        let data: Option<KnownSurfaceFileData> =
            serde_yaml::from_str(&content).map_err(|source| SurfmapError::Yaml {
                path: self.path.clone(),
                source,
            })?;
        let surface = data.unwrap_or_default().known_surface;

        validate_surface(&surface).map_err(|e| {
            SurfmapError::Config(format!(
                "Failed to parse known-surface file at {}: {}",
                path, e
            ))
        })?;

        info!("Known surface elements discovered in the past: {}", surface.summary());
        Ok(surface)
    }
}

impl KnownSurfaceStore for KnownSurfaceFile {
    fn load(&self) -> Result<Surface> {
        self.parse()
    }
}
