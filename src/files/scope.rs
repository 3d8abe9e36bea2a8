//! Scope file (`scope.yaml`) parsing and validation.

use crate::files::ScopeSource;
use crate::surface::validation::validate_surface;
use crate::surface::Surface;
use crate::types::{Result, SurfmapError};
use serde::Deserialize;
use std::path::{Path, PathBuf};
use tracing::debug;

pub const SCOPE_FILE_NAME: &str = "scope.yaml";

#[derive(Debug, Default, Deserialize)]
struct ScopeFileData {
    #[serde(default)]
    scope: Surface,
    #[serde(default)]
    exclusions: Surface,
}

/// The scope file inside a config folder.
#[derive(Debug, Clone)]
pub struct ScopeFile {
    path: PathBuf,
}

impl ScopeFile {
    pub fn new(config_folder: &Path) -> Self {
        Self {
            path: config_folder.join(SCOPE_FILE_NAME),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Read, parse and validate the scope file.
    pub fn parse(&self) -> Result<(Surface, Surface)> {
        let path = self.path.display();

        let content = std::fs::read_to_string(&self.path).map_err(|source| SurfmapError::Io {
            path: self.path.clone(),
            source,
        })?;

        // An empty document deserializes to unit, not to an empty mapping.
        let data: ScopeFileData = if content.trim().is_empty() {
            ScopeFileData::default()
        } else {
            serde_yaml::from_str(&content).map_err(|source| SurfmapError::Yaml {
                path: self.path.clone(),
                source,
            })?
        };

        if data.scope.is_empty() {
            return Err(SurfmapError::Config(format!(
                "Failed to parse scope file at {}: the scope cannot be empty",
                path
            )));
        }

        validate_surface(&data.scope).map_err(|e| {
            SurfmapError::Config(format!(
                "Failed to parse scope file at {}: In section 'scope': {}",
                path, e
            ))
        })?;
        validate_surface(&data.exclusions).map_err(|e| {
            SurfmapError::Config(format!(
                "Failed to parse scope file at {}: In section 'exclusions': {}",
                path, e
            ))
        })?;

        debug!(
            "Scope: {}, exclusions: {}",
            data.scope.summary(),
            data.exclusions.summary()
        );
        Ok((data.scope, data.exclusions))
    }
}

impl ScopeSource for ScopeFile {
    fn load(&self) -> Result<(Surface, Surface)> {
        self.parse()
    }
}
