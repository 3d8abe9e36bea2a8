//! File-backed scope and known-surface sources.
//!
//! - `scope.yaml` in the config folder: the allowed surface plus exclusions
//! - `discovered-surface.yaml` in the data folder: surface found by earlier runs

pub mod known_surface;
pub mod scope;

pub use known_surface::KnownSurfaceFile;
pub use scope::ScopeFile;

use crate::surface::Surface;
use crate::types::Result;

/// Supplies the configured scope and its exclusions.
pub trait ScopeSource: Send + Sync {
    /// Returns `(scope, exclusions)`.
    fn load(&self) -> Result<(Surface, Surface)>;
}

/// Supplies the surface discovered by previous runs. Read only.
pub trait KnownSurfaceStore: Send + Sync {
    fn load(&self) -> Result<Surface>;
}
