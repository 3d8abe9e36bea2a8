//! Core types and errors for the surface discovery pipeline.

use crate::surface::Surface;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::PathBuf;
use thiserror::Error;

/// Errors that can occur while discovering the attack surface.
#[derive(Error, Debug)]
pub enum SurfmapError {
    #[error("Validation error: {0}")]
    Validation(String),

    #[error("{stage} failed: {source}")]
    Collaborator {
        stage: Stage,
        #[source]
        source: Box<SurfmapError>,
    },

    #[error("Run cancelled during {0}")]
    Cancelled(Stage),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("HTTP request failed: {0}")]
    Http(#[from] reqwest::Error),

    #[error("DNS resolution failed: {0}")]
    Resolve(#[from] hickory_resolver::ResolveError),

    #[error("JSON parse error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Failed to parse {}: Invalid Syntax: {source}", .path.display())]
    Yaml {
        path: PathBuf,
        #[source]
        source: serde_yaml::Error,
    },

    #[error("Failed to access {}: {source}", .path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Enumeration error: {0}")]
    Enumeration(String),
}

impl SurfmapError {
    /// Wrap a collaborator error with the stage it surfaced in.
    pub fn in_stage(self, stage: Stage) -> Self {
        match self {
            // Validation and cancellation already carry their meaning.
            e @ (SurfmapError::Validation(_)
            | SurfmapError::Cancelled(_)
            | SurfmapError::Collaborator { .. }) => e,
            other => SurfmapError::Collaborator {
                stage,
                source: Box::new(other),
            },
        }
    }
}

pub type Result<T> = std::result::Result<T, SurfmapError>;

/// The ordered stages of a discovery run.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Stage {
    Seed,
    UrlExpansion,
    DomainExpansion,
    WildcardClassification,
    FuzzyExpansion,
    ActiveProbing,
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Stage::Seed => "seed",
            Stage::UrlExpansion => "url expansion",
            Stage::DomainExpansion => "domain expansion",
            Stage::WildcardClassification => "wildcard classification",
            Stage::FuzzyExpansion => "fuzzy expansion",
            Stage::ActiveProbing => "active probing",
        };
        f.write_str(name)
    }
}

/// Result of probing a single target over HTTP.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct ProbeResult {
    /// The surface element that was probed (URL, domain or IP).
    pub target: String,
    /// Final URL that answered, if any.
    pub url: Option<String>,
    /// HTTP status code, when a response was received.
    pub status_code: Option<u16>,
    /// Error message, when no response was received.
    pub error: Option<String>,
}

/// Outcome of a complete discovery run.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RunReport {
    /// Final in-scope surface.
    pub surface: Surface,
    /// Domains confirmed as DNS wildcard roots, sorted.
    pub wildcards: Vec<String>,
    /// Per-target probe results (empty when probing was skipped).
    pub probes: Vec<ProbeResult>,
    /// Number of distinct names resolved during the run.
    pub dns_cache_entries: usize,
    /// Run duration in seconds.
    pub duration_secs: f64,
}

/// A run that stopped early: the surface merged so far plus the error.
#[derive(Debug, Error)]
#[error("run halted during {stage}: {error}")]
pub struct PartialRun {
    pub stage: Stage,
    pub surface: Surface,
    #[source]
    pub error: SurfmapError,
}

impl PartialRun {
    pub fn new(stage: Stage, surface: Surface, error: SurfmapError) -> Self {
        Self {
            stage,
            surface,
            error: error.in_stage(stage),
        }
    }
}
