//! surfmap - Continuous attack surface discovery.
//!
//! This library computes the externally reachable surface of a target by:
//! - Merging the configured scope with the surface found by earlier runs
//! - Extracting hosts and IPs from in-scope URLs
//! - Enumerating subdomains under the reduced set of root domains
//! - Detecting wildcard DNS roots so fuzzing only targets meaningful names
//! - Resolving permutations of known names and probing the result over HTTP
//!
//! # Example
//!
//! ```no_run
//! use std::path::Path;
//! use std::sync::Arc;
//! use surfmap::{
//!     Collaborators, CrtShEnumerator, HickoryResolver, KnownSurfaceFile, Pipeline,
//!     PipelineOptions, ReqwestProber, ScopeFile, WordlistPermuter,
//! };
//! use tokio_util::sync::CancellationToken;
//!
//! #[tokio::main]
//! async fn main() -> surfmap::Result<()> {
//!     let collaborators = Collaborators {
//!         scope: Arc::new(ScopeFile::new(Path::new("./"))),
//!         known_surface: Arc::new(KnownSurfaceFile::open(Path::new("./data"))?),
//!         enumerator: Arc::new(CrtShEnumerator::new(10, 1, 3)?),
//!         resolver: Arc::new(HickoryResolver::new(5)),
//!         permuter: Arc::new(WordlistPermuter::default()),
//!         prober: Arc::new(ReqwestProber::new(10, 50, "surfmap")?),
//!     };
//!
//!     let pipeline = Pipeline::new(collaborators, PipelineOptions::default());
//!     match pipeline.run(&CancellationToken::new()).await {
//!         Ok(report) => println!("Final surface: {}", report.surface.summary()),
//!         Err(partial) => eprintln!("{} (kept {})", partial, partial.surface.summary()),
//!     }
//!     Ok(())
//! }
//! ```

pub mod config;
pub mod discovery;
pub mod dns;
pub mod files;
pub mod notify;
pub mod pipeline;
pub mod probe;
pub mod surface;
pub mod types;

pub use config::{Commands, Config, RunConfig};
pub use discovery::{CrtShEnumerator, PermutationGenerator, SubdomainEnumerator, WordlistPermuter};
pub use dns::{DnsCache, DnsResolver, FnResolver, HickoryResolver};
pub use files::{KnownSurfaceFile, KnownSurfaceStore, ScopeFile, ScopeSource};
pub use notify::ConsoleOutput;
pub use pipeline::{Collaborators, Pipeline, PipelineOptions};
pub use probe::{HttpProber, ReqwestProber};
pub use surface::{insert_safe, Exclusions, Surface};
pub use types::{PartialRun, ProbeResult, Result, RunReport, Stage, SurfmapError};
