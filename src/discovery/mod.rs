//! Surface expansion collaborators.
//!
//! This module handles growing the set of in-scope names from:
//! - Subdomain enumeration (certificate transparency via crt.sh)
//! - Name permutation (wordlist-driven fuzzing of known names)

pub mod crtsh;
pub mod permute;

pub use crtsh::CrtShEnumerator;
pub use permute::WordlistPermuter;

use crate::types::Result;
use async_trait::async_trait;
use tokio_util::sync::CancellationToken;

/// Discovers subdomains beneath a list of root domains.
///
/// Implementations may run for a long time and must return promptly once
/// `cancel` fires, keeping whatever they already found.
#[async_trait]
pub trait SubdomainEnumerator: Send + Sync {
    async fn enumerate(&self, cancel: &CancellationToken, roots: &[String]) -> Result<Vec<String>>;
}

/// Generates plausible, not yet verified, names from known ones.
#[async_trait]
pub trait PermutationGenerator: Send + Sync {
    async fn generate(&self, seeds: &[String]) -> Result<Vec<String>>;
}
