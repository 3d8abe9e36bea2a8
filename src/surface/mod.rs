//! Attack surface model.
//!
//! A [`Surface`] is the ordered, duplicate-free set of domains, IPs and URLs
//! belonging to a target. [`Exclusions`] carve elements out of it, and
//! [`insert_safe`] is the only way the pipeline grows a surface.

pub mod hierarchy;
pub mod ops;
pub mod validation;

pub use hierarchy::{reduce, registrable_domain};
pub use ops::{extract_hosts, extract_ips, is_descendant, select_descendants, subtract};

use serde::{Deserialize, Serialize};
use std::collections::HashSet;

/// Domains, IP literals/CIDR blocks and URLs, each in first-seen order.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct Surface {
    #[serde(default)]
    pub domains: Vec<String>,
    #[serde(default)]
    pub ips: Vec<String>,
    #[serde(default)]
    pub urls: Vec<String>,
}

impl Surface {
    pub fn new() -> Self {
        Self::default()
    }

    /// Total number of entries across all three categories.
    pub fn len(&self) -> usize {
        self.domains.len() + self.ips.len() + self.urls.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Every element as a probe target: URLs, then domains, then IPs.
    pub fn targets(&self) -> Vec<String> {
        self.urls
            .iter()
            .chain(self.domains.iter())
            .chain(self.ips.iter())
            .cloned()
            .collect()
    }

    /// One-line count summary for logs.
    pub fn summary(&self) -> String {
        format!(
            "Domains[{}], IPs[{}], URLs[{}]",
            self.domains.len(),
            self.ips.len(),
            self.urls.len()
        )
    }
}

fn normalize_domain(domain: &str) -> String {
    domain.to_lowercase()
}

fn normalize_url(url: &str) -> String {
    url.to_lowercase()
}

/// Elements explicitly carved out of scope.
///
/// Domains and URLs match case-insensitively. IPs match as raw strings:
/// an excluded CIDR block does not exclude the addresses it contains.
#[derive(Debug, Clone, Default)]
pub struct Exclusions {
    domains: HashSet<String>,
    ips: HashSet<String>,
    urls: HashSet<String>,
}

impl Exclusions {
    /// Build exclusion sets from the exclusion section of a scope.
    pub fn from_surface(surface: &Surface) -> Self {
        Self {
            domains: surface.domains.iter().map(|d| normalize_domain(d)).collect(),
            ips: surface.ips.iter().cloned().collect(),
            urls: surface.urls.iter().map(|u| normalize_url(u)).collect(),
        }
    }

    pub fn contains_domain(&self, domain: &str) -> bool {
        self.domains.contains(&normalize_domain(domain))
    }

    pub fn contains_ip(&self, ip: &str) -> bool {
        self.ips.contains(ip)
    }

    pub fn contains_url(&self, url: &str) -> bool {
        self.urls.contains(&normalize_url(url))
    }

    /// Check a value against all three exclusion sets.
    pub fn contains(&self, value: &str) -> bool {
        self.contains_domain(value) || self.contains_ip(value) || self.contains_url(value)
    }

    pub fn len(&self) -> usize {
        self.domains.len() + self.ips.len() + self.urls.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

fn insert_safe_strings<F>(source: &[String], is_excluded: F, target: &mut Vec<String>)
where
    F: Fn(&str) -> bool,
{
    let mut existing: HashSet<String> = target.iter().cloned().collect();

    for value in source {
        if is_excluded(value) || existing.contains(value) {
            continue;
        }
        existing.insert(value.clone());
        target.push(value.clone());
    }
}

/// Merge `source` into `target`, skipping excluded and already present values.
///
/// Categories are merged independently and keep first-seen order. Applying
/// the same source twice leaves the target unchanged the second time.
pub fn insert_safe(source: &Surface, exclusions: &Exclusions, target: &mut Surface) {
    insert_safe_strings(&source.domains, |d| exclusions.contains_domain(d), &mut target.domains);
    insert_safe_strings(&source.ips, |ip| exclusions.contains_ip(ip), &mut target.ips);
    insert_safe_strings(&source.urls, |u| exclusions.contains_url(u), &mut target.urls);
}
