//! Domain hierarchy helpers: registrable-domain grouping and redundant
//! subdomain reduction.

use crate::surface::ops::is_descendant;
use crate::types::{Result, SurfmapError};
use std::collections::{HashMap, HashSet};

/// Return the registrable domain (eTLD+1) of `domain`.
///
/// Fails for empty labels, leading or trailing dots, and names that are a
/// public suffix themselves.
pub fn registrable_domain(domain: &str) -> Result<String> {
    let lower = domain.to_lowercase();

    if lower.is_empty() || lower.split('.').any(|label| label.is_empty()) {
        return Err(SurfmapError::Validation(format!(
            "domain '{}' has an empty label",
            domain
        )));
    }

    match psl::domain_str(&lower) {
        Some(registrable) => Ok(registrable.to_string()),
        None => Err(SurfmapError::Validation(format!(
            "cannot derive a registrable domain from '{}'",
            domain
        ))),
    }
}

/// Number of dot-separated labels.
pub fn label_depth(domain: &str) -> usize {
    domain.split('.').count()
}

/// Group lowercased domains by registrable domain, keeping first-seen order
/// both for groups and within a group. Duplicates are dropped.
pub(crate) fn group_by_registrable<'a, I, F>(domains: I, mut on_error: F) -> Result<Vec<Vec<String>>>
where
    I: IntoIterator<Item = &'a String>,
    F: FnMut(&str, SurfmapError) -> Result<()>,
{
    let mut groups: HashMap<String, Vec<String>> = HashMap::new();
    let mut order: Vec<String> = Vec::new();
    let mut seen: HashSet<String> = HashSet::new();

    for domain in domains {
        let lower = domain.to_lowercase();
        if !seen.insert(lower.clone()) {
            continue;
        }

        let base = match registrable_domain(&lower) {
            Ok(base) => base,
            Err(e) => {
                on_error(domain, e)?;
                continue;
            }
        };

        let entry = groups.entry(base.clone()).or_default();
        if entry.is_empty() {
            order.push(base);
        }
        entry.push(lower);
    }

    Ok(order
        .into_iter()
        .filter_map(|key| groups.remove(&key))
        .collect())
}

/// Collapse a domain list to the shallowest names of each hierarchy.
///
/// `[a.sub.example.com, sub.example.com, test.com]` becomes
/// `[sub.example.com, test.com]`: enumerating a kept ancestor covers its
/// descendants. Any name the public suffix list cannot classify fails the
/// whole call.
pub fn reduce(domains: &[String]) -> Result<Vec<String>> {
    let groups = group_by_registrable(domains, |domain, e| {
        Err(SurfmapError::Validation(format!(
            "cannot reduce domain '{}': {}",
            domain, e
        )))
    })?;

    let mut result = Vec::new();

    for mut group in groups {
        // Deepest first; every later entry is at most as deep.
        group.sort_by(|a, b| label_depth(b).cmp(&label_depth(a)));

        for (i, domain) in group.iter().enumerate() {
            let has_ancestor = group[i + 1..]
                .iter()
                .any(|candidate| is_descendant(domain, candidate));
            if !has_ancestor {
                result.push(domain.clone());
            }
        }
    }

    Ok(result)
}
