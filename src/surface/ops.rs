//! Set and string operators over surface elements.

use std::collections::HashSet;
use url::{Host, Url};

/// Check whether `child` is a strict dot-suffix descendant of `parent`.
pub fn is_descendant(child: &str, parent: &str) -> bool {
    child.len() > parent.len()
        && child.ends_with(parent)
        && child.as_bytes()[child.len() - parent.len() - 1] == b'.'
}

/// Whether `raw` starts with `http://` or `https://`, ignoring case.
pub fn has_http_scheme(raw: &str) -> bool {
    ["http://", "https://"].iter().any(|scheme| {
        raw.get(..scheme.len())
            .is_some_and(|prefix| prefix.eq_ignore_ascii_case(scheme))
    })
}

/// Prefix `https://` unless `raw` already carries an http(s) scheme.
pub fn with_default_scheme(raw: &str) -> String {
    if has_http_scheme(raw) {
        raw.to_string()
    } else {
        format!("https://{}", raw)
    }
}

/// Parse a URL, assuming `https://` when no http(s) scheme is present.
fn parse_host(raw: &str) -> Option<Host<String>> {
    let parsable = with_default_scheme(raw);

    let parsed = Url::parse(&parsable).ok()?;
    parsed.host().map(|h| h.to_owned())
}

/// Extract the unique domain names referenced by `urls`, in first-seen order.
///
/// IP hosts are left to [`extract_ips`]; unparseable URLs are skipped.
pub fn extract_hosts(urls: &[String]) -> Vec<String> {
    let mut seen = HashSet::new();
    let mut hosts = Vec::new();

    for raw in urls {
        if let Some(Host::Domain(domain)) = parse_host(raw) {
            if !domain.is_empty() && seen.insert(domain.clone()) {
                hosts.push(domain);
            }
        }
    }

    hosts
}

/// Extract the unique IP literals referenced by `urls`, in first-seen order.
///
/// IPv6 hosts are returned without brackets.
pub fn extract_ips(urls: &[String]) -> Vec<String> {
    let mut seen = HashSet::new();
    let mut ips = Vec::new();

    for raw in urls {
        let ip = match parse_host(raw) {
            Some(Host::Ipv4(addr)) => addr.to_string(),
            Some(Host::Ipv6(addr)) => addr.to_string(),
            _ => continue,
        };
        if seen.insert(ip.clone()) {
            ips.push(ip);
        }
    }

    ips
}

/// `values \ to_remove` by exact string membership, keeping order.
pub fn subtract(values: &[String], to_remove: &[String]) -> Vec<String> {
    let remove: HashSet<&str> = to_remove.iter().map(String::as_str).collect();
    values
        .iter()
        .filter(|item| !remove.contains(item.as_str()))
        .cloned()
        .collect()
}

/// Domains that equal, or descend from, at least one of `roots`.
pub fn select_descendants<S: AsRef<str>>(domains: &[String], roots: &[S]) -> Vec<String> {
    domains
        .iter()
        .filter(|domain| {
            roots.iter().any(|root| {
                let root = root.as_ref();
                domain.as_str() == root || is_descendant(domain, root)
            })
        })
        .cloned()
        .collect()
}
