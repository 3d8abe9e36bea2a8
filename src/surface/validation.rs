//! Syntax validation for user-supplied surface elements.

use crate::surface::ops::with_default_scheme;
use crate::surface::Surface;
use crate::types::{Result, SurfmapError};
use regex::Regex;
use std::net::IpAddr;
use std::sync::OnceLock;
use url::Url;

fn domain_regex() -> Option<&'static Regex> {
    static DOMAIN_RE: OnceLock<Option<Regex>> = OnceLock::new();
    DOMAIN_RE
        .get_or_init(|| Regex::new(r"^[a-zA-Z0-9\-]+\.[a-zA-Z0-9\-\.]+$").ok())
        .as_ref()
}

/// Validate a bare domain name.
pub fn validate_domain(domain: &str) -> Result<()> {
    if domain.is_empty() {
        return Err(SurfmapError::Validation("Domain cannot be empty".to_string()));
    }

    let domain = domain.trim();

    if domain.len() > 253 {
        return Err(SurfmapError::Validation(format!(
            "domain '{}' exceeds maximum length of 253 characters",
            domain
        )));
    }

    if domain.contains("://") {
        return Err(SurfmapError::Validation(format!(
            "domain '{}' contains a scheme; this is probably a URL, not a domain",
            domain
        )));
    }

    if !domain_regex().is_some_and(|re| re.is_match(domain)) {
        return Err(SurfmapError::Validation(format!(
            "domain '{}' has invalid format",
            domain
        )));
    }

    Ok(())
}

/// Validate an IP literal or a CIDR block.
pub fn validate_ip(ip: &str) -> Result<()> {
    if ip.is_empty() {
        return Err(SurfmapError::Validation("IP cannot be empty".to_string()));
    }

    let ip = ip.trim();

    if let Some((addr, prefix)) = ip.split_once('/') {
        let addr: IpAddr = addr
            .parse()
            .map_err(|_| SurfmapError::Validation(format!("invalid CIDR notation '{}'", ip)))?;
        let max_prefix = if addr.is_ipv4() { 32 } else { 128 };
        match prefix.parse::<u8>() {
            Ok(p) if p <= max_prefix => return Ok(()),
            _ => {
                return Err(SurfmapError::Validation(format!(
                    "invalid CIDR notation '{}'",
                    ip
                )))
            }
        }
    }

    ip.parse::<IpAddr>()
        .map(|_| ())
        .map_err(|_| SurfmapError::Validation(format!("invalid IP address '{}'", ip)))
}

/// Validate an endpoint URL; a missing scheme is treated as `https://`.
pub fn validate_url(endpoint: &str) -> Result<()> {
    if endpoint.is_empty() {
        return Err(SurfmapError::Validation("endpoint cannot be empty".to_string()));
    }

    let endpoint = endpoint.trim();
    let parsable = with_default_scheme(endpoint);

    let parsed = Url::parse(&parsable).map_err(|e| {
        SurfmapError::Validation(format!("invalid endpoint URL '{}': {}", parsable, e))
    })?;

    match parsed.host_str() {
        Some(host) if !host.is_empty() => Ok(()),
        _ => Err(SurfmapError::Validation(format!(
            "endpoint '{}' must have a host",
            parsable
        ))),
    }
}

/// Validate every element of a surface, naming the offending index.
pub fn validate_surface(surface: &Surface) -> Result<()> {
    for (i, domain) in surface.domains.iter().enumerate() {
        validate_domain(domain).map_err(|e| {
            SurfmapError::Validation(format!("Invalid domain at index {}: {}", i, inner(e)))
        })?;
    }

    for (i, ip) in surface.ips.iter().enumerate() {
        validate_ip(ip).map_err(|e| {
            SurfmapError::Validation(format!("Invalid IP at index {}: {}", i, inner(e)))
        })?;
    }

    for (i, url) in surface.urls.iter().enumerate() {
        validate_url(url).map_err(|e| {
            SurfmapError::Validation(format!("Invalid url at index {}: {}", i, inner(e)))
        })?;
    }

    Ok(())
}

fn inner(e: SurfmapError) -> String {
    match e {
        SurfmapError::Validation(msg) => msg,
        other => other.to_string(),
    }
}
