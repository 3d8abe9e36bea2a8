//! DNS wildcard root detection.
//!
//! A domain is a wildcard root when a random, never-registered label under
//! it still resolves. Enumeration or fuzzing beneath such a root produces
//! names that resolve regardless of whether they exist, so they carry no
//! signal.
//!
//! Candidates are grouped by registrable domain and tested parents first.
//! Once a candidate is confirmed, its descendants in the candidate list are
//! neither tested nor reported. Only ancestors that are themselves
//! candidates can cause a skip: given `a.test.com` and `b.test.com` under a
//! `*.test.com` wildcard, both are reported, because `test.com` itself was
//! never in scope and must not be probed.

use crate::dns::cache::DnsCache;
use crate::dns::resolver::{resolve_cached, DnsResolver};
use crate::surface::hierarchy::{group_by_registrable, label_depth};
use crate::surface::ops::is_descendant;
use crate::types::Result;
use std::collections::HashSet;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};
use uuid::Uuid;

/// Build a single-use probe name under `domain`.
fn probe_name(domain: &str) -> String {
    format!("{}.{}", Uuid::new_v4().simple(), domain)
}

/// Return the candidates confirmed as wildcard roots.
///
/// Probe answers are stored in `cache` under the probe name, negatives
/// included. Names without a registrable domain are skipped. Once `cancel`
/// fires no further probes are sent and the roots confirmed so far are
/// returned.
pub async fn detect(
    cancel: &CancellationToken,
    domains: &[String],
    cache: &DnsCache,
    resolver: &dyn DnsResolver,
) -> Result<HashSet<String>> {
    let groups = group_by_registrable(domains, |domain, e| {
        debug!("Skipping wildcard test for {}: {}", domain, e);
        Ok(())
    })?;

    let mut roots: HashSet<String> = HashSet::new();
    let mut probes = 0usize;

    'groups: for mut group in groups {
        // Parents before children.
        group.sort_by_key(|domain| label_depth(domain));

        for domain in group {
            if roots.iter().any(|root| is_descendant(&domain, root)) {
                debug!("Skipping {}: under a confirmed wildcard", domain);
                continue;
            }

            let probe = probe_name(&domain);
            let addresses = tokio::select! {
                biased;
                _ = cancel.cancelled() => {
                    warn!("Wildcard detection cancelled after {} probes", probes);
                    break 'groups;
                }
                result = resolve_cached(resolver, cache, &probe) => result?,
            };
            probes += 1;

            if !addresses.is_empty() {
                info!("Wildcard DNS detected: *.{} -> {:?}", domain, addresses);
                roots.insert(domain);
            }
        }
    }

    debug!("Wildcard detection issued {} probes", probes);
    Ok(roots)
}
