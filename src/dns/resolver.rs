//! DNS resolution capability and its implementations.

use crate::dns::cache::DnsCache;
use crate::types::Result;
use async_trait::async_trait;
use futures::stream::{self, StreamExt, TryStreamExt};
use hickory_resolver::config::ResolverConfig;
use hickory_resolver::name_server::TokioConnectionProvider;
use hickory_resolver::TokioResolver;
use std::time::Duration;
use tokio_util::sync::CancellationToken;
use tracing::{debug, trace, warn};

/// Resolves a name to its addresses.
///
/// An empty list means the name has no records; errors are reserved for
/// failures to obtain an answer at all.
#[async_trait]
pub trait DnsResolver: Send + Sync {
    async fn resolve(&self, name: &str) -> Result<Vec<String>>;
}

/// Resolver backed by hickory's tokio resolver (A and AAAA records).
pub struct HickoryResolver {
    resolver: TokioResolver,
}

impl HickoryResolver {
    /// Create a resolver from the system configuration, falling back to
    /// public defaults when it cannot be read.
    pub fn new(timeout_secs: u64) -> Self {
        let mut builder = match TokioResolver::builder(TokioConnectionProvider::default()) {
            Ok(builder) => builder,
            Err(e) => {
                warn!("Failed to read system resolver config, using defaults: {}", e);
                TokioResolver::builder_with_config(
                    ResolverConfig::default(),
                    TokioConnectionProvider::default(),
                )
            }
        };
        builder.options_mut().timeout = Duration::from_secs(timeout_secs);

        Self {
            resolver: builder.build(),
        }
    }
}

#[async_trait]
impl DnsResolver for HickoryResolver {
    async fn resolve(&self, name: &str) -> Result<Vec<String>> {
        match self.resolver.lookup_ip(name).await {
            Ok(lookup) => Ok(lookup.iter().map(|ip| ip.to_string()).collect()),
            Err(e) if e.is_no_records_found() || e.is_nx_domain() => {
                trace!("No records for {}", name);
                Ok(Vec::new())
            }
            Err(e) => Err(e.into()),
        }
    }
}

/// Resolver that delegates to a plain function.
///
/// Handy for deterministic lookups in tests and for wiring in answers
/// produced elsewhere.
pub struct FnResolver<F> {
    lookup: F,
}

impl<F> FnResolver<F>
where
    F: Fn(&str) -> Result<Vec<String>> + Send + Sync,
{
    pub fn new(lookup: F) -> Self {
        Self { lookup }
    }
}

#[async_trait]
impl<F> DnsResolver for FnResolver<F>
where
    F: Fn(&str) -> Result<Vec<String>> + Send + Sync,
{
    async fn resolve(&self, name: &str) -> Result<Vec<String>> {
        (self.lookup)(name)
    }
}

/// Resolve `name`, consulting and filling the cache.
pub async fn resolve_cached(
    resolver: &dyn DnsResolver,
    cache: &DnsCache,
    name: &str,
) -> Result<Vec<String>> {
    if let Some(addresses) = cache.get(name) {
        trace!("Cache hit for {}", name);
        return Ok(addresses);
    }

    let addresses = resolver.resolve(name).await?;
    cache.set(name, addresses.clone());
    Ok(addresses)
}

/// Return the names that resolve to at least one address, in input order.
///
/// Up to `concurrency` lookups run at once. The first resolver error
/// aborts the whole call. Once `cancel` fires no new lookups start and the
/// names confirmed so far are returned.
pub async fn filter_active(
    cancel: &CancellationToken,
    names: &[String],
    resolver: &dyn DnsResolver,
    cache: &DnsCache,
    concurrency: usize,
) -> Result<Vec<String>> {
    let answers: Vec<(String, bool)> = stream::iter(names.iter())
        .map(|name| async move {
            let addresses = resolve_cached(resolver, cache, name).await?;
            Ok::<_, crate::types::SurfmapError>((name.clone(), !addresses.is_empty()))
        })
        .buffered(concurrency.max(1))
        .take_until(cancel.cancelled())
        .try_collect()
        .await?;

    let active: Vec<String> = answers
        .into_iter()
        .filter_map(|(name, resolves)| resolves.then_some(name))
        .collect();

    debug!("{}/{} names resolve", active.len(), names.len());
    Ok(active)
}
