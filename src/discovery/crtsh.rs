//! Certificate transparency subdomain enumeration via crt.sh.

use crate::discovery::SubdomainEnumerator;
use crate::surface::ops::is_descendant;
use crate::types::{Result, SurfmapError};
use async_trait::async_trait;
use governor::{Quota, RateLimiter};
use reqwest::Client;
use serde::Deserialize;
use std::collections::HashSet;
use std::num::NonZeroU32;
use std::sync::Arc;
use std::time::Duration;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, trace, warn};

/// A single crt.sh JSON row; `name_value` holds newline-separated names.
#[derive(Debug, Deserialize)]
struct CrtShEntry {
    name_value: String,
}

/// Subdomain enumerator backed by the crt.sh certificate transparency search.
pub struct CrtShEnumerator {
    client: Client,
    rate_limiter: Arc<RateLimiter<governor::state::NotKeyed, governor::state::InMemoryState, governor::clock::DefaultClock>>,
    base_url: String,
    max_retries: u32,
}

impl CrtShEnumerator {
    /// Create a new crt.sh enumerator.
    pub fn new(timeout_secs: u64, rate_limit: u32, max_retries: u32) -> Result<Self> {
        let client = Client::builder()
            .timeout(Duration::from_secs(timeout_secs))
            .user_agent("surfmap/0.1")
            .pool_max_idle_per_host(2)
            .pool_idle_timeout(Duration::from_secs(30))
            .build()?;

        // crt.sh throttles aggressively; never exceed a couple of requests per second.
        let per_second = NonZeroU32::new(rate_limit.min(2)).unwrap_or(NonZeroU32::MIN);
        let rate_limiter = Arc::new(RateLimiter::direct(Quota::per_second(per_second)));

        Ok(Self {
            client,
            rate_limiter,
            base_url: "https://crt.sh".to_string(),
            max_retries,
        })
    }

    /// Point the enumerator at a different crt.sh-compatible endpoint.
    pub fn with_base_url(mut self, base_url: &str) -> Self {
        self.base_url = base_url.trim_end_matches('/').to_string();
        self
    }

    /// Query crt.sh for every certificate name under `root`, with retries.
    async fn query(&self, root: &str) -> Result<Vec<String>> {
        let url = format!(
            "{}/?q={}&output=json",
            self.base_url,
            urlencoding::encode(&format!("%.{}", root))
        );

        let mut retries = 0;
        loop {
            self.rate_limiter.until_ready().await;
            trace!("Querying crt.sh: {}", url);

            match self.do_query(&url).await {
                Ok(entries) => return Ok(names_under_root(&entries, root)),
                Err(e) => {
                    // 4xx answers won't change on retry.
                    let retryable = match &e {
                        SurfmapError::Http(http_err) => http_err
                            .status()
                            .map(|status| !status.is_client_error())
                            .unwrap_or(true),
                        _ => false,
                    };

                    if !retryable || retries >= self.max_retries {
                        return Err(SurfmapError::Enumeration(format!(
                            "crt.sh query for {} failed: {}",
                            root, e
                        )));
                    }

                    retries += 1;
                    debug!("Retry {} for crt.sh query {}: {}", retries, root, e);
                    tokio::time::sleep(Duration::from_millis(500 * retries as u64)).await;
                }
            }
        }
    }

    async fn do_query(&self, url: &str) -> Result<Vec<CrtShEntry>> {
        let response = self.client.get(url).send().await?.error_for_status()?;
        let body = response.text().await?;

        // crt.sh answers an empty body instead of `[]` when nothing matches.
        if body.trim().is_empty() {
            return Ok(Vec::new());
        }

        Ok(serde_json::from_str(&body)?)
    }
}

/// Clean certificate names and keep those equal to or under `root`.
fn names_under_root(entries: &[CrtShEntry], root: &str) -> Vec<String> {
    let root = root.to_lowercase();
    let mut seen = HashSet::new();
    let mut names = Vec::new();

    for entry in entries {
        for name in entry.name_value.lines() {
            let cleaned = name.trim().trim_start_matches("*.").to_lowercase();
            if cleaned.is_empty() || cleaned.contains('*') || cleaned.contains('@') {
                continue;
            }
            if (cleaned == root || is_descendant(&cleaned, &root)) && seen.insert(cleaned.clone()) {
                names.push(cleaned);
            }
        }
    }

    names
}

#[async_trait]
impl SubdomainEnumerator for CrtShEnumerator {
    async fn enumerate(&self, cancel: &CancellationToken, roots: &[String]) -> Result<Vec<String>> {
        let mut seen = HashSet::new();
        let mut discovered = Vec::new();

        for root in roots {
            let names = tokio::select! {
                biased;
                _ = cancel.cancelled() => {
                    warn!("Enumeration cancelled, keeping {} names found so far", discovered.len());
                    break;
                }
                result = self.query(root) => result?,
            };

            info!("crt.sh: {} names under {}", names.len(), root);
            for name in names {
                if seen.insert(name.clone()) {
                    discovered.push(name);
                }
            }
        }

        Ok(discovered)
    }
}
