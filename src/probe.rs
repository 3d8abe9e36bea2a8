//! Active HTTP probing of the discovered surface.

use crate::surface::ops::has_http_scheme;
use crate::surface::Surface;
use crate::types::{ProbeResult, Result};
use async_trait::async_trait;
use futures::stream::{self, StreamExt};
use governor::{Quota, RateLimiter};
use indicatif::{ProgressBar, ProgressStyle};
use reqwest::Client;
use std::net::IpAddr;
use std::num::NonZeroU32;
use std::sync::Arc;
use std::time::Duration;
use tokio_util::sync::CancellationToken;
use tracing::{debug, trace, warn};

/// Probes every element of a surface and reports one result per target.
///
/// Implementations must stop starting new probes once `cancel` fires and
/// return the results gathered so far.
#[async_trait]
pub trait HttpProber: Send + Sync {
    async fn probe(
        &self,
        cancel: &CancellationToken,
        surface: &Surface,
        concurrency: usize,
    ) -> Result<Vec<ProbeResult>>;
}

/// Prober issuing GET requests with reqwest.
pub struct ReqwestProber {
    client: Client,
    rate_limiter: Arc<RateLimiter<governor::state::NotKeyed, governor::state::InMemoryState, governor::clock::DefaultClock>>,
    show_progress: bool,
}

impl ReqwestProber {
    /// Create a new prober.
    pub fn new(timeout_secs: u64, rate_limit: u32, user_agent: &str) -> Result<Self> {
        let client = Client::builder()
            .timeout(Duration::from_secs(timeout_secs))
            .user_agent(user_agent)
            .redirect(reqwest::redirect::Policy::limited(5))
            .danger_accept_invalid_certs(true)
            .pool_max_idle_per_host(10)
            .pool_idle_timeout(Duration::from_secs(30))
            .build()?;

        let quota = Quota::per_second(NonZeroU32::new(rate_limit).unwrap_or(NonZeroU32::MIN));
        let rate_limiter = Arc::new(RateLimiter::direct(quota));

        Ok(Self {
            client,
            rate_limiter,
            show_progress: false,
        })
    }

    /// Show an indicatif progress bar while probing.
    pub fn with_progress(mut self, show: bool) -> Self {
        self.show_progress = show;
        self
    }

    /// Probe a single target, trying each candidate URL until one answers.
    async fn probe_one(&self, target: String) -> ProbeResult {
        let mut last_error = None;

        for url in candidate_urls(&target) {
            self.rate_limiter.until_ready().await;
            trace!("Probing {}", url);

            match self.client.get(&url).send().await {
                Ok(response) => {
                    debug!("{} -> {}", url, response.status());
                    return ProbeResult {
                        target,
                        url: Some(response.url().to_string()),
                        status_code: Some(response.status().as_u16()),
                        error: None,
                    };
                }
                Err(e) => {
                    trace!("Probe of {} failed: {}", url, e);
                    last_error = Some(e.to_string());
                }
            }
        }

        ProbeResult {
            target,
            url: None,
            status_code: None,
            error: last_error.or_else(|| Some("no probeable URL".to_string())),
        }
    }

    fn progress_bar(&self, total: u64) -> Option<ProgressBar> {
        if !self.show_progress {
            return None;
        }

        let pb = ProgressBar::new(total);
        if let Ok(style) = ProgressStyle::default_bar()
            .template("{spinner:.cyan} [{elapsed_precise}] [{bar:40.cyan/blue}] {pos}/{len} {msg}")
        {
            pb.set_style(style.progress_chars("#>-"));
        }
        pb.set_message("Probing");
        Some(pb)
    }
}

/// URLs to try for a surface element: URLs as given, bare hosts over
/// HTTPS then HTTP. IPv6 literals are bracketed; CIDR blocks are skipped.
pub fn candidate_urls(target: &str) -> Vec<String> {
    if has_http_scheme(target) {
        return vec![target.to_string()];
    }

    if target.contains('/') {
        // Either a CIDR block or a scheme-less URL with a path.
        let host = target.split('/').next().unwrap_or_default();
        if host.parse::<IpAddr>().is_ok() && target.split('/').nth(1).is_some_and(|p| p.parse::<u8>().is_ok()) {
            return Vec::new();
        }
        return vec![format!("https://{}", target), format!("http://{}", target)];
    }

    let host = match target.parse::<IpAddr>() {
        Ok(IpAddr::V6(addr)) => format!("[{}]", addr),
        _ => target.to_string(),
    };

    vec![format!("https://{}", host), format!("http://{}", host)]
}

#[async_trait]
impl HttpProber for ReqwestProber {
    async fn probe(
        &self,
        cancel: &CancellationToken,
        surface: &Surface,
        concurrency: usize,
    ) -> Result<Vec<ProbeResult>> {
        let targets = surface.targets();
        let total = targets.len();
        let pb = self.progress_bar(total as u64);

        let results: Vec<ProbeResult> = stream::iter(targets)
            .map(|target| async move { self.probe_one(target).await })
            .buffer_unordered(concurrency.max(1))
            .take_until(cancel.cancelled())
            .inspect(|_| {
                if let Some(ref pb) = pb {
                    pb.inc(1);
                }
            })
            .collect()
            .await;

        if let Some(pb) = pb {
            pb.finish_and_clear();
        }
        if results.len() < total {
            warn!("Probing cancelled after {}/{} targets", results.len(), total);
        }

        Ok(results)
    }
}
