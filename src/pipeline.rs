//! Pipeline orchestrating every discovery stage.

use crate::discovery::{PermutationGenerator, SubdomainEnumerator};
use crate::dns::{filter_active, wildcard, DnsCache, DnsResolver};
use crate::files::{KnownSurfaceStore, ScopeSource};
use crate::notify::ConsoleOutput;
use crate::probe::HttpProber;
use crate::surface::{
    extract_hosts, extract_ips, insert_safe, reduce, select_descendants, subtract, Exclusions,
    Surface,
};
use crate::types::{PartialRun, ProbeResult, RunReport, Stage, SurfmapError};
use std::collections::HashSet;
use std::sync::Arc;
use std::time::Instant;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info};

type StageResult<T> = std::result::Result<T, PartialRun>;

/// Tuning knobs for a run.
#[derive(Debug, Clone)]
pub struct PipelineOptions {
    /// Concurrent HTTP probes.
    pub probe_concurrency: usize,
    /// Concurrent DNS lookups while validating fuzzed names.
    pub resolve_concurrency: usize,
    /// Stop after fuzzy expansion.
    pub skip_probe: bool,
}

impl Default for PipelineOptions {
    fn default() -> Self {
        Self {
            probe_concurrency: 50,
            resolve_concurrency: 20,
            skip_probe: false,
        }
    }
}

/// The external systems a run talks to.
#[derive(Clone)]
pub struct Collaborators {
    pub scope: Arc<dyn ScopeSource>,
    pub known_surface: Arc<dyn KnownSurfaceStore>,
    pub enumerator: Arc<dyn SubdomainEnumerator>,
    pub resolver: Arc<dyn DnsResolver>,
    pub permuter: Arc<dyn PermutationGenerator>,
    pub prober: Arc<dyn HttpProber>,
}

/// Runs the six discovery stages in order over one working surface.
///
/// Any stage failure halts the run and hands back the surface merged so far.
pub struct Pipeline {
    collaborators: Collaborators,
    options: PipelineOptions,
    console: Option<ConsoleOutput>,
}

/// Lowercase every domain so case variants merge and compare as one name.
fn lowercase_domains(mut surface: Surface) -> Surface {
    for domain in surface.domains.iter_mut() {
        *domain = domain.to_lowercase();
    }
    surface
}

/// Return the surface untouched unless `cancel` fired.
fn checkpoint(cancel: &CancellationToken, stage: Stage, surface: Surface) -> StageResult<Surface> {
    if cancel.is_cancelled() {
        info!("Cancellation requested, stopping at {}", stage);
        return Err(PartialRun::new(stage, surface, SurfmapError::Cancelled(stage)));
    }
    Ok(surface)
}

impl Pipeline {
    pub fn new(collaborators: Collaborators, options: PipelineOptions) -> Self {
        Self {
            collaborators,
            options,
            console: None,
        }
    }

    /// Report stage summaries on the console.
    pub fn with_console(mut self, console: ConsoleOutput) -> Self {
        self.console = Some(console);
        self
    }

    fn report_stage(&self, stage: Stage, surface: &Surface) {
        info!("Surface after {}: {}", stage, surface.summary());
        if let Some(ref console) = self.console {
            console.print_stage(stage, surface);
        }
    }

    /// Execute a full run.
    pub async fn run(&self, cancel: &CancellationToken) -> StageResult<RunReport> {
        let start_time = Instant::now();
        // Answers are only trusted within a single run.
        let cache = DnsCache::new();

        let surface = checkpoint(cancel, Stage::Seed, Surface::new())?;
        let (surface, exclusions) = self.seed(surface)?;
        self.report_stage(Stage::Seed, &surface);

        let surface = checkpoint(cancel, Stage::UrlExpansion, surface)?;
        let surface = self.expand_urls(surface, &exclusions);
        self.report_stage(Stage::UrlExpansion, &surface);

        let surface = checkpoint(cancel, Stage::DomainExpansion, surface)?;
        let surface = self.expand_domains(cancel, surface, &exclusions).await?;
        self.report_stage(Stage::DomainExpansion, &surface);

        let surface = checkpoint(cancel, Stage::WildcardClassification, surface)?;
        let (surface, wildcards) = self.classify_wildcards(cancel, surface, &cache).await?;
        if let Some(ref console) = self.console {
            console.print_wildcards(&wildcards);
        }

        let surface = checkpoint(cancel, Stage::FuzzyExpansion, surface)?;
        let surface = self
            .expand_fuzzy(cancel, surface, &exclusions, &wildcards, &cache)
            .await?;
        self.report_stage(Stage::FuzzyExpansion, &surface);

        let surface = checkpoint(cancel, Stage::ActiveProbing, surface)?;
        let (surface, probes) = self.probe(cancel, surface).await?;

        Ok(RunReport {
            surface,
            wildcards,
            probes,
            dns_cache_entries: cache.len(),
            duration_secs: start_time.elapsed().as_secs_f64(),
        })
    }

    /// Merge scope then known surface into the empty working surface.
    fn seed(&self, mut surface: Surface) -> StageResult<(Surface, Exclusions)> {
        let stage = Stage::Seed;

        let (scope, excluded) = match self.collaborators.scope.load() {
            Ok(loaded) => loaded,
            Err(e) => return Err(PartialRun::new(stage, surface, e)),
        };
        let known = match self.collaborators.known_surface.load() {
            Ok(known) => known,
            Err(e) => return Err(PartialRun::new(stage, surface, e)),
        };

        let exclusions = Exclusions::from_surface(&excluded);
        debug!("Loaded {} exclusions", exclusions.len());

        insert_safe(&lowercase_domains(scope), &exclusions, &mut surface);
        insert_safe(&lowercase_domains(known), &exclusions, &mut surface);
        Ok((surface, exclusions))
    }

    /// Pull hosts and IPs out of in-scope URLs.
    fn expand_urls(&self, mut surface: Surface, exclusions: &Exclusions) -> Surface {
        let found = Surface {
            domains: extract_hosts(&surface.urls),
            ips: extract_ips(&surface.urls),
            urls: Vec::new(),
        };
        debug!("URLs yielded {}", found.summary());

        insert_safe(&found, exclusions, &mut surface);
        surface
    }

    /// Enumerate subdomains under the reduced domain roots.
    async fn expand_domains(
        &self,
        cancel: &CancellationToken,
        mut surface: Surface,
        exclusions: &Exclusions,
    ) -> StageResult<Surface> {
        let stage = Stage::DomainExpansion;

        let roots = match reduce(&surface.domains) {
            Ok(roots) => roots,
            Err(e) => return Err(PartialRun::new(stage, surface, e)),
        };
        if roots.is_empty() {
            debug!("No domains to enumerate");
            return Ok(surface);
        }
        info!(
            "Enumerating {} root domains (reduced from {})",
            roots.len(),
            surface.domains.len()
        );

        let names = match self.collaborators.enumerator.enumerate(cancel, &roots).await {
            Ok(names) => names,
            Err(e) => return Err(PartialRun::new(stage, surface, e)),
        };

        let found = Surface {
            domains: names.iter().map(|name| name.to_lowercase()).collect(),
            ..Surface::default()
        };
        insert_safe(&found, exclusions, &mut surface);

        checkpoint(cancel, stage, surface)
    }

    /// Find the wildcard roots among in-scope domains, sorted.
    async fn classify_wildcards(
        &self,
        cancel: &CancellationToken,
        surface: Surface,
        cache: &DnsCache,
    ) -> StageResult<(Surface, Vec<String>)> {
        let stage = Stage::WildcardClassification;
        let resolver = self.collaborators.resolver.as_ref();

        let roots = match wildcard::detect(cancel, &surface.domains, cache, resolver).await {
            Ok(roots) => roots,
            Err(e) => return Err(PartialRun::new(stage, surface, e)),
        };
        // An interrupted detection is incomplete and must not gate fuzzing.
        let surface = checkpoint(cancel, stage, surface)?;

        let mut wildcards: Vec<String> = roots.into_iter().collect();
        wildcards.sort();
        info!("Wildcard roots: {}", wildcards.len());
        Ok((surface, wildcards))
    }

    /// Permute testable domains and keep the candidates that resolve.
    async fn expand_fuzzy(
        &self,
        cancel: &CancellationToken,
        mut surface: Surface,
        exclusions: &Exclusions,
        wildcards: &[String],
        cache: &DnsCache,
    ) -> StageResult<Surface> {
        let stage = Stage::FuzzyExpansion;

        // Anything under a wildcard resolves, so fuzzing it proves nothing.
        let untestable = select_descendants(&surface.domains, wildcards);
        let fuzzable = subtract(&surface.domains, &untestable);
        debug!(
            "{} fuzzable domains, {} under wildcards",
            fuzzable.len(),
            untestable.len()
        );
        if fuzzable.is_empty() {
            return Ok(surface);
        }

        let generated = match self.collaborators.permuter.generate(&fuzzable).await {
            Ok(generated) => generated,
            Err(e) => return Err(PartialRun::new(stage, surface, e)),
        };

        let generated: Vec<String> = generated.iter().map(|name| name.to_lowercase()).collect();
        let known: HashSet<&str> = surface.domains.iter().map(String::as_str).collect();
        let under_wildcard: HashSet<String> = select_descendants(&generated, wildcards)
            .into_iter()
            .collect();
        let candidates: Vec<String> = generated
            .iter()
            .filter(|name| {
                !known.contains(name.as_str())
                    && !under_wildcard.contains(*name)
                    && !exclusions.contains_domain(name)
            })
            .cloned()
            .collect();
        info!(
            "Resolving {} of {} generated candidates",
            candidates.len(),
            generated.len()
        );

        let resolver = self.collaborators.resolver.as_ref();
        let active = match filter_active(
            cancel,
            &candidates,
            resolver,
            cache,
            self.options.resolve_concurrency,
        )
        .await
        {
            Ok(active) => active,
            Err(e) => return Err(PartialRun::new(stage, surface, e)),
        };

        let found = Surface {
            domains: active,
            ..Surface::default()
        };
        insert_safe(&found, exclusions, &mut surface);

        checkpoint(cancel, stage, surface)
    }

    /// Probe the final surface over HTTP.
    async fn probe(
        &self,
        cancel: &CancellationToken,
        surface: Surface,
    ) -> StageResult<(Surface, Vec<ProbeResult>)> {
        let stage = Stage::ActiveProbing;
        if self.options.skip_probe {
            info!("Active probing skipped");
            return Ok((surface, Vec::new()));
        }

        info!("Probing {} targets", surface.len());
        match self
            .collaborators
            .prober
            .probe(cancel, &surface, self.options.probe_concurrency)
            .await
        {
            Ok(probes) => {
                if let Some(ref console) = self.console {
                    console.print_probe_results(&probes);
                }
                let surface = checkpoint(cancel, stage, surface)?;
                Ok((surface, probes))
            }
            Err(e) => Err(PartialRun::new(stage, surface, e)),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dns::FnResolver;
    use crate::surface::is_descendant;
    use crate::types::Result;
    use async_trait::async_trait;
    use std::sync::atomic::{AtomicUsize, Ordering};

    fn strings(values: &[&str]) -> Vec<String> {
        values.iter().map(|s| s.to_string()).collect()
    }

    struct StaticScope {
        scope: Surface,
        exclusions: Surface,
    }

    impl ScopeSource for StaticScope {
        fn load(&self) -> Result<(Surface, Surface)> {
            Ok((self.scope.clone(), self.exclusions.clone()))
        }
    }

    struct StaticKnown(Surface);

    impl KnownSurfaceStore for StaticKnown {
        fn load(&self) -> Result<Surface> {
            Ok(self.0.clone())
        }
    }

    #[derive(Default)]
    struct FakeEnumerator {
        names: Vec<String>,
        fail: bool,
        cancel_after: Option<CancellationToken>,
        calls: AtomicUsize,
        seen_roots: std::sync::Mutex<Vec<String>>,
    }

    #[async_trait]
    impl SubdomainEnumerator for FakeEnumerator {
        async fn enumerate(&self, _cancel: &CancellationToken, roots: &[String]) -> Result<Vec<String>> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            self.seen_roots.lock().unwrap().extend(roots.iter().cloned());
            if self.fail {
                return Err(SurfmapError::Enumeration("upstream unavailable".to_string()));
            }
            if let Some(ref token) = self.cancel_after {
                token.cancel();
            }
            Ok(self.names.clone())
        }
    }

    #[derive(Default)]
    struct FakePermuter {
        candidates: Vec<String>,
        calls: AtomicUsize,
        seen_seeds: std::sync::Mutex<Vec<String>>,
    }

    #[async_trait]
    impl PermutationGenerator for FakePermuter {
        async fn generate(&self, seeds: &[String]) -> Result<Vec<String>> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            self.seen_seeds.lock().unwrap().extend(seeds.iter().cloned());
            Ok(self.candidates.clone())
        }
    }

    #[derive(Default)]
    struct FakeProber {
        fail: bool,
        calls: AtomicUsize,
    }

    #[async_trait]
    impl HttpProber for FakeProber {
        async fn probe(
            &self,
            _cancel: &CancellationToken,
            surface: &Surface,
            _concurrency: usize,
        ) -> Result<Vec<ProbeResult>> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            if self.fail {
                return Err(SurfmapError::Config("prober misconfigured".to_string()));
            }
            Ok(surface
                .targets()
                .into_iter()
                .map(|target| ProbeResult {
                    target,
                    url: None,
                    status_code: Some(200),
                    error: None,
                })
                .collect())
        }
    }

    /// Resolver answering for `live` names and anything under `wildcards`.
    fn resolver(live: &[&str], wildcards: &[&str]) -> Arc<dyn DnsResolver> {
        let live = strings(live);
        let wildcards = strings(wildcards);
        Arc::new(FnResolver::new(move |name: &str| {
            if live.iter().any(|l| l == name) || wildcards.iter().any(|w| is_descendant(name, w)) {
                Ok(vec!["192.0.2.10".to_string()])
            } else {
                Ok(vec![])
            }
        }))
    }

    struct Fixture {
        enumerator: Arc<FakeEnumerator>,
        permuter: Arc<FakePermuter>,
        prober: Arc<FakeProber>,
        pipeline: Pipeline,
    }

    fn fixture(
        scope: Surface,
        exclusions: Surface,
        known: Surface,
        enumerator: FakeEnumerator,
        permuter: FakePermuter,
        resolver: Arc<dyn DnsResolver>,
        options: PipelineOptions,
    ) -> Fixture {
        let prober = Arc::new(FakeProber::default());
        fixture_with_prober(
            scope, exclusions, known, enumerator, permuter, resolver, options, prober,
        )
    }

    #[allow(clippy::too_many_arguments)]
    fn fixture_with_prober(
        scope: Surface,
        exclusions: Surface,
        known: Surface,
        enumerator: FakeEnumerator,
        permuter: FakePermuter,
        resolver: Arc<dyn DnsResolver>,
        options: PipelineOptions,
        prober: Arc<FakeProber>,
    ) -> Fixture {
        let enumerator = Arc::new(enumerator);
        let permuter = Arc::new(permuter);
        let pipeline = Pipeline::new(
            Collaborators {
                scope: Arc::new(StaticScope { scope, exclusions }),
                known_surface: Arc::new(StaticKnown(known)),
                enumerator: enumerator.clone(),
                resolver,
                permuter: permuter.clone(),
                prober: prober.clone(),
            },
            options,
        );
        Fixture {
            enumerator,
            permuter,
            prober,
            pipeline,
        }
    }

    fn scope_surface() -> Surface {
        Surface {
            domains: strings(&["example.com"]),
            ips: strings(&["192.0.2.0/24"]),
            urls: strings(&["https://portal.example.com/login", "http://198.51.100.4:8080/"]),
        }
    }

    #[tokio::test]
    async fn test_full_run() {
        let f = fixture(
            scope_surface(),
            Surface::default(),
            Surface {
                domains: strings(&["old.example.com"]),
                ..Surface::default()
            },
            FakeEnumerator {
                names: strings(&["API.example.com", "www.example.com"]),
                ..FakeEnumerator::default()
            },
            FakePermuter {
                candidates: strings(&["dev.api.example.com", "www.example.com", "ghost.example.com"]),
                ..FakePermuter::default()
            },
            resolver(&["dev.api.example.com"], &[]),
            PipelineOptions::default(),
        );

        let report = f.pipeline.run(&CancellationToken::new()).await.unwrap();

        assert_eq!(
            report.surface.domains,
            strings(&[
                "example.com",
                "old.example.com",
                "portal.example.com",
                "api.example.com",
                "www.example.com",
                "dev.api.example.com",
            ])
        );
        assert_eq!(report.surface.ips, strings(&["192.0.2.0/24", "198.51.100.4"]));
        assert!(report.wildcards.is_empty());
        assert_eq!(report.probes.len(), report.surface.len());
        assert_eq!(f.prober.calls.load(Ordering::SeqCst), 1);
        // Only the reduced root is enumerated.
        assert_eq!(*f.enumerator.seen_roots.lock().unwrap(), strings(&["example.com"]));
    }

    #[tokio::test]
    async fn test_enumerator_error_halts_before_wildcards() {
        let resolver_calls = Arc::new(AtomicUsize::new(0));
        let counter = resolver_calls.clone();
        let resolver: Arc<dyn DnsResolver> = Arc::new(FnResolver::new(move |_name: &str| {
            counter.fetch_add(1, Ordering::SeqCst);
            Ok(vec![])
        }));

        let f = fixture(
            scope_surface(),
            Surface::default(),
            Surface::default(),
            FakeEnumerator {
                fail: true,
                ..FakeEnumerator::default()
            },
            FakePermuter::default(),
            resolver,
            PipelineOptions::default(),
        );

        let partial = f.pipeline.run(&CancellationToken::new()).await.unwrap_err();

        assert_eq!(partial.stage, Stage::DomainExpansion);
        assert!(matches!(
            partial.error,
            SurfmapError::Collaborator {
                stage: Stage::DomainExpansion,
                ..
            }
        ));
        assert_eq!(
            partial.surface.domains,
            strings(&["example.com", "portal.example.com"])
        );
        assert!(partial.surface.ips.contains(&"198.51.100.4".to_string()));
        assert_eq!(resolver_calls.load(Ordering::SeqCst), 0);
        assert_eq!(f.permuter.calls.load(Ordering::SeqCst), 0);
        assert_eq!(f.prober.calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn test_exclusions_apply_to_every_stage() {
        let f = fixture(
            scope_surface(),
            Surface {
                domains: strings(&["WWW.example.com", "portal.example.com"]),
                ips: strings(&["198.51.100.4"]),
                urls: Vec::new(),
            },
            Surface::default(),
            FakeEnumerator {
                names: strings(&["www.example.com", "mail.example.com"]),
                ..FakeEnumerator::default()
            },
            FakePermuter {
                candidates: strings(&["portal.example.com", "dev.example.com"]),
                ..FakePermuter::default()
            },
            resolver(&["portal.example.com", "dev.example.com"], &[]),
            PipelineOptions {
                skip_probe: true,
                ..PipelineOptions::default()
            },
        );

        let report = f.pipeline.run(&CancellationToken::new()).await.unwrap();

        assert_eq!(
            report.surface.domains,
            strings(&["example.com", "mail.example.com", "dev.example.com"])
        );
        assert_eq!(report.surface.ips, strings(&["192.0.2.0/24"]));
    }

    #[tokio::test]
    async fn test_fuzzing_skips_wildcard_descendants() {
        let f = fixture(
            Surface {
                domains: strings(&["example.com", "cdn.example.com", "edge.cdn.example.com"]),
                ..Surface::default()
            },
            Surface::default(),
            Surface::default(),
            FakeEnumerator::default(),
            FakePermuter {
                candidates: strings(&["img.cdn.example.com", "dev.example.com", "ghost.example.com"]),
                ..FakePermuter::default()
            },
            resolver(&["dev.example.com"], &["cdn.example.com"]),
            PipelineOptions {
                skip_probe: true,
                ..PipelineOptions::default()
            },
        );

        let report = f.pipeline.run(&CancellationToken::new()).await.unwrap();

        assert_eq!(report.wildcards, strings(&["cdn.example.com"]));
        // Wildcard roots and their descendants are never used as seeds.
        assert_eq!(*f.permuter.seen_seeds.lock().unwrap(), strings(&["example.com"]));
        assert!(!report.surface.domains.contains(&"img.cdn.example.com".to_string()));
        assert!(!report.surface.domains.contains(&"ghost.example.com".to_string()));
        assert!(report.surface.domains.contains(&"dev.example.com".to_string()));
        assert!(report.dns_cache_entries > 0);
    }

    #[tokio::test]
    async fn test_fuzzing_skipped_when_everything_is_wildcarded() {
        let f = fixture(
            Surface {
                domains: strings(&["example.com"]),
                ..Surface::default()
            },
            Surface::default(),
            Surface::default(),
            FakeEnumerator::default(),
            FakePermuter::default(),
            resolver(&[], &["example.com"]),
            PipelineOptions {
                skip_probe: true,
                ..PipelineOptions::default()
            },
        );

        let report = f.pipeline.run(&CancellationToken::new()).await.unwrap();

        assert_eq!(report.wildcards, strings(&["example.com"]));
        assert_eq!(f.permuter.calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn test_cancel_before_run() {
        let f = fixture(
            scope_surface(),
            Surface::default(),
            Surface::default(),
            FakeEnumerator::default(),
            FakePermuter::default(),
            resolver(&[], &[]),
            PipelineOptions::default(),
        );
        let cancel = CancellationToken::new();
        cancel.cancel();

        let partial = f.pipeline.run(&cancel).await.unwrap_err();

        assert_eq!(partial.stage, Stage::Seed);
        assert!(matches!(partial.error, SurfmapError::Cancelled(Stage::Seed)));
        assert!(partial.surface.is_empty());
    }

    #[tokio::test]
    async fn test_cancel_during_enumeration_keeps_found_names() {
        let cancel = CancellationToken::new();
        let f = fixture(
            scope_surface(),
            Surface::default(),
            Surface::default(),
            FakeEnumerator {
                names: strings(&["api.example.com"]),
                cancel_after: Some(cancel.clone()),
                ..FakeEnumerator::default()
            },
            FakePermuter::default(),
            resolver(&[], &[]),
            PipelineOptions::default(),
        );

        let partial = f.pipeline.run(&cancel).await.unwrap_err();

        assert_eq!(partial.stage, Stage::DomainExpansion);
        assert!(matches!(
            partial.error,
            SurfmapError::Cancelled(Stage::DomainExpansion)
        ));
        assert!(partial.surface.domains.contains(&"api.example.com".to_string()));
        assert_eq!(f.permuter.calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn test_skip_probe() {
        let f = fixture(
            scope_surface(),
            Surface::default(),
            Surface::default(),
            FakeEnumerator::default(),
            FakePermuter::default(),
            resolver(&[], &[]),
            PipelineOptions {
                skip_probe: true,
                ..PipelineOptions::default()
            },
        );

        let report = f.pipeline.run(&CancellationToken::new()).await.unwrap();

        assert!(report.probes.is_empty());
        assert_eq!(f.prober.calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn test_no_domains_skips_enumeration() {
        let f = fixture(
            Surface {
                ips: strings(&["203.0.113.9"]),
                ..Surface::default()
            },
            Surface::default(),
            Surface::default(),
            FakeEnumerator::default(),
            FakePermuter::default(),
            resolver(&[], &[]),
            PipelineOptions::default(),
        );

        let report = f.pipeline.run(&CancellationToken::new()).await.unwrap();

        assert_eq!(f.enumerator.calls.load(Ordering::SeqCst), 0);
        assert_eq!(f.permuter.calls.load(Ordering::SeqCst), 0);
        assert_eq!(report.probes.len(), 1);
    }

    #[tokio::test]
    async fn test_mixed_case_wildcard_root_is_not_fuzzed() {
        let f = fixture(
            Surface {
                domains: strings(&["example.com", "CDN.example.com", "Api.Example.com"]),
                ..Surface::default()
            },
            Surface::default(),
            Surface {
                domains: strings(&["api.example.com"]),
                ..Surface::default()
            },
            FakeEnumerator::default(),
            FakePermuter::default(),
            resolver(&[], &["cdn.example.com"]),
            PipelineOptions {
                skip_probe: true,
                ..PipelineOptions::default()
            },
        );

        let report = f.pipeline.run(&CancellationToken::new()).await.unwrap();

        assert_eq!(report.wildcards, strings(&["cdn.example.com"]));
        assert_eq!(
            report.surface.domains,
            strings(&["example.com", "cdn.example.com", "api.example.com"])
        );
        assert_eq!(
            *f.permuter.seen_seeds.lock().unwrap(),
            strings(&["example.com", "api.example.com"])
        );
    }

    #[tokio::test]
    async fn test_cancel_during_wildcard_classification_stops_resolving() {
        let cancel = CancellationToken::new();
        let token = cancel.clone();
        let calls = Arc::new(AtomicUsize::new(0));
        let counter = calls.clone();
        let resolver: Arc<dyn DnsResolver> = Arc::new(FnResolver::new(move |_name: &str| {
            counter.fetch_add(1, Ordering::SeqCst);
            token.cancel();
            Ok(vec![])
        }));
        let domains: Vec<String> = (0..50).map(|i| format!("host{}.example{}.com", i, i)).collect();

        let f = fixture(
            Surface {
                domains: domains.clone(),
                ..Surface::default()
            },
            Surface::default(),
            Surface::default(),
            FakeEnumerator::default(),
            FakePermuter::default(),
            resolver,
            PipelineOptions::default(),
        );

        let partial = f.pipeline.run(&cancel).await.unwrap_err();

        assert_eq!(calls.load(Ordering::SeqCst), 1);
        assert_eq!(partial.stage, Stage::WildcardClassification);
        assert!(matches!(
            partial.error,
            SurfmapError::Cancelled(Stage::WildcardClassification)
        ));
        assert_eq!(partial.surface.domains, domains);
        assert_eq!(f.permuter.calls.load(Ordering::SeqCst), 0);
        assert_eq!(f.prober.calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn test_resolver_error_during_wildcard_classification() {
        let resolver: Arc<dyn DnsResolver> = Arc::new(FnResolver::new(|_name: &str| {
            Err(SurfmapError::Config("resolver unreachable".to_string()))
        }));
        let f = fixture(
            scope_surface(),
            Surface::default(),
            Surface::default(),
            FakeEnumerator {
                names: strings(&["api.example.com"]),
                ..FakeEnumerator::default()
            },
            FakePermuter::default(),
            resolver,
            PipelineOptions::default(),
        );

        let partial = f.pipeline.run(&CancellationToken::new()).await.unwrap_err();

        assert_eq!(partial.stage, Stage::WildcardClassification);
        assert!(matches!(
            partial.error,
            SurfmapError::Collaborator {
                stage: Stage::WildcardClassification,
                ..
            }
        ));
        assert_eq!(
            partial.surface.domains,
            strings(&["example.com", "portal.example.com", "api.example.com"])
        );
        assert_eq!(f.permuter.calls.load(Ordering::SeqCst), 0);
        assert_eq!(f.prober.calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn test_resolver_error_during_fuzzy_expansion() {
        // Wildcard checks use random labels, so only the permuted name fails.
        let resolver: Arc<dyn DnsResolver> = Arc::new(FnResolver::new(|name: &str| {
            if name == "dev.example.com" {
                Err(SurfmapError::Config("resolver unreachable".to_string()))
            } else {
                Ok(vec![])
            }
        }));
        let f = fixture(
            scope_surface(),
            Surface::default(),
            Surface::default(),
            FakeEnumerator::default(),
            FakePermuter {
                candidates: strings(&["dev.example.com"]),
                ..FakePermuter::default()
            },
            resolver,
            PipelineOptions::default(),
        );

        let partial = f.pipeline.run(&CancellationToken::new()).await.unwrap_err();

        assert_eq!(partial.stage, Stage::FuzzyExpansion);
        assert!(matches!(
            partial.error,
            SurfmapError::Collaborator {
                stage: Stage::FuzzyExpansion,
                ..
            }
        ));
        assert_eq!(
            partial.surface.domains,
            strings(&["example.com", "portal.example.com"])
        );
        assert_eq!(f.prober.calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn test_prober_error_keeps_final_surface() {
        let prober = Arc::new(FakeProber {
            fail: true,
            ..FakeProber::default()
        });
        let f = fixture_with_prober(
            scope_surface(),
            Surface::default(),
            Surface::default(),
            FakeEnumerator::default(),
            FakePermuter {
                candidates: strings(&["dev.example.com"]),
                ..FakePermuter::default()
            },
            resolver(&["dev.example.com"], &[]),
            PipelineOptions::default(),
            prober,
        );

        let partial = f.pipeline.run(&CancellationToken::new()).await.unwrap_err();

        assert_eq!(partial.stage, Stage::ActiveProbing);
        assert!(matches!(
            partial.error,
            SurfmapError::Collaborator {
                stage: Stage::ActiveProbing,
                ..
            }
        ));
        assert_eq!(
            partial.surface.domains,
            strings(&["example.com", "portal.example.com", "dev.example.com"])
        );
        assert_eq!(f.prober.calls.load(Ordering::SeqCst), 1);
    }
}
