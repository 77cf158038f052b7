//! Trigger classification and resolution orchestration.

use std::time::Duration;

use tracing::{debug, info, warn};
use uuid::Uuid;

use crate::cache::{CacheKey, ResultCache};
use crate::consider::ConsiderManifest;
use crate::discovery::Discovery;
use crate::error::{ResolveError, ResolveResult};
use crate::request::ResolutionRequest;
use crate::scm::ScmClient;

/// Engine configuration, supplied by the wiring layer once at startup.
#[derive(Debug, Clone)]
pub struct ResolverConfig {
    /// Merge every discovered fragment. When disabled, only the first
    /// fragment per changed file (ancestor walk) or per scan applies.
    pub concat: bool,
    /// Full-scan when an event carries no changed files.
    pub fallback: bool,
    /// Full-scan on every event, ignoring changed files.
    pub always_run_all: bool,
    /// Enable dependency injection for a fragment named `finalize`.
    pub finalize: bool,
    /// Maximum recursion depth of the full scan.
    pub max_depth: u32,
    /// Repository-relative path of the consider manifest, if any.
    pub consider_file: Option<String>,
    /// Whether a consider-manifest fetch failure aborts the resolution.
    /// When false, the failure is logged and discovery falls back to
    /// running unrestricted.
    pub consider_file_required: bool,
    /// Result-cache TTL; zero disables caching.
    pub cache_ttl: Duration,
    /// Whether failed resolutions are cached for the TTL as well.
    pub cache_errors: bool,
}

impl Default for ResolverConfig {
    fn default() -> Self {
        ResolverConfig {
            concat: false,
            fallback: false,
            always_run_all: false,
            finalize: false,
            max_depth: 2,
            consider_file: None,
            consider_file_required: true,
            cache_ttl: Duration::ZERO,
            cache_errors: true,
        }
    }
}

/// Config resolution engine.
///
/// Holds the static configuration and the result cache; everything else is
/// per-request state. One instance is shared across all inbound events,
/// each of which runs on its own task with its own SCM client handle.
pub struct Resolver {
    config: ResolverConfig,
    cache: ResultCache,
}

impl Resolver {
    pub fn new(config: ResolverConfig) -> Self {
        Resolver {
            config,
            cache: ResultCache::new(),
        }
    }

    pub fn config(&self) -> &ResolverConfig {
        &self.config
    }

    /// Resolve the effective config document for one change event.
    ///
    /// The whole operation is wrapped by the result cache: a fresh outcome
    /// (document or fatal error, per `cache_errors`) is stored under the
    /// request fingerprint for the configured TTL.
    pub async fn resolve(
        &self,
        client: &dyn ScmClient,
        req: &ResolutionRequest,
    ) -> ResolveResult<String> {
        let rid = Uuid::new_v4();
        info!(request = %rid, repo = %req.repo.slug, "resolution started");

        let key = CacheKey::for_request(req);
        if let Some(outcome) = self.cache.get(&key) {
            info!(request = %rid, repo = %req.repo.slug, "resolution finished (cached)");
            return outcome;
        }

        let outcome = self.resolve_uncached(client, req, rid).await;
        if outcome.is_ok() || self.config.cache_errors {
            self.cache
                .put(key, outcome.clone(), self.config.cache_ttl);
        }

        info!(request = %rid, repo = %req.repo.slug, "resolution finished");
        outcome
    }

    /// Drop any cached outcome for the given request fingerprint.
    pub fn invalidate(&self, req: &ResolutionRequest) {
        self.cache.invalidate(&CacheKey::for_request(req));
    }

    async fn resolve_uncached(
        &self,
        client: &dyn ScmClient,
        req: &ResolutionRequest,
        rid: Uuid,
    ) -> ResolveResult<String> {
        let consider = self.load_consider(client, req, rid).await?;
        let mut discovery = Discovery::new(&self.config, client, req, rid, consider);

        if self.config.always_run_all {
            self.scan_full(&mut discovery, rid).await?;
        } else {
            let changed = self.changed_files(client, req, rid).await?;
            if !changed.is_empty() {
                discovery.walk_changed(&changed).await?;
            } else if req.is_cron() {
                warn!(request = %rid, "cron trigger, rebuilding all");
                self.scan_full(&mut discovery, rid).await?;
            } else if self.config.fallback {
                warn!(request = %rid, "no changed files and fallback enabled, rebuilding all");
                self.scan_full(&mut discovery, rid).await?;
            } else {
                return Err(ResolveError::NotFound);
            }
        }

        let document = discovery.into_document()?;
        if document.is_empty() {
            return Err(ResolveError::NotFound);
        }
        Ok(document)
    }

    /// Full-scan strategy: iterate the consider manifest when one is
    /// active, otherwise recurse over the whole tree.
    async fn scan_full(&self, discovery: &mut Discovery<'_>, rid: Uuid) -> ResolveResult<()> {
        if discovery.has_consider() {
            discovery.walk_listed().await
        } else {
            warn!(
                request = %rid,
                "unrestricted full-tree scan without a consider manifest, this is expensive"
            );
            discovery.scan_tree(String::new(), 0).await
        }
    }

    /// Changed-file retrieval per trigger kind. Scheduled triggers get an
    /// empty synthetic list so the classifier falls through to the full
    /// scan; pull-request refs use the PR diff; everything else diffs
    /// before..after.
    async fn changed_files(
        &self,
        client: &dyn ScmClient,
        req: &ResolutionRequest,
        rid: Uuid,
    ) -> ResolveResult<Vec<String>> {
        if req.is_cron() {
            return Ok(Vec::new());
        }

        let changed = if let Some(number) = req.pull_request_number()? {
            client
                .changed_files_in_pull_request(number)
                .await
                .map_err(|err| ResolveError::Transport {
                    context: format!("fetching diff for pull request {number}: {err}"),
                })?
        } else {
            let base = req.diff_base();
            client
                .changed_files_in_diff(&base, &req.after)
                .await
                .map_err(|err| ResolveError::Transport {
                    context: format!("fetching diff {base}..{}: {err}", req.after),
                })?
        };

        if !changed.is_empty() {
            debug!(request = %rid, files = changed.len(), "changed files fetched");
        }
        Ok(changed)
    }

    /// Derive the consider manifest for this request, honoring the
    /// fetch-failure policy.
    async fn load_consider(
        &self,
        client: &dyn ScmClient,
        req: &ResolutionRequest,
        rid: Uuid,
    ) -> ResolveResult<Option<ConsiderManifest>> {
        let Some(path) = &self.config.consider_file else {
            return Ok(None);
        };

        match client.get_file_contents(path, &req.after).await {
            Ok(raw) => Ok(Some(ConsiderManifest::parse(&raw, &req.config_file, rid))),
            Err(err) if self.config.consider_file_required => Err(ResolveError::Transport {
                context: format!("fetching consider file {path}: {err}"),
            }),
            Err(err) => {
                warn!(
                    request = %rid,
                    path = %path,
                    error = %err,
                    "consider file unavailable, falling back to unrestricted discovery"
                );
                Ok(None)
            }
        }
    }
}
