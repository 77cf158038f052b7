//! Discovery strategies: ancestor walk and bounded recursive scan.

use std::collections::HashSet;

use futures::future::BoxFuture;
use tracing::{debug, info};
use uuid::Uuid;

use crate::combine::Combiner;
use crate::consider::ConsiderManifest;
use crate::error::{ResolveError, ResolveResult, ScmError};
use crate::fragment::{validate_fragment, Candidate};
use crate::request::ResolutionRequest;
use crate::resolver::ResolverConfig;
use crate::scm::{EntryKind, ScmClient};

/// Per-request discovery state.
///
/// Owns the combiner and the memo set of already-probed candidate paths;
/// both live for exactly one resolution. All SCM calls run sequentially to
/// keep discovery order deterministic.
pub(crate) struct Discovery<'a> {
    cfg: &'a ResolverConfig,
    client: &'a dyn ScmClient,
    req: &'a ResolutionRequest,
    rid: Uuid,
    consider: Option<ConsiderManifest>,
    combiner: Combiner,
    probed: HashSet<String>,
}

impl<'a> Discovery<'a> {
    pub(crate) fn new(
        cfg: &'a ResolverConfig,
        client: &'a dyn ScmClient,
        req: &'a ResolutionRequest,
        rid: Uuid,
        consider: Option<ConsiderManifest>,
    ) -> Self {
        Discovery {
            cfg,
            client,
            req,
            rid,
            consider,
            combiner: Combiner::new(),
            probed: HashSet::new(),
        }
    }

    pub(crate) fn has_consider(&self) -> bool {
        self.consider.is_some()
    }

    /// Hand the accumulated fragments to the combiner.
    pub(crate) fn into_document(self) -> ResolveResult<String> {
        self.combiner.into_document(self.cfg.finalize)
    }

    /// Ancestor walk over the changed-file list.
    ///
    /// For every changed path, each ancestor directory is probed for the
    /// config file, nearest first. With concatenation disabled the walk
    /// stops ascending a changed file after its first hit; only the
    /// nearest enclosing config applies to it.
    pub(crate) async fn walk_changed(&mut self, changed: &[String]) -> ResolveResult<()> {
        for file in changed {
            for candidate in ancestor_candidates(file, &self.req.config_file) {
                if self.probe(&candidate).await? && !self.cfg.concat {
                    info!(
                        request = %self.rid,
                        path = %candidate,
                        "concatenation disabled, keeping nearest config"
                    );
                    break;
                }
            }
        }
        Ok(())
    }

    /// Iterate the consider manifest's sanctioned paths, in manifest
    /// order, through the same dedup/fetch/validate machinery as the
    /// ancestor walk. Replaces directory listing when a manifest is
    /// active.
    pub(crate) async fn walk_listed(&mut self) -> ResolveResult<()> {
        let entries: Vec<String> = self
            .consider
            .as_ref()
            .map(|manifest| manifest.entries().to_vec())
            .unwrap_or_default();
        for path in entries {
            if self.probe(&path).await? && !self.cfg.concat {
                info!(request = %self.rid, "concatenation disabled, stopping after first config");
                break;
            }
        }
        Ok(())
    }

    /// Depth-bounded recursive scan from `dir`, in directory-listing
    /// order. Exceeding the depth bound returns an empty result for that
    /// subtree, logged but not an error. With concatenation disabled the
    /// scan stops once anything has been collected; results already merged
    /// from subdirectories are retained.
    pub(crate) fn scan_tree(
        &mut self,
        dir: String,
        depth: u32,
    ) -> BoxFuture<'_, ResolveResult<()>> {
        Box::pin(async move {
            if depth > self.cfg.max_depth {
                info!(
                    request = %self.rid,
                    dir = %dir,
                    depth,
                    "skipping scan, max depth reached"
                );
                return Ok(());
            }

            let entries = self
                .client
                .get_file_listing(&dir, &self.req.after)
                .await
                .map_err(|err| ResolveError::Transport {
                    context: format!("listing {}: {err}", display_dir(&dir)),
                })?;

            for entry in entries {
                match entry.kind {
                    EntryKind::Dir => self.scan_tree(entry.path, depth + 1).await?,
                    EntryKind::File if entry.name == self.req.config_file => {
                        self.probe(&entry.path).await?;
                    }
                    EntryKind::File => {}
                }
                if !self.cfg.concat && !self.combiner.is_empty() {
                    info!(request = %self.rid, "concatenation disabled, stopping after first config");
                    return Ok(());
                }
            }
            Ok(())
        })
    }

    /// Probe one candidate path: dedup, consider-membership check, fetch,
    /// validate, append. Returns whether a fragment was appended. Absent
    /// candidates are skipped; malformed ones and transport failures abort
    /// the resolution.
    async fn probe(&mut self, candidate: &str) -> ResolveResult<bool> {
        if !self.probed.insert(candidate.to_string()) {
            return Ok(false);
        }
        if let Some(manifest) = &self.consider {
            if !manifest.contains(candidate) {
                return Ok(false);
            }
        }

        match self.fetch_candidate(candidate).await? {
            Candidate::Absent => Ok(false),
            Candidate::Loaded(fragment) => {
                info!(
                    request = %self.rid,
                    repo = %self.req.repo.slug,
                    path = %candidate,
                    name = %fragment.name,
                    "found config fragment"
                );
                self.combiner.push(fragment);
                Ok(true)
            }
        }
    }

    /// Fetch and validate a single candidate. A missing file is the
    /// non-fatal `Absent` outcome; anything else that goes wrong is fatal.
    async fn fetch_candidate(&self, candidate: &str) -> ResolveResult<Candidate> {
        debug!(request = %self.rid, path = %candidate, "checking candidate");
        let raw = match self.client.get_file_contents(candidate, &self.req.after).await {
            Ok(raw) => raw,
            Err(ScmError::NotFound { .. }) => {
                debug!(request = %self.rid, path = %candidate, "skipping, not present");
                return Ok(Candidate::Absent);
            }
            Err(err) => {
                return Err(ResolveError::Transport {
                    context: format!("fetching {candidate}: {err}"),
                })
            }
        };
        validate_fragment(candidate, &raw).map(Candidate::Loaded)
    }
}

fn display_dir(dir: &str) -> &str {
    if dir.is_empty() {
        "/"
    } else {
        dir
    }
}

/// Candidate config paths for a changed file: one per ancestor directory,
/// from the immediate parent up to the repository root.
fn ancestor_candidates(changed: &str, config_file: &str) -> Vec<String> {
    let mut candidates = Vec::new();
    let mut dir = changed.trim_start_matches('/');
    loop {
        dir = match dir.rsplit_once('/') {
            Some((parent, _)) => parent,
            None => "",
        };
        candidates.push(crate::scm::join_path(dir, config_file));
        if dir.is_empty() {
            break;
        }
    }
    candidates
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn ancestors_walk_to_the_root() {
        assert_eq!(
            ancestor_candidates("a/b/c", ".drone.yml"),
            ["a/b/.drone.yml", "a/.drone.yml", ".drone.yml"]
        );
    }

    #[test]
    fn root_level_file_has_only_root_candidate() {
        assert_eq!(ancestor_candidates("README.md", ".drone.yml"), [".drone.yml"]);
    }

    #[test]
    fn leading_slash_is_ignored() {
        assert_eq!(
            ancestor_candidates("/a/b", ".drone.yml"),
            ["a/.drone.yml", ".drone.yml"]
        );
    }
}
