//! Per-event resolution request.

use crate::error::{ResolveError, ResolveResult};

/// Trigger string used by the CI host for scheduled builds.
pub const CRON_TRIGGER: &str = "@cron";

/// Ref prefix carried by pull-request events.
pub const PULL_REQUEST_REF_PREFIX: &str = "refs/pull/";

/// Placeholder revision the CI host sends when there is no "before" commit,
/// e.g. on the first push to a branch.
pub const ZERO_REVISION: &str = "0000000000000000000000000000000000000000";

/// Identity of the repository a request refers to.
#[derive(Debug, Clone)]
pub struct Repo {
    pub namespace: String,
    pub name: String,
    /// Combined `namespace/name` slug, as the CI host reports it.
    pub slug: String,
}

/// Immutable per-event value describing one resolution request.
///
/// Constructed once at request entry from the inbound CI event and
/// read-only thereafter.
#[derive(Debug, Clone)]
pub struct ResolutionRequest {
    pub repo: Repo,
    /// Name of the config file to discover, e.g. `.drone.yml`.
    pub config_file: String,
    /// Default branch of the repository.
    pub branch: String,
    /// Revision before the change; may be empty or the all-zero sentinel.
    pub before: String,
    /// Revision after the change. All file fetches use this revision.
    pub after: String,
    /// Full git ref of the event, e.g. `refs/heads/main` or
    /// `refs/pull/42/head`.
    pub ref_name: String,
    /// Event kind reported by the CI host, e.g. `push`.
    pub event: String,
    /// Trigger string; [`CRON_TRIGGER`] marks scheduled builds.
    pub trigger: String,
    /// Author of the change.
    pub author: String,
}

impl ResolutionRequest {
    /// Whether this request was raised by a scheduled (cron) trigger.
    pub fn is_cron(&self) -> bool {
        self.trigger == CRON_TRIGGER
    }

    /// Pull-request number parsed from the ref, if this is a pull-request
    /// event. A pull-request ref that does not carry a numeric id is an
    /// input error.
    pub fn pull_request_number(&self) -> ResolveResult<Option<u64>> {
        let Some(rest) = self.ref_name.strip_prefix(PULL_REQUEST_REF_PREFIX) else {
            return Ok(None);
        };
        let id = rest.split('/').next().unwrap_or_default();
        id.parse::<u64>()
            .map(Some)
            .map_err(|_| ResolveError::Input(format!("no pull request id in ref {}", self.ref_name)))
    }

    /// Base revision for a two-revision diff. Substitutes `<after>~1` when
    /// the host sent no usable "before" revision.
    pub fn diff_base(&self) -> String {
        if self.before.is_empty() || self.before == ZERO_REVISION {
            format!("{}~1", self.after)
        } else {
            self.before.clone()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn request(ref_name: &str, before: &str, trigger: &str) -> ResolutionRequest {
        ResolutionRequest {
            repo: Repo {
                namespace: "octocat".to_string(),
                name: "hello-world".to_string(),
                slug: "octocat/hello-world".to_string(),
            },
            config_file: ".drone.yml".to_string(),
            branch: "main".to_string(),
            before: before.to_string(),
            after: "abcdef0".to_string(),
            ref_name: ref_name.to_string(),
            event: "push".to_string(),
            trigger: trigger.to_string(),
            author: "octocat".to_string(),
        }
    }

    #[test]
    fn pull_request_number_parses_ref() {
        let req = request("refs/pull/42/head", "", "");
        assert_eq!(req.pull_request_number().unwrap(), Some(42));
    }

    #[test]
    fn pull_request_number_ignores_branch_refs() {
        let req = request("refs/heads/main", "", "");
        assert_eq!(req.pull_request_number().unwrap(), None);
    }

    #[test]
    fn pull_request_number_rejects_bad_id() {
        let req = request("refs/pull/forty-two/head", "", "");
        assert!(matches!(
            req.pull_request_number(),
            Err(ResolveError::Input(_))
        ));
    }

    #[test]
    fn diff_base_substitutes_parent_for_zero_revision() {
        assert_eq!(request("r", ZERO_REVISION, "").diff_base(), "abcdef0~1");
        assert_eq!(request("r", "", "").diff_base(), "abcdef0~1");
        assert_eq!(request("r", "1234567", "").diff_base(), "1234567");
    }

    #[test]
    fn is_cron_matches_trigger() {
        assert!(request("r", "", CRON_TRIGGER).is_cron());
        assert!(!request("r", "", "").is_cron());
    }
}
