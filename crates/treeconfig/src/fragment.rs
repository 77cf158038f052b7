//! Candidate validation and loaded fragments.

use serde::Deserialize;

use crate::error::{ResolveError, ResolveResult};

/// Name of the fragment that is made dependent on all others.
pub const FINALIZE_NAME: &str = "finalize";

/// A validated configuration document discovered in the tree.
///
/// Created only by [`validate_fragment`] and owned by the combiner from
/// then on.
#[derive(Debug, Clone)]
pub struct LoadedFragment {
    /// Repository-relative path the fragment was loaded from.
    pub path: String,
    /// `name` field of the document.
    pub name: String,
    /// `kind` field of the document.
    pub kind: String,
    /// Raw file content, unmodified.
    pub raw: String,
}

impl LoadedFragment {
    /// Whether this fragment receives the dependency-injection treatment.
    pub fn is_finalize(&self) -> bool {
        self.name == FINALIZE_NAME
    }
}

/// Outcome of probing a single candidate path.
///
/// A two-variant result instead of a boolean "critical" flag: the fatal
/// cases travel through `Err`, so fatal-vs-non-fatal is explicit at the
/// type level.
#[derive(Debug)]
pub enum Candidate {
    /// The candidate does not exist at the requested revision.
    Absent,
    /// The candidate exists and passed validation.
    Loaded(LoadedFragment),
}

/// Minimal schema every fragment must satisfy.
#[derive(Debug, Default, Deserialize)]
struct FragmentHeader {
    #[serde(default)]
    name: Option<String>,
    #[serde(default)]
    kind: Option<String>,
}

/// Parse raw content as YAML and check the minimal schema.
///
/// A fragment file may itself hold several pipelines as a multi-document
/// stream; the header is checked on the first document only. A parse
/// failure or a missing/empty `name` or `kind` is fatal: the file is
/// present but unusable, and silently skipping it would run the wrong
/// pipeline.
pub fn validate_fragment(path: &str, raw: &str) -> ResolveResult<LoadedFragment> {
    let header: FragmentHeader = serde_yaml::Deserializer::from_str(raw)
        .next()
        .map(FragmentHeader::deserialize)
        .transpose()
        .map_err(|err| ResolveError::Malformed {
            path: path.to_string(),
            reason: format!("yaml parse error: {err}"),
        })?
        .unwrap_or_default();

    let name = header.name.filter(|v| !v.is_empty());
    let kind = header.kind.filter(|v| !v.is_empty());
    match (name, kind) {
        (Some(name), Some(kind)) => Ok(LoadedFragment {
            path: path.to_string(),
            name,
            kind,
            raw: raw.to_string(),
        }),
        _ => Err(ResolveError::Malformed {
            path: path.to_string(),
            reason: "missing 'name' or 'kind'".to_string(),
        }),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn accepts_minimal_document() {
        let fragment = validate_fragment("a/.drone.yml", "kind: pipeline\nname: a\n").unwrap();
        assert_eq!(fragment.name, "a");
        assert_eq!(fragment.kind, "pipeline");
        assert_eq!(fragment.path, "a/.drone.yml");
    }

    #[test]
    fn accepts_multi_document_stream() {
        let raw = "kind: pipeline\nname: a\n---\nkind: pipeline\nname: a-arm\n";
        let fragment = validate_fragment("a/.drone.yml", raw).unwrap();
        assert_eq!(fragment.name, "a", "header comes from the first document");
        assert_eq!(fragment.raw, raw, "raw content keeps every document");
    }

    #[test]
    fn rejects_missing_kind() {
        let err = validate_fragment("x/.drone.yml", "name: a\n").unwrap_err();
        assert!(matches!(err, ResolveError::Malformed { .. }));
    }

    #[test]
    fn rejects_empty_name() {
        let err = validate_fragment("x/.drone.yml", "kind: pipeline\nname: ''\n").unwrap_err();
        assert!(matches!(err, ResolveError::Malformed { .. }));
    }

    #[test]
    fn rejects_unparseable_yaml() {
        let err = validate_fragment("x/.drone.yml", ": :\n  - [unbalanced\n").unwrap_err();
        assert!(matches!(err, ResolveError::Malformed { .. }));
    }

    #[test]
    fn finalize_is_detected_by_name() {
        let fragment =
            validate_fragment(".drone.yml", "kind: pipeline\nname: finalize\n").unwrap();
        assert!(fragment.is_finalize());
    }
}
