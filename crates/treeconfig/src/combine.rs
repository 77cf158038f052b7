//! Multi-fragment YAML combiner.
//!
//! Fragments serialize in discovery order into one multi-document stream,
//! with one exception: a fragment named `finalize` is rewritten to depend
//! on every other fragment and always emitted last, regardless of where
//! discovery found it.

use serde_yaml::Value;

use crate::error::{ResolveError, ResolveResult};
use crate::fragment::LoadedFragment;

/// Ordered collection of discovered fragments.
#[derive(Debug, Default)]
pub struct Combiner {
    fragments: Vec<LoadedFragment>,
}

impl Combiner {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a fragment in discovery order.
    pub fn push(&mut self, fragment: LoadedFragment) {
        self.fragments.push(fragment);
    }

    pub fn is_empty(&self) -> bool {
        self.fragments.is_empty()
    }

    pub fn len(&self) -> usize {
        self.fragments.len()
    }

    /// Serialize all fragments into the final multi-document stream.
    ///
    /// With `finalize_enabled`, the fragment named `finalize` (at most one)
    /// gets its `depends_on` field set to the names of all other fragments
    /// and moves to the end. Zero fragments yield the empty string, which
    /// callers interpret as "no configuration found".
    pub fn into_document(self, finalize_enabled: bool) -> ResolveResult<String> {
        if self.fragments.is_empty() {
            return Ok(String::new());
        }

        let mut ordinary: Vec<&LoadedFragment> = Vec::with_capacity(self.fragments.len());
        let mut finalize: Option<&LoadedFragment> = None;
        for fragment in &self.fragments {
            if finalize_enabled && fragment.is_finalize() {
                if let Some(first) = finalize {
                    return Err(ResolveError::Malformed {
                        path: fragment.path.clone(),
                        reason: format!(
                            "second 'finalize' fragment, first seen at {}",
                            first.path
                        ),
                    });
                }
                finalize = Some(fragment);
            } else {
                ordinary.push(fragment);
            }
        }

        let mut document = String::new();
        for fragment in &ordinary {
            append_normalized(&mut document, &fragment.raw);
        }
        if let Some(finalize) = finalize {
            let names: Vec<&str> = ordinary.iter().map(|f| f.name.as_str()).collect();
            let rewritten = inject_depends_on(finalize, &names)?;
            append_normalized(&mut document, &rewritten);
        }

        Ok(tidy(&document))
    }
}

/// Append one fragment body: trim surrounding blank lines, guarantee a
/// leading document separator and a single trailing newline.
fn append_normalized(document: &mut String, raw: &str) {
    let body = raw.trim_matches(|c| c == ' ' || c == '\n');
    if body.is_empty() {
        return;
    }
    if !body.starts_with("---\n") && body != "---" {
        document.push_str("---\n");
    }
    document.push_str(body);
    if !document.ends_with('\n') {
        document.push('\n');
    }
}

/// Rewrite the finalize fragment so its pipeline depends on every other
/// discovered pipeline.
fn inject_depends_on(fragment: &LoadedFragment, names: &[&str]) -> ResolveResult<String> {
    let mut value: Value =
        serde_yaml::from_str(&fragment.raw).map_err(|err| ResolveError::Malformed {
            path: fragment.path.clone(),
            reason: format!("yaml parse error: {err}"),
        })?;
    let mapping = value.as_mapping_mut().ok_or_else(|| ResolveError::Malformed {
        path: fragment.path.clone(),
        reason: "finalize fragment is not a mapping".to_string(),
    })?;
    mapping.insert(
        Value::String("depends_on".to_string()),
        Value::Sequence(
            names
                .iter()
                .map(|name| Value::String((*name).to_string()))
                .collect(),
        ),
    );
    serde_yaml::to_string(&value).map_err(|err| ResolveError::Malformed {
        path: fragment.path.clone(),
        reason: format!("yaml serialize error: {err}"),
    })
}

fn is_separator(line: &str) -> bool {
    line.strip_prefix("---")
        .is_some_and(|rest| rest.trim().is_empty())
}

fn is_document_end(line: &str) -> bool {
    line.strip_prefix("...")
        .is_some_and(|rest| rest.trim().is_empty())
}

/// Final cleanup pass: drop standalone document-end markers, then collapse
/// any run of two-or-more separator lines (blank lines in between
/// included) down to a single separator.
fn tidy(document: &str) -> String {
    let mut kept: Vec<&str> = Vec::new();
    for line in document.lines() {
        if is_document_end(line) {
            continue;
        }
        if is_separator(line) {
            // Walk back over blank lines; if the previous meaningful line
            // is already a separator, fold this one into it.
            let mut last = kept.len();
            while last > 0 && kept[last - 1].trim().is_empty() {
                last -= 1;
            }
            if last > 0 && is_separator(kept[last - 1]) {
                kept.truncate(last);
                continue;
            }
        }
        kept.push(line);
    }
    let mut out = kept.join("\n");
    if !out.is_empty() {
        out.push('\n');
    }
    out
}
