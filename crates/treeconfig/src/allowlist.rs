//! Flat-file repository allow-list.
//!
//! One regex pattern per line, matched against the repo slug. Evaluated by
//! the wiring layer before the engine is invoked; a bypassed repository
//! falls back to the host's default config behavior.

use std::fs;
use std::path::Path;

use regex::Regex;
use tracing::{info, warn};

/// Whether the engine is enabled for `slug`.
///
/// Semantics follow the flat-file format: empty lines and `#` comments are
/// ignored, an invalid pattern warns and the remaining lines are still
/// considered, and any match allows the repository. A missing or
/// unreadable file allows everything.
pub fn slug_allowed(allow_list: Option<&Path>, slug: &str) -> bool {
    let Some(path) = allow_list else {
        info!(slug = %slug, "match: no allow-list configured");
        return true;
    };

    let raw = match fs::read_to_string(path) {
        Ok(raw) => raw,
        Err(err) => {
            warn!(path = %path.display(), error = %err, "allow-list read error");
            info!(slug = %slug, "match");
            return true;
        }
    };

    for line in raw.lines() {
        if line.is_empty() || line.starts_with('#') {
            continue;
        }
        let pattern = match Regex::new(line) {
            Ok(pattern) => pattern,
            Err(err) => {
                warn!(pattern = %line, error = %err, "invalid allow-list pattern");
                continue;
            }
        };
        if pattern.is_match(slug) {
            info!(slug = %slug, pattern = %line, "match");
            return true;
        }
    }

    info!(slug = %slug, "no match");
    false
}
