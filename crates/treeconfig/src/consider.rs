//! Consider manifest: an allow-list of exact config-file paths that
//! narrows discovery.

use std::collections::HashSet;

use tracing::warn;
use uuid::Uuid;

/// Parsed consider manifest.
///
/// Keeps both the ordered entry list (iteration order matters for
/// full-scan delegation) and a set for O(1) membership checks during the
/// ancestor walk.
#[derive(Debug, Default)]
pub struct ConsiderManifest {
    entries: Vec<String>,
    members: HashSet<String>,
}

impl ConsiderManifest {
    /// Parse manifest text. Blank lines and `#` comments are ignored;
    /// lines not ending in `config_file` are dropped with a warning.
    pub fn parse(raw: &str, config_file: &str, rid: Uuid) -> Self {
        let mut manifest = ConsiderManifest::default();
        for line in raw.lines() {
            let trimmed = line.trim();
            if trimmed.is_empty() || trimmed.starts_with('#') {
                continue;
            }
            if !line.ends_with(config_file) {
                warn!(request = %rid, entry = %line, "skipping invalid consider entry");
                continue;
            }
            manifest.entries.push(line.to_string());
            manifest.members.insert(line.to_string());
        }
        manifest
    }

    /// Whether `path` is sanctioned by the manifest.
    pub fn contains(&self, path: &str) -> bool {
        self.members.contains(path)
    }

    /// Sanctioned paths in manifest order.
    pub fn entries(&self) -> &[String] {
        &self.entries
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse(raw: &str) -> ConsiderManifest {
        ConsiderManifest::parse(raw, ".drone.yml", Uuid::new_v4())
    }

    #[test]
    fn skips_blank_lines_and_comments() {
        let manifest = parse("# header\n\n  \na/.drone.yml\n");
        assert_eq!(manifest.entries(), [String::from("a/.drone.yml")]);
    }

    #[test]
    fn drops_entries_with_wrong_suffix() {
        let manifest = parse("a/.drone.yml\nb/README.md\nc/.drone.yml\n");
        assert_eq!(
            manifest.entries(),
            [String::from("a/.drone.yml"), String::from("c/.drone.yml")]
        );
        assert!(!manifest.contains("b/README.md"));
    }

    #[test]
    fn membership_matches_exact_paths() {
        let manifest = parse("a/.drone.yml\n");
        assert!(manifest.contains("a/.drone.yml"));
        assert!(!manifest.contains("a/b/.drone.yml"));
        assert!(!manifest.contains(".drone.yml"));
    }

    #[test]
    fn preserves_manifest_order() {
        let manifest = parse("z/.drone.yml\na/.drone.yml\n");
        assert_eq!(
            manifest.entries(),
            [String::from("z/.drone.yml"), String::from("a/.drone.yml")]
        );
    }
}
