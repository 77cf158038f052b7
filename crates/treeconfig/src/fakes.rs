//! In-memory fake of the SCM capability (testing only).
//!
//! `FakeScmClient` serves a fixed set of files, answers diff queries from
//! preset changed-file lists, and counts every capability call so tests
//! can assert the cache short-circuits SCM traffic. Listing order follows
//! file insertion order, mirroring the "backend listing order, not
//! sorted" contract.

use std::collections::{HashMap, HashSet};
use std::sync::atomic::{AtomicUsize, Ordering};

use async_trait::async_trait;

use crate::error::{ScmError, ScmResult};
use crate::scm::{EntryKind, FileEntry, ScmClient};

/// In-memory SCM backend for tests.
#[derive(Debug, Default)]
pub struct FakeScmClient {
    files: Vec<(String, String)>,
    pr_changes: HashMap<u64, Vec<String>>,
    diff_changes: Vec<String>,
    fail_contents: HashSet<String>,
    calls: AtomicUsize,
}

impl FakeScmClient {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a file at a repository-relative path.
    pub fn with_file(mut self, path: &str, contents: &str) -> Self {
        self.files.push((path.to_string(), contents.to_string()));
        self
    }

    /// Preset the changed files returned for a pull request number.
    pub fn with_pr_changes(mut self, number: u64, paths: &[&str]) -> Self {
        self.pr_changes
            .insert(number, paths.iter().map(|p| p.to_string()).collect());
        self
    }

    /// Preset the changed files returned for any two-revision diff.
    pub fn with_diff_changes(mut self, paths: &[&str]) -> Self {
        self.diff_changes = paths.iter().map(|p| p.to_string()).collect();
        self
    }

    /// Make `get_file_contents` fail with a transport error for a path.
    pub fn with_transport_failure(mut self, path: &str) -> Self {
        self.fail_contents.insert(path.to_string());
        self
    }

    /// Total capability calls served so far.
    pub fn scm_calls(&self) -> usize {
        self.calls.load(Ordering::Relaxed)
    }

    fn record_call(&self) {
        self.calls.fetch_add(1, Ordering::Relaxed);
    }
}

fn parent(path: &str) -> &str {
    path.rsplit_once('/').map(|(dir, _)| dir).unwrap_or("")
}

fn base_name(path: &str) -> &str {
    path.rsplit_once('/').map(|(_, name)| name).unwrap_or(path)
}

#[async_trait]
impl ScmClient for FakeScmClient {
    async fn changed_files_in_pull_request(&self, number: u64) -> ScmResult<Vec<String>> {
        self.record_call();
        self.pr_changes
            .get(&number)
            .cloned()
            .ok_or_else(|| ScmError::Transport(format!("unknown pull request {number}")))
    }

    async fn changed_files_in_diff(&self, _base: &str, _head: &str) -> ScmResult<Vec<String>> {
        self.record_call();
        Ok(self.diff_changes.clone())
    }

    async fn get_file_contents(&self, path: &str, _revision: &str) -> ScmResult<String> {
        self.record_call();
        if self.fail_contents.contains(path) {
            return Err(ScmError::Transport(format!("injected failure for {path}")));
        }
        self.files
            .iter()
            .find(|(p, _)| p == path)
            .map(|(_, contents)| contents.clone())
            .ok_or_else(|| ScmError::NotFound {
                path: path.to_string(),
            })
    }

    async fn get_file_listing(
        &self,
        directory: &str,
        _revision: &str,
    ) -> ScmResult<Vec<FileEntry>> {
        self.record_call();
        let mut entries: Vec<FileEntry> = Vec::new();
        let mut seen_dirs: HashSet<String> = HashSet::new();

        for (path, _) in &self.files {
            if parent(path) == directory {
                entries.push(FileEntry {
                    path: path.clone(),
                    name: base_name(path).to_string(),
                    kind: EntryKind::File,
                });
                continue;
            }
            // A deeper path contributes its first segment below `directory`
            // as a subdirectory entry.
            let rest = if directory.is_empty() {
                Some(path.as_str())
            } else {
                path.strip_prefix(directory)
                    .and_then(|r| r.strip_prefix('/'))
            };
            if let Some(rest) = rest {
                if let Some((segment, _)) = rest.split_once('/') {
                    let dir_path = crate::scm::join_path(directory, segment);
                    if seen_dirs.insert(dir_path.clone()) {
                        entries.push(FileEntry {
                            path: dir_path,
                            name: segment.to_string(),
                            kind: EntryKind::Dir,
                        });
                    }
                }
            }
        }
        Ok(entries)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn listing_derives_subdirectories_in_insertion_order() {
        let client = FakeScmClient::new()
            .with_file("b/.drone.yml", "x")
            .with_file("a/deep/file.txt", "y")
            .with_file("README.md", "z");

        let root = client.get_file_listing("", "rev").await.unwrap();
        let names: Vec<&str> = root.iter().map(|e| e.name.as_str()).collect();
        assert_eq!(names, ["b", "a", "README.md"]);
        assert_eq!(root[0].kind, EntryKind::Dir);
        assert_eq!(root[2].kind, EntryKind::File);

        let a = client.get_file_listing("a", "rev").await.unwrap();
        assert_eq!(a.len(), 1);
        assert_eq!(a[0].path, "a/deep");
        assert_eq!(a[0].kind, EntryKind::Dir);
    }

    #[tokio::test]
    async fn missing_file_is_not_found() {
        let client = FakeScmClient::new();
        let err = client.get_file_contents(".drone.yml", "rev").await.unwrap_err();
        assert!(matches!(err, ScmError::NotFound { .. }));
    }

    #[tokio::test]
    async fn calls_are_counted() {
        let client = FakeScmClient::new().with_file("x", "y");
        assert_eq!(client.scm_calls(), 0);
        let _ = client.get_file_contents("x", "rev").await;
        let _ = client.get_file_listing("", "rev").await;
        assert_eq!(client.scm_calls(), 2);
    }
}
