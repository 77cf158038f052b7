//! SCM capability interface.
//!
//! The resolution engine talks to source-control backends exclusively
//! through [`ScmClient`]: four operations, repository-relative paths, and
//! backend-native revision identifiers. One concrete implementation exists
//! per backend; the engine never knows which one it holds.
//!
//! Path conventions: all paths are relative to the repository root and use
//! forward slashes. The repository root directory is the empty string.

use async_trait::async_trait;

use crate::error::ScmResult;

/// Kind of a directory entry returned by [`ScmClient::get_file_listing`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EntryKind {
    File,
    Dir,
}

/// A single entry in a directory listing.
#[derive(Debug, Clone)]
pub struct FileEntry {
    /// Repository-relative path of the entry.
    pub path: String,
    /// Base name of the entry.
    pub name: String,
    /// Whether the entry is a file or a directory.
    pub kind: EntryKind,
}

/// Capability interface a source-control backend must satisfy.
///
/// Guarantees:
/// - Errors distinguish "not found" (non-fatal to discovery) from other
///   transport failures (fatal).
/// - `get_file_listing` returns entries in the backend's listing order;
///   the engine preserves that order rather than sorting.
#[async_trait]
pub trait ScmClient: Send + Sync {
    /// Paths changed by the given pull request.
    async fn changed_files_in_pull_request(&self, number: u64) -> ScmResult<Vec<String>>;

    /// Paths changed between two revisions.
    async fn changed_files_in_diff(&self, base: &str, head: &str) -> ScmResult<Vec<String>>;

    /// Contents of a file at a revision. `ScmError::NotFound` if absent.
    async fn get_file_contents(&self, path: &str, revision: &str) -> ScmResult<String>;

    /// Entries of a directory at a revision, in listing order.
    async fn get_file_listing(&self, directory: &str, revision: &str)
        -> ScmResult<Vec<FileEntry>>;
}

/// Join a directory path and an entry name, treating `""` as the root.
pub(crate) fn join_path(dir: &str, name: &str) -> String {
    if dir.is_empty() {
        name.to_string()
    } else {
        format!("{dir}/{name}")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn join_path_handles_root() {
        assert_eq!(join_path("", ".drone.yml"), ".drone.yml");
        assert_eq!(join_path("a/b", ".drone.yml"), "a/b/.drone.yml");
    }
}
