//! Local-directory SCM backend.
//!
//! Serves file contents and listings from a checkout on disk and answers
//! diff queries from an operator-supplied changed-file list, so the engine
//! can be exercised end-to-end without network credentials. Revisions are
//! ignored: the checkout on disk is the only revision there is.

use std::io;
use std::path::PathBuf;

use async_trait::async_trait;
use treeconfig::{EntryKind, FileEntry, ScmClient, ScmError, ScmResult};

pub struct LocalDirClient {
    root: PathBuf,
    changed: Vec<String>,
}

impl LocalDirClient {
    pub fn new(root: PathBuf, changed: Vec<String>) -> Self {
        LocalDirClient { root, changed }
    }

    fn map_io(path: &str, err: io::Error) -> ScmError {
        if err.kind() == io::ErrorKind::NotFound {
            ScmError::NotFound {
                path: path.to_string(),
            }
        } else {
            ScmError::Transport(format!("{path}: {err}"))
        }
    }
}

#[async_trait]
impl ScmClient for LocalDirClient {
    async fn changed_files_in_pull_request(&self, _number: u64) -> ScmResult<Vec<String>> {
        Ok(self.changed.clone())
    }

    async fn changed_files_in_diff(&self, _base: &str, _head: &str) -> ScmResult<Vec<String>> {
        Ok(self.changed.clone())
    }

    async fn get_file_contents(&self, path: &str, _revision: &str) -> ScmResult<String> {
        std::fs::read_to_string(self.root.join(path)).map_err(|err| Self::map_io(path, err))
    }

    async fn get_file_listing(
        &self,
        directory: &str,
        _revision: &str,
    ) -> ScmResult<Vec<FileEntry>> {
        let dir = if directory.is_empty() {
            self.root.clone()
        } else {
            self.root.join(directory)
        };

        let mut entries = Vec::new();
        let read_dir = std::fs::read_dir(&dir).map_err(|err| Self::map_io(directory, err))?;
        for entry in read_dir {
            let entry = entry.map_err(|err| Self::map_io(directory, err))?;
            let name = entry.file_name().to_string_lossy().into_owned();
            if name == ".git" {
                continue;
            }
            let file_type = entry
                .file_type()
                .map_err(|err| Self::map_io(directory, err))?;
            let kind = if file_type.is_dir() {
                EntryKind::Dir
            } else {
                EntryKind::File
            };
            let path = if directory.is_empty() {
                name.clone()
            } else {
                format!("{directory}/{name}")
            };
            entries.push(FileEntry { path, name, kind });
        }
        // Filesystem order is arbitrary; sort so this backend's listing
        // order is stable across runs.
        entries.sort_by(|a, b| a.name.cmp(&b.name));
        Ok(entries)
    }
}
