use anyhow::Result;
use serde::Serialize;
use std::path::{Path, PathBuf};

mod repo;

#[cfg(test)]
mod tests;

pub use repo::GitRepo;

/// One entry of the repository's worktree list.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct WorktreeDescriptor {
    pub path: PathBuf,
    pub head: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub branch: Option<String>,
    #[serde(skip_serializing_if = "std::ops::Not::not")]
    pub bare: bool,
}

impl WorktreeDescriptor {
    /// Last path segment, the name users type.
    pub fn name(&self) -> String {
        self.path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_else(|| self.path.display().to_string())
    }

    /// Branch name, or `detached:<short sha>` when HEAD is detached.
    pub fn branch_label(&self) -> String {
        match &self.branch {
            Some(b) => b.clone(),
            None => format!("detached:{}", short_sha(&self.head)),
        }
    }
}

pub fn short_sha(sha: &str) -> &str {
    sha.get(..7).unwrap_or(sha)
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MergeOutcome {
    UpToDate,
    FastForward,
    Merged,
    /// The merge stopped with conflicts; the index and working tree are left
    /// in the merging state.
    Conflicts(Vec<String>),
}

/// The git operations the navigation core depends on. Everything is
/// relative to the repository discovered from the working directory.
pub trait VcsBackend {
    /// Canonical common git directory, shared by every worktree of a clone.
    fn repo_identity(&self) -> Result<String>;
    /// This worktree's own git directory.
    fn git_dir(&self) -> PathBuf;
    /// Root of the worktree the process is standing in.
    fn worktree_root(&self) -> Result<PathBuf>;
    fn is_main_worktree(&self) -> bool;
    fn list_worktrees(&self) -> Result<Vec<WorktreeDescriptor>>;
    /// `None` when HEAD is detached.
    fn current_branch(&self) -> Result<Option<String>>;
    fn has_uncommitted_changes(&self) -> Result<bool>;
    fn checkout(&mut self, branch: &str) -> Result<()>;
    /// Stash local changes and return a reference that `stash_pop` accepts.
    fn stash(&mut self, message: &str) -> Result<String>;
    fn stash_pop(&mut self, stash_ref: &str) -> Result<()>;
    fn merge(&mut self, branch: &str) -> Result<MergeOutcome>;
    fn delete_branch(&mut self, name: &str, force: bool) -> Result<()>;
    fn remove_worktree(&mut self, path: &Path, force: bool) -> Result<()>;
    /// Add a worktree at `path` on `branch`, creating the branch from HEAD
    /// when `create_branch` is set.
    fn add_worktree(&mut self, path: &Path, branch: &str, create_branch: bool) -> Result<()>;
    /// Drop administrative entries for worktrees whose directories are gone.
    fn prune_worktrees(&mut self) -> Result<usize>;
    fn branch_exists(&self, name: &str) -> bool;

    /// First of `main`, `master` that exists.
    fn main_branch(&self) -> Option<String> {
        ["main", "master"]
            .into_iter()
            .find(|b| self.branch_exists(b))
            .map(String::from)
    }
}
