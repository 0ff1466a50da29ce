use anyhow::{Context, Result};
use std::fs;
use std::io;
use std::path::{Path, PathBuf};

#[cfg(test)]
mod tests;

const PREVIOUS_BRANCH_FILE: &str = "LAZYWORK_PREVIOUS_BRANCH";
const STASH_REF_FILE: &str = "LAZYWORK_STASH_REF";

/// Read a single-value state file, returning `None` if it doesn't exist.
fn read_value(path: &Path) -> Result<Option<String>> {
    match fs::read_to_string(path) {
        Ok(s) => Ok(Some(s.trim().to_string())),
        Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(None),
        Err(e) => Err(e).with_context(|| format!("reading {}", path.display())),
    }
}

/// Remove a file, ignoring "not found" errors.
fn remove_if_exists(path: &Path) -> Result<()> {
    match fs::remove_file(path) {
        Ok(()) => Ok(()),
        Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(()),
        Err(e) => Err(e).with_context(|| format!("removing {}", path.display())),
    }
}

/// What `use` needs to undo on `return`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SessionState {
    pub previous_branch: String,
    pub stash_ref: Option<String>,
}

/// The single borrow-branch session of one repository, kept as plain files
/// inside that repository's git directory. The previous-branch file existing
/// is what makes the session active.
pub struct SessionStore {
    dir: PathBuf,
}

impl SessionStore {
    pub fn new(git_dir: impl Into<PathBuf>) -> Self {
        Self { dir: git_dir.into() }
    }

    fn previous_branch_path(&self) -> PathBuf {
        self.dir.join(PREVIOUS_BRANCH_FILE)
    }

    fn stash_ref_path(&self) -> PathBuf {
        self.dir.join(STASH_REF_FILE)
    }

    pub fn is_active(&self) -> bool {
        self.previous_branch_path().is_file()
    }

    pub fn load(&self) -> Result<Option<SessionState>> {
        let Some(previous_branch) = read_value(&self.previous_branch_path())? else {
            return Ok(None);
        };
        let stash_ref = read_value(&self.stash_ref_path())?.filter(|s| !s.is_empty());
        Ok(Some(SessionState {
            previous_branch,
            stash_ref,
        }))
    }

    pub fn save(&self, state: &SessionState) -> Result<()> {
        let path = self.previous_branch_path();
        fs::write(&path, &state.previous_branch)
            .with_context(|| format!("writing {}", path.display()))?;
        let stash_path = self.stash_ref_path();
        match &state.stash_ref {
            Some(stash_ref) => fs::write(&stash_path, stash_ref)
                .with_context(|| format!("writing {}", stash_path.display())),
            None => remove_if_exists(&stash_path),
        }
    }

    pub fn clear(&self) -> Result<()> {
        remove_if_exists(&self.previous_branch_path())?;
        remove_if_exists(&self.stash_ref_path())
    }
}
