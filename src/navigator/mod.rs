use crate::error::{CommandError, CommandResult, ErrorCode, WithCode};
use crate::git::{MergeOutcome, VcsBackend, WorktreeDescriptor};
use crate::history::HistoryStore;
use crate::prompt::Prompter;
use crate::resolver;
use crate::session::{SessionState, SessionStore};
use serde::Serialize;
use std::path::{Path, PathBuf};


/// Per-invocation settings, built once from the command line and config.
#[derive(Debug, Clone)]
pub struct Context {
    pub json: bool,
    /// Running under the shell wrapper: navigations print a bare `cd` line.
    pub shell_helper: bool,
    /// Attached to a terminal and not in JSON mode; prompts are allowed.
    pub interactive: bool,
    pub worktree_dir: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Navigation {
    pub name: String,
    pub path: PathBuf,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct UseOutcome {
    pub worktree: String,
    pub branch: String,
    pub previous_branch: String,
    pub stashed: bool,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ReturnOutcome {
    pub from_branch: Option<String>,
    pub branch: String,
    pub stash_restored: bool,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub warnings: Vec<String>,
}

/// What `finish` does with the worktree after a successful merge.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Cleanup {
    /// Confirm interactively; keep when there is no terminal.
    Ask,
    Delete,
    Keep,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FinishOutcome {
    pub worktree: String,
    pub branch: String,
    pub into: String,
    pub fast_forward: bool,
    pub up_to_date: bool,
    pub removed_worktree: bool,
    pub deleted_branch: bool,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub warnings: Vec<String>,
}

/// Drives `go`, `use`, `return` and `finish` against one repository.
pub struct Navigator<'a, B: VcsBackend, P: Prompter> {
    backend: &'a mut B,
    prompter: &'a P,
    history_path: PathBuf,
    ctx: Context,
}

impl<'a, B: VcsBackend, P: Prompter> Navigator<'a, B, P> {
    pub fn new(backend: &'a mut B, prompter: &'a P, history_path: PathBuf, ctx: Context) -> Self {
        Self {
            backend,
            prompter,
            history_path,
            ctx,
        }
    }

    // ---------------------------------------------------------------
    // Shared helpers
    // ---------------------------------------------------------------

    fn worktrees(&self) -> CommandResult<Vec<WorktreeDescriptor>> {
        self.backend
            .list_worktrees()
            .code(ErrorCode::WorktreeListError)
    }

    fn require_main_worktree(&self, verb: &str) -> CommandResult<()> {
        if self.backend.is_main_worktree() {
            Ok(())
        } else {
            Err(CommandError::new(
                ErrorCode::NotMainWorktree,
                format!("'{verb}' must be run from the main worktree, not a secondary one"),
            ))
        }
    }

    fn current_branch(&self) -> CommandResult<String> {
        self.backend
            .current_branch()
            .code(ErrorCode::GitError)?
            .ok_or_else(|| {
                CommandError::new(
                    ErrorCode::DetachedHead,
                    "HEAD is detached; check out a branch first",
                )
            })
    }

    fn is_dirty(&self) -> CommandResult<bool> {
        self.backend
            .has_uncommitted_changes()
            .code(ErrorCode::GitError)
    }

    fn session(&self) -> SessionStore {
        SessionStore::new(self.backend.git_dir())
    }

    /// Resolve `name`, or let the user pick a secondary worktree when it is
    /// omitted and a terminal is available.
    fn pick(
        &self,
        verb: &str,
        worktrees: &[WorktreeDescriptor],
        name: Option<&str>,
    ) -> CommandResult<WorktreeDescriptor> {
        let token = match name {
            Some(name) => name.to_string(),
            None => self.choose(verb, worktrees)?,
        };
        resolver::resolve(worktrees, &token).cloned()
    }

    fn choose(&self, verb: &str, worktrees: &[WorktreeDescriptor]) -> CommandResult<String> {
        if !self.ctx.interactive {
            return Err(CommandError::new(
                ErrorCode::NameRequired,
                format!("worktree name required (use: lazywork worktree {verb} <name>)"),
            ));
        }
        let candidates = resolver::secondary(worktrees, &self.ctx.worktree_dir);
        if candidates.is_empty() {
            return Err(CommandError::new(
                ErrorCode::NoWorktrees,
                format!("no worktrees found under {}", self.ctx.worktree_dir),
            ));
        }
        let labels: Vec<String> = candidates
            .iter()
            .map(|w| format!("{} ({})", w.name(), w.branch_label()))
            .collect();
        match self
            .prompter
            .select("Select worktree", &labels)
            .code(ErrorCode::Cancelled)?
        {
            Some(i) if i < candidates.len() => Ok(candidates[i].path.display().to_string()),
            _ => Err(CommandError::new(ErrorCode::Cancelled, "no worktree selected")),
        }
    }

    /// The branch a non-primary worktree has checked out.
    fn target_branch(
        &self,
        worktrees: &[WorktreeDescriptor],
        target: &WorktreeDescriptor,
    ) -> CommandResult<String> {
        if worktrees.first().is_some_and(|main| main.path == target.path) {
            return Err(CommandError::new(
                ErrorCode::InvalidTarget,
                format!("'{}' is the main worktree", target.name()),
            ));
        }
        target.branch.clone().ok_or_else(|| {
            CommandError::new(
                ErrorCode::DetachedHead,
                format!("worktree '{}' has a detached HEAD", target.name()),
            )
        })
    }

    /// Put back a stash taken by `use`, returning a description of the
    /// failure if it could not be restored.
    fn restore_stash(&mut self, stash_ref: Option<&str>) -> Option<String> {
        let stash_ref = stash_ref?;
        match self.backend.stash_pop(stash_ref) {
            Ok(()) => None,
            Err(e) => {
                tracing::warn!(stash_ref, error = %format!("{e:#}"), "failed to restore stash");
                Some(format!(
                    "could not restore stashed changes ({stash_ref}): {e:#}; check 'git stash list'"
                ))
            }
        }
    }

    // ---------------------------------------------------------------
    // go
    // ---------------------------------------------------------------

    pub fn go(&mut self, name: Option<&str>) -> CommandResult<Navigation> {
        let worktrees = self.worktrees()?;
        let target = self.pick("go", &worktrees, name)?;
        self.visit(target.path)
    }

    /// Jump to the worktree visited before the current one. Doing this
    /// twice returns to where you started.
    pub fn go_previous(&mut self) -> CommandResult<Navigation> {
        let repo = self.backend.repo_identity().code(ErrorCode::NotGitRepo)?;
        let history = HistoryStore::load(&self.history_path).code(ErrorCode::HistoryError)?;
        let previous = history.previous(&repo).to_string();
        if previous.is_empty() {
            return Err(CommandError::new(
                ErrorCode::NoPrevious,
                "no previous worktree to go back to",
            ));
        }
        if !Path::new(&previous).is_dir() {
            return Err(CommandError::new(
                ErrorCode::WorktreeNotFound,
                format!("previous worktree {previous} no longer exists"),
            ));
        }
        self.go(Some(&previous))
    }

    /// Record `path` as the current location. On the first visit in a
    /// repository the caller's own worktree is recorded first, so there is
    /// something to go back to.
    fn visit(&mut self, path: PathBuf) -> CommandResult<Navigation> {
        let repo = self.backend.repo_identity().code(ErrorCode::NotGitRepo)?;
        let mut history = HistoryStore::load(&self.history_path).code(ErrorCode::HistoryError)?;
        if history.current(&repo).is_empty() {
            let here = self.backend.worktree_root().code(ErrorCode::NotGitRepo)?;
            history.record_visit(&repo, &here.display().to_string());
        }
        history.record_visit(&repo, &path.display().to_string());
        history
            .save(&self.history_path)
            .code(ErrorCode::HistoryError)?;

        let name = path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_else(|| path.display().to_string());
        Ok(Navigation { name, path })
    }

    // ---------------------------------------------------------------
    // use / return
    // ---------------------------------------------------------------

    /// Check a secondary worktree's branch out in the main worktree,
    /// remembering where to return to.
    pub fn use_worktree(&mut self, name: Option<&str>) -> CommandResult<UseOutcome> {
        self.require_main_worktree("use")?;
        let store = self.session();
        if store.is_active() {
            return Err(CommandError::new(
                ErrorCode::StateExists,
                "a worktree branch is already in use; run 'lazywork worktree return' first",
            ));
        }
        let previous_branch = self.current_branch()?;
        let worktrees = self.worktrees()?;
        let target = self.pick("use", &worktrees, name)?;
        let branch = self.target_branch(&worktrees, &target)?;

        let stash_ref = if self.is_dirty()? {
            if !self.ctx.interactive {
                return Err(CommandError::new(
                    ErrorCode::UncommittedChanges,
                    "you have uncommitted changes; commit or stash them first",
                ));
            }
            let confirmed = self
                .prompter
                .confirm(
                    "You have uncommitted changes. Stash them? They are restored on return",
                    true,
                )
                .code(ErrorCode::Cancelled)?;
            if confirmed != Some(true) {
                return Err(CommandError::new(
                    ErrorCode::Cancelled,
                    "cancelled; uncommitted changes left in place",
                ));
            }
            let stash_ref = self
                .backend
                .stash(&format!("lazywork: use {branch}"))
                .code(ErrorCode::StashError)?;
            tracing::info!(%stash_ref, "stashed uncommitted changes");
            Some(stash_ref)
        } else {
            None
        };

        // Persist before checkout so a crash mid-way still knows the way back.
        let state = SessionState {
            previous_branch: previous_branch.clone(),
            stash_ref: stash_ref.clone(),
        };
        if let Err(e) = store.save(&state) {
            let mut message = format!("saving session state: {e:#}");
            if let Err(clear_err) = store.clear() {
                message.push_str(&format!("; clearing partial state: {clear_err:#}"));
            }
            if let Some(problem) = self.restore_stash(stash_ref.as_deref()) {
                message.push_str(&format!("; {problem}"));
            }
            return Err(CommandError::new(ErrorCode::StateError, message));
        }

        if let Err(e) = self.backend.checkout(&branch) {
            let mut message = format!("{e:#}");
            if let Err(clear_err) = store.clear() {
                message.push_str(&format!("; clearing session state: {clear_err:#}"));
            }
            if let Some(problem) = self.restore_stash(stash_ref.as_deref()) {
                message.push_str(&format!("; {problem}"));
            }
            return Err(CommandError::new(ErrorCode::CheckoutError, message));
        }

        tracing::info!(%branch, %previous_branch, "session started");
        Ok(UseOutcome {
            worktree: target.name(),
            branch,
            previous_branch,
            stashed: stash_ref.is_some(),
        })
    }

    /// Undo `use`: go back to the saved branch and restore stashed changes.
    pub fn return_to_previous(&mut self) -> CommandResult<ReturnOutcome> {
        self.require_main_worktree("return")?;
        let store = self.session();
        let state = store.load().code(ErrorCode::StateError)?.ok_or_else(|| {
            CommandError::new(
                ErrorCode::NoState,
                "no worktree branch in use; nothing to return from",
            )
        })?;
        if self.is_dirty()? {
            return Err(CommandError::new(
                ErrorCode::UncommittedChanges,
                "you have uncommitted changes; commit or discard them before returning",
            ));
        }
        let from_branch = self.backend.current_branch().ok().flatten();

        self.backend
            .checkout(&state.previous_branch)
            .code(ErrorCode::CheckoutError)?;

        let mut warnings = Vec::new();
        let stash_restored = match self.restore_stash(state.stash_ref.as_deref()) {
            Some(problem) => {
                warnings.push(problem);
                false
            }
            None => state.stash_ref.is_some(),
        };
        store.clear().code(ErrorCode::StateError)?;

        tracing::info!(branch = %state.previous_branch, "session ended");
        Ok(ReturnOutcome {
            from_branch,
            branch: state.previous_branch,
            stash_restored,
            warnings,
        })
    }

    // ---------------------------------------------------------------
    // finish
    // ---------------------------------------------------------------

    /// Merge a worktree's branch into the main branch, then optionally
    /// remove the worktree and its branch.
    pub fn finish(&mut self, name: Option<&str>, cleanup: Cleanup) -> CommandResult<FinishOutcome> {
        self.require_main_worktree("finish")?;
        let main_branch = self.backend.main_branch().ok_or_else(|| {
            CommandError::new(
                ErrorCode::MainBranchNotFound,
                "neither 'main' nor 'master' exists",
            )
        })?;
        let current = self.current_branch()?;
        if current != main_branch {
            return Err(CommandError::new(
                ErrorCode::NotOnMainBranch,
                format!("switch to '{main_branch}' before finishing (currently on '{current}')"),
            ));
        }
        if self.is_dirty()? {
            return Err(CommandError::new(
                ErrorCode::UncommittedChanges,
                "you have uncommitted changes; commit or stash them first",
            ));
        }

        let worktrees = self.worktrees()?;
        let target = self.pick("finish", &worktrees, name)?;
        let branch = self.target_branch(&worktrees, &target)?;
        let worktree = target.name();

        let merge = self
            .backend
            .merge(&branch)
            .code(ErrorCode::MergeError)?;
        if let MergeOutcome::Conflicts(paths) = &merge {
            return Err(CommandError::new(
                ErrorCode::MergeConflict,
                format!(
                    "merging '{branch}' into '{main_branch}' stopped with conflicts in: {}. \
                     Resolve them and commit, then run 'lazywork worktree remove {worktree}'",
                    paths.join(", ")
                ),
            ));
        }
        tracing::info!(%branch, into = %main_branch, ?merge, "merged");

        let remove = match cleanup {
            Cleanup::Delete => true,
            Cleanup::Keep => false,
            Cleanup::Ask => {
                self.ctx.interactive
                    && matches!(
                        self.prompter.confirm(
                            &format!("Delete worktree '{worktree}' and its branch?"),
                            false,
                        ),
                        Ok(Some(true))
                    )
            }
        };

        let mut outcome = FinishOutcome {
            worktree,
            branch,
            into: main_branch,
            fast_forward: merge == MergeOutcome::FastForward,
            up_to_date: merge == MergeOutcome::UpToDate,
            removed_worktree: false,
            deleted_branch: false,
            warnings: Vec::new(),
        };
        if remove {
            match self.backend.remove_worktree(&target.path, false) {
                Ok(()) => outcome.removed_worktree = true,
                Err(e) => outcome
                    .warnings
                    .push(format!("could not remove worktree '{}': {e:#}", outcome.worktree)),
            }
            match self.backend.delete_branch(&outcome.branch, false) {
                Ok(()) => outcome.deleted_branch = true,
                Err(e) => outcome
                    .warnings
                    .push(format!("could not delete branch '{}': {e:#}", outcome.branch)),
            }
        }
        Ok(outcome)
    }
}
