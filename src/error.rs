use std::fmt;

/// Stable machine-readable error codes, emitted verbatim in `--json` mode.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorCode {
    NotGitRepo,
    NotMainWorktree,
    DetachedHead,
    StateExists,
    NoState,
    NoPrevious,
    UncommittedChanges,
    NotOnMainBranch,
    MainBranchNotFound,
    InvalidTarget,
    WorktreeNotFound,
    NameRequired,
    NoWorktrees,
    Cancelled,
    EmptyName,
    CheckoutError,
    StashError,
    StateError,
    MergeConflict,
    MergeError,
    WorktreeListError,
    WorktreeAddError,
    WorktreeRemoveError,
    WorktreePruneError,
    BranchExists,
    BranchNotFound,
    HistoryError,
    ConfigLoadError,
    ConfigSaveError,
    ConfigExists,
    InvalidKey,
    UnsupportedShell,
    GitError,
}

impl ErrorCode {
    pub fn as_str(self) -> &'static str {
        match self {
            ErrorCode::NotGitRepo => "NOT_GIT_REPO",
            ErrorCode::NotMainWorktree => "NOT_MAIN_WORKTREE",
            ErrorCode::DetachedHead => "DETACHED_HEAD",
            ErrorCode::StateExists => "STATE_EXISTS",
            ErrorCode::NoState => "NO_STATE",
            ErrorCode::NoPrevious => "NO_PREVIOUS",
            ErrorCode::UncommittedChanges => "UNCOMMITTED_CHANGES",
            ErrorCode::NotOnMainBranch => "NOT_ON_MAIN_BRANCH",
            ErrorCode::MainBranchNotFound => "MAIN_BRANCH_NOT_FOUND",
            ErrorCode::InvalidTarget => "INVALID_TARGET",
            ErrorCode::WorktreeNotFound => "WORKTREE_NOT_FOUND",
            ErrorCode::NameRequired => "NAME_REQUIRED",
            ErrorCode::NoWorktrees => "NO_WORKTREES",
            ErrorCode::Cancelled => "CANCELLED",
            ErrorCode::EmptyName => "EMPTY_NAME",
            ErrorCode::CheckoutError => "CHECKOUT_ERROR",
            ErrorCode::StashError => "STASH_ERROR",
            ErrorCode::StateError => "STATE_ERROR",
            ErrorCode::MergeConflict => "MERGE_CONFLICT",
            ErrorCode::MergeError => "MERGE_ERROR",
            ErrorCode::WorktreeListError => "WORKTREE_LIST_ERROR",
            ErrorCode::WorktreeAddError => "WORKTREE_ADD_ERROR",
            ErrorCode::WorktreeRemoveError => "WORKTREE_REMOVE_ERROR",
            ErrorCode::WorktreePruneError => "WORKTREE_PRUNE_ERROR",
            ErrorCode::BranchExists => "BRANCH_EXISTS",
            ErrorCode::BranchNotFound => "BRANCH_NOT_FOUND",
            ErrorCode::HistoryError => "HISTORY_ERROR",
            ErrorCode::ConfigLoadError => "CONFIG_LOAD_ERROR",
            ErrorCode::ConfigSaveError => "CONFIG_SAVE_ERROR",
            ErrorCode::ConfigExists => "CONFIG_EXISTS",
            ErrorCode::InvalidKey => "INVALID_KEY",
            ErrorCode::UnsupportedShell => "UNSUPPORTED_SHELL",
            ErrorCode::GitError => "GIT_ERROR",
        }
    }
}

impl fmt::Display for ErrorCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A user-facing failure: a stable code plus a human sentence.
#[derive(Debug, thiserror::Error)]
#[error("{message}")]
pub struct CommandError {
    pub code: ErrorCode,
    pub message: String,
}

impl CommandError {
    pub fn new(code: ErrorCode, message: impl Into<String>) -> Self {
        Self {
            code,
            message: message.into(),
        }
    }

    /// Wrap a plumbing error, keeping its full context chain in the message.
    pub fn wrap(code: ErrorCode, err: anyhow::Error) -> Self {
        Self::new(code, format!("{err:#}"))
    }
}

pub type CommandResult<T> = std::result::Result<T, CommandError>;

/// Attach an error code to a plumbing result.
pub trait WithCode<T> {
    fn code(self, code: ErrorCode) -> CommandResult<T>;
}

impl<T> WithCode<T> for anyhow::Result<T> {
    fn code(self, code: ErrorCode) -> CommandResult<T> {
        self.map_err(|e| CommandError::wrap(code, e))
    }
}
