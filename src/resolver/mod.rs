use crate::error::{CommandError, CommandResult, ErrorCode};
use crate::git::WorktreeDescriptor;
use glob::Pattern;
use std::path::Path;


/// Find the worktree a user means by `token`.
///
/// Bare entries are skipped. Match order, first hit wins:
///
/// 1. the full path;
/// 2. the last path segment;
/// 3. the branch name;
/// 4. the last path segment against `*-<token>`, so `auth` finds
///    `myrepo-auth`.
pub fn resolve<'a>(
    worktrees: &'a [WorktreeDescriptor],
    token: &str,
) -> CommandResult<&'a WorktreeDescriptor> {
    let candidates = || worktrees.iter().filter(|w| !w.bare);
    let suffix = Pattern::new(&format!("*-{}", Pattern::escape(token))).ok();

    let found = candidates()
        .find(|w| w.path == Path::new(token))
        .or_else(|| candidates().find(|w| w.name() == token))
        .or_else(|| candidates().find(|w| w.branch.as_deref() == Some(token)))
        .or_else(|| {
            let suffix = suffix.as_ref()?;
            candidates().find(|w| suffix.matches(&w.name()))
        });

    match found {
        Some(w) => {
            tracing::debug!(token, path = %w.path.display(), "resolved worktree");
            Ok(w)
        }
        None => Err(CommandError::new(
            ErrorCode::WorktreeNotFound,
            format!("worktree '{token}' not found"),
        )),
    }
}

/// Worktrees living under a `base_dir` path segment (conventionally
/// `.worktrees`). The primary checkout never qualifies.
pub fn secondary<'a>(
    worktrees: &'a [WorktreeDescriptor],
    base_dir: &str,
) -> Vec<&'a WorktreeDescriptor> {
    let sep = std::path::MAIN_SEPARATOR;
    let needle = format!("{sep}{}{sep}", base_dir.trim_matches(['/', '\\']));
    let primary = worktrees.first().map(|w| w.path.as_path());
    worktrees
        .iter()
        .filter(|w| !w.bare)
        .filter(|w| Some(w.path.as_path()) != primary)
        .filter(|w| w.path.to_string_lossy().contains(&needle))
        .collect()
}
