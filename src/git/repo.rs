use super::{MergeOutcome, VcsBackend, WorktreeDescriptor};
use anyhow::{Context, Result, bail};
use git2::build::CheckoutBuilder;
use git2::{
    BranchType, ErrorCode, Repository, Signature, StashFlags, StatusOptions, WorktreeAddOptions,
    WorktreeLockStatus, WorktreePruneOptions,
};
use std::fs;
use std::io;
use std::path::{Path, PathBuf};

/// Resolve symlinks where possible and drop trailing separators, so paths
/// coming out of git2 compare equal to what a shell reports.
pub fn normalize_path(path: &Path) -> PathBuf {
    fs::canonicalize(path)
        .unwrap_or_else(|_| path.to_path_buf())
        .components()
        .collect()
}

/// Check whether a worktree has any uncommitted or untracked changes,
/// excluding anything under `ignored_dir` (where linked worktrees live).
fn has_changes(repo: &Repository, ignored_dir: &str) -> Result<bool> {
    let mut opts = StatusOptions::new();
    opts.include_untracked(true).include_ignored(false);
    let statuses = repo.statuses(Some(&mut opts)).context("checking git status")?;
    Ok(statuses.iter().any(|s| {
        ignored_dir.is_empty()
            || !s
                .path()
                .is_some_and(|p| Path::new(p).starts_with(ignored_dir))
    }))
}

/// Make sure `<dir>/` is listed in the repository's `info/exclude`, so the
/// linked worktrees living there never show up as untracked content.
fn exclude_dir(repo: &Repository, dir: &str) -> Result<()> {
    let dir = dir.trim_matches('/');
    if dir.is_empty() {
        return Ok(());
    }
    let pattern = format!("/{dir}/");
    let path = repo.commondir().join("info").join("exclude");
    let existing = match fs::read_to_string(&path) {
        Ok(contents) => contents,
        Err(e) if e.kind() == io::ErrorKind::NotFound => String::new(),
        Err(e) => return Err(e).with_context(|| format!("reading {}", path.display())),
    };
    if existing.lines().any(|line| line.trim() == pattern) {
        return Ok(());
    }
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent).with_context(|| format!("creating {}", parent.display()))?;
    }
    let mut contents = existing;
    if !contents.is_empty() && !contents.ends_with('\n') {
        contents.push('\n');
    }
    contents.push_str(&pattern);
    contents.push('\n');
    fs::write(&path, contents).with_context(|| format!("writing {}", path.display()))?;
    tracing::debug!(%pattern, "added worktree dir to info/exclude");
    Ok(())
}

/// HEAD's branch name, also for an unborn branch. `None` when detached.
fn head_branch(repo: &Repository) -> Result<Option<String>> {
    match repo.head() {
        Ok(head) if head.is_branch() => Ok(head.shorthand().map(String::from)),
        Ok(_) => Ok(None),
        Err(e) if e.code() == ErrorCode::UnbornBranch => Ok(repo
            .find_reference("HEAD")
            .ok()
            .and_then(|r| r.symbolic_target().map(String::from))
            .map(|t| t.trim_start_matches("refs/heads/").to_string())),
        Err(e) => Err(e).context("reading HEAD"),
    }
}

fn describe(repo: &Repository, path: PathBuf) -> WorktreeDescriptor {
    let head = repo
        .head()
        .ok()
        .and_then(|h| h.target())
        .map(|oid| oid.to_string())
        .unwrap_or_default();
    WorktreeDescriptor {
        path,
        head,
        branch: head_branch(repo).ok().flatten(),
        bare: repo.is_bare(),
    }
}

/// Parse the `stash@{N}` form written by older versions.
fn stash_index(stash_ref: &str) -> Option<usize> {
    stash_ref
        .strip_prefix("stash@{")?
        .strip_suffix('}')?
        .parse()
        .ok()
}

/// `VcsBackend` backed by libgit2, rooted at the repository that contains
/// the working directory.
pub struct GitRepo {
    repo: Repository,
    worktree_dir: String,
}

impl GitRepo {
    /// Discover the repository containing `cwd`. `worktree_dir` is the
    /// base directory for linked worktrees, ignored by the dirty check.
    pub fn discover(cwd: &Path, worktree_dir: &str) -> Result<Self> {
        let repo = Repository::discover(cwd)
            .with_context(|| format!("finding git repo from {}", cwd.display()))?;
        if repo.is_bare() {
            bail!("git repo is bare, no working directory");
        }
        Ok(Self {
            repo,
            worktree_dir: worktree_dir.to_string(),
        })
    }

    /// The main checkout's repository, even when standing in a linked one.
    fn main_repo(&self) -> Result<Repository> {
        let dir = if self.repo.is_worktree() {
            self.repo.commondir()
        } else {
            self.repo.path()
        };
        Repository::open(dir).with_context(|| format!("opening {}", dir.display()))
    }

    fn signature(&self) -> Result<Signature<'static>> {
        self.repo
            .signature()
            .or_else(|_| Signature::now("lazywork", "lazywork@localhost"))
            .context("building git signature")
    }

    fn find_linked(&self, path: &Path) -> Result<git2::Worktree> {
        let target = normalize_path(path);
        let names = self.repo.worktrees().context("listing worktrees")?;
        names
            .iter()
            .flatten()
            .filter_map(|name| self.repo.find_worktree(name).ok())
            .find(|wt| normalize_path(wt.path()) == target)
            .with_context(|| format!("{} is not a linked worktree", path.display()))
    }
}

impl VcsBackend for GitRepo {
    fn repo_identity(&self) -> Result<String> {
        Ok(normalize_path(self.repo.commondir()).display().to_string())
    }

    fn git_dir(&self) -> PathBuf {
        self.repo.path().to_path_buf()
    }

    fn worktree_root(&self) -> Result<PathBuf> {
        self.repo
            .workdir()
            .map(normalize_path)
            .context("git repo is bare, no working directory")
    }

    fn is_main_worktree(&self) -> bool {
        !self.repo.is_worktree()
    }

    fn list_worktrees(&self) -> Result<Vec<WorktreeDescriptor>> {
        let main = self.main_repo()?;
        let main_path = normalize_path(main.workdir().unwrap_or_else(|| main.path()));
        let mut linked = Vec::new();
        let names = main.worktrees().context("listing worktrees")?;
        for name in names.iter().flatten() {
            let wt = main
                .find_worktree(name)
                .with_context(|| format!("opening worktree {name}"))?;
            let path = normalize_path(wt.path());
            linked.push(match Repository::open_from_worktree(&wt) {
                Ok(repo) => describe(&repo, path),
                // Directory is gone; `prune` will clean it up.
                Err(_) => WorktreeDescriptor {
                    path,
                    head: String::new(),
                    branch: None,
                    bare: false,
                },
            });
        }
        linked.sort_by(|a, b| a.path.cmp(&b.path));

        let mut list = vec![describe(&main, main_path)];
        list.extend(linked);
        Ok(list)
    }

    fn current_branch(&self) -> Result<Option<String>> {
        head_branch(&self.repo)
    }

    fn has_uncommitted_changes(&self) -> Result<bool> {
        has_changes(&self.repo, &self.worktree_dir)
    }

    fn checkout(&mut self, branch: &str) -> Result<()> {
        let reference = self
            .repo
            .find_branch(branch, BranchType::Local)
            .with_context(|| format!("branch '{branch}' not found"))?
            .into_reference();
        let refname = reference
            .name()
            .context("branch name is not valid UTF-8")?
            .to_string();
        let tree = reference
            .peel_to_tree()
            .with_context(|| format!("resolving tree of {branch}"))?;
        self.repo
            .checkout_tree(tree.as_object(), Some(CheckoutBuilder::new().safe()))
            .with_context(|| format!("checking out {branch}"))?;
        // Write HEAD directly: the branch may be checked out in a linked
        // worktree, which `set_head` refuses.
        self.repo
            .reference_symbolic("HEAD", &refname, true, &format!("lazywork: checkout {branch}"))
            .context("updating HEAD")?;
        Ok(())
    }

    fn stash(&mut self, message: &str) -> Result<String> {
        // Untracked files count as changes, so they go into the stash too.
        exclude_dir(&self.repo, &self.worktree_dir)?;
        let sig = self.signature()?;
        let oid = self
            .repo
            .stash_save(&sig, message, Some(StashFlags::INCLUDE_UNTRACKED))
            .context("stashing changes")?;
        Ok(oid.to_string())
    }

    fn stash_pop(&mut self, stash_ref: &str) -> Result<()> {
        let mut index = stash_index(stash_ref);
        if index.is_none() {
            self.repo
                .stash_foreach(|i, _, oid| {
                    if oid.to_string() == stash_ref {
                        index = Some(i);
                        false
                    } else {
                        true
                    }
                })
                .context("listing stashes")?;
        }
        let Some(index) = index else {
            bail!("stash {stash_ref} is no longer in the stash list, nothing was restored");
        };
        self.repo
            .stash_pop(index, None)
            .with_context(|| format!("popping stash {stash_ref}"))
    }

    fn merge(&mut self, branch: &str) -> Result<MergeOutcome> {
        let reference = self
            .repo
            .find_branch(branch, BranchType::Local)
            .with_context(|| format!("branch '{branch}' not found"))?
            .into_reference();
        let theirs = self
            .repo
            .reference_to_annotated_commit(&reference)
            .context("resolving merge target")?;
        let (analysis, _) = self
            .repo
            .merge_analysis(&[&theirs])
            .context("analyzing merge")?;

        if analysis.is_up_to_date() {
            return Ok(MergeOutcome::UpToDate);
        }
        if analysis.is_fast_forward() {
            let mut head = self.repo.head().context("reading HEAD")?;
            head.set_target(theirs.id(), &format!("lazywork: fast-forward to {branch}"))
                .context("fast-forwarding")?;
            self.repo
                .checkout_head(Some(CheckoutBuilder::new().force()))
                .context("updating working tree")?;
            return Ok(MergeOutcome::FastForward);
        }

        self.repo
            .merge(&[&theirs], None, None)
            .with_context(|| format!("merging {branch}"))?;
        let mut index = self.repo.index().context("opening index")?;
        if index.has_conflicts() {
            let paths = index
                .conflicts()
                .context("reading conflicts")?
                .filter_map(|c| c.ok())
                .filter_map(|c| c.our.or(c.their).or(c.ancestor))
                .map(|entry| String::from_utf8_lossy(&entry.path).into_owned())
                .collect();
            return Ok(MergeOutcome::Conflicts(paths));
        }

        let tree_oid = index.write_tree().context("writing tree")?;
        let tree = self.repo.find_tree(tree_oid).context("finding tree")?;
        let ours = self
            .repo
            .head()
            .and_then(|h| h.peel_to_commit())
            .context("reading HEAD commit")?;
        let theirs = self
            .repo
            .find_commit(theirs.id())
            .context("reading merge commit")?;
        let sig = self.signature()?;
        self.repo
            .commit(
                Some("HEAD"),
                &sig,
                &sig,
                &format!("Merge branch '{branch}'"),
                &tree,
                &[&ours, &theirs],
            )
            .context("creating merge commit")?;
        self.repo.cleanup_state().context("clearing merge state")?;
        Ok(MergeOutcome::Merged)
    }

    fn delete_branch(&mut self, name: &str, force: bool) -> Result<()> {
        let mut branch = self
            .repo
            .find_branch(name, BranchType::Local)
            .with_context(|| format!("branch '{name}' not found"))?;
        if !force {
            let tip = branch.get().target().context("branch has no target")?;
            let head = self
                .repo
                .head()
                .ok()
                .and_then(|h| h.target())
                .context("HEAD has no target")?;
            let merged = tip == head || self.repo.graph_descendant_of(head, tip)?;
            if !merged {
                bail!("branch '{name}' is not fully merged");
            }
        }
        branch
            .delete()
            .with_context(|| format!("deleting branch {name}"))
    }

    fn remove_worktree(&mut self, path: &Path, force: bool) -> Result<()> {
        let wt = self.find_linked(path)?;
        if !force {
            if let WorktreeLockStatus::Locked(reason) = wt.is_locked()? {
                bail!(
                    "worktree is locked ({}), use --force to remove it",
                    reason.unwrap_or_default()
                );
            }
            if let Ok(repo) = Repository::open_from_worktree(&wt) {
                if has_changes(&repo, "")? {
                    bail!(
                        "'{}' contains modified or untracked files, use --force to remove it",
                        path.display()
                    );
                }
            }
        }
        let mut opts = WorktreePruneOptions::new();
        opts.valid(true).locked(force).working_tree(true);
        wt.prune(Some(&mut opts))
            .with_context(|| format!("removing worktree {}", path.display()))?;
        if path.exists() {
            fs::remove_dir_all(path).with_context(|| format!("removing {}", path.display()))?;
        }
        Ok(())
    }

    fn add_worktree(&mut self, path: &Path, branch: &str, create_branch: bool) -> Result<()> {
        if create_branch {
            let head = self
                .repo
                .head()
                .and_then(|h| h.peel_to_commit())
                .context("reading HEAD commit")?;
            self.repo
                .branch(branch, &head, false)
                .with_context(|| format!("creating branch {branch}"))?;
        }
        let reference = self
            .repo
            .find_branch(branch, BranchType::Local)
            .with_context(|| format!("branch '{branch}' not found"))?
            .into_reference();
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)
                .with_context(|| format!("creating {}", parent.display()))?;
        }
        let name = path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .context("worktree path has no name")?;
        exclude_dir(&self.repo, &self.worktree_dir)?;
        let mut opts = WorktreeAddOptions::new();
        opts.reference(Some(&reference));
        self.repo
            .worktree(&name, path, Some(&opts))
            .with_context(|| format!("adding worktree at {}", path.display()))?;
        Ok(())
    }

    fn prune_worktrees(&mut self) -> Result<usize> {
        let mut pruned = 0;
        let names = self.repo.worktrees().context("listing worktrees")?;
        for name in names.iter().flatten() {
            let wt = self
                .repo
                .find_worktree(name)
                .with_context(|| format!("opening worktree {name}"))?;
            if wt.is_prunable(None)? {
                wt.prune(None)
                    .with_context(|| format!("pruning worktree {name}"))?;
                tracing::debug!(name, "pruned stale worktree");
                pruned += 1;
            }
        }
        Ok(pruned)
    }

    fn branch_exists(&self, name: &str) -> bool {
        self.repo.find_branch(name, BranchType::Local).is_ok()
    }
}
