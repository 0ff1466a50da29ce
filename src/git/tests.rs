use super::repo::normalize_path;
use super::*;
use git2::{Repository, RepositoryInitOptions};
use std::fs;

// ===================================================================
// Test helpers
// ===================================================================

/// A repo on `main` with one commit containing README.md.
fn temp_repo() -> tempfile::TempDir {
    let dir = tempfile::tempdir().unwrap();
    let mut opts = RepositoryInitOptions::new();
    opts.initial_head("main");
    let repo = Repository::init_opts(dir.path(), &opts).unwrap();
    let mut config = repo.config().unwrap();
    config.set_str("user.name", "Test").unwrap();
    config.set_str("user.email", "test@test.com").unwrap();
    commit_file(dir.path(), "README.md", "# test\n", "initial");
    dir
}

/// Write `name` in the worktree at `root` and commit it on the current branch.
fn commit_file(root: &Path, name: &str, contents: &str, message: &str) {
    let repo = Repository::open(root).unwrap();
    fs::write(root.join(name), contents).unwrap();
    let mut index = repo.index().unwrap();
    index.add_path(Path::new(name)).unwrap();
    index.write().unwrap();
    let tree = repo.find_tree(index.write_tree().unwrap()).unwrap();
    let sig = repo.signature().unwrap();
    let parent = repo.head().ok().and_then(|h| h.peel_to_commit().ok());
    let parents: Vec<&git2::Commit> = parent.iter().collect();
    repo.commit(Some("HEAD"), &sig, &sig, message, &tree, &parents)
        .unwrap();
}

fn open(path: &Path) -> GitRepo {
    GitRepo::discover(path, ".worktrees").unwrap()
}

fn add_linked(root: &Path, name: &str) -> PathBuf {
    let path = root.join(".worktrees").join(name);
    open(root).add_worktree(&path, name, true).unwrap();
    normalize_path(&path)
}

// ===================================================================
// Discovery and listing
// ===================================================================

#[test]
fn discover_fails_outside_a_repo() {
    let dir = tempfile::tempdir().unwrap();
    assert!(GitRepo::discover(dir.path(), ".worktrees").is_err());
}

#[test]
fn lists_main_then_linked_worktrees() {
    let dir = temp_repo();
    let a = add_linked(dir.path(), "feature-a");
    let b = add_linked(dir.path(), "feature-b");

    let list = open(dir.path()).list_worktrees().unwrap();
    assert_eq!(list.len(), 3);
    assert_eq!(list[0].path, normalize_path(dir.path()));
    assert_eq!(list[0].branch.as_deref(), Some("main"));
    assert_eq!(list[1].path, a);
    assert_eq!(list[1].branch.as_deref(), Some("feature-a"));
    assert_eq!(list[2].path, b);
    assert_eq!(list[2].head.len(), 40);
    assert!(list.iter().all(|w| !w.bare));
}

#[test]
fn identity_is_shared_across_worktrees() {
    let dir = temp_repo();
    let a = add_linked(dir.path(), "feature-a");

    let from_main = open(dir.path());
    let from_linked = open(&a);
    assert_eq!(
        from_main.repo_identity().unwrap(),
        from_linked.repo_identity().unwrap()
    );
    assert!(from_main.is_main_worktree());
    assert!(!from_linked.is_main_worktree());
    assert_eq!(from_linked.worktree_root().unwrap(), a);
    assert_ne!(from_main.git_dir(), from_linked.git_dir());
}

#[test]
fn main_branch_prefers_main_over_master() {
    let dir = temp_repo();
    let backend = open(dir.path());
    assert_eq!(backend.main_branch().as_deref(), Some("main"));
    assert!(backend.branch_exists("main"));
    assert!(!backend.branch_exists("master"));
}

// ===================================================================
// Working tree state
// ===================================================================

#[test]
fn dirty_check_ignores_worktree_dir() {
    let dir = temp_repo();
    add_linked(dir.path(), "feature-a");
    let backend = open(dir.path());
    assert!(!backend.has_uncommitted_changes().unwrap());

    fs::write(dir.path().join("scratch.txt"), "x").unwrap();
    assert!(backend.has_uncommitted_changes().unwrap());
}

#[test]
fn detached_head_has_no_branch() {
    let dir = temp_repo();
    let repo = Repository::open(dir.path()).unwrap();
    let oid = repo.head().unwrap().target().unwrap();
    repo.set_head_detached(oid).unwrap();
    assert_eq!(open(dir.path()).current_branch().unwrap(), None);
}

#[test]
fn checkout_borrows_branch_from_linked_worktree() {
    let dir = temp_repo();
    let a = add_linked(dir.path(), "feature-a");
    commit_file(&a, "a.txt", "from a\n", "work on a");

    let mut backend = open(dir.path());
    backend.checkout("feature-a").unwrap();
    assert_eq!(backend.current_branch().unwrap().as_deref(), Some("feature-a"));
    assert!(dir.path().join("a.txt").exists());

    backend.checkout("main").unwrap();
    assert_eq!(backend.current_branch().unwrap().as_deref(), Some("main"));
    assert!(!dir.path().join("a.txt").exists());
}

#[test]
fn checkout_unknown_branch_fails() {
    let dir = temp_repo();
    assert!(open(dir.path()).checkout("nope").is_err());
}

#[test]
fn stash_and_pop_restore_changes() {
    let dir = temp_repo();
    let mut backend = open(dir.path());
    fs::write(dir.path().join("README.md"), "# changed\n").unwrap();

    let stash_ref = backend.stash("lazywork: test").unwrap();
    assert!(!backend.has_uncommitted_changes().unwrap());

    backend.stash_pop(&stash_ref).unwrap();
    assert_eq!(
        fs::read_to_string(dir.path().join("README.md")).unwrap(),
        "# changed\n"
    );
}

#[test]
fn stash_pop_accepts_legacy_reference() {
    let dir = temp_repo();
    let mut backend = open(dir.path());
    fs::write(dir.path().join("README.md"), "# legacy\n").unwrap();
    backend.stash("legacy").unwrap();
    backend.stash_pop("stash@{0}").unwrap();
    assert!(backend.has_uncommitted_changes().unwrap());
}

#[test]
fn stash_takes_untracked_only_changes() {
    let dir = temp_repo();
    let mut backend = open(dir.path());
    fs::write(dir.path().join("notes.txt"), "todo\n").unwrap();
    assert!(backend.has_uncommitted_changes().unwrap());

    let stash_ref = backend.stash("lazywork: untracked").unwrap();
    assert!(!dir.path().join("notes.txt").exists());
    assert!(!backend.has_uncommitted_changes().unwrap());

    backend.stash_pop(&stash_ref).unwrap();
    assert_eq!(
        fs::read_to_string(dir.path().join("notes.txt")).unwrap(),
        "todo\n"
    );
}

#[test]
fn stash_leaves_linked_worktrees_in_place() {
    let dir = temp_repo();
    let a = add_linked(dir.path(), "feature-a");
    let mut backend = open(dir.path());
    fs::write(dir.path().join("notes.txt"), "todo\n").unwrap();

    backend.stash("lazywork: untracked").unwrap();
    assert!(a.join("README.md").exists());
    assert!(a.join(".git").exists());

    let exclude = fs::read_to_string(dir.path().join(".git").join("info").join("exclude")).unwrap();
    assert_eq!(exclude.lines().filter(|l| *l == "/.worktrees/").count(), 1);
}

#[test]
fn stash_pop_of_missing_entry_leaves_other_stashes() {
    let dir = temp_repo();
    let mut backend = open(dir.path());
    fs::write(dir.path().join("README.md"), "# someone else's\n").unwrap();
    backend.stash("user stash").unwrap();

    let err = backend
        .stash_pop("0123456789abcdef0123456789abcdef01234567")
        .unwrap_err();
    assert!(format!("{err:#}").contains("no longer in the stash list"));
    assert!(!backend.has_uncommitted_changes().unwrap());
    backend.stash_pop("stash@{0}").unwrap();
}

// ===================================================================
// Merge and cleanup
// ===================================================================

#[test]
fn merge_fast_forwards() {
    let dir = temp_repo();
    let a = add_linked(dir.path(), "feature-a");
    commit_file(&a, "a.txt", "a\n", "add a");

    let mut backend = open(dir.path());
    assert_eq!(backend.merge("feature-a").unwrap(), MergeOutcome::FastForward);
    assert!(dir.path().join("a.txt").exists());
    assert_eq!(backend.merge("feature-a").unwrap(), MergeOutcome::UpToDate);
}

#[test]
fn merge_creates_merge_commit_for_diverged_branches() {
    let dir = temp_repo();
    let a = add_linked(dir.path(), "feature-a");
    commit_file(&a, "a.txt", "a\n", "add a");
    commit_file(dir.path(), "main.txt", "m\n", "add main");

    let mut backend = open(dir.path());
    assert_eq!(backend.merge("feature-a").unwrap(), MergeOutcome::Merged);
    let repo = Repository::open(dir.path()).unwrap();
    let head = repo.head().unwrap().peel_to_commit().unwrap();
    assert_eq!(head.parent_count(), 2);
    assert_eq!(repo.state(), git2::RepositoryState::Clean);
}

#[test]
fn merge_reports_conflicts() {
    let dir = temp_repo();
    let a = add_linked(dir.path(), "feature-a");
    commit_file(&a, "README.md", "# from a\n", "edit on a");
    commit_file(dir.path(), "README.md", "# from main\n", "edit on main");

    match open(dir.path()).merge("feature-a").unwrap() {
        MergeOutcome::Conflicts(paths) => assert_eq!(paths, vec!["README.md".to_string()]),
        other => panic!("expected conflicts, got {other:?}"),
    }
}

#[test]
fn delete_branch_refuses_unmerged_without_force() {
    let dir = temp_repo();
    let a = add_linked(dir.path(), "feature-a");
    commit_file(&a, "a.txt", "a\n", "add a");

    let mut backend = open(dir.path());
    backend.remove_worktree(&a, false).unwrap();
    assert!(backend.delete_branch("feature-a", false).is_err());
    backend.delete_branch("feature-a", true).unwrap();
    assert!(!backend.branch_exists("feature-a"));
}

#[test]
fn remove_worktree_refuses_dirty_without_force() {
    let dir = temp_repo();
    let a = add_linked(dir.path(), "feature-a");
    fs::write(a.join("wip.txt"), "wip").unwrap();

    let mut backend = open(dir.path());
    assert!(backend.remove_worktree(&a, false).is_err());
    assert!(a.exists());
    backend.remove_worktree(&a, true).unwrap();
    assert!(!a.exists());
    assert_eq!(backend.list_worktrees().unwrap().len(), 1);
}

#[test]
fn prune_drops_missing_worktrees() {
    let dir = temp_repo();
    let a = add_linked(dir.path(), "feature-a");
    add_linked(dir.path(), "feature-b");
    fs::remove_dir_all(&a).unwrap();

    let mut backend = open(dir.path());
    assert_eq!(backend.prune_worktrees().unwrap(), 1);
    let names: Vec<String> = backend
        .list_worktrees()
        .unwrap()
        .iter()
        .map(|w| w.name())
        .collect();
    assert!(names.contains(&"feature-b".to_string()));
    assert!(!names.contains(&"feature-a".to_string()));
}

#[test]
fn descriptor_labels() {
    let wt = WorktreeDescriptor {
        path: PathBuf::from("/repo/.worktrees/feature-a"),
        head: "0123456789abcdef".into(),
        branch: None,
        bare: false,
    };
    assert_eq!(wt.name(), "feature-a");
    assert_eq!(wt.branch_label(), "detached:0123456");
}
