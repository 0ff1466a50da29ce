mod common;

use common::{Sandbox, branch_exists, head_branch};
use std::fs;

#[test]
fn list_main_first() {
    let sb = Sandbox::new();
    let auth = sb.add_worktree("auth");
    let (code, value) = sb.json(&auth, &["wt", "list"]);
    assert_eq!(code, 0);
    assert_eq!(value["count"], 2);
    let list = value["worktrees"].as_array().unwrap();
    assert_eq!(list[0]["path"], sb.root().display().to_string());
    assert_eq!(list[0]["branch"], "main");
    assert_eq!(list[1]["path"], auth.display().to_string());
    assert_eq!(list[1]["branch"], "auth");
    assert!(list[1].get("bare").is_none());
}

#[test]
fn list_human() {
    let sb = Sandbox::new();
    sb.add_worktree("auth");
    let (code, stdout, _) = sb.run(&sb.root(), &["worktree", "list"]);
    assert_eq!(code, 0);
    assert!(stdout.contains("Worktrees (2):"));
    assert!(stdout.contains("  auth\n"));
    assert!(stdout.contains("branch: auth"));
}

#[test]
fn add_creates_branch_and_worktree() {
    let sb = Sandbox::new();
    let root = sb.root();
    let (code, value) = sb.json(&root, &["wt", "add", "feature-x"]);
    assert_eq!(code, 0, "{value}");
    let path = root.join(".worktrees").join("feature-x");
    assert_eq!(value["path"], path.display().to_string());
    assert_eq!(value["branch"], "feature-x");
    assert!(path.join("README.md").exists());
    assert_eq!(head_branch(&path), "feature-x");
}

#[test]
fn add_from_linked_worktree_lands_under_main() {
    let sb = Sandbox::new();
    let auth = sb.add_worktree("auth");
    let (code, value) = sb.json(&auth, &["wt", "add", "other"]);
    assert_eq!(code, 0, "{value}");
    assert!(sb.root().join(".worktrees").join("other").exists());
}

#[test]
fn add_existing_branch() {
    let sb = Sandbox::new();
    let root = sb.root();
    let (code, value) = sb.json(&root, &["wt", "add", "main"]);
    assert_eq!(code, 1);
    assert_eq!(value["code"], "BRANCH_EXISTS");

    let repo = git2::Repository::open(&root).unwrap();
    let head = repo.head().unwrap().peel_to_commit().unwrap();
    repo.branch("existing", &head, false).unwrap();
    let (code, value) = sb.json(&root, &["wt", "add", "copy", "-b", "existing"]);
    assert_eq!(code, 0, "{value}");
    assert_eq!(head_branch(&root.join(".worktrees").join("copy")), "existing");
}

#[test]
fn add_from_missing_branch() {
    let sb = Sandbox::new();
    let (code, value) = sb.json(&sb.root(), &["wt", "add", "x", "--branch", "ghost"]);
    assert_eq!(code, 1);
    assert_eq!(value["code"], "BRANCH_NOT_FOUND");
}

#[test]
fn add_name_rules() {
    let sb = Sandbox::new();
    let (code, value) = sb.json(&sb.root(), &["wt", "add"]);
    assert_eq!(code, 1);
    assert_eq!(value["code"], "NAME_REQUIRED");

    let (code, value) = sb.json(&sb.root(), &["wt", "add", "  "]);
    assert_eq!(code, 1);
    assert_eq!(value["code"], "EMPTY_NAME");
}

#[test]
fn add_honors_configured_directory() {
    let sb = Sandbox::new();
    let root = sb.root();
    let (code, _, stderr) = sb.run(&root, &["config", "set", "worktree_dir", "trees"]);
    assert_eq!(code, 0, "{stderr}");
    let (code, value) = sb.json(&root, &["wt", "add", "x"]);
    assert_eq!(code, 0, "{value}");
    assert!(root.join("trees").join("x").exists());
}

#[test]
fn remove_worktree() {
    let sb = Sandbox::new();
    let auth = sb.add_worktree("auth");
    let root = sb.root();
    let (code, value) = sb.json(&root, &["wt", "rm", "auth"]);
    assert_eq!(code, 0, "{value}");
    assert_eq!(value["removed"], true);
    assert!(!auth.exists());
    // The branch is left alone.
    assert!(branch_exists(&root, "auth"));
}

#[test]
fn remove_dirty_needs_force() {
    let sb = Sandbox::new();
    let auth = sb.add_worktree("auth");
    fs::write(auth.join("scratch.txt"), "notes").unwrap();
    let root = sb.root();

    let (code, value) = sb.json(&root, &["wt", "remove", "auth"]);
    assert_eq!(code, 1);
    assert_eq!(value["code"], "WORKTREE_REMOVE_ERROR");
    assert!(auth.exists());

    let (code, _) = sb.json(&root, &["wt", "remove", "auth", "--force"]);
    assert_eq!(code, 0);
    assert!(!auth.exists());
}

#[test]
fn remove_main_or_unknown() {
    let sb = Sandbox::new();
    let root = sb.root();
    let name = root.file_name().unwrap().to_string_lossy().into_owned();
    let (code, value) = sb.json(&root, &["wt", "rm", &name]);
    assert_eq!(code, 1);
    assert_eq!(value["code"], "INVALID_TARGET");

    let (code, value) = sb.json(&root, &["wt", "rm", "ghost"]);
    assert_eq!(code, 1);
    assert_eq!(value["code"], "WORKTREE_NOT_FOUND");
}

#[test]
fn prune_stale_entries() {
    let sb = Sandbox::new();
    let auth = sb.add_worktree("auth");
    fs::remove_dir_all(&auth).unwrap();
    let root = sb.root();

    let (code, value) = sb.json(&root, &["wt", "prune"]);
    assert_eq!(code, 0, "{value}");
    assert_eq!(value["count"], 1);

    let (_, value) = sb.json(&root, &["wt", "list"]);
    assert_eq!(value["count"], 1);
}
