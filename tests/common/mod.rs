#![allow(dead_code)]

use git2::{Repository, RepositoryInitOptions, Signature, WorktreeAddOptions};
use std::fs;
use std::path::{Path, PathBuf};
use std::process::{Command, Stdio};

/// Run the binary in `cwd` with `HOME` pointed at `home`. Stdin is not a
/// terminal, so no prompts are shown.
pub fn run_cli(cwd: &Path, home: &Path, args: &[&str]) -> (i32, String, String) {
    let output = Command::new(env!("CARGO_BIN_EXE_lazywork"))
        .args(args)
        .current_dir(cwd)
        .env("HOME", home)
        .env("SHELL", "/bin/bash")
        .env_remove("LAZYWORK_LOG")
        .env_remove("XDG_CONFIG_HOME")
        .stdin(Stdio::null())
        .output()
        .expect("failed to spawn binary");
    (
        output.status.code().unwrap_or(-1),
        String::from_utf8_lossy(&output.stdout).to_string(),
        String::from_utf8_lossy(&output.stderr).to_string(),
    )
}

/// Run with `--json` and parse stdout.
pub fn run_json(cwd: &Path, home: &Path, args: &[&str]) -> (i32, serde_json::Value) {
    let mut full = args.to_vec();
    full.push("--json");
    let (code, stdout, stderr) = run_cli(cwd, home, &full);
    let value = serde_json::from_str(&stdout)
        .unwrap_or_else(|e| panic!("stdout is not JSON ({e}): {stdout:?} stderr: {stderr:?}"));
    (code, value)
}

/// A git repo on `main` with one commit containing README.md, plus a
/// separate home directory. Both must be kept alive for the test.
pub struct Sandbox {
    pub repo: tempfile::TempDir,
    pub home: tempfile::TempDir,
}

impl Sandbox {
    pub fn new() -> Self {
        let repo = tempfile::tempdir().unwrap();
        let mut opts = RepositoryInitOptions::new();
        opts.initial_head("main");
        let git = Repository::init_opts(repo.path(), &opts).unwrap();
        let mut config = git.config().unwrap();
        config.set_str("user.name", "Test").unwrap();
        config.set_str("user.email", "test@test.com").unwrap();
        commit_file(repo.path(), "README.md", "# test\n", "initial");
        Self {
            repo,
            home: tempfile::tempdir().unwrap(),
        }
    }

    /// Canonical path of the main checkout.
    pub fn root(&self) -> PathBuf {
        fs::canonicalize(self.repo.path()).unwrap()
    }

    pub fn run(&self, cwd: &Path, args: &[&str]) -> (i32, String, String) {
        run_cli(cwd, self.home.path(), args)
    }

    pub fn json(&self, cwd: &Path, args: &[&str]) -> (i32, serde_json::Value) {
        run_json(cwd, self.home.path(), args)
    }

    /// Add a linked worktree at `.worktrees/<name>` on a new branch `<name>`.
    pub fn add_worktree(&self, name: &str) -> PathBuf {
        let root = self.root();
        let repo = Repository::open(&root).unwrap();
        let head = repo.head().unwrap().peel_to_commit().unwrap();
        let branch = repo.branch(name, &head, false).unwrap();
        let base = root.join(".worktrees");
        fs::create_dir_all(&base).unwrap();
        let path = base.join(name);
        let mut opts = WorktreeAddOptions::new();
        opts.reference(Some(branch.get()));
        repo.worktree(name, &path, Some(&opts)).unwrap();
        path
    }

    pub fn history(&self) -> serde_json::Value {
        let path = self
            .home
            .path()
            .join(".config")
            .join("lazywork")
            .join("history.json");
        serde_json::from_str(&fs::read_to_string(path).unwrap()).unwrap()
    }
}

/// Write `name` in the worktree at `root` and commit it on that worktree's HEAD.
pub fn commit_file(root: &Path, name: &str, contents: &str, message: &str) {
    let repo = Repository::open(root).unwrap();
    fs::write(root.join(name), contents).unwrap();
    let mut index = repo.index().unwrap();
    index.add_path(Path::new(name)).unwrap();
    index.write().unwrap();
    let tree = repo.find_tree(index.write_tree().unwrap()).unwrap();
    let sig = Signature::now("Test", "test@test.com").unwrap();
    let parent = repo.head().ok().and_then(|h| h.peel_to_commit().ok());
    let parents: Vec<_> = parent.iter().collect();
    repo.commit(Some("HEAD"), &sig, &sig, message, &tree, &parents)
        .unwrap();
}

/// Short name of the branch HEAD points at in the worktree at `root`.
pub fn head_branch(root: &Path) -> String {
    let repo = Repository::open(root).unwrap();
    repo.head().unwrap().shorthand().unwrap().to_string()
}

pub fn branch_exists(root: &Path, name: &str) -> bool {
    let repo = Repository::open(root).unwrap();
    repo.find_branch(name, git2::BranchType::Local).is_ok()
}
