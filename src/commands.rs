//! Command dispatch and rendering. Each handler does its work through the
//! navigator or the backend, then prints either JSON or decorated text.

use crate::cli::{Cli, Command, ConfigCommand, ShellCommand, WorktreeCommand};
use crate::config::{self, Config};
use crate::error::{CommandError, CommandResult, ErrorCode, WithCode};
use crate::git::{GitRepo, VcsBackend, short_sha};
use crate::history;
use crate::navigator::{
    Cleanup, Context, FinishOutcome, Navigation, Navigator, ReturnOutcome, UseOutcome,
};
use crate::output::Output;
use crate::prompt::{Prompter, TerminalPrompter};
use crate::shell::{self, Shell};
use serde_json::json;
use std::io::{self, IsTerminal};
use std::path::{Path, PathBuf};

pub fn run(cli: Cli, out: &Output) -> CommandResult<()> {
    let config_path = match cli.config {
        Some(path) => path,
        None => config::default_path().code(ErrorCode::ConfigLoadError)?,
    };
    match cli.command {
        Command::Config { command } => run_config(command, &config_path, out),
        Command::Shell { command } => run_shell(command, out),
        Command::Worktree { command } => {
            let config = Config::load(&config_path).code(ErrorCode::ConfigLoadError)?;
            // Answers come from stdin; the prompt draws on stderr or, under
            // the shell wrapper, on the controlling terminal.
            let prompter = (!cli.json && io::stdin().is_terminal())
                .then(TerminalPrompter::open)
                .flatten();
            let ctx = Context {
                json: cli.json,
                shell_helper: cli.shell_helper,
                interactive: prompter.is_some(),
                worktree_dir: config.worktree_dir,
            };
            let prompter = prompter.unwrap_or_else(TerminalPrompter::stderr);
            run_worktree(command, ctx, &prompter, out)
        }
    }
}

fn home_dir() -> CommandResult<PathBuf> {
    dirs::home_dir()
        .ok_or_else(|| CommandError::new(ErrorCode::ConfigLoadError, "cannot locate home directory"))
}

// ---------------------------------------------------------------
// worktree
// ---------------------------------------------------------------

fn run_worktree(
    command: Option<WorktreeCommand>,
    ctx: Context,
    prompter: &TerminalPrompter,
    out: &Output,
) -> CommandResult<()> {
    let cwd = std::env::current_dir().map_err(|e| {
        CommandError::new(ErrorCode::NotGitRepo, format!("reading current directory: {e}"))
    })?;
    let mut repo = GitRepo::discover(&cwd, &ctx.worktree_dir).map_err(|e| {
        CommandError::new(
            ErrorCode::NotGitRepo,
            format!("not inside a git repository ({e:#})"),
        )
    })?;

    match command {
        Some(WorktreeCommand::List) => list(&repo, out),
        Some(WorktreeCommand::Add { name, branch }) => {
            add(&mut repo, prompter, &ctx, name, branch, out)
        }
        Some(WorktreeCommand::Remove { name, force }) => remove(&mut repo, &name, force, out),
        Some(WorktreeCommand::Prune) => prune(&mut repo, out),
        None => {
            let nav = navigator(&mut repo, prompter, &ctx)?.go(None)?;
            render_navigation(&nav, &ctx, out)
        }
        Some(WorktreeCommand::Go { previous: true, .. }) => {
            let nav = navigator(&mut repo, prompter, &ctx)?.go_previous()?;
            render_navigation(&nav, &ctx, out)
        }
        Some(WorktreeCommand::Go { name, .. }) => {
            let nav = navigator(&mut repo, prompter, &ctx)?.go(name.as_deref())?;
            render_navigation(&nav, &ctx, out)
        }
        Some(WorktreeCommand::Use { name }) => {
            let outcome = navigator(&mut repo, prompter, &ctx)?.use_worktree(name.as_deref())?;
            render_use(&outcome, out);
            Ok(())
        }
        Some(WorktreeCommand::Return) => {
            let outcome = navigator(&mut repo, prompter, &ctx)?.return_to_previous()?;
            render_return(&outcome, out);
            Ok(())
        }
        Some(WorktreeCommand::Finish { name, delete, keep }) => {
            let cleanup = match (delete, keep) {
                (true, _) => Cleanup::Delete,
                (_, true) => Cleanup::Keep,
                _ => Cleanup::Ask,
            };
            let outcome = navigator(&mut repo, prompter, &ctx)?.finish(name.as_deref(), cleanup)?;
            render_finish(&outcome, out);
            Ok(())
        }
    }
}

fn navigator<'a>(
    repo: &'a mut GitRepo,
    prompter: &'a TerminalPrompter,
    ctx: &Context,
) -> CommandResult<Navigator<'a, GitRepo, TerminalPrompter>> {
    let history_path = history::default_path().code(ErrorCode::HistoryError)?;
    Ok(Navigator::new(repo, prompter, history_path, ctx.clone()))
}

fn render_use(outcome: &UseOutcome, out: &Output) {
    if out.is_json() {
        out.json(outcome);
        return;
    }
    out.success(format!(
        "Now on '{}' from worktree {}",
        outcome.branch, outcome.worktree
    ));
    if outcome.stashed {
        out.info("Stashed uncommitted changes; they come back on return");
    }
    out.dim(format!(
        "Run 'lazywork worktree return' to go back to '{}'",
        outcome.previous_branch
    ));
}

fn render_return(outcome: &ReturnOutcome, out: &Output) {
    if out.is_json() {
        out.json(outcome);
        return;
    }
    for warning in &outcome.warnings {
        out.warning(warning);
    }
    out.success(format!("Returned to '{}'", outcome.branch));
    if outcome.stash_restored {
        out.info("Restored stashed changes");
    }
}

fn render_finish(outcome: &FinishOutcome, out: &Output) {
    if out.is_json() {
        out.json(outcome);
        return;
    }
    let how = if outcome.up_to_date {
        " (already up to date)"
    } else if outcome.fast_forward {
        " (fast-forward)"
    } else {
        ""
    };
    out.success(format!(
        "Merged '{}' into '{}'{how}",
        outcome.branch, outcome.into
    ));
    if outcome.removed_worktree {
        out.success(format!("Removed worktree: {}", outcome.worktree));
    }
    if outcome.deleted_branch {
        out.success(format!("Deleted branch: {}", outcome.branch));
    }
    for warning in &outcome.warnings {
        out.warning(warning);
    }
    if !outcome.removed_worktree && !outcome.deleted_branch && outcome.warnings.is_empty() {
        out.dim(format!(
            "Kept worktree; remove it later with 'lazywork worktree remove {}'",
            outcome.worktree
        ));
    }
}

/// Print a navigation for the wrapper, a script, or a person.
fn render_navigation(nav: &Navigation, ctx: &Context, out: &Output) -> CommandResult<()> {
    if ctx.shell_helper {
        println!("{}", shell::cd_line(&nav.path));
        return Ok(());
    }
    if ctx.json {
        out.json(&json!({ "name": nav.name, "path": nav.path, "cd": true }));
        return Ok(());
    }
    out.success(format!("Worktree: {}", nav.name));
    out.info(shell::cd_line(&nav.path));

    let shell = Shell::detect();
    let installed = dirs::home_dir()
        .map(|home| shell.has_init_line(&home).unwrap_or(false))
        .unwrap_or(false);
    if !installed {
        out.line("");
        out.dim("To change directory automatically, enable the shell integration:");
        out.dim(format!("  {}", shell.init_line()));
    }
    Ok(())
}

fn list<B: VcsBackend>(backend: &B, out: &Output) -> CommandResult<()> {
    let worktrees = backend
        .list_worktrees()
        .code(ErrorCode::WorktreeListError)?;

    if out.is_json() {
        out.json(&json!({ "worktrees": worktrees, "count": worktrees.len() }));
        return Ok(());
    }
    if worktrees.is_empty() {
        out.dim("No worktrees found");
        return Ok(());
    }

    out.bold(format!("Worktrees ({}):", worktrees.len()));
    out.line("");
    for wt in &worktrees {
        if wt.bare {
            out.line(format!("  {} (bare)", wt.path.display()));
        } else {
            let branch = match &wt.branch {
                Some(b) => b.clone(),
                None => format!("(detached at {})", short_sha(&wt.head)),
            };
            out.line(format!("  {}", wt.name()));
            out.dim(format!("    branch: {branch}"));
            out.dim(format!("    path:   {}", wt.path.display()));
        }
        out.line("");
    }
    Ok(())
}

fn add<B: VcsBackend, P: Prompter>(
    backend: &mut B,
    prompter: &P,
    ctx: &Context,
    name: Option<String>,
    from_branch: Option<String>,
    out: &Output,
) -> CommandResult<()> {
    let name = match name {
        Some(name) => name.trim().to_string(),
        None if ctx.interactive => prompter
            .input("Branch name")
            .code(ErrorCode::Cancelled)?,
        None => {
            return Err(CommandError::new(
                ErrorCode::NameRequired,
                "branch name required (use: lazywork worktree add <name>)",
            ));
        }
    };
    if name.is_empty() {
        return Err(CommandError::new(
            ErrorCode::EmptyName,
            "branch name cannot be empty",
        ));
    }

    // New worktrees always live under the main checkout.
    let worktrees = backend
        .list_worktrees()
        .code(ErrorCode::WorktreeListError)?;
    let root = match worktrees.first() {
        Some(main) => main.path.clone(),
        None => backend.worktree_root().code(ErrorCode::NotGitRepo)?,
    };
    let path = root.join(&ctx.worktree_dir).join(&name);

    let branch = match from_branch {
        Some(branch) => {
            if !backend.branch_exists(&branch) {
                return Err(CommandError::new(
                    ErrorCode::BranchNotFound,
                    format!("branch '{branch}' does not exist"),
                ));
            }
            backend
                .add_worktree(&path, &branch, false)
                .code(ErrorCode::WorktreeAddError)?;
            branch
        }
        None => {
            if backend.branch_exists(&name) {
                return Err(CommandError::new(
                    ErrorCode::BranchExists,
                    format!(
                        "branch '{name}' already exists. Use --branch to check out an existing branch"
                    ),
                ));
            }
            backend
                .add_worktree(&path, &name, true)
                .code(ErrorCode::WorktreeAddError)?;
            name.clone()
        }
    };
    tracing::info!(path = %path.display(), %branch, "worktree added");

    if out.is_json() {
        out.json(&json!({ "path": path, "branch": branch, "created": true }));
        return Ok(());
    }
    out.success(format!("Created worktree: {name}"));
    out.dim(format!("  branch: {branch}"));
    out.dim(format!("  path:   {}", path.display()));
    out.line("");
    out.info(shell::cd_line(&path));
    Ok(())
}

fn remove<B: VcsBackend>(backend: &mut B, name: &str, force: bool, out: &Output) -> CommandResult<()> {
    let worktrees = backend
        .list_worktrees()
        .code(ErrorCode::WorktreeListError)?;
    let target = crate::resolver::resolve(&worktrees, name)?;
    if worktrees.first().is_some_and(|main| main.path == target.path) {
        return Err(CommandError::new(
            ErrorCode::InvalidTarget,
            "the main worktree cannot be removed",
        ));
    }
    let path = target.path.clone();
    backend
        .remove_worktree(&path, force)
        .code(ErrorCode::WorktreeRemoveError)?;
    tracing::info!(path = %path.display(), "worktree removed");

    if out.is_json() {
        out.json(&json!({ "path": path, "removed": true }));
        return Ok(());
    }
    out.success(format!("Removed worktree: {}", target.name()));
    Ok(())
}

fn prune<B: VcsBackend>(backend: &mut B, out: &Output) -> CommandResult<()> {
    let pruned = backend
        .prune_worktrees()
        .code(ErrorCode::WorktreePruneError)?;
    if out.is_json() {
        out.json(&json!({ "pruned": true, "count": pruned }));
        return Ok(());
    }
    out.success(format!("Pruned stale worktree entries ({pruned})"));
    Ok(())
}

// ---------------------------------------------------------------
// shell
// ---------------------------------------------------------------

fn run_shell(command: ShellCommand, out: &Output) -> CommandResult<()> {
    let home = home_dir()?;
    match command {
        ShellCommand::Init { shell } => {
            let shell = match shell {
                Some(name) => name
                    .parse::<Shell>()
                    .map_err(|msg| CommandError::new(ErrorCode::UnsupportedShell, msg))?,
                None => Shell::detect(),
            };
            let script = shell.init_script(&home).code(ErrorCode::UnsupportedShell)?;
            print!("{script}");
            Ok(())
        }
        ShellCommand::Status => {
            let shell = Shell::detect();
            let rc_file = shell.rc_file(&home);
            let installed = shell.has_init_line(&home).code(ErrorCode::ConfigLoadError)?;
            if out.is_json() {
                out.json(&json!({
                    "shell": shell.name(),
                    "rc_file": rc_file,
                    "installed": installed,
                }));
                return Ok(());
            }
            out.bold("Shell Integration Status");
            out.line("");
            out.line(format!("  Shell:   {shell}"));
            out.line(format!("  RC file: {}", rc_file.display()));
            if installed {
                out.success("lazywork integration is installed");
            } else {
                out.warning("lazywork integration not found in RC file");
                out.line("");
                out.info(format!("Add this to {}:", rc_file.display()));
                out.dim(format!("  {}", shell.init_line()));
            }
            Ok(())
        }
    }
}

// ---------------------------------------------------------------
// config
// ---------------------------------------------------------------

fn run_config(command: ConfigCommand, path: &Path, out: &Output) -> CommandResult<()> {
    let exists = path.is_file();
    match command {
        ConfigCommand::Show => {
            let config = Config::load(path).code(ErrorCode::ConfigLoadError)?;
            if out.is_json() {
                out.json(&json!({
                    "path": path,
                    "exists": exists,
                    "worktree_dir": config.worktree_dir,
                    "config": config,
                }));
                return Ok(());
            }
            out.bold("lazywork configuration");
            out.line("");
            out.line(format!("  Path: {}", path.display()));
            if exists {
                out.success("Config file exists");
            } else {
                out.dim("  (using defaults, no config file)");
            }
            out.line("");
            out.line(format!("  Worktree Dir: {}", config.worktree_dir));
            Ok(())
        }
        ConfigCommand::Path => {
            if out.is_json() {
                out.json(&json!({ "path": path, "exists": exists }));
                return Ok(());
            }
            out.line(path.display().to_string());
            if !exists {
                out.dim("(file does not exist)");
            }
            Ok(())
        }
        ConfigCommand::Init => {
            if exists {
                return Err(CommandError::new(
                    ErrorCode::ConfigExists,
                    format!("config file already exists at {}", path.display()),
                ));
            }
            Config::default()
                .save(path)
                .code(ErrorCode::ConfigSaveError)?;
            if out.is_json() {
                out.json(&json!({ "path": path, "created": true }));
                return Ok(());
            }
            out.success(format!("Created config file at {}", path.display()));
            Ok(())
        }
        ConfigCommand::Set { key, value } => {
            let mut config = Config::load(path).code(ErrorCode::ConfigLoadError)?;
            config.set(&key, &value).code(ErrorCode::InvalidKey)?;
            config.save(path).code(ErrorCode::ConfigSaveError)?;
            // `worktree_dir` is the only key; report it as stored.
            let value = config.worktree_dir;
            if out.is_json() {
                out.json(&json!({ "key": key, "value": value, "updated": true }));
                return Ok(());
            }
            out.success(format!("Set {key} = {value}"));
            Ok(())
        }
    }
}
