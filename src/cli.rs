//! Command-line definitions.

use clap::{Parser, Subcommand};
use std::path::PathBuf;

/// Jump between git worktrees without losing your place.
#[derive(Parser, Debug)]
#[command(name = "lazywork", version, about = "Navigate and manage git worktrees")]
pub struct Cli {
    /// Emit machine-readable JSON
    #[arg(long, global = true)]
    pub json: bool,

    /// Disable colored output
    #[arg(long, global = true)]
    pub no_color: bool,

    /// Path to config file
    #[arg(long, global = true, value_name = "PATH")]
    pub config: Option<PathBuf>,

    /// Output for the shell wrapper: navigations print a bare `cd` line
    #[arg(long, global = true, hide = true)]
    pub shell_helper: bool,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Manage and navigate git worktrees
    #[command(visible_alias = "wt")]
    Worktree {
        /// Without a subcommand, pick a worktree and go there
        #[command(subcommand)]
        command: Option<WorktreeCommand>,
    },

    /// Shell integration commands
    Shell {
        #[command(subcommand)]
        command: ShellCommand,
    },

    /// Manage configuration
    Config {
        #[command(subcommand)]
        command: ConfigCommand,
    },
}

#[derive(Subcommand, Debug)]
pub enum WorktreeCommand {
    /// List all worktrees
    List,

    /// Create a new worktree under the worktree directory
    Add {
        /// Worktree directory name, also the new branch name
        name: Option<String>,

        /// Check out an existing branch instead of creating one
        #[arg(short, long, value_name = "BRANCH")]
        branch: Option<String>,
    },

    /// Remove a worktree
    #[command(visible_alias = "rm")]
    Remove {
        name: String,

        /// Remove even with uncommitted changes
        #[arg(short, long)]
        force: bool,
    },

    /// Remove stale worktree entries
    Prune,

    /// Change directory to a worktree
    Go {
        /// Path, directory name, branch, or `<repo>-<name>` suffix
        name: Option<String>,

        /// Go back to the previously visited worktree
        #[arg(short, long, conflicts_with = "name")]
        previous: bool,
    },

    /// Check out a worktree's branch in the main worktree
    Use { name: Option<String> },

    /// Undo `use`: restore the previous branch and stashed changes
    Return,

    /// Merge a worktree's branch into main and optionally clean up
    Finish {
        name: Option<String>,

        /// Remove the worktree and delete its branch without asking
        #[arg(long, conflicts_with = "keep")]
        delete: bool,

        /// Keep the worktree and branch without asking
        #[arg(long)]
        keep: bool,
    },
}

#[derive(Subcommand, Debug)]
pub enum ShellCommand {
    /// Print the shell initialization script
    Init {
        /// bash, zsh or fish; detected from $SHELL when omitted
        shell: Option<String>,
    },

    /// Check whether the integration is installed
    Status,
}

#[derive(Subcommand, Debug)]
pub enum ConfigCommand {
    /// Show current configuration
    Show,
    /// Show configuration file path
    Path,
    /// Create the default configuration file
    Init,
    /// Set a configuration value (keys: worktree_dir)
    Set { key: String, value: String },
}
