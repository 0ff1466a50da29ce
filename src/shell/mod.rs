//! Shell integration.
//!
//! A subprocess can't change its parent shell's directory, so `shell init`
//! installs a wrapper function that runs every command with the hidden
//! `--shell-helper` flag. In that mode a navigation prints exactly one line,
//! `cd <path>`, which the wrapper evaluates in the interactive shell. Any
//! other output is echoed verbatim and the command's exit status is kept.

use anyhow::{Context, Result};
use minijinja::{Environment, context};
use std::fmt;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use std::str::FromStr;


const BIN: &str = "lazywork";

const POSIX_TEMPLATE: &str = r#"# LazyWork shell integration
# Add to {{ rc_file }}: {{ init_line }}

# Wrapper function that handles cd commands from {{ bin }}
__{{ bin }}_exec() {
  local output
  output=$(command {{ bin }} "$@" --shell-helper 2>&1)
  local exit_code=$?

  if [[ $output == cd\ * ]]; then
    eval "$output"
  else
    [[ -n $output ]] && printf '%s\n' "$output"
    return $exit_code
  fi
}

# Aliases
alias lw='__{{ bin }}_exec'
alias lwt='__{{ bin }}_exec worktree'
"#;

const FISH_TEMPLATE: &str = r#"# LazyWork shell integration
# Add to {{ rc_file }}: {{ init_line }}

# Wrapper function that handles cd commands from {{ bin }}
function __{{ bin }}_exec
    set -l output (command {{ bin }} $argv --shell-helper 2>&1)
    set -l exit_code $status

    if string match -q 'cd *' -- $output
        eval $output
    else
        test -n "$output"; and printf '%s\n' $output
        return $exit_code
    end
end

# Aliases
alias lw='__{{ bin }}_exec'
alias lwt='__{{ bin }}_exec worktree'
"#;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Shell {
    Bash,
    Zsh,
    Fish,
}

impl Shell {
    pub const ALL: [Shell; 3] = [Shell::Bash, Shell::Zsh, Shell::Fish];

    /// Guess from `$SHELL`, falling back to bash.
    pub fn detect() -> Self {
        std::env::var("SHELL")
            .ok()
            .and_then(|s| {
                Path::new(&s)
                    .file_name()
                    .and_then(|n| n.to_str())
                    .and_then(|n| n.parse().ok())
            })
            .unwrap_or(Shell::Bash)
    }

    pub fn name(self) -> &'static str {
        match self {
            Shell::Bash => "bash",
            Shell::Zsh => "zsh",
            Shell::Fish => "fish",
        }
    }

    /// Startup file the init line belongs in, under `home`.
    pub fn rc_file(self, home: &Path) -> PathBuf {
        match self {
            Shell::Bash => home.join(".bashrc"),
            Shell::Zsh => home.join(".zshrc"),
            Shell::Fish => home.join(".config").join("fish").join("config.fish"),
        }
    }

    pub fn init_line(self) -> String {
        match self {
            Shell::Fish => format!("{BIN} shell init fish | source"),
            _ => format!(r#"eval "$({BIN} shell init {})""#, self.name()),
        }
    }

    /// Whether the RC file already sources the integration. A missing RC
    /// file just means "not installed".
    pub fn has_init_line(self, home: &Path) -> Result<bool> {
        let path = self.rc_file(home);
        match fs::read_to_string(&path) {
            Ok(content) => Ok(content.contains(&format!("{BIN} shell init"))),
            Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(false),
            Err(e) => Err(e).with_context(|| format!("reading {}", path.display())),
        }
    }

    pub fn init_script(self, home: &Path) -> Result<String> {
        let template = match self {
            Shell::Fish => FISH_TEMPLATE,
            Shell::Bash | Shell::Zsh => POSIX_TEMPLATE,
        };
        let env = Environment::new();
        let tmpl = env
            .template_from_str(template)
            .context("parsing shell init template")?;
        tmpl.render(context! {
            bin => BIN,
            rc_file => self.rc_file(home).display().to_string(),
            init_line => self.init_line(),
        })
        .context("rendering shell init template")
    }
}

impl fmt::Display for Shell {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for Shell {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "bash" => Ok(Shell::Bash),
            "zsh" => Ok(Shell::Zsh),
            "fish" => Ok(Shell::Fish),
            other => {
                let supported: Vec<&str> = Shell::ALL.iter().map(|s| s.name()).collect();
                Err(format!(
                    "unsupported shell '{other}'. Supported: {}",
                    supported.join(", ")
                ))
            }
        }
    }
}

/// Quote `path` for `eval` in bash, zsh and fish. Plain paths pass through.
pub fn quote_path(path: &Path) -> String {
    let s = path.display().to_string();
    let plain = !s.is_empty()
        && s
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || matches!(c, '/' | '.' | '_' | '-'));
    if plain {
        s
    } else {
        format!("'{}'", s.replace('\'', r"'\''"))
    }
}

/// The single line a navigation prints in helper mode.
pub fn cd_line(path: &Path) -> String {
    format!("cd {}", quote_path(path))
}
