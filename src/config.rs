use anyhow::{Context, Result, bail};
use serde::{Deserialize, Serialize};
use std::fs;
use std::io;
use std::path::{Component, Path, PathBuf};

const FILENAME: &str = "config.toml";
const DEFAULT_WORKTREE_DIR: &str = ".worktrees";

/// User settings stored in `~/.config/lazywork/config.toml`.
///
/// ```toml
/// worktree_dir = ".worktrees"
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Config {
    /// Directory, relative to the main checkout, where new worktrees are
    /// created and where secondary worktrees are recognized.
    #[serde(default = "default_worktree_dir")]
    pub worktree_dir: String,
}

fn default_worktree_dir() -> String {
    DEFAULT_WORKTREE_DIR.into()
}

/// Reduce a user-supplied `worktree_dir` to plain relative components:
/// `./.worktrees/` becomes `.worktrees`. Absolute paths and `..` are refused.
pub fn normalize_worktree_dir(value: &str) -> Result<String> {
    let value = value.trim();
    if Path::new(value).is_absolute() {
        bail!("worktree_dir must be relative to the main checkout, got '{value}'");
    }
    let mut parts = Vec::new();
    for component in Path::new(value).components() {
        match component {
            Component::Normal(part) => parts.push(part.to_string_lossy().into_owned()),
            Component::CurDir => {}
            _ => bail!("worktree_dir cannot leave the main checkout, got '{value}'"),
        }
    }
    if parts.is_empty() {
        bail!("worktree_dir cannot be empty");
    }
    Ok(parts.join("/"))
}

impl Default for Config {
    fn default() -> Self {
        Self {
            worktree_dir: default_worktree_dir(),
        }
    }
}

/// `~/.config/lazywork/config.toml`.
pub fn default_path() -> Result<PathBuf> {
    let home = dirs::home_dir().context("locating home directory")?;
    Ok(home.join(".config").join("lazywork").join(FILENAME))
}

impl Config {
    /// Load the config file. A missing file yields defaults; missing keys in
    /// an existing file are filled in via serde.
    pub fn load(path: &Path) -> Result<Self> {
        match fs::read_to_string(path) {
            Ok(contents) => {
                let mut config: Self = toml::from_str(&contents)
                    .with_context(|| format!("parsing {}", path.display()))?;
                config.worktree_dir = normalize_worktree_dir(&config.worktree_dir)
                    .with_context(|| format!("invalid {}", path.display()))?;
                Ok(config)
            }
            Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(Self::default()),
            Err(e) => Err(e).with_context(|| format!("reading {}", path.display())),
        }
    }

    pub fn save(&self, path: &Path) -> Result<()> {
        if let Some(dir) = path.parent() {
            fs::create_dir_all(dir).with_context(|| format!("creating {}", dir.display()))?;
        }
        let toml_str = toml::to_string_pretty(self).context("serializing config")?;
        fs::write(path, toml_str).with_context(|| format!("writing {}", path.display()))
    }

    /// Update one key by name, as typed on the command line.
    pub fn set(&mut self, key: &str, value: &str) -> Result<()> {
        match key.to_ascii_lowercase().as_str() {
            "worktree_dir" => self.worktree_dir = normalize_worktree_dir(value)?,
            other => bail!("unknown config key '{other}'. Supported keys: worktree_dir"),
        }
        Ok(())
    }
}
