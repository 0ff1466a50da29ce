use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Deserializer, Serialize};
use std::collections::BTreeMap;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};


const FILENAME: &str = "history.json";

/// The last two worktrees visited in one repository.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RepoState {
    #[serde(default)]
    pub previous: String,
    #[serde(default)]
    pub current: String,
}

/// Navigation history for every repository on this machine, keyed by the
/// repository's common git directory so that all of its worktrees share one
/// entry.
///
/// Stored as `~/.config/lazywork/history.json`. Entries are never pruned.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct HistoryStore {
    #[serde(default, deserialize_with = "null_as_empty")]
    pub repo_history: BTreeMap<String, RepoState>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub updated_at: Option<DateTime<Utc>>,
}

fn null_as_empty<'de, D>(de: D) -> std::result::Result<BTreeMap<String, RepoState>, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(Option::deserialize(de)?.unwrap_or_default())
}

/// `~/.config/lazywork/history.json`.
pub fn default_path() -> Result<PathBuf> {
    let home = dirs::home_dir().context("locating home directory")?;
    Ok(home.join(".config").join("lazywork").join(FILENAME))
}

impl HistoryStore {
    /// Read the history file, returning an empty store if it doesn't exist.
    pub fn load(path: &Path) -> Result<Self> {
        match fs::read_to_string(path) {
            Ok(s) => serde_json::from_str(&s)
                .with_context(|| format!("parsing {}", path.display())),
            Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(Self::default()),
            Err(e) => Err(e).with_context(|| format!("reading {}", path.display())),
        }
    }

    /// Rewrite the whole file, stamping `updated_at`. Concurrent writers are
    /// not coordinated; the last one wins.
    pub fn save(&mut self, path: &Path) -> Result<()> {
        if let Some(dir) = path.parent() {
            fs::create_dir_all(dir).with_context(|| format!("creating {}", dir.display()))?;
        }
        self.updated_at = Some(Utc::now());
        let json = serde_json::to_string_pretty(self).context("serializing history")?;
        fs::write(path, json).with_context(|| format!("writing {}", path.display()))
    }

    /// Shift `current` into `previous` and make `path` current. Re-visiting
    /// the current worktree changes nothing.
    pub fn record_visit(&mut self, repo: &str, path: &str) {
        let state = self.repo_history.entry(repo.to_string()).or_default();
        if state.current == path {
            return;
        }
        state.previous = std::mem::replace(&mut state.current, path.to_string());
        tracing::debug!(repo, current = path, previous = %state.previous, "recorded visit");
    }

    pub fn current(&self, repo: &str) -> &str {
        self.repo_history
            .get(repo)
            .map(|s| s.current.as_str())
            .unwrap_or("")
    }

    pub fn previous(&self, repo: &str) -> &str {
        self.repo_history
            .get(repo)
            .map(|s| s.previous.as_str())
            .unwrap_or("")
    }
}
