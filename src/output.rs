use crate::error::CommandError;
use colored::Colorize;
use serde::Serialize;
use serde_json::json;

/// Dual-mode output: structured JSON for scripts and agents, decorated
/// text for humans. Decorated helpers are silent in JSON mode.
pub struct Output {
    json: bool,
}

impl Output {
    /// `color` is applied process-wide through `colored`'s override.
    pub fn new(json: bool, color: bool) -> Self {
        colored::control::set_override(color);
        Self { json }
    }

    pub fn is_json(&self) -> bool {
        self.json
    }

    pub fn json<T: Serialize>(&self, value: &T) {
        match serde_json::to_string_pretty(value) {
            Ok(s) => println!("{s}"),
            Err(e) => eprintln!("lazywork: serializing output: {e}"),
        }
    }

    pub fn line(&self, msg: impl AsRef<str>) {
        if !self.json {
            println!("{}", msg.as_ref());
        }
    }

    pub fn success(&self, msg: impl AsRef<str>) {
        if !self.json {
            println!("{}", format!("✓ {}", msg.as_ref()).green());
        }
    }

    pub fn info(&self, msg: impl AsRef<str>) {
        if !self.json {
            println!("{}", format!("ℹ {}", msg.as_ref()).blue());
        }
    }

    pub fn warning(&self, msg: impl AsRef<str>) {
        if !self.json {
            eprintln!("{}", format!("⚠ {}", msg.as_ref()).yellow());
        }
    }

    pub fn dim(&self, msg: impl AsRef<str>) {
        if !self.json {
            println!("{}", msg.as_ref().dimmed());
        }
    }

    pub fn bold(&self, msg: impl AsRef<str>) {
        if !self.json {
            println!("{}", msg.as_ref().bold());
        }
    }

    pub fn error_result(&self, err: &CommandError) {
        if self.json {
            self.json(&json!({ "error": err.message, "code": err.code.as_str() }));
        } else {
            eprintln!("{}", format!("✗ {}", err.message).red().bold());
        }
    }
}
