use anyhow::Result;
use dialoguer::console::Term;
use dialoguer::{Confirm, Input, Select};
use std::io::{self, IsTerminal};

/// Interactive questions the controller may ask. Only called when the
/// session is attached to a terminal and not in JSON mode.
pub trait Prompter {
    /// Index of the chosen item, `None` if the user backed out.
    fn select(&self, title: &str, items: &[String]) -> Result<Option<usize>>;
    /// `None` if the user backed out.
    fn confirm(&self, prompt: &str, default: bool) -> Result<Option<bool>>;
    fn input(&self, prompt: &str) -> Result<String>;
}

/// `dialoguer` prompts drawn on a terminal.
pub struct TerminalPrompter {
    term: Term,
}

impl TerminalPrompter {
    /// Draw on stderr when it is a terminal. Under the shell wrapper stderr
    /// is captured, so fall back to the controlling terminal. `None` when
    /// neither is available.
    pub fn open() -> Option<Self> {
        if io::stderr().is_terminal() {
            return Some(Self::stderr());
        }
        controlling_terminal().map(|term| Self { term })
    }

    /// Prompter on stderr. Callers that are not interactive never prompt.
    pub fn stderr() -> Self {
        Self {
            term: Term::stderr(),
        }
    }
}

#[cfg(unix)]
fn controlling_terminal() -> Option<Term> {
    use std::fs::{File, OpenOptions};

    let read = File::open("/dev/tty").ok()?;
    let write = OpenOptions::new().write(true).open("/dev/tty").ok()?;
    let term = Term::read_write_pair(read, write);
    term.is_term().then_some(term)
}

#[cfg(not(unix))]
fn controlling_terminal() -> Option<Term> {
    None
}

impl Prompter for TerminalPrompter {
    fn select(&self, title: &str, items: &[String]) -> Result<Option<usize>> {
        let choice = Select::new()
            .with_prompt(title)
            .items(items)
            .default(0)
            .interact_on_opt(&self.term)?;
        Ok(choice)
    }

    fn confirm(&self, prompt: &str, default: bool) -> Result<Option<bool>> {
        let answer = Confirm::new()
            .with_prompt(prompt)
            .default(default)
            .interact_on_opt(&self.term)?;
        Ok(answer)
    }

    fn input(&self, prompt: &str) -> Result<String> {
        let value: String = Input::new()
            .with_prompt(prompt)
            .allow_empty(true)
            .interact_text_on(&self.term)?;
        Ok(value.trim().to_string())
    }
}
