mod cli;
mod commands;
mod config;
mod error;
mod git;
mod history;
mod logging;
mod navigator;
mod output;
mod prompt;
mod resolver;
mod session;
mod shell;

use clap::Parser;
use cli::Cli;
use output::Output;
use std::io::{self, IsTerminal};
use std::process;

fn main() {
    logging::init();
    let cli = Cli::parse();
    let color = !cli.no_color && io::stdout().is_terminal();
    let out = Output::new(cli.json, color);

    if let Err(err) = commands::run(cli, &out) {
        tracing::debug!(code = %err.code, "command failed");
        out.error_result(&err);
        process::exit(1);
    }
}
