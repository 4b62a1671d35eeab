//! CLI command handlers.

use std::io::{self, BufRead, Write};

use anyhow::{Result, bail};
use dermascan_core::guard;
use dermascan_core::store::DispatchError;

use super::App;
use crate::view;

pub mod auth;
pub mod config;
pub mod diagnose;
pub mod history;
pub mod profile;

/// Refuses protected commands when no session is saved.
fn require_login(app: &App) -> Result<()> {
    guard::require_token(&app.store.state().auth)?;
    Ok(())
}

/// Prints pending notices, then surfaces the thunk's outcome.
fn settle(app: &mut App, outcome: Result<(), DispatchError>) -> Result<()> {
    let notices = app.store.drain_notices();
    view::print_notices(&notices);
    outcome.map_err(Into::into)
}

/// Reads one line from stdin, prompting on stderr.
fn prompt(label: &str) -> Result<String> {
    eprint!("{label}: ");
    io::stderr().flush()?;

    let mut line = String::new();
    io::stdin().lock().read_line(&mut line)?;
    let value = line.trim_end_matches(['\r', '\n']).to_string();
    if value.is_empty() {
        bail!("{label} is required");
    }
    Ok(value)
}

fn value_or_prompt(value: Option<String>, label: &str) -> Result<String> {
    match value {
        Some(v) if !v.is_empty() => Ok(v),
        _ => prompt(label),
    }
}

fn print_json(value: &impl serde::Serialize) -> Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}
