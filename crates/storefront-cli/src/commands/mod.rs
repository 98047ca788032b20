//! Command handlers

pub mod config;
pub mod product;
pub mod serve;
pub mod status;
pub mod submission;
pub mod subscribe;

use std::io::{self, IsTerminal, Write};

use anyhow::{bail, Result};

use storefront_core::{Entity, SyncController, SyncError};

use crate::output::Output;

/// Resolve a full id or an unambiguous prefix against the mirrored rows
pub fn resolve_id<E: Entity>(items: &[E], id: &str, kind: &str) -> Result<String> {
    if let Some(exact) = items.iter().find(|e| e.id() == id) {
        return Ok(exact.id().to_string());
    }

    let matches: Vec<_> = items.iter().filter(|e| e.id().starts_with(id)).collect();
    match matches.len() {
        0 => bail!("No {} found matching: {}", kind, id),
        1 => Ok(matches[0].id().to_string()),
        _ => {
            eprintln!("Multiple {}s match '{}':", kind, id);
            for e in &matches {
                eprintln!("  {}", e.id());
            }
            bail!("Ambiguous ID. Please provide more characters.");
        }
    }
}

/// Prompt for confirmation
///
/// Returns true if user confirms, false otherwise.
/// In non-interactive mode (no TTY), returns false.
pub fn confirm(prompt: &str) -> Result<bool> {
    if !io::stdin().is_terminal() {
        return Ok(false);
    }

    print!("{} [y/N] ", prompt);
    io::stdout().flush()?;

    let mut input = String::new();
    io::stdin().read_line(&mut input)?;

    let input = input.trim().to_lowercase();
    Ok(input == "y" || input == "yes")
}

/// Tell the user when a list is empty only because loading failed
pub fn warn_if_load_failed<E: Entity>(controller: &SyncController<E>, output: &Output) {
    if let Some(err) = controller.last_load_error() {
        if !output.is_quiet() {
            eprintln!("{}", load_warning(E::TABLE, err));
        }
    }
}

fn load_warning(table: &str, err: &SyncError) -> String {
    if err.is_retryable() {
        format!("⚠ Could not load {}: {} (showing nothing; try again shortly)", table, err)
    } else {
        format!("⚠ Could not load {}: {}", table, err)
    }
}

/// Treat an empty string or "none" as clearing an optional value
pub fn optional(value: String) -> Option<String> {
    if value.is_empty() || value == "none" {
        None
    } else {
        Some(value)
    }
}
