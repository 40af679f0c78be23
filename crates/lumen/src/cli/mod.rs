//! Command handlers for the `lumen` binary.

pub mod analyze;
pub mod config;
pub mod providers;
pub mod templates;

use serde::Serialize;

/// Print a value to stdout as pretty JSON.
pub(crate) fn print_json<T: Serialize>(value: &T) -> anyhow::Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}
