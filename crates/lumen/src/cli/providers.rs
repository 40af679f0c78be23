//! The `lumen providers` command.

use lumen_core::ProviderRegistry;

/// Print the built-in providers and their defaults as JSON.
pub fn execute() -> anyhow::Result<()> {
    super::print_json(&ProviderRegistry::with_builtins().list())
}
