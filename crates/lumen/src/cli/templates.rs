//! The `lumen templates` command.

use lumen_core::TemplateCatalog;

/// Print the template catalog as JSON.
pub fn execute() -> anyhow::Result<()> {
    super::print_json(&TemplateCatalog::builtin().list())
}
