//! Get command implementation.

use super::{describe, lookup};
use relitem_core::DocumentManager;

/// Runs the get command.
pub fn run(
    dm: &DocumentManager,
    qualified_id: &str,
    format: &str,
) -> Result<(), Box<dyn std::error::Error>> {
    let item = lookup(dm, qualified_id)?;
    match format {
        "json" => {
            println!("{}", serde_json::to_string_pretty(&item)?);
        }
        _ => {
            println!("{}", describe(&item));
        }
    }
    Ok(())
}
