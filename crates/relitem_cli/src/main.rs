//! relitem CLI
//!
//! Command-line tools for relitem documents stored in a JSON file store.
//!
//! # Commands
//!
//! - `inspect` - Display item counts per type
//! - `get` - Print one item
//! - `create` - Create an item with a generated id
//! - `set` - Change one field of an item
//! - `delete` - Delete an item and cascade to its dependents
//! - `verify` - Check referential integrity

mod commands;

use clap::{Parser, Subcommand};
use std::path::PathBuf;
use tracing_subscriber::EnvFilter;

/// relitem command-line document tools.
#[derive(Parser)]
#[command(name = "relitem")]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// Path to the store file
    #[arg(global = true, short, long)]
    store: Option<PathBuf>,

    /// Path to the JSON schema declaring types and foreign keys
    #[arg(global = true, long)]
    schema: Option<PathBuf>,

    /// Enable verbose output
    #[arg(global = true, short, long)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Display item counts per type
    Inspect {
        /// Output format (text, json)
        #[arg(short, long, default_value = "text")]
        format: String,
    },

    /// Print one item
    Get {
        /// Item to print, as qualifier:id
        item: String,

        /// Output format (text, json)
        #[arg(short, long, default_value = "text")]
        format: String,
    },

    /// Create an item with a generated id
    Create {
        /// Type of the new item
        qualifier: String,

        /// Field assignment, as INDEX=VALUE (repeatable)
        #[arg(long = "set", value_name = "INDEX=VALUE")]
        assignments: Vec<String>,
    },

    /// Change one field of an item
    Set {
        /// Item to change, as qualifier:id
        item: String,

        /// Field index
        index: usize,

        /// New value
        value: String,
    },

    /// Delete an item
    Delete {
        /// Item to delete, as qualifier:id
        item: String,
    },

    /// Check referential integrity
    Verify,

    /// Show version information
    Version,
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();

    // Initialize logging
    let filter = if cli.verbose {
        EnvFilter::new("debug")
    } else {
        EnvFilter::new("info")
    };
    tracing_subscriber::fmt().with_env_filter(filter).init();

    if let Commands::Version = cli.command {
        println!("relitem CLI v{}", env!("CARGO_PKG_VERSION"));
        println!("relitem core v{}", relitem_core::VERSION);
        return Ok(());
    }

    let store = cli.store.ok_or("Store path required")?;
    let schema = cli.schema.ok_or("Schema path required")?;
    let dm = commands::open(&store, &schema)?;

    match cli.command {
        Commands::Inspect { format } => commands::inspect::run(&dm, &store, &format)?,
        Commands::Get { item, format } => commands::get::run(&dm, &item, &format)?,
        Commands::Create {
            qualifier,
            assignments,
        } => {
            let assignments = assignments
                .iter()
                .map(|a| commands::parse_assignment(a))
                .collect::<Result<Vec<_>, _>>()?;
            commands::edit::create(&dm, &qualifier, assignments)?;
        }
        Commands::Set { item, index, value } => {
            commands::edit::set(&dm, &item, index, commands::parse_value(&value))?;
        }
        Commands::Delete { item } => commands::edit::delete(&dm, &item)?,
        Commands::Verify => commands::verify::run(&dm)?,
        Commands::Version => {}
    }

    Ok(())
}
