//! CLI argument definitions using clap derive

use clap::{Parser, Subcommand};

use crate::cli::commands::{
    completions::CompletionsArgs,
    config::ConfigCommands,
    fishbowl::FishbowlArgs,
    import::{BomArgs, ExcelArgs, InventoryArgs, RunsArgs},
    verify::VerifyArgs,
};

#[derive(Parser)]
#[command(name = "ion-import")]
#[command(author, version, about = "Batch import utilities for the ion manufacturing API")]
#[command(long_about = "Push BOMs, inventory and runs from spreadsheet and CSV exports into the ion GraphQL API.\n\nThe client secret is read from ION_IMPORTER_CLIENT_SECRET or prompted for.")]
#[command(propagate_version = true)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,

    #[command(flatten)]
    pub global: GlobalOpts,
}

#[derive(clap::Args, Clone, Debug, Default)]
pub struct GlobalOpts {
    /// Only log warnings and errors
    #[arg(long, short = 'q', global = true)]
    pub quiet: bool,

    /// Enable debug logging
    #[arg(long, short = 'v', global = true)]
    pub verbose: bool,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Verify the connection and credentials
    Verify(VerifyArgs),

    /// Import a BOM export (dot-notation Level or integer Depth)
    Bom(BomArgs),

    /// Import an inventory CSV
    Inventory(InventoryArgs),

    /// Import parts or inventory from a spreadsheet
    Excel(ExcelArgs),

    /// Create runs for serialized units
    Runs(RunsArgs),

    /// Convert Fishbowl CSV exports into one inventory CSV
    Fishbowl(FishbowlArgs),

    /// Inspect configuration
    #[command(subcommand)]
    Config(ConfigCommands),

    /// Generate shell completions
    Completions(CompletionsArgs),
}
