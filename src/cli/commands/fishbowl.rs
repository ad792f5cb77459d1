//! `ion-import fishbowl` - convert Fishbowl exports to inventory CSV

use chrono::Local;
use console::style;
use miette::Result;
use std::path::PathBuf;

use crate::cli::GlobalOpts;
use crate::core::fishbowl::{default_output_name, transform_folder};

#[derive(clap::Args, Debug)]
pub struct FishbowlArgs {
    /// Folder holding the Fishbowl CSV exports
    #[arg(value_name = "INPUT_FOLDER")]
    pub input_folder: PathBuf,

    /// Output CSV (default: ion_inventory_import_<timestamp>.csv)
    #[arg(long = "output_file", alias = "output-file")]
    pub output_file: Option<PathBuf>,
}

pub fn run(args: FishbowlArgs, global: &GlobalOpts) -> Result<()> {
    let output = args
        .output_file
        .unwrap_or_else(|| PathBuf::from(default_output_name(Local::now())));

    let summary = transform_folder(&args.input_folder, &output)?;

    if !global.quiet {
        println!(
            "{} Converted {} file(s), {} row(s) ({} serial) into {}",
            style("✓").green(),
            summary.files,
            summary.rows,
            summary.serials,
            style(summary.output.display()).yellow()
        );
    }
    Ok(())
}
