//! `ion-import completions` - shell completion scripts
//!
//! Completes the importer subcommands and their flags, including the
//! `--hierarchy` and `--type` values.
//!
//! ```bash
//! # Bash - add to ~/.bashrc
//! source <(ion-import completions bash)
//!
//! # Zsh
//! ion-import completions zsh > "${fpath[1]}/_ion-import"
//!
//! # Fish
//! ion-import completions fish > ~/.config/fish/completions/ion-import.fish
//! ```

use clap::CommandFactory;
use clap_complete::{generate, Shell};
use miette::Result;
use std::io;

use crate::cli::Cli;

#[derive(clap::Args, Debug)]
pub struct CompletionsArgs {
    /// Shell to generate the ion-import completion script for
    #[arg(value_enum)]
    pub shell: Shell,
}

pub fn run(args: CompletionsArgs) -> Result<()> {
    let mut cmd = Cli::command();
    generate(args.shell, &mut cmd, "ion-import", &mut io::stdout());
    Ok(())
}
