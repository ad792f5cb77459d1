//! `ion-import verify` - check that the credentials work

use console::style;
use miette::Result;

use crate::cli::helpers::{authenticator, ConnectionArgs};
use crate::cli::GlobalOpts;

#[derive(clap::Args, Debug)]
pub struct VerifyArgs {
    #[command(flatten)]
    pub connection: ConnectionArgs,
}

pub fn run(args: VerifyArgs, _global: &GlobalOpts) -> Result<()> {
    let (config, auth) = authenticator(&args.connection)?;
    auth.access_token()?;

    println!("{} Successful connection!", style("✓").green());
    println!("  {} {}", style("API URL:").cyan(), config.api_url);
    println!("  {} {}", style("Audience:").cyan(), auth.audience());
    println!("  {} {}", style("Client ID:").cyan(), auth.client_id());
    Ok(())
}
