//! `ion-import config` command - inspect the resolved configuration

use clap::Subcommand;
use console::style;
use miette::Result;

use crate::cli::GlobalOpts;
use crate::core::config::ApiConfig;

#[derive(Subcommand, Debug)]
pub enum ConfigCommands {
    /// Show the effective configuration
    Show,

    /// Show the path of the user config file
    Path,
}

/// Run a config subcommand
pub fn run(cmd: ConfigCommands, _global: &GlobalOpts) -> Result<()> {
    match cmd {
        ConfigCommands::Show => run_show(),
        ConfigCommands::Path => run_path(),
    }
}

fn run_show() -> Result<()> {
    let config = ApiConfig::load()?;

    println!("{}", style("Effective Configuration").bold().underlined());
    println!();
    print_config_value("api_url", Some(&config.api_url));
    print_config_value("audience", Some(&config.audience));
    print_config_value("auth_domain", Some(&config.auth_domain));
    print_config_value("auth_scheme", Some(config.auth_scheme.as_str()));
    print_config_value("client_id", config.client_id.as_deref());

    println!();
    println!("{}", style("Config Sources (in priority order):").dim());
    println!("  1. Environment variables (ION_IMPORT_API, ION_API_AUDIENCE, ION_AUTH_DOMAIN,");
    println!("     ION_AUTH_SCHEME, ION_IMPORTER_CLIENT_ID)");
    println!("  2. Global config (~/.config/ion-import/config.yaml)");
    println!("  3. Built-in defaults");
    Ok(())
}

fn print_config_value(key: &str, value: Option<&str>) {
    match value {
        Some(v) => println!("  {} = {}", style(key).cyan(), v),
        None => println!("  {} = {}", style(key).cyan(), style("(not set)").dim()),
    }
}

fn run_path() -> Result<()> {
    let path = ApiConfig::global_config_path()
        .ok_or_else(|| miette::miette!("Cannot determine the user config directory"))?;
    println!("{}", path.display());
    if !path.exists() {
        eprintln!("{}", style("(not created)").dim());
    }
    Ok(())
}
