//! Shared helper functions for CLI commands

use dialoguer::Password;
use miette::{IntoDiagnostic, Result};
use tracing::info;

use crate::core::auth::{Authenticator, Credentials};
use crate::core::client::{ApiClient, HttpTransport};
use crate::core::config::ApiConfig;

/// Environment variable consulted before prompting for the secret
pub const CLIENT_SECRET_ENV: &str = "ION_IMPORTER_CLIENT_SECRET";

/// Connection options shared by every command that talks to the API
#[derive(clap::Args, Debug, Clone, Default)]
pub struct ConnectionArgs {
    /// Your API client ID (default: ION_IMPORTER_CLIENT_ID or the config file)
    #[arg(long = "client_id", alias = "client-id")]
    pub client_id: Option<String>,
}

/// Pick the client ID from the flag, falling back to configuration
pub fn resolve_client_id(args: &ConnectionArgs, config: &ApiConfig) -> Result<String> {
    args.client_id
        .clone()
        .or_else(|| config.client_id.clone())
        .filter(|id| !id.trim().is_empty())
        .ok_or_else(|| {
            miette::miette!(
                help = "Pass --client_id or set ION_IMPORTER_CLIENT_ID",
                "Must input client ID and client secret to run import"
            )
        })
}

/// Read the client secret from the environment or prompt for it
pub fn client_secret() -> Result<String> {
    if let Ok(secret) = std::env::var(CLIENT_SECRET_ENV) {
        if !secret.is_empty() {
            return Ok(secret);
        }
    }
    Password::new()
        .with_prompt("Client secret")
        .interact()
        .into_diagnostic()
}

/// Load configuration and build an authenticator from the command line
pub fn authenticator(args: &ConnectionArgs) -> Result<(ApiConfig, Authenticator)> {
    let config = ApiConfig::load()?;
    let client_id = resolve_client_id(args, &config)?;
    let client_secret = client_secret()?;
    let auth = Authenticator::new(
        config.clone(),
        Credentials {
            client_id,
            client_secret,
        },
    )?;
    Ok((config, auth))
}

/// Authenticate and return a client for the GraphQL endpoint
pub fn connect(args: &ConnectionArgs) -> Result<ApiClient> {
    let (config, auth) = authenticator(args)?;
    let token = auth.access_token()?;
    info!("Authenticated against {}", config.api_url);
    let transport = HttpTransport::new(config.graphql_url()?, &token, config.auth_scheme)?;
    Ok(ApiClient::new(transport))
}
