//! OAuth2 client-credentials authentication against the identity provider

use miette::Diagnostic;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::debug;

use crate::core::client::http_client;
use crate::core::config::{ApiConfig, ConfigError};

/// Client credentials for the import API
#[derive(Clone)]
pub struct Credentials {
    pub client_id: String,
    pub client_secret: String,
}

impl std::fmt::Debug for Credentials {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Credentials")
            .field("client_id", &self.client_id)
            .field("client_secret", &"<redacted>")
            .finish()
    }
}

/// Body of the client-credentials grant
#[derive(Debug, Serialize)]
struct TokenRequest<'a> {
    client_id: &'a str,
    client_secret: &'a str,
    audience: &'a str,
    grant_type: &'static str,
}

#[derive(Debug, Deserialize)]
struct TokenResponse {
    access_token: Option<String>,
}

/// Errors that can occur while obtaining an access token
#[derive(Debug, Error, Diagnostic)]
pub enum AuthError {
    #[error("Client ID and client secret are required")]
    #[diagnostic(
        code(ion::auth::missing_credentials),
        help("Pass --client_id (or set ION_IMPORTER_CLIENT_ID) and enter the secret when prompted")
    )]
    MissingCredentials,

    #[error("Identity provider rejected the credentials ({status}): {body}")]
    #[diagnostic(code(ion::auth::rejected))]
    Rejected { status: u16, body: String },

    #[error("Token response did not contain an access_token")]
    #[diagnostic(code(ion::auth::missing_token))]
    MissingToken,

    #[error("Token request failed: {0}")]
    #[diagnostic(code(ion::auth::transport))]
    Transport(#[from] reqwest::Error),

    #[error(transparent)]
    #[diagnostic(transparent)]
    Config(#[from] ConfigError),
}

/// Exchanges client credentials for a bearer token
pub struct Authenticator {
    http: reqwest::blocking::Client,
    config: ApiConfig,
    credentials: Credentials,
}

impl Authenticator {
    /// Create an authenticator; fails fast when either credential is empty
    pub fn new(config: ApiConfig, credentials: Credentials) -> Result<Self, AuthError> {
        if credentials.client_id.trim().is_empty() || credentials.client_secret.is_empty() {
            return Err(AuthError::MissingCredentials);
        }
        Ok(Self {
            http: http_client()?,
            config,
            credentials,
        })
    }

    /// The audience the token is requested for
    pub fn audience(&self) -> &str {
        &self.config.audience
    }

    pub fn client_id(&self) -> &str {
        &self.credentials.client_id
    }

    /// POST the client-credentials grant and return the access token
    pub fn access_token(&self) -> Result<String, AuthError> {
        let url = self.config.token_url()?;
        debug!(%url, audience = %self.config.audience, "requesting access token");

        let body = TokenRequest {
            client_id: &self.credentials.client_id,
            client_secret: &self.credentials.client_secret,
            audience: &self.config.audience,
            grant_type: "client_credentials",
        };

        let response = self.http.post(url).json(&body).send()?;
        let status = response.status();
        if !status.is_success() {
            let body = response
                .text()
                .unwrap_or_else(|_| "<unreadable body>".to_string());
            return Err(AuthError::Rejected {
                status: status.as_u16(),
                body,
            });
        }

        let token: TokenResponse = response.json()?;
        extract_token(token)
    }
}

fn extract_token(response: TokenResponse) -> Result<String, AuthError> {
    response
        .access_token
        .filter(|t| !t.is_empty())
        .ok_or(AuthError::MissingToken)
}
