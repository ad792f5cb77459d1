//! Configuration management with layered hierarchy

use miette::Diagnostic;
use reqwest::Url;
use serde::Deserialize;
use std::path::PathBuf;
use thiserror::Error;

/// Default import API base URL when nothing else is configured
pub const DEFAULT_API_URL: &str = "http://localhost:5000/";

/// Default identity provider domain for the client-credentials grant
pub const DEFAULT_AUTH_DOMAIN: &str = "firstresonance.auth0.com";

/// How the access token is placed in the `Authorization` header
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AuthScheme {
    /// The bare token, exactly as issued
    #[default]
    Raw,
    /// `Bearer <token>`
    Bearer,
}

impl AuthScheme {
    /// Build the header value for a token
    pub fn header_value(&self, token: &str) -> String {
        match self {
            AuthScheme::Raw => token.to_string(),
            AuthScheme::Bearer => format!("Bearer {}", token),
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            AuthScheme::Raw => "raw",
            AuthScheme::Bearer => "bearer",
        }
    }
}

impl std::str::FromStr for AuthScheme {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "raw" => Ok(AuthScheme::Raw),
            "bearer" => Ok(AuthScheme::Bearer),
            other => Err(ConfigError::InvalidValue {
                key: "auth_scheme".to_string(),
                value: other.to_string(),
            }),
        }
    }
}

/// Values that may appear in the user config file
#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct FileConfig {
    api_url: Option<String>,
    audience: Option<String>,
    auth_domain: Option<String>,
    auth_scheme: Option<AuthScheme>,
    client_id: Option<String>,
}

/// Resolved settings for talking to the import API
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ApiConfig {
    /// Base URL of the API; the GraphQL endpoint is `<api_url>/graphql`
    pub api_url: String,

    /// OAuth2 audience requested for the token
    pub audience: String,

    /// Identity provider domain (no scheme)
    pub auth_domain: String,

    /// Authorization header style
    pub auth_scheme: AuthScheme,

    /// Client ID used when `--client_id` is not given
    pub client_id: Option<String>,
}

impl Default for ApiConfig {
    fn default() -> Self {
        Self {
            api_url: DEFAULT_API_URL.to_string(),
            audience: DEFAULT_API_URL.to_string(),
            auth_domain: DEFAULT_AUTH_DOMAIN.to_string(),
            auth_scheme: AuthScheme::Raw,
            client_id: None,
        }
    }
}

impl ApiConfig {
    /// Load configuration from all sources, merging in priority order
    pub fn load() -> Result<Self, ConfigError> {
        let mut file_config = FileConfig::default();

        // 1. Built-in defaults (Default impl)

        // 2. Global user config (~/.config/ion-import/config.yaml)
        if let Some(path) = Self::global_config_path() {
            if path.exists() {
                let contents = std::fs::read_to_string(&path).map_err(|e| ConfigError::Read {
                    path: path.clone(),
                    message: e.to_string(),
                })?;
                file_config = serde_yml::from_str(&contents).map_err(|e| ConfigError::Parse {
                    path: path.clone(),
                    message: e.to_string(),
                })?;
            }
        }

        // 3. Environment variables
        Self::resolve(file_config, |key| std::env::var(key).ok())
    }

    /// Merge file values and environment lookups over the defaults
    fn resolve(
        file: FileConfig,
        env: impl Fn(&str) -> Option<String>,
    ) -> Result<Self, ConfigError> {
        let mut config = ApiConfig::default();
        let mut audience_set = false;

        if let Some(url) = file.api_url {
            config.api_url = url;
        }
        if let Some(audience) = file.audience {
            config.audience = audience;
            audience_set = true;
        }
        if let Some(domain) = file.auth_domain {
            config.auth_domain = domain;
        }
        if let Some(scheme) = file.auth_scheme {
            config.auth_scheme = scheme;
        }
        config.client_id = file.client_id;

        if let Some(url) = env("ION_IMPORT_API") {
            config.api_url = url;
        }
        if let Some(audience) = env("ION_API_AUDIENCE") {
            config.audience = audience;
            audience_set = true;
        }
        if let Some(domain) = env("ION_AUTH_DOMAIN") {
            config.auth_domain = domain;
        }
        if let Some(scheme) = env("ION_AUTH_SCHEME") {
            config.auth_scheme = scheme.parse()?;
        }
        if let Some(client_id) = env("ION_IMPORTER_CLIENT_ID") {
            config.client_id = Some(client_id);
        }

        // The audience follows the API URL unless set explicitly
        if !audience_set {
            config.audience = config.api_url.clone();
        }

        Ok(config)
    }

    /// Get the path to the global config file
    pub fn global_config_path() -> Option<PathBuf> {
        directories::ProjectDirs::from("", "", "ion-import")
            .map(|dirs| dirs.config_dir().join("config.yaml"))
    }

    /// The GraphQL endpoint, `<api_url>/graphql`
    pub fn graphql_url(&self) -> Result<Url, ConfigError> {
        join_url(&self.api_url, "graphql")
    }

    /// The identity provider token endpoint
    pub fn token_url(&self) -> Result<Url, ConfigError> {
        join_url(&format!("https://{}", self.auth_domain), "oauth/token")
    }
}

fn join_url(base: &str, path: &str) -> Result<Url, ConfigError> {
    let base = Url::parse(base).map_err(|e| ConfigError::InvalidUrl {
        url: base.to_string(),
        message: e.to_string(),
    })?;
    base.join(path).map_err(|e| ConfigError::InvalidUrl {
        url: base.to_string(),
        message: e.to_string(),
    })
}

/// Errors that can occur while loading configuration
#[derive(Debug, Error, Diagnostic)]
pub enum ConfigError {
    #[error("Failed to read config file {path:?}: {message}")]
    #[diagnostic(code(ion::config::read))]
    Read { path: PathBuf, message: String },

    #[error("Failed to parse config file {path:?}: {message}")]
    #[diagnostic(code(ion::config::parse))]
    Parse { path: PathBuf, message: String },

    #[error("Invalid value '{value}' for {key}")]
    #[diagnostic(code(ion::config::value), help("Expected one of: raw, bearer"))]
    InvalidValue { key: String, value: String },

    #[error("Invalid URL '{url}': {message}")]
    #[diagnostic(code(ion::config::url))]
    InvalidUrl { url: String, message: String },
}
