//! Core module - API access, input loading and the shared import machinery

pub mod auth;
pub mod cache;
pub mod client;
pub mod config;
pub mod fishbowl;
pub mod graphql;
pub mod hierarchy;
pub mod kind;
pub mod loader;
pub mod logging;
pub mod resolver;
pub mod runner;

pub use auth::{AuthError, Authenticator, Credentials};
pub use cache::ResolutionCache;
pub use client::{ApiClient, ApiError, HttpTransport, Transport};
pub use config::{ApiConfig, AuthScheme, ConfigError};
pub use graphql::{GraphqlRequest, GraphqlResponse, Mutation, Query};
pub use kind::EntityKind;
pub use loader::{LoadError, Record, Table};
pub use runner::{MutationReport, PendingMutation};
