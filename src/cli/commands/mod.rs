//! CLI command implementations

pub mod completions;
pub mod config;
pub mod fishbowl;
pub mod import;
pub mod verify;
