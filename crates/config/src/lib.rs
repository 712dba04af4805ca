//! Configuration loading and env substitution.
//!
//! Config files: `sleuth.toml`, `sleuth.yaml`, `sleuth.yml`, or `sleuth.json`
//! Searched in `./` then `~/.config/sleuth/`.
//!
//! Supports `${ENV_VAR}` substitution in all string values.

pub mod env_subst;
pub mod error;
pub mod loader;
pub mod schema;

pub use {
    error::{Error, Result},
    loader::{config_dir, discover_and_load, find_config_file, load_config},
    schema::{BrowserConfig, PluginsConfig, ServerConfig, SleuthConfig},
};
