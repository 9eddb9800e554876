//! Configuration loading and validation for the marketplace tooling.
//!
//! Config files: `marketplace.toml`, `marketplace.yaml`, `marketplace.yml`
//! or `marketplace.json`. Searched in the repository root, then in the
//! user config directory (`~/.config/marketplace/`).

pub mod error;
pub mod loader;
pub mod schema;
pub mod validate;

pub use {
    error::{Error, Result},
    loader::{config_dir, discover_and_load, find_config_file, load_config, load_config_value},
    schema::{MarketplaceConfig, ValidationConfig},
    validate::{ConfigValidation, Diagnostic, Severity, validate_config_file, validate_value},
};
