// src/config/mod.rs

//! Configuration loading and validation for watchrun.
//!
//! Responsibilities:
//! - Define the TOML-backed data model (`model.rs`).
//! - Load an optional config file from disk (`loader.rs`).
//! - Validate timing and filter settings (`validate.rs`).

pub mod loader;
pub mod model;
pub mod validate;

pub use loader::{default_config_path, load_and_validate, load_for_cli, load_from_path};
pub use model::{ConfigFile, FilterSection, RawConfigFile, RunSection};
