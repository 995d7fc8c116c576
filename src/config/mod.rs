//! Configuration module for bundle-toolkit
//!
//! Handles loading settings from TOML files.

pub mod settings;

pub use settings::{
    CaBundlePolicy, CaBundleSettings, KeyCipher, KeySettings, LeafSelection, PfxEncryption,
    PfxSettings, Settings,
};

use crate::utils::ConfigError;
use std::path::Path;

/// Load settings from `path`, or from the default location when `None`
pub fn load_settings(path: Option<&Path>) -> Result<Settings, ConfigError> {
    match path {
        Some(path) => Settings::load_from_file(path),
        None => Settings::load_default(),
    }
}
