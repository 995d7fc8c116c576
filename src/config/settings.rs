//! Application settings configuration
//!
//! Defines PFX encoding, key re-encryption, and CA bundle handling.

use crate::utils::ConfigError;
use serde::{Deserialize, Serialize};
use std::path::Path;

/// Cipher family used when writing a PFX
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize, Serialize, clap::ValueEnum)]
pub enum PfxEncryption {
    /// pbeWithSHAAnd3-KeyTripleDES-CBC with an HMAC-SHA1 MAC
    #[default]
    #[serde(rename = "legacy-3des")]
    #[value(name = "legacy-3des")]
    Legacy3Des,
    /// PBES2 with AES-256-CBC, written by p12-keystore
    #[serde(rename = "aes-256")]
    #[value(name = "aes-256")]
    Aes256,
}

/// How the leaf certificate is chosen among a PFX's certificate bags
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize, Serialize, clap::ValueEnum)]
#[serde(rename_all = "kebab-case")]
pub enum LeafSelection {
    /// First certificate bag is the leaf
    #[default]
    Positional,
    /// Certificate whose localKeyId matches the key bag, else positional
    LocalKeyId,
}

/// Cipher for re-encrypted private keys
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize, Serialize, clap::ValueEnum)]
pub enum KeyCipher {
    #[default]
    #[serde(rename = "aes-256-cbc")]
    #[value(name = "aes-256-cbc")]
    Aes256Cbc,
    #[serde(rename = "aes-128-cbc")]
    #[value(name = "aes-128-cbc")]
    Aes128Cbc,
}

/// Treatment of CA bundle blocks that fail to parse
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize, Serialize, clap::ValueEnum)]
#[serde(rename_all = "kebab-case")]
pub enum CaBundlePolicy {
    /// Drop the block and log a warning
    #[default]
    Lenient,
    /// Fail with the block's position
    Strict,
}

/// PFX writer settings
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
#[serde(default)]
pub struct PfxSettings {
    pub encryption: PfxEncryption,
    pub iterations: u32,
    pub default_friendly_name: String,
    pub leaf_selection: LeafSelection,
}

impl Default for PfxSettings {
    fn default() -> Self {
        Self {
            encryption: PfxEncryption::default(),
            iterations: crate::pkcs12::DEFAULT_ITERATIONS,
            default_friendly_name: "certificate".to_string(),
            leaf_selection: LeafSelection::default(),
        }
    }
}

/// Private key re-encryption settings
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
#[serde(default)]
pub struct KeySettings {
    pub cipher: KeyCipher,
    pub pbkdf2_iterations: u32,
}

impl Default for KeySettings {
    fn default() -> Self {
        Self {
            cipher: KeyCipher::default(),
            pbkdf2_iterations: 2048,
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize, Serialize)]
#[serde(default)]
pub struct CaBundleSettings {
    pub policy: CaBundlePolicy,
}

/// Application settings
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize, Serialize)]
pub struct Settings {
    #[serde(default)]
    pub pfx: PfxSettings,
    #[serde(default)]
    pub key: KeySettings,
    #[serde(default)]
    pub ca_bundle: CaBundleSettings,
}

impl Settings {
    /// Load settings from the default config file
    pub fn load_default() -> Result<Self, ConfigError> {
        let config_path = Path::new("config/default.toml");
        if config_path.exists() {
            Self::load_from_file(config_path)
        } else {
            Ok(Self::default())
        }
    }

    /// Load settings from a specific file
    pub fn load_from_file<P: AsRef<Path>>(path: P) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path).map_err(|_| ConfigError::FileNotFound {
            path: path.display().to_string(),
        })?;

        Self::from_toml(&content)
    }

    /// Parse and validate settings from TOML text
    pub fn from_toml(content: &str) -> Result<Self, ConfigError> {
        let settings: Self = toml::from_str(content).map_err(|e| ConfigError::ParseError {
            message: e.to_string(),
        })?;
        settings.validate()?;
        Ok(settings)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.pfx.iterations == 0 {
            return Err(ConfigError::InvalidValue {
                key: "pfx.iterations".to_string(),
                message: "must be greater than zero".to_string(),
            });
        }
        if self.key.pbkdf2_iterations == 0 {
            return Err(ConfigError::InvalidValue {
                key: "key.pbkdf2_iterations".to_string(),
                message: "must be greater than zero".to_string(),
            });
        }
        if self.pfx.default_friendly_name.trim().is_empty() {
            return Err(ConfigError::InvalidValue {
                key: "pfx.default_friendly_name".to_string(),
                message: "must not be empty".to_string(),
            });
        }
        Ok(())
    }
}
