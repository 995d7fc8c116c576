//! Custom error types for bundle-toolkit
//!
//! This module defines domain-specific error types using `thiserror` for
//! the failure modes of the bundle codec and its configuration.

use thiserror::Error;

/// Top-level error type for the bundle-toolkit application
#[derive(Error, Debug)]
pub enum ToolkitError {
    #[error("Bundle error: {0}")]
    Bundle(#[from] BundleError),

    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    #[error("Failed to read {path}: {message}")]
    FileRead { path: String, message: String },

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// Broad category of a [`BundleError`]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    /// Wrong or missing password. Needs new input from the user.
    Credential,
    /// Input is not a container or PEM object of the expected type.
    Format,
    /// Producing output failed: encoding a PFX or P7B, or re-encrypting an
    /// extracted private key under a new password. The input itself was fine.
    Generation,
}

/// Errors raised by the bundle codec
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum BundleError {
    #[error("Invalid password or corrupt PKCS#12 file")]
    BadCredentials,

    #[error("Failed to parse PKCS#12 file: {message}")]
    Pkcs12Parse { message: String },

    #[error("Failed to parse P7B file, expected DER or PEM encoded PKCS#7: {message}")]
    Pkcs7Format { message: String },

    #[error("No certificates found in P7B file")]
    NoCertificates,

    #[error("Private key is encrypted, password required")]
    PasswordRequired,

    #[error("Failed to decrypt private key: wrong password or unsupported encryption")]
    KeyDecryption,

    #[error("Failed to parse private key: {message}")]
    KeyParse { message: String },

    #[error("Failed to parse certificate: {message}")]
    CertificateParse { message: String },

    #[error("Failed to encrypt private key: {message}")]
    KeyEncryption { message: String },

    #[error("Invalid CA certificate at position {index}: {message}")]
    InvalidCaCertificate { index: usize, message: String },

    #[error("Failed to generate PFX. Check that the key and certificate match and are valid PEM")]
    PfxGeneration,

    #[error("Failed to generate P7B. Check that the certificates are valid PEM")]
    P7bGeneration,
}

impl BundleError {
    /// Classify the error for presentation
    pub fn kind(&self) -> ErrorKind {
        match self {
            BundleError::BadCredentials
            | BundleError::PasswordRequired
            | BundleError::KeyDecryption => ErrorKind::Credential,
            BundleError::Pkcs12Parse { .. }
            | BundleError::Pkcs7Format { .. }
            | BundleError::NoCertificates
            | BundleError::KeyParse { .. }
            | BundleError::CertificateParse { .. }
            | BundleError::InvalidCaCertificate { .. } => ErrorKind::Format,
            BundleError::KeyEncryption { .. }
            | BundleError::PfxGeneration
            | BundleError::P7bGeneration => ErrorKind::Generation,
        }
    }

    /// True when the caller has to supply a (different) password
    pub fn is_credential_error(&self) -> bool {
        self.kind() == ErrorKind::Credential
    }
}

/// Configuration loading errors
#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Configuration file not found: {path}")]
    FileNotFound { path: String },

    #[error("Failed to parse configuration: {message}")]
    ParseError { message: String },

    #[error("Invalid configuration value for {key}: {message}")]
    InvalidValue { key: String, message: String },
}

/// Result type alias using ToolkitError
pub type Result<T> = std::result::Result<T, ToolkitError>;
