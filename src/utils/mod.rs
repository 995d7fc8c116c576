//! Utility modules for bundle-toolkit
//!
//! This module contains the error types shared by the codec and the CLI.

pub mod error;

pub use error::{BundleError, ConfigError, ErrorKind, Result, ToolkitError};
