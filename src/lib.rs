//! Bundle Toolkit Library
//!
//! Client-side conversion between certificate bundle formats:
//! - PKCS#12 (.pfx/.p12) unpacking into PEM key, certificate and CA chain
//! - PKCS#7 (.p7b/.p7c) unpacking into PEM certificate and CA chain
//! - PKCS#12 and PKCS#7 generation from PEM inputs
//! - Certificate/private key pair matching
//!
//! # Usage
//!
//! ```rust,no_run
//! use bundle_toolkit::cert_ops::convert;
//!
//! # fn main() -> Result<(), Box<dyn std::error::Error>> {
//! let pfx = std::fs::read("site.pfx")?;
//! let parsed = convert::extract_from_pfx(&pfx, "secret", None)?;
//! if let (Some(cert), Some(key)) = (&parsed.cert, &parsed.key) {
//!     assert!(convert::verify_cert_key_match(cert, key, None)?);
//! }
//! # Ok(())
//! # }
//! ```

pub mod cert_ops;
pub mod cli;
pub mod config;
pub mod models;
pub mod oid;
pub mod pkcs12;
pub mod pkcs7;
pub mod report;
pub mod utils;

// Re-export commonly used types
pub use cert_ops::convert::BundleCodec;
pub use cli::Cli;
pub use config::Settings;
pub use models::ParsedComponents;
pub use utils::{BundleError, ErrorKind, Result, ToolkitError};
