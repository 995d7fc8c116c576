//! Bundle operations module
//!
//! Provides the bundle codec (PKCS#12 and PKCS#7 to and from PEM), private
//! key parsing and pair matching, and the CLI runners around them.

pub mod convert;
pub mod key_match;
pub mod reader;
pub mod runner;

pub use convert::{
    create_p7b, create_pfx, extract_from_p7b, extract_from_pfx, verify_cert_key_match,
    BundleCodec,
};
pub use reader::DetectedFormat;
