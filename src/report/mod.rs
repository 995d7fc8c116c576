//! Text encodings of codec output

pub mod pem;

pub use pem::PemExporter;
