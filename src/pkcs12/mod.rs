//! PKCS#12 (.p12/.pfx) engine.
//!
//! Reads both legacy PBE (SHA-1 + 3DES/RC2) and PBES2 (PBKDF2 + AES-CBC)
//! containers, keeping every safe bag in file order together with its
//! `localKeyId` and `friendlyName` attributes. Writes the legacy 3DES flavour
//! that older certificate stores still import.

mod kdf;
mod parse;
mod write;

use thiserror::Error;

pub use parse::parse_pfx;
pub use write::{PfxWriter, DEFAULT_ITERATIONS};

/// Errors raised while decoding or encoding a PFX
#[derive(Error, Debug)]
pub enum Pkcs12Error {
    #[error("malformed ASN.1 structure: {0}")]
    Asn1(#[from] yasna::ASN1Error),

    #[error("MAC verification failed (wrong password?)")]
    Mac,

    #[error("decryption failed (wrong password?)")]
    Decrypt,

    #[error("unsupported algorithm: {0}")]
    UnsupportedAlgorithm(String),

    #[error("unsupported PFX version {0}")]
    UnsupportedVersion(u32),

    #[error("encoding failed: {0}")]
    Encode(String),
}

impl Pkcs12Error {
    /// True for failures a wrong password produces: MAC mismatch, bad
    /// padding, or garbage where decrypted ASN.1 was expected.
    pub fn is_credential_failure(&self) -> bool {
        matches!(
            self,
            Pkcs12Error::Asn1(_) | Pkcs12Error::Mac | Pkcs12Error::Decrypt
        )
    }
}

/// PKCS#9 attributes carried by a safe bag
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct BagAttributes {
    pub local_key_id: Option<Vec<u8>>,
    pub friendly_name: Option<String>,
}

/// A decoded safe bag
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SafeBag {
    /// `keyBag` or decrypted `pkcs8ShroudedKeyBag`: PKCS#8 DER
    Key {
        pkcs8_der: Vec<u8>,
        attributes: BagAttributes,
    },
    /// `certBag` holding an X.509 certificate: DER
    Certificate {
        der: Vec<u8>,
        attributes: BagAttributes,
    },
}

impl SafeBag {
    pub fn attributes(&self) -> &BagAttributes {
        match self {
            SafeBag::Key { attributes, .. } | SafeBag::Certificate { attributes, .. } => {
                attributes
            }
        }
    }
}
