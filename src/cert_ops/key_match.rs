//! Private key parsing and certificate/key pair matching
//!
//! Supports RSA, EC P-256, and EC P-384 keys in PKCS#8, encrypted PKCS#8,
//! PKCS#1, and SEC1 formats.

use crate::cert_ops::reader::parse_certificate_pem;
use crate::config::KeyCipher;
use crate::utils::BundleError;
use pkcs8::{DecodePrivateKey, DecodePublicKey, EncodePrivateKey, EncodePublicKey};
use rand::rngs::OsRng;
use rand::RngCore;
use spki::der::{pem::LineEnding, Decode, EncodePem};
use x509_parser::prelude::*;

/// A parsed private key, normalised to PKCS#8
#[derive(Debug, Clone)]
pub struct ParsedKey {
    /// Unencrypted PKCS#8 PrivateKeyInfo
    pub pkcs8_der: Vec<u8>,
    /// The SubjectPublicKeyInfo bytes derived from the private key
    pub public_key_spki: Vec<u8>,
    /// Key type description
    pub key_type: String,
}

/// Parse the first private key block in `pem`.
///
/// Encrypted PKCS#8 needs `password`; without one the result is
/// [`BundleError::PasswordRequired`].
pub fn parse_private_key_pem(pem: &str, password: Option<&str>) -> Result<ParsedKey, BundleError> {
    let pems = ::pem::parse_many(pem.as_bytes()).map_err(|e| BundleError::KeyParse {
        message: format!("Failed to parse PEM: {}", e),
    })?;

    for p in &pems {
        match p.tag() {
            "PRIVATE KEY" => {
                // PKCS#8 format
                return parse_pkcs8_der(p.contents());
            }
            "ENCRYPTED PRIVATE KEY" => {
                let Some(password) = password else {
                    return Err(BundleError::PasswordRequired);
                };
                let der = decrypt_pkcs8_der(p.contents(), password)?;
                return parse_pkcs8_der(&der);
            }
            "RSA PRIVATE KEY" | "EC PRIVATE KEY" if is_legacy_encrypted(p) => {
                // OpenSSL's pre-PKCS#8 encrypted PEM
                return Err(match password {
                    None => BundleError::PasswordRequired,
                    Some(_) => BundleError::KeyDecryption,
                });
            }
            "RSA PRIVATE KEY" => {
                // PKCS#1 RSA format
                return parse_pkcs1_rsa(p.contents());
            }
            "EC PRIVATE KEY" => {
                // SEC1 EC format
                return parse_sec1_ec(p.contents());
            }
            _ => continue,
        }
    }

    Err(BundleError::KeyParse {
        message: "No recognized private key block found".to_string(),
    })
}

fn is_legacy_encrypted(block: &::pem::Pem) -> bool {
    block
        .headers()
        .get("Proc-Type")
        .is_some_and(|value| value.trim() == "4,ENCRYPTED")
}

fn decrypt_pkcs8_der(der: &[u8], password: &str) -> Result<Vec<u8>, BundleError> {
    let encrypted = pkcs8::EncryptedPrivateKeyInfo::try_from(der).map_err(|e| {
        BundleError::KeyParse {
            message: format!("Malformed encrypted PKCS#8 key: {}", e),
        }
    })?;
    let document = encrypted.decrypt(password).map_err(|e| {
        tracing::debug!(error = %e, "PKCS#8 decryption failed");
        BundleError::KeyDecryption
    })?;
    Ok(document.as_bytes().to_vec())
}

/// Parse a PKCS#8 DER-encoded private key and extract SPKI
pub fn parse_pkcs8_der(der: &[u8]) -> Result<ParsedKey, BundleError> {
    // Try RSA first
    if let Ok(rsa_key) = rsa::RsaPrivateKey::from_pkcs8_der(der) {
        let public_key = rsa::RsaPublicKey::from(&rsa_key);
        return Ok(ParsedKey {
            pkcs8_der: der.to_vec(),
            public_key_spki: encode_spki(&public_key, "RSA")?,
            key_type: "RSA (PKCS#8)".to_string(),
        });
    }

    // Try EC P-256
    if let Ok(ec_key) = p256::SecretKey::from_pkcs8_der(der) {
        return Ok(ParsedKey {
            pkcs8_der: der.to_vec(),
            public_key_spki: encode_spki(&ec_key.public_key(), "EC P-256")?,
            key_type: "EC P-256 (PKCS#8)".to_string(),
        });
    }

    // Try EC P-384
    if let Ok(ec_key) = p384::SecretKey::from_pkcs8_der(der) {
        return Ok(ParsedKey {
            pkcs8_der: der.to_vec(),
            public_key_spki: encode_spki(&ec_key.public_key(), "EC P-384")?,
            key_type: "EC P-384 (PKCS#8)".to_string(),
        });
    }

    Err(BundleError::KeyParse {
        message: "Unsupported key type in PKCS#8 container".to_string(),
    })
}

/// Parse a PKCS#1 RSA private key
fn parse_pkcs1_rsa(der: &[u8]) -> Result<ParsedKey, BundleError> {
    use rsa::pkcs1::DecodeRsaPrivateKey;

    let rsa_key = rsa::RsaPrivateKey::from_pkcs1_der(der).map_err(|e| BundleError::KeyParse {
        message: format!("Failed to parse PKCS#1 RSA key: {}", e),
    })?;

    let public_key = rsa::RsaPublicKey::from(&rsa_key);
    Ok(ParsedKey {
        pkcs8_der: encode_pkcs8(&rsa_key, "RSA")?,
        public_key_spki: encode_spki(&public_key, "RSA")?,
        key_type: "RSA (PKCS#1)".to_string(),
    })
}

/// Parse a SEC1 EC private key
fn parse_sec1_ec(der: &[u8]) -> Result<ParsedKey, BundleError> {
    // Try P-256 first
    if let Ok(ec_key) = p256::SecretKey::from_sec1_der(der) {
        return Ok(ParsedKey {
            pkcs8_der: encode_pkcs8(&ec_key, "EC P-256")?,
            public_key_spki: encode_spki(&ec_key.public_key(), "EC P-256")?,
            key_type: "EC P-256 (SEC1)".to_string(),
        });
    }

    // Try P-384
    if let Ok(ec_key) = p384::SecretKey::from_sec1_der(der) {
        return Ok(ParsedKey {
            pkcs8_der: encode_pkcs8(&ec_key, "EC P-384")?,
            public_key_spki: encode_spki(&ec_key.public_key(), "EC P-384")?,
            key_type: "EC P-384 (SEC1)".to_string(),
        });
    }

    Err(BundleError::KeyParse {
        message: "Unsupported EC curve (only P-256 and P-384 are supported)".to_string(),
    })
}

fn encode_spki(public_key: &impl EncodePublicKey, label: &str) -> Result<Vec<u8>, BundleError> {
    public_key
        .to_public_key_der()
        .map(|doc| doc.as_ref().to_vec())
        .map_err(|e| BundleError::KeyParse {
            message: format!("Failed to encode {} public key: {}", label, e),
        })
}

fn encode_pkcs8(private_key: &impl EncodePrivateKey, label: &str) -> Result<Vec<u8>, BundleError> {
    private_key
        .to_pkcs8_der()
        .map(|doc| doc.as_bytes().to_vec())
        .map_err(|e| BundleError::KeyParse {
            message: format!("Failed to encode {} key as PKCS#8: {}", label, e),
        })
}

/// Re-encode a SubjectPublicKeyInfo as `PUBLIC KEY` PEM.
///
/// Known key types are decoded and re-encoded first, so a compressed EC
/// point in a certificate compares equal to the uncompressed form.
pub fn public_key_pem(spki_der: &[u8]) -> Result<String, BundleError> {
    let canonical = if let Ok(key) = rsa::RsaPublicKey::from_public_key_der(spki_der) {
        encode_spki(&key, "RSA")?
    } else if let Ok(key) = p256::PublicKey::from_public_key_der(spki_der) {
        encode_spki(&key, "EC P-256")?
    } else if let Ok(key) = p384::PublicKey::from_public_key_der(spki_der) {
        encode_spki(&key, "EC P-384")?
    } else {
        spki_der.to_vec()
    };

    spki::SubjectPublicKeyInfoOwned::from_der(&canonical)
        .and_then(|spki| spki.to_pem(LineEnding::LF))
        .map_err(|e| BundleError::KeyParse {
            message: format!("Failed to encode public key: {}", e),
        })
}

/// Check if a private key matches a certificate by comparing canonical public keys
pub fn keys_match(cert_der: &[u8], key_info: &ParsedKey) -> Result<bool, BundleError> {
    let (_, cert) = X509Certificate::from_der(cert_der).map_err(|e| {
        BundleError::CertificateParse {
            message: format!("{:?}", e),
        }
    })?;

    let cert_key = public_key_pem(cert.public_key().raw)?;
    let private_key = public_key_pem(&key_info.public_key_spki)?;

    Ok(cert_key == private_key)
}

/// Parse both PEM inputs and report whether they form a pair
pub fn verify_cert_key_match(
    cert_pem: &str,
    key_pem: &str,
    password: Option<&str>,
) -> Result<bool, BundleError> {
    let cert_der = parse_certificate_pem(cert_pem)?;
    let key = parse_private_key_pem(key_pem, password)?;
    let matched = keys_match(&cert_der, &key)?;
    tracing::debug!(key_type = %key.key_type, matched, "compared public keys");
    Ok(matched)
}

/// Encrypt a PKCS#8 key as `ENCRYPTED PRIVATE KEY` PEM (PBES2, PBKDF2-SHA256).
pub fn encrypt_private_key_pem(
    pkcs8_der: &[u8],
    password: &str,
    cipher: KeyCipher,
    iterations: u32,
) -> Result<String, BundleError> {
    let mut salt = [0u8; 16];
    let mut iv = [0u8; 16];
    OsRng.fill_bytes(&mut salt);
    OsRng.fill_bytes(&mut iv);

    let params = match cipher {
        KeyCipher::Aes256Cbc => {
            pkcs8::pkcs5::pbes2::Parameters::pbkdf2_sha256_aes256cbc(iterations, &salt, &iv)
        }
        KeyCipher::Aes128Cbc => {
            pkcs8::pkcs5::pbes2::Parameters::pbkdf2_sha256_aes128cbc(iterations, &salt, &iv)
        }
    }
    .map_err(|e| BundleError::KeyEncryption {
        message: e.to_string(),
    })?;

    let info = pkcs8::PrivateKeyInfo::try_from(pkcs8_der).map_err(|e| {
        BundleError::KeyEncryption {
            message: format!("not a PKCS#8 key: {}", e),
        }
    })?;
    let encrypted = info
        .encrypt_with_params(params, password)
        .map_err(|e| BundleError::KeyEncryption {
            message: e.to_string(),
        })?;

    let pem = encrypted
        .to_pem("ENCRYPTED PRIVATE KEY", LineEnding::LF)
        .map_err(|e| BundleError::KeyEncryption {
            message: e.to_string(),
        })?;
    Ok(pem.to_string())
}
