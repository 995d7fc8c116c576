//! Bundle conversion
//!
//! Unpacks PKCS#12 and PKCS#7 bundles into PEM components and builds them
//! back from PEM certificates, keys, and CA bundles.

use crate::cert_ops::key_match::{self, encrypt_private_key_pem, parse_private_key_pem};
use crate::cert_ops::reader::{parse_certificate_pem, read_ca_bundle};
use crate::config::{LeafSelection, PfxEncryption, Settings};
use crate::models::ParsedComponents;
use crate::pkcs12::{self, BagAttributes, PfxWriter, SafeBag};
use crate::pkcs7;
use crate::report::PemExporter;
use crate::utils::BundleError;
use sha1::{Digest, Sha1};

/// Stateless codec over a fixed set of [`Settings`]
#[derive(Debug, Clone, Default)]
pub struct BundleCodec {
    settings: Settings,
}

impl BundleCodec {
    pub fn new(settings: Settings) -> Self {
        Self { settings }
    }

    pub fn settings(&self) -> &Settings {
        &self.settings
    }

    /// Decode a PKCS#12 bundle into its key, leaf certificate, and CA chain.
    ///
    /// With `key_password` the key is returned as encrypted PKCS#8.
    pub fn extract_from_pfx(
        &self,
        bundle: &[u8],
        password: &str,
        key_password: Option<&str>,
    ) -> Result<ParsedComponents, BundleError> {
        let bags = pkcs12::parse_pfx(bundle, password).map_err(|e| {
            tracing::debug!(error = %e, "PKCS#12 decode failed");
            if e.is_credential_failure() {
                BundleError::BadCredentials
            } else {
                BundleError::Pkcs12Parse {
                    message: e.to_string(),
                }
            }
        })?;

        let mut key: Option<(&[u8], &BagAttributes)> = None;
        let mut certs: Vec<(&[u8], &BagAttributes)> = Vec::new();
        for bag in &bags {
            match bag {
                SafeBag::Key {
                    pkcs8_der,
                    attributes,
                } => {
                    if key.is_none() {
                        key = Some((pkcs8_der.as_slice(), attributes));
                    } else {
                        tracing::debug!("ignoring additional key bag");
                    }
                }
                SafeBag::Certificate { der, attributes } => certs.push((der.as_slice(), attributes)),
            }
        }

        let key_id = key.and_then(|(_, attributes)| attributes.local_key_id.as_deref());
        let leaf_index = select_leaf(&certs, key_id, self.settings.pfx.leaf_selection);

        // Leaf first, the remaining bags keep their file order.
        let mut chain: Vec<Vec<u8>> = Vec::with_capacity(certs.len());
        if let Some((der, _)) = certs.get(leaf_index) {
            chain.push(der.to_vec());
        }
        chain.extend(
            certs
                .iter()
                .enumerate()
                .filter(|(i, _)| *i != leaf_index)
                .map(|(_, (der, _))| der.to_vec()),
        );

        let key = match key {
            Some((der, _)) => Some(self.encode_key(der, key_password)?),
            None => None,
        };
        let cert = chain.first().map(|der| PemExporter::export_certificate(der));
        let ca = Some(PemExporter::export_chain_without_leaf(&chain)).filter(|ca| !ca.is_empty());

        tracing::debug!(
            has_key = key.is_some(),
            certificates = chain.len(),
            "extracted PFX components"
        );

        Ok(ParsedComponents { key, cert, ca })
    }

    fn encode_key(&self, pkcs8_der: &[u8], key_password: Option<&str>) -> Result<String, BundleError> {
        match key_password.filter(|p| !p.is_empty()) {
            Some(password) => encrypt_private_key_pem(
                pkcs8_der,
                password,
                self.settings.key.cipher,
                self.settings.key.pbkdf2_iterations,
            ),
            None => Ok(PemExporter::export_private_key(pkcs8_der)),
        }
    }

    /// Decode a DER or PEM PKCS#7 bundle. The first certificate is the leaf.
    pub fn extract_from_p7b(&self, bundle: &[u8]) -> Result<ParsedComponents, BundleError> {
        let certs = decode_pkcs7(bundle)?;
        if certs.is_empty() {
            return Err(BundleError::NoCertificates);
        }

        tracing::debug!(certificates = certs.len(), "extracted P7B certificates");

        Ok(ParsedComponents {
            key: None,
            cert: Some(PemExporter::export_certificate(&certs[0])),
            ca: Some(PemExporter::export_chain_without_leaf(&certs)).filter(|ca| !ca.is_empty()),
        })
    }

    pub fn verify_cert_key_match(
        &self,
        cert_pem: &str,
        key_pem: &str,
        password: Option<&str>,
    ) -> Result<bool, BundleError> {
        key_match::verify_cert_key_match(cert_pem, key_pem, password)
    }

    /// Build a password protected PKCS#12 from PEM inputs. Returns DER.
    pub fn create_pfx(
        &self,
        key_pem: &str,
        cert_pem: &str,
        ca_pem: Option<&str>,
        password: &str,
        friendly_name: Option<&str>,
    ) -> Result<Vec<u8>, BundleError> {
        self.build_pfx(key_pem, cert_pem, ca_pem, password, friendly_name)
            .map_err(|e| match e {
                BundleError::InvalidCaCertificate { .. } => e,
                other => {
                    tracing::debug!(error = %other, "PFX generation failed");
                    BundleError::PfxGeneration
                }
            })
    }

    fn build_pfx(
        &self,
        key_pem: &str,
        cert_pem: &str,
        ca_pem: Option<&str>,
        password: &str,
        friendly_name: Option<&str>,
    ) -> Result<Vec<u8>, BundleError> {
        let key = parse_private_key_pem(key_pem, None)?;
        let leaf = parse_certificate_pem(cert_pem)?;
        let ca = read_ca_bundle(ca_pem, self.settings.ca_bundle.policy)?;

        if !key_match::keys_match(&leaf, &key)? {
            tracing::warn!("private key does not match the certificate public key");
        }

        let friendly_name = friendly_name
            .map(str::trim)
            .filter(|name| !name.is_empty())
            .unwrap_or(self.settings.pfx.default_friendly_name.as_str());

        tracing::debug!(
            key_type = %key.key_type,
            ca_certificates = ca.len(),
            encryption = ?self.settings.pfx.encryption,
            "encoding PFX"
        );

        match self.settings.pfx.encryption {
            PfxEncryption::Legacy3Des => PfxWriter::new()
                .iterations(self.settings.pfx.iterations)
                .write(&key.pkcs8_der, &leaf, &ca, friendly_name, password)
                .map_err(|e| {
                    tracing::debug!(error = %e, "PKCS#12 encoding failed");
                    BundleError::PfxGeneration
                }),
            PfxEncryption::Aes256 => {
                write_keystore(
                    &key.pkcs8_der,
                    &leaf,
                    &ca,
                    friendly_name,
                    password,
                    self.settings.pfx.iterations,
                )
            }
        }
    }

    /// Build a certificates-only PKCS#7 as `PKCS7` PEM
    pub fn create_p7b(&self, cert_pem: &str, ca_pem: Option<&str>) -> Result<String, BundleError> {
        let build = || -> Result<String, BundleError> {
            let leaf = parse_certificate_pem(cert_pem)?;
            let ca = read_ca_bundle(ca_pem, self.settings.ca_bundle.policy)?;

            let mut chain = Vec::with_capacity(1 + ca.len());
            chain.push(leaf);
            chain.extend(ca);

            let der = pkcs7::build_certs_only(&chain);
            tracing::debug!(certificates = chain.len(), bytes = der.len(), "encoded P7B");
            Ok(PemExporter::export_pkcs7(&der))
        };

        build().map_err(|e| match e {
            BundleError::InvalidCaCertificate { .. } => e,
            other => {
                tracing::debug!(error = %other, "P7B generation failed");
                BundleError::P7bGeneration
            }
        })
    }
}

/// Index of the leaf among the certificate bags
fn select_leaf(
    certs: &[(&[u8], &BagAttributes)],
    key_id: Option<&[u8]>,
    mode: LeafSelection,
) -> usize {
    if mode == LeafSelection::LocalKeyId {
        let found = key_id.and_then(|id| {
            certs
                .iter()
                .position(|(_, attributes)| attributes.local_key_id.as_deref() == Some(id))
        });
        match found {
            Some(index) => return index,
            None => tracing::debug!("no certificate matches the key's localKeyId, using first"),
        }
    }
    0
}

/// DER first, then every PEM block in turn
fn decode_pkcs7(bundle: &[u8]) -> Result<Vec<Vec<u8>>, BundleError> {
    let der_error = match pkcs7::parse_certificates(bundle) {
        Ok(certs) => return Ok(certs),
        Err(e) => e,
    };

    if let Ok(blocks) = ::pem::parse_many(bundle) {
        for block in &blocks {
            match pkcs7::parse_certificates(block.contents()) {
                Ok(certs) => return Ok(certs),
                Err(e) => tracing::debug!(label = block.tag(), error = %e, "PEM block is not PKCS#7"),
            }
        }
    }

    Err(BundleError::Pkcs7Format {
        message: der_error.to_string(),
    })
}

/// PBES2/AES-256 PFX through p12-keystore
fn write_keystore(
    key_der: &[u8],
    leaf: &[u8],
    ca: &[Vec<u8>],
    friendly_name: &str,
    password: &str,
    iterations: u32,
) -> Result<Vec<u8>, BundleError> {
    let certs: Result<Vec<p12_keystore::Certificate>, _> = std::iter::once(leaf)
        .chain(ca.iter().map(Vec::as_slice))
        .map(p12_keystore::Certificate::from_der)
        .collect();

    let certs = certs.map_err(|e| {
        tracing::debug!(error = %e, "certificate rejected by PKCS#12 writer");
        BundleError::PfxGeneration
    })?;

    let local_key_id = Sha1::digest(leaf).to_vec();
    let chain = p12_keystore::PrivateKeyChain::new(key_der.to_vec(), &local_key_id, certs);

    let mut keystore = p12_keystore::KeyStore::new();
    keystore.add_entry(
        friendly_name,
        p12_keystore::KeyStoreEntry::PrivateKeyChain(chain),
    );

    keystore
        .writer(password)
        .encryption_iterations(u64::from(iterations))
        .mac_iterations(u64::from(iterations))
        .write()
        .map_err(|e| {
            tracing::debug!(error = %e, "PKCS#12 serialization failed");
            BundleError::PfxGeneration
        })
}

/// [`BundleCodec::extract_from_pfx`] with default settings
pub fn extract_from_pfx(
    bundle: &[u8],
    password: &str,
    key_password: Option<&str>,
) -> Result<ParsedComponents, BundleError> {
    BundleCodec::default().extract_from_pfx(bundle, password, key_password)
}

/// [`BundleCodec::extract_from_p7b`] with default settings
pub fn extract_from_p7b(bundle: &[u8]) -> Result<ParsedComponents, BundleError> {
    BundleCodec::default().extract_from_p7b(bundle)
}

/// [`BundleCodec::verify_cert_key_match`] with default settings
pub fn verify_cert_key_match(
    cert_pem: &str,
    key_pem: &str,
    password: Option<&str>,
) -> Result<bool, BundleError> {
    BundleCodec::default().verify_cert_key_match(cert_pem, key_pem, password)
}

/// [`BundleCodec::create_pfx`] with default settings
pub fn create_pfx(
    key_pem: &str,
    cert_pem: &str,
    ca_pem: Option<&str>,
    password: &str,
    friendly_name: Option<&str>,
) -> Result<Vec<u8>, BundleError> {
    BundleCodec::default().create_pfx(key_pem, cert_pem, ca_pem, password, friendly_name)
}

/// [`BundleCodec::create_p7b`] with default settings
pub fn create_p7b(cert_pem: &str, ca_pem: Option<&str>) -> Result<String, BundleError> {
    BundleCodec::default().create_p7b(cert_pem, ca_pem)
}
