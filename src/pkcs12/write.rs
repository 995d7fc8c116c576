//! PFX encoder.
//!
//! Produces the layout `openssl pkcs12 -export -legacy` writes: certificates
//! in a 3DES `encryptedData` ContentInfo, the key in a 3DES
//! `pkcs8ShroudedKeyBag` inside a `data` ContentInfo, and an HMAC-SHA1 MAC.

use super::kdf::{self, LegacyCipher, MacDigest};
use super::Pkcs12Error;
use crate::oid::{self, oid};
use rand::rngs::OsRng;
use rand::RngCore;
use sha1::{Digest, Sha1};
use yasna::{DERWriter, Tag};

/// Iteration count for the PBE and MAC key derivations.
pub const DEFAULT_ITERATIONS: u32 = 2048;

const SALT_LEN: usize = 8;

/// Builds password protected PFX files
#[derive(Debug, Clone)]
pub struct PfxWriter {
    iterations: u32,
}

impl Default for PfxWriter {
    fn default() -> Self {
        Self {
            iterations: DEFAULT_ITERATIONS,
        }
    }
}

impl PfxWriter {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn iterations(mut self, iterations: u32) -> Self {
        self.iterations = iterations;
        self
    }

    /// Encode `key_pkcs8_der`, `leaf_der` and `ca_ders` (in that order) into a PFX.
    ///
    /// The key bag and the leaf certificate bag share a `localKeyId`, the
    /// SHA-1 of the leaf DER, and carry `friendly_name`.
    pub fn write(
        &self,
        key_pkcs8_der: &[u8],
        leaf_der: &[u8],
        ca_ders: &[Vec<u8>],
        friendly_name: &str,
        password: &str,
    ) -> Result<Vec<u8>, Pkcs12Error> {
        if self.iterations == 0 {
            return Err(Pkcs12Error::Encode(
                "iteration count must be positive".to_string(),
            ));
        }

        let bmp = kdf::password_to_bmp(password);
        let local_key_id = Sha1::digest(leaf_der).to_vec();
        let iterations = self.iterations;

        // Certificates: leaf first, then CA certificates in the given order.
        let cert_contents = yasna::construct_der(|w| {
            w.write_sequence(|w| {
                write_cert_bag(w.next(), leaf_der, Some((local_key_id.as_slice(), friendly_name)));
                for der in ca_ders {
                    write_cert_bag(w.next(), der, None);
                }
            })
        });
        let cert_salt = random_salt();
        let encrypted_certs =
            LegacyCipher::TripleDes.encrypt(&cert_contents, &bmp, &cert_salt, iterations)?;

        let key_salt = random_salt();
        let encrypted_key =
            LegacyCipher::TripleDes.encrypt(key_pkcs8_der, &bmp, &key_salt, iterations)?;
        let key_contents = yasna::construct_der(|w| {
            w.write_sequence(|w| {
                w.next().write_sequence(|w| {
                    w.next().write_oid(&oid(oid::PKCS8_SHROUDED_KEY_BAG));
                    w.next().write_tagged(Tag::context(0), |w| {
                        w.write_sequence(|w| {
                            write_pbe_algorithm(w.next(), &key_salt, iterations);
                            w.next().write_bytes(&encrypted_key);
                        })
                    });
                    write_attributes(w.next(), &local_key_id, friendly_name);
                })
            })
        });

        let auth_safe = yasna::construct_der(|w| {
            w.write_sequence(|w| {
                w.next().write_sequence(|w| {
                    w.next().write_oid(&oid(oid::ENCRYPTED_DATA));
                    w.next().write_tagged(Tag::context(0), |w| {
                        w.write_sequence(|w| {
                            w.next().write_u32(0);
                            w.next().write_sequence(|w| {
                                w.next().write_oid(&oid(oid::DATA));
                                write_pbe_algorithm(w.next(), &cert_salt, iterations);
                                w.next()
                                    .write_tagged_implicit(Tag::context(0), |w| {
                                        w.write_bytes(&encrypted_certs)
                                    });
                            })
                        })
                    });
                });
                w.next().write_sequence(|w| {
                    w.next().write_oid(&oid(oid::DATA));
                    w.next()
                        .write_tagged(Tag::context(0), |w| w.write_bytes(&key_contents));
                });
            })
        });

        let mac_salt = random_salt();
        let mac_key = MacDigest::Sha1.derive(
            kdf::ID_MAC,
            &bmp,
            &mac_salt,
            iterations,
            MacDigest::Sha1.output_len(),
        );
        let mac = MacDigest::Sha1
            .hmac(&mac_key, &auth_safe)
            .map_err(|e| Pkcs12Error::Encode(e.to_string()))?;

        let pfx = yasna::construct_der(|w| {
            w.write_sequence(|w| {
                w.next().write_u32(3);
                w.next().write_sequence(|w| {
                    w.next().write_oid(&oid(oid::DATA));
                    w.next()
                        .write_tagged(Tag::context(0), |w| w.write_bytes(&auth_safe));
                });
                w.next().write_sequence(|w| {
                    w.next().write_sequence(|w| {
                        w.next().write_sequence(|w| {
                            w.next().write_oid(&oid(oid::SHA1));
                            w.next().write_null();
                        });
                        w.next().write_bytes(&mac);
                    });
                    w.next().write_bytes(&mac_salt);
                    w.next().write_u32(iterations);
                });
            })
        });

        tracing::debug!(
            certificates = 1 + ca_ders.len(),
            iterations,
            bytes = pfx.len(),
            "encoded PFX"
        );
        Ok(pfx)
    }
}

fn random_salt() -> [u8; SALT_LEN] {
    let mut salt = [0u8; SALT_LEN];
    OsRng.fill_bytes(&mut salt);
    salt
}

fn write_pbe_algorithm(w: DERWriter, salt: &[u8], iterations: u32) {
    w.write_sequence(|w| {
        w.next().write_oid(&oid(oid::PBE_SHA1_3DES_CBC));
        w.next().write_sequence(|w| {
            w.next().write_bytes(salt);
            w.next().write_u32(iterations);
        });
    });
}

fn write_cert_bag(w: DERWriter, der: &[u8], attributes: Option<(&[u8], &str)>) {
    w.write_sequence(|w| {
        w.next().write_oid(&oid(oid::CERT_BAG));
        w.next().write_tagged(Tag::context(0), |w| {
            w.write_sequence(|w| {
                w.next().write_oid(&oid(oid::X509_CERTIFICATE));
                w.next().write_tagged(Tag::context(0), |w| w.write_bytes(der));
            })
        });
        if let Some((local_key_id, friendly_name)) = attributes {
            write_attributes(w.next(), local_key_id, friendly_name);
        }
    });
}

fn write_attributes(w: DERWriter, local_key_id: &[u8], friendly_name: &str) {
    w.write_set(|w| {
        w.next().write_sequence(|w| {
            w.next().write_oid(&oid(oid::FRIENDLY_NAME));
            w.next().write_set(|w| w.next().write_bmp_string(friendly_name));
        });
        w.next().write_sequence(|w| {
            w.next().write_oid(&oid(oid::LOCAL_KEY_ID));
            w.next().write_set(|w| w.next().write_bytes(local_key_id));
        });
    });
}
