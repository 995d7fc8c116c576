//! BER parsing of PKCS#12 (PFX) structures (RFC 7292).
//!
//! Uses `yasna::parse_ber` since PKCS#12 files in the wild use BER
//! (indefinite lengths, constructed OCTET STRINGs), not strict DER.

use super::kdf::{self, AesCbc, LegacyCipher, MacDigest, Prf};
use super::{BagAttributes, Pkcs12Error, SafeBag};
use crate::oid::{self, oid};
use yasna::{ASN1Error, BERReader, BERReaderSeq, Tag};

/// Inner `Err` names an algorithm this engine does not implement.
type Supported<T> = Result<T, String>;

#[derive(Debug)]
enum Encryption {
    Legacy {
        cipher: LegacyCipher,
        salt: Vec<u8>,
        iterations: u32,
    },
    Pbes2 {
        salt: Vec<u8>,
        iterations: u32,
        prf: Prf,
        cipher: AesCbc,
        iv: Vec<u8>,
    },
    Unsupported(String),
}

impl Encryption {
    fn decrypt(&self, ciphertext: &[u8], password: &Password<'_>) -> Result<Vec<u8>, Pkcs12Error> {
        match self {
            Encryption::Legacy {
                cipher,
                salt,
                iterations,
            } => cipher.decrypt(ciphertext, &password.bmp, salt, *iterations),
            Encryption::Pbes2 {
                salt,
                iterations,
                prf,
                cipher,
                iv,
            } => kdf::pbes2_decrypt(
                ciphertext,
                password.text,
                salt,
                *iterations,
                *prf,
                *cipher,
                iv,
            ),
            Encryption::Unsupported(name) => Err(Pkcs12Error::UnsupportedAlgorithm(name.clone())),
        }
    }
}

/// The password in both encodings PKCS#12 uses: BMP for the PKCS#12 KDF,
/// UTF-8 for PBKDF2.
struct Password<'p> {
    text: &'p str,
    bmp: Vec<u8>,
}

struct MacData {
    digest: Supported<MacDigest>,
    digest_value: Vec<u8>,
    salt: Vec<u8>,
    iterations: u32,
}

enum ContentInfoInner {
    Data(Vec<u8>),
    EncryptedData {
        algorithm: Encryption,
        ciphertext: Vec<u8>,
    },
    Other(String),
}

enum BagValue {
    Key(Vec<u8>),
    ShroudedKey {
        algorithm: Encryption,
        ciphertext: Vec<u8>,
    },
    Certificate(Vec<u8>),
    Other(String),
}

struct RawBag {
    value: BagValue,
    attributes: BagAttributes,
}

/// Decode a PFX, verify its MAC and decrypt every bag, in file order.
pub fn parse_pfx(data: &[u8], password: &str) -> Result<Vec<SafeBag>, Pkcs12Error> {
    let (version, auth_safe, mac_data) = yasna::parse_ber(data, |r| {
        r.read_sequence(|r| {
            let version = r.next().read_u32()?;
            let auth_safe = parse_content_info_data(r.next())?;
            let mac_data = r.read_optional(parse_mac_data)?;
            Ok((version, auth_safe, mac_data))
        })
    })?;

    if version != 3 {
        return Err(Pkcs12Error::UnsupportedVersion(version));
    }

    let auth_safe = auth_safe.map_err(|name| {
        Pkcs12Error::UnsupportedAlgorithm(format!("authSafe content type {name}"))
    })?;

    let candidates = bmp_candidates(password);
    let bmp = match mac_data {
        Some(ref mac) => verify_mac(mac, &auth_safe, &candidates)?,
        None => {
            tracing::debug!("PFX has no MAC, skipping integrity check");
            candidates.into_iter().next().unwrap_or_default()
        }
    };
    let password = Password {
        text: password,
        bmp,
    };

    let content_infos =
        yasna::parse_ber(&auth_safe, |r| r.collect_sequence_of(parse_content_info_inner))?;

    let mut bags = Vec::new();
    for content_info in content_infos {
        let bags_data = match content_info {
            ContentInfoInner::Data(data) => data,
            ContentInfoInner::EncryptedData {
                algorithm,
                ciphertext,
            } => algorithm.decrypt(&ciphertext, &password)?,
            ContentInfoInner::Other(name) => {
                tracing::debug!(content_type = %name, "skipping unsupported authSafe entry");
                continue;
            }
        };

        let raw_bags = yasna::parse_ber(&bags_data, |r| r.collect_sequence_of(parse_safe_bag))?;

        for RawBag { value, attributes } in raw_bags {
            match value {
                BagValue::Key(pkcs8_der) => bags.push(SafeBag::Key {
                    pkcs8_der,
                    attributes,
                }),
                BagValue::ShroudedKey {
                    algorithm,
                    ciphertext,
                } => {
                    let pkcs8_der = algorithm.decrypt(&ciphertext, &password)?;
                    bags.push(SafeBag::Key {
                        pkcs8_der,
                        attributes,
                    });
                }
                BagValue::Certificate(der) => bags.push(SafeBag::Certificate { der, attributes }),
                BagValue::Other(name) => {
                    tracing::debug!(bag_type = %name, "skipping unsupported safe bag");
                }
            }
        }
    }

    tracing::debug!(bags = bags.len(), "decoded PFX");
    Ok(bags)
}

/// Password encodings to try. OpenSSL writes the empty password either as
/// an empty string or as a lone BMP terminator, so both are accepted.
fn bmp_candidates(password: &str) -> Vec<Vec<u8>> {
    if password.is_empty() {
        vec![Vec::new(), vec![0, 0]]
    } else {
        vec![kdf::password_to_bmp(password)]
    }
}

// ── ContentInfo parsing ────────────────────────────────────────────────────

/// Parse the ContentInfo that wraps the authSafe; only `data` is supported
/// (password integrity mode).
fn parse_content_info_data(r: BERReader) -> Result<Supported<Vec<u8>>, ASN1Error> {
    r.read_sequence(|r| {
        let content_type = r.next().read_oid()?;
        if content_type != oid(oid::DATA) {
            r.next().read_tagged(Tag::context(0), |r| r.read_der())?;
            return Ok(Err(oid::dotted(&content_type)));
        }
        let data = r
            .next()
            .read_tagged(Tag::context(0), |r| r.read_bytes())?;
        Ok(Ok(data))
    })
}

fn parse_content_info_inner(r: BERReader) -> Result<ContentInfoInner, ASN1Error> {
    r.read_sequence(|r| {
        let content_type = r.next().read_oid()?;

        if content_type == oid(oid::DATA) {
            let data = r
                .next()
                .read_tagged(Tag::context(0), |r| r.read_bytes())?;
            Ok(ContentInfoInner::Data(data))
        } else if content_type == oid(oid::ENCRYPTED_DATA) {
            r.next().read_tagged(Tag::context(0), |r| {
                r.read_sequence(|r| {
                    let _version = r.next().read_u32()?;
                    r.next().read_sequence(|r| {
                        let _content_type = r.next().read_oid()?;
                        let algorithm = parse_algorithm_identifier(r.next())?;
                        let ciphertext = r
                            .next()
                            .read_tagged_implicit(Tag::context(0), |r| r.read_bytes())?;
                        Ok(ContentInfoInner::EncryptedData {
                            algorithm,
                            ciphertext,
                        })
                    })
                })
            })
        } else {
            r.next().read_tagged(Tag::context(0), |r| r.read_der())?;
            Ok(ContentInfoInner::Other(oid::dotted(&content_type)))
        }
    })
}

// ── SafeBag parsing ────────────────────────────────────────────────────────

fn parse_safe_bag(r: BERReader) -> Result<RawBag, ASN1Error> {
    r.read_sequence(|r| {
        let bag_type = r.next().read_oid()?;

        let value = if bag_type == oid(oid::KEY_BAG) {
            let der = r.next().read_tagged(Tag::context(0), |r| r.read_der())?;
            BagValue::Key(der)
        } else if bag_type == oid(oid::PKCS8_SHROUDED_KEY_BAG) {
            let (algorithm, ciphertext) = r.next().read_tagged(Tag::context(0), |r| {
                r.read_sequence(|r| {
                    let algorithm = parse_algorithm_identifier(r.next())?;
                    let ciphertext = r.next().read_bytes()?;
                    Ok((algorithm, ciphertext))
                })
            })?;
            BagValue::ShroudedKey {
                algorithm,
                ciphertext,
            }
        } else if bag_type == oid(oid::CERT_BAG) {
            r.next().read_tagged(Tag::context(0), |r| {
                r.read_sequence(|r| {
                    let cert_type = r.next().read_oid()?;
                    let is_x509 = cert_type == oid(oid::X509_CERTIFICATE);
                    let value = r.next().read_tagged(Tag::context(0), |r| {
                        if is_x509 {
                            r.read_bytes()
                        } else {
                            r.read_der()
                        }
                    })?;
                    Ok(if is_x509 {
                        BagValue::Certificate(value)
                    } else {
                        BagValue::Other(format!("certBag {}", oid::dotted(&cert_type)))
                    })
                })
            })?
        } else {
            r.next().read_tagged(Tag::context(0), |r| r.read_der())?;
            BagValue::Other(oid::dotted(&bag_type))
        };

        let attributes = parse_attributes(r)?;
        Ok(RawBag { value, attributes })
    })
}

/// Read the optional `SET OF Attribute` that closes a SafeBag, keeping the
/// first `localKeyId` and `friendlyName` values.
fn parse_attributes(r: &mut BERReaderSeq<'_, '_>) -> Result<BagAttributes, ASN1Error> {
    let mut attributes = BagAttributes::default();
    r.read_optional(|r| {
        r.read_set_of(|r| {
            r.read_sequence(|r| {
                let attr_type = r.next().read_oid()?;
                r.next().read_set_of(|r| {
                    if attr_type == oid(oid::LOCAL_KEY_ID) {
                        let id = r.read_bytes()?;
                        attributes.local_key_id.get_or_insert(id);
                    } else if attr_type == oid(oid::FRIENDLY_NAME) {
                        let name = r.read_bmp_string()?;
                        attributes.friendly_name.get_or_insert(name);
                    } else {
                        r.read_der()?;
                    }
                    Ok(())
                })
            })
        })
    })?;
    Ok(attributes)
}

// ── AlgorithmIdentifier parsing ────────────────────────────────────────────

fn parse_algorithm_identifier(r: BERReader) -> Result<Encryption, ASN1Error> {
    r.read_sequence(|r| {
        let alg_oid = r.next().read_oid()?;

        let legacy = if alg_oid == oid(oid::PBE_SHA1_3DES_CBC) {
            Some(LegacyCipher::TripleDes)
        } else if alg_oid == oid(oid::PBE_SHA1_128BIT_RC2_CBC) {
            Some(LegacyCipher::Rc2With128BitKey)
        } else if alg_oid == oid(oid::PBE_SHA1_40BIT_RC2_CBC) {
            Some(LegacyCipher::Rc2With40BitKey)
        } else {
            None
        };

        if let Some(cipher) = legacy {
            // pkcs-12PbeParams: SEQUENCE { salt OCTET STRING, iterations INTEGER }
            return r.next().read_sequence(|r| {
                let salt = r.next().read_bytes()?;
                let iterations = r.next().read_u32()?;
                Ok(Encryption::Legacy {
                    cipher,
                    salt,
                    iterations,
                })
            });
        }

        if alg_oid == oid(oid::PBES2) {
            return r.next().read_sequence(parse_pbes2_params);
        }

        r.read_optional(|r| r.read_der())?;
        Ok(Encryption::Unsupported(oid::dotted(&alg_oid)))
    })
}

/// PBES2-params: SEQUENCE { keyDerivationFunc AlgId, encryptionScheme AlgId }
fn parse_pbes2_params(r: &mut BERReaderSeq<'_, '_>) -> Result<Encryption, ASN1Error> {
    let kdf_params = r.next().read_sequence(|r| {
        let kdf_oid = r.next().read_oid()?;
        if kdf_oid != oid(oid::PBKDF2) {
            r.read_optional(|r| r.read_der())?;
            return Ok(Err(oid::dotted(&kdf_oid)));
        }
        // PBKDF2-params: SEQUENCE { salt, iterationCount, keyLength?, prf? }
        r.next().read_sequence(|r| {
            let salt = r.next().read_bytes()?;
            let iterations = r.next().read_u32()?;
            let _key_length = r.read_optional(|r| r.read_u32())?;
            let prf = r.read_optional(parse_prf)?.unwrap_or(Ok(Prf::HmacSha1));
            Ok(prf.map(|prf| (salt, iterations, prf)))
        })
    })?;

    let scheme = r.next().read_sequence(|r| {
        let enc_oid = r.next().read_oid()?;
        let cipher = if enc_oid == oid(oid::AES_128_CBC) {
            Some(AesCbc::Aes128)
        } else if enc_oid == oid(oid::AES_192_CBC) {
            Some(AesCbc::Aes192)
        } else if enc_oid == oid(oid::AES_256_CBC) {
            Some(AesCbc::Aes256)
        } else {
            None
        };
        match cipher {
            Some(cipher) => {
                let iv = r.next().read_bytes()?;
                Ok(Ok((cipher, iv)))
            }
            None => {
                r.read_optional(|r| r.read_der())?;
                Ok(Err(oid::dotted(&enc_oid)))
            }
        }
    })?;

    Ok(match (kdf_params, scheme) {
        (Ok((salt, iterations, prf)), Ok((cipher, iv))) => Encryption::Pbes2 {
            salt,
            iterations,
            prf,
            cipher,
            iv,
        },
        (Err(name), _) | (_, Err(name)) => Encryption::Unsupported(name),
    })
}

fn parse_prf(r: BERReader) -> Result<Supported<Prf>, ASN1Error> {
    r.read_sequence(|r| {
        let prf_oid = r.next().read_oid()?;
        r.read_optional(|r| r.read_null())?;
        Ok(if prf_oid == oid(oid::HMAC_SHA1) {
            Ok(Prf::HmacSha1)
        } else if prf_oid == oid(oid::HMAC_SHA256) {
            Ok(Prf::HmacSha256)
        } else if prf_oid == oid(oid::HMAC_SHA512) {
            Ok(Prf::HmacSha512)
        } else {
            Err(oid::dotted(&prf_oid))
        })
    })
}

// ── MAC verification ───────────────────────────────────────────────────────

fn parse_mac_data(r: BERReader) -> Result<MacData, ASN1Error> {
    r.read_sequence(|r| {
        // DigestInfo: SEQUENCE { digestAlgorithm, digest }
        let (digest, digest_value) = r.next().read_sequence(|r| {
            let digest = r.next().read_sequence(|r| {
                let hash_oid = r.next().read_oid()?;
                r.read_optional(|r| r.read_null())?;
                Ok(if hash_oid == oid(oid::SHA1) {
                    Ok(MacDigest::Sha1)
                } else if hash_oid == oid(oid::SHA256) {
                    Ok(MacDigest::Sha256)
                } else if hash_oid == oid(oid::SHA512) {
                    Ok(MacDigest::Sha512)
                } else {
                    Err(oid::dotted(&hash_oid))
                })
            })?;
            let value = r.next().read_bytes()?;
            Ok((digest, value))
        })?;

        let salt = r.next().read_bytes()?;
        let iterations = r.read_optional(|r| r.read_u32())?.unwrap_or(1);

        Ok(MacData {
            digest,
            digest_value,
            salt,
            iterations,
        })
    })
}

/// Check the MAC and return the password encoding that produced it.
fn verify_mac(
    mac: &MacData,
    auth_safe: &[u8],
    candidates: &[Vec<u8>],
) -> Result<Vec<u8>, Pkcs12Error> {
    let digest = mac.digest.clone().map_err(|name| {
        Pkcs12Error::UnsupportedAlgorithm(format!("MAC digest {name}"))
    })?;

    for candidate in candidates {
        let key = digest.derive(
            kdf::ID_MAC,
            candidate,
            &mac.salt,
            mac.iterations,
            digest.output_len(),
        );
        if digest.hmac(&key, auth_safe)? == mac.digest_value {
            return Ok(candidate.clone());
        }
    }

    Err(Pkcs12Error::Mac)
}
