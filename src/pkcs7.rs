//! Certificates-only PKCS#7 `signedData` (RFC 2315 "degenerate" case)

use crate::oid::{self, oid};
use thiserror::Error;
use yasna::{ASN1Error, Tag};

#[derive(Error, Debug)]
pub enum Pkcs7Error {
    #[error("malformed ASN.1 structure: {0}")]
    Asn1(#[from] ASN1Error),

    #[error("content type {0} is not signedData")]
    NotSignedData(String),
}

/// Return the DER of every certificate in a `signedData` ContentInfo, in
/// the order they appear. A missing `certificates` field yields an empty list.
pub fn parse_certificates(der: &[u8]) -> Result<Vec<Vec<u8>>, Pkcs7Error> {
    let certs = yasna::parse_ber(der, |r| {
        r.read_sequence(|r| {
            let content_type = r.next().read_oid()?;
            if content_type != oid(oid::SIGNED_DATA) {
                r.read_optional(|r| r.read_der())?;
                return Ok(Err(oid::dotted(&content_type)));
            }
            r.next().read_tagged(Tag::context(0), |r| {
                r.read_sequence(|r| {
                    let _version = r.next().read_der()?;
                    let _digest_algorithms = r.next().read_der()?;
                    let _encap_content_info = r.next().read_der()?;
                    let certs = r
                        .read_optional(|r| {
                            r.read_tagged_implicit(Tag::context(0), |r| {
                                let mut certs = Vec::new();
                                r.read_set_of(|r| {
                                    certs.push(r.read_der()?);
                                    Ok(())
                                })?;
                                Ok(certs)
                            })
                        })?
                        .unwrap_or_default();
                    // read_der would ignore the implicit tag, so walk the SET to match [1].
                    let crls = r.read_optional(|r| {
                        r.read_tagged_implicit(Tag::context(1), |r| {
                            let mut count = 0usize;
                            r.read_set_of(|r| {
                                r.read_der()?;
                                count += 1;
                                Ok(())
                            })?;
                            Ok(count)
                        })
                    })?;
                    if let Some(count) = crls {
                        tracing::debug!(crls = count, "ignoring revocation lists");
                    }
                    let _signer_infos = r.next().read_der()?;
                    Ok(Ok(certs))
                })
            })
        })
    })?;

    let certs = certs.map_err(Pkcs7Error::NotSignedData)?;
    let total = certs.len();
    // CertificateChoices may also hold [0]..[3] tagged legacy forms; keep plain X.509.
    let certs: Vec<Vec<u8>> = certs
        .into_iter()
        .filter(|der| der.first() == Some(&0x30))
        .collect();
    if certs.len() != total {
        tracing::debug!(
            skipped = total - certs.len(),
            "ignoring non X.509 certificate choices"
        );
    }
    Ok(certs)
}

/// Encode `certs` as a certificates-only `signedData` ContentInfo (DER).
///
/// The certificates field is written in the given order rather than sorted,
/// so the leaf stays first.
pub fn build_certs_only(certs: &[Vec<u8>]) -> Vec<u8> {
    yasna::construct_der(|w| {
        w.write_sequence(|w| {
            w.next().write_oid(&oid(oid::SIGNED_DATA));
            w.next().write_tagged(Tag::context(0), |w| {
                w.write_sequence(|w| {
                    w.next().write_u32(1);
                    w.next().write_set(|_| {});
                    w.next().write_sequence(|w| {
                        w.next().write_oid(&oid(oid::DATA));
                    });
                    w.next().write_tagged_implicit(Tag::context(0), |w| {
                        w.write_sequence(|w| {
                            for cert in certs {
                                w.next().write_der(cert);
                            }
                        })
                    });
                    w.next().write_set(|_| {});
                })
            });
        })
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::PathBuf;

    fn fixture(name: &str) -> Vec<u8> {
        std::fs::read(
            PathBuf::from(env!("CARGO_MANIFEST_DIR"))
                .join("tests/fixtures")
                .join(name),
        )
        .unwrap()
    }

    #[test]
    fn test_parse_openssl_chain() {
        let certs = parse_certificates(&fixture("chain.p7b")).unwrap();
        assert_eq!(certs.len(), 3);
        assert!(certs.iter().all(|c| c[0] == 0x30));
    }

    #[test]
    fn test_revocation_lists_are_skipped() {
        let certs = parse_certificates(&fixture("chain-with-crl.p7b")).unwrap();
        assert_eq!(certs, parse_certificates(&fixture("chain.p7b")).unwrap());
    }

    #[test]
    fn test_single_certificate_build() {
        let certs = vec![b"\x30\x03\x02\x01\x09".to_vec()];
        assert_eq!(parse_certificates(&build_certs_only(&certs)).unwrap(), certs);
    }

    #[test]
    fn test_parse_empty_signed_data() {
        let certs = parse_certificates(&fixture("empty.p7b")).unwrap();
        assert!(certs.is_empty());
    }

    #[test]
    fn test_build_preserves_order() {
        // Deliberately out of DER SET OF order.
        let certs = vec![
            b"\x30\x03\x02\x01\x09".to_vec(),
            b"\x30\x03\x02\x01\x01".to_vec(),
            b"\x30\x03\x02\x01\x05".to_vec(),
        ];
        let der = build_certs_only(&certs);
        assert_eq!(parse_certificates(&der).unwrap(), certs);
    }

    #[test]
    fn test_rebuild_openssl_chain() {
        let certs = parse_certificates(&fixture("chain.p7b")).unwrap();
        let rebuilt = parse_certificates(&build_certs_only(&certs)).unwrap();
        assert_eq!(rebuilt, certs);
    }

    #[test]
    fn test_rejects_other_content_types() {
        let der = yasna::construct_der(|w| {
            w.write_sequence(|w| {
                w.next().write_oid(&oid(oid::DATA));
                w.next()
                    .write_tagged(Tag::context(0), |w| w.write_bytes(b"hello"));
            })
        });
        let err = parse_certificates(&der).unwrap_err();
        assert!(matches!(err, Pkcs7Error::NotSignedData(_)));
    }

    #[test]
    fn test_rejects_garbage() {
        let err = parse_certificates(b"not asn.1").unwrap_err();
        assert!(std::error::Error::source(&err).is_some());
        assert!(matches!(err, Pkcs7Error::Asn1(_)));
    }
}
