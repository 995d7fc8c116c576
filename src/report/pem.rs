//! PEM export functionality
//!
//! Writes RFC 7468 text blocks with LF line endings and 64 column bodies.

use base64::Engine;

/// PEM exporter for certificates, keys and PKCS#7 bundles
pub struct PemExporter;

impl PemExporter {
    /// Encode one DER blob under `label`
    pub fn encode_block(label: &str, der: &[u8]) -> String {
        let b64 = base64::engine::general_purpose::STANDARD.encode(der);
        let mut pem = String::with_capacity(b64.len() + b64.len() / 64 + 2 * label.len() + 34);
        pem.push_str("-----BEGIN ");
        pem.push_str(label);
        pem.push_str("-----\n");

        for chunk in b64.as_bytes().chunks(64) {
            pem.push_str(std::str::from_utf8(chunk).unwrap_or(""));
            pem.push('\n');
        }

        pem.push_str("-----END ");
        pem.push_str(label);
        pem.push_str("-----\n");
        pem
    }

    /// Export a single certificate to PEM format
    pub fn export_certificate(der: &[u8]) -> String {
        Self::encode_block("CERTIFICATE", der)
    }

    /// Export a certificate chain to PEM format (includes all certs)
    pub fn export_chain(chain: &[Vec<u8>]) -> String {
        Self::export_chain_internal(chain, false)
    }

    /// Export the CA part of a chain (everything after the leaf)
    pub fn export_chain_without_leaf(chain: &[Vec<u8>]) -> String {
        Self::export_chain_internal(chain, true)
    }

    fn export_chain_internal(chain: &[Vec<u8>], skip_leaf: bool) -> String {
        let start_idx = if skip_leaf { 1 } else { 0 };
        chain
            .iter()
            .skip(start_idx)
            .map(|der| Self::export_certificate(der))
            .collect::<Vec<_>>()
            .join("\n")
    }

    /// Unencrypted PKCS#8
    pub fn export_private_key(pkcs8_der: &[u8]) -> String {
        Self::encode_block("PRIVATE KEY", pkcs8_der)
    }

    pub fn export_pkcs7(der: &[u8]) -> String {
        Self::encode_block("PKCS7", der)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_export_chain() {
        let chain = vec![
            vec![0x30, 0x82, 0x01, 0x00], // Minimal DER header
        ];

        let pem = PemExporter::export_chain(&chain);
        assert!(pem.contains("-----BEGIN CERTIFICATE-----"));
        assert!(pem.contains("-----END CERTIFICATE-----"));
    }

    #[test]
    fn test_body_wraps_at_64_columns() {
        let pem = PemExporter::encode_block("PKCS7", &[0xAB; 100]);
        let lines: Vec<&str> = pem.lines().collect();
        assert_eq!(lines[0], "-----BEGIN PKCS7-----");
        assert_eq!(lines[1].len(), 64);
        assert_eq!(lines.last().copied(), Some("-----END PKCS7-----"));
        assert!(!pem.contains('\r'));
    }
}
