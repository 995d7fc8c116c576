//! Result of unpacking a PKCS#12 or PKCS#7 bundle

use serde::Serialize;

/// PEM components extracted from a bundle
///
/// `ca` holds every certificate after the leaf as PEM blocks separated by a
/// newline, in bundle order.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct ParsedComponents {
    pub key: Option<String>,
    pub cert: Option<String>,
    pub ca: Option<String>,
}

impl ParsedComponents {
    /// Number of CA certificate blocks
    pub fn ca_count(&self) -> usize {
        self.ca
            .as_deref()
            .map(|ca| ca.matches("-----BEGIN CERTIFICATE-----").count())
            .unwrap_or(0)
    }

    pub fn is_empty(&self) -> bool {
        self.key.is_none() && self.cert.is_none() && self.ca.is_none()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_ca_count() {
        let mut parsed = ParsedComponents::default();
        assert!(parsed.is_empty());
        assert_eq!(parsed.ca_count(), 0);

        parsed.ca = Some(
            "-----BEGIN CERTIFICATE-----\nAA==\n-----END CERTIFICATE-----\n\n\
             -----BEGIN CERTIFICATE-----\nAQ==\n-----END CERTIFICATE-----\n"
                .to_string(),
        );
        assert_eq!(parsed.ca_count(), 2);
    }

    #[test]
    fn test_serializes_missing_fields_as_null() {
        let parsed = ParsedComponents {
            cert: Some("c".into()),
            ..Default::default()
        };
        let json = serde_json::to_value(&parsed).unwrap();
        assert_eq!(json["cert"], "c");
        assert!(json["key"].is_null());
    }
}
