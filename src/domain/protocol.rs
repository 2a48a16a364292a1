use crate::error::{AuthError, Result};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::path::Path;

/// Per-protocol authorization rules.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProtocolConfig {
    /// Exact digit count of a valid approval code.
    pub approval_length: usize,
    /// Online protocols always contact the acquirer; offline ones are
    /// eligible for stand-in approval below the risk limit.
    pub is_online: bool,
}

impl ProtocolConfig {
    pub fn accepts_code(&self, code: &str) -> bool {
        !code.is_empty()
            && code.len() == self.approval_length
            && code.bytes().all(|b| b.is_ascii_digit())
    }
}

/// Immutable catalog of acquiring protocols, loaded once at startup.
///
/// Lookups never mutate, so a shared reference is safe across threads
/// without synchronization.
#[derive(Debug, Clone)]
pub struct ProtocolCatalog {
    protocols: HashMap<String, ProtocolConfig>,
}

impl ProtocolCatalog {
    /// Builds a catalog, rejecting entries that could never validate a code.
    pub fn new(entries: impl IntoIterator<Item = (String, ProtocolConfig)>) -> Result<Self> {
        let protocols: HashMap<String, ProtocolConfig> = entries.into_iter().collect();
        for (name, config) in &protocols {
            if config.approval_length == 0 {
                return Err(AuthError::Configuration(format!(
                    "protocol {name} has zero approval length"
                )));
            }
        }
        if protocols.is_empty() {
            return Err(AuthError::Configuration(
                "protocol catalog is empty".to_string(),
            ));
        }
        Ok(Self { protocols })
    }

    pub fn from_json_str(json: &str) -> Result<Self> {
        let entries: HashMap<String, ProtocolConfig> =
            serde_json::from_str(json).map_err(|e| AuthError::Internal(Box::new(e)))?;
        Self::new(entries)
    }

    pub fn from_path(path: impl AsRef<Path>) -> Result<Self> {
        let json = std::fs::read_to_string(path)?;
        Self::from_json_str(&json)
    }

    pub fn lookup(&self, protocol: &str) -> Result<ProtocolConfig> {
        self.protocols
            .get(protocol)
            .copied()
            .ok_or_else(|| AuthError::Configuration(protocol.to_string()))
    }

    /// True iff `code` is non-empty, all digits, and exactly the protocol's
    /// configured length. Unknown protocols fail the lookup.
    pub fn validate_approval_code(&self, protocol: &str, code: &str) -> Result<bool> {
        Ok(self.lookup(protocol)?.accepts_code(code))
    }

    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.protocols.keys().map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.protocols.len()
    }

    pub fn is_empty(&self) -> bool {
        self.protocols.is_empty()
    }
}

impl Default for ProtocolCatalog {
    /// The standard terminal protocol set.
    fn default() -> Self {
        let entries = [
            ("POS Terminal -101.1 (4-digit approval)", 4, true),
            ("POS Terminal -101.4 (6-digit approval)", 6, true),
            ("POS Terminal -101.6 (Pre-authorization)", 6, true),
            ("POS Terminal -101.7 (4-digit approval)", 4, true),
            ("POS Terminal -101.8 (PIN-LESS transaction)", 4, false),
            ("POS Terminal -201.1 (6-digit approval)", 6, true),
            ("POS Terminal -201.3 (6-digit approval)", 6, false),
            ("POS Terminal -201.5 (6-digit approval)", 6, false),
        ];
        Self {
            protocols: entries
                .into_iter()
                .map(|(name, approval_length, is_online)| {
                    (
                        name.to_string(),
                        ProtocolConfig {
                            approval_length,
                            is_online,
                        },
                    )
                })
                .collect(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_catalog_entries() {
        let catalog = ProtocolCatalog::default();
        assert_eq!(catalog.len(), 8);

        let config = catalog
            .lookup("POS Terminal -101.1 (4-digit approval)")
            .unwrap();
        assert_eq!(config.approval_length, 4);
        assert!(config.is_online);

        let config = catalog
            .lookup("POS Terminal -201.3 (6-digit approval)")
            .unwrap();
        assert_eq!(config.approval_length, 6);
        assert!(!config.is_online);
    }

    #[test]
    fn test_unknown_protocol_is_configuration_error() {
        let catalog = ProtocolCatalog::default();
        let err = catalog.lookup("POS Terminal -999").unwrap_err();
        assert!(matches!(err, AuthError::Configuration(_)));
    }

    #[test]
    fn test_validate_approval_code() {
        let catalog = ProtocolCatalog::default();
        let protocol = "POS Terminal -101.1 (4-digit approval)";

        assert!(catalog.validate_approval_code(protocol, "1234").unwrap());
        assert!(!catalog.validate_approval_code(protocol, "12345").unwrap());
        assert!(!catalog.validate_approval_code(protocol, "12a4").unwrap());
        assert!(!catalog.validate_approval_code(protocol, "").unwrap());
        assert!(!catalog.validate_approval_code(protocol, "123").unwrap());

        assert!(catalog.validate_approval_code("nope", "1234").is_err());
    }

    #[test]
    fn test_from_json() {
        let json = r#"{
            "TEST-4": {"approval_length": 4, "is_online": true},
            "TEST-6": {"approval_length": 6, "is_online": false}
        }"#;
        let catalog = ProtocolCatalog::from_json_str(json).unwrap();
        assert_eq!(catalog.len(), 2);
        assert!(!catalog.lookup("TEST-6").unwrap().is_online);
    }

    #[test]
    fn test_load_rejects_bad_entries() {
        assert!(ProtocolCatalog::from_json_str("{}").is_err());
        let json = r#"{"BAD": {"approval_length": 0, "is_online": true}}"#;
        assert!(ProtocolCatalog::from_json_str(json).is_err());
    }
}
