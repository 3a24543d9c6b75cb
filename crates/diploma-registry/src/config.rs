//! Registry configuration via `registry.toml`.

use std::collections::{BTreeMap, HashMap};
use std::path::Path;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use diploma_registry_core::{ContentAddress, OwnerAddress, RecordId, Role};

use crate::error::ConfigError;

/// Configuration for the registry.
///
/// # Example
///
/// ```toml
/// verify_base_url = "https://diplomas.example.edu"
/// content_gateway_url = "https://gateway.pinata.cloud/ipfs"
/// ledger_timeout_ms = 30000
/// content_timeout_ms = 60000
///
/// [role_overrides]
/// "0xAdminAddress" = "ADMIN"
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RegistryConfig {
    /// Base of the public verification page; records link to
    /// `<verify_base_url>/verify/<id>`.
    pub verify_base_url: String,
    /// Base URL content addresses are resolved against.
    pub content_gateway_url: String,
    /// Upper bound on a single ledger call. Expiry counts as a ledger failure.
    pub ledger_timeout_ms: u64,
    /// Upper bound on a single content upload. Expiry is fatal.
    pub content_timeout_ms: u64,
    /// How many identifiers Create tries before giving up on conflicts.
    pub max_allocation_attempts: u32,
    /// Reason recorded on the ledger when Invalidate is called without one.
    pub default_invalidation_reason: String,
    /// Fixed address → role entries that win over the role store.
    pub role_overrides: BTreeMap<String, Role>,
}

impl Default for RegistryConfig {
    fn default() -> Self {
        Self {
            verify_base_url: "http://localhost:5173".to_string(),
            content_gateway_url: "https://gateway.pinata.cloud/ipfs".to_string(),
            ledger_timeout_ms: 30_000,
            content_timeout_ms: 60_000,
            max_allocation_attempts: 5,
            default_invalidation_reason: "Revoked by admin".to_string(),
            role_overrides: BTreeMap::new(),
        }
    }
}

impl RegistryConfig {
    /// Parse config from TOML text. Missing keys take their defaults.
    pub fn from_toml_str(text: &str) -> Result<Self, ConfigError> {
        let config: RegistryConfig = toml::from_str(text)?;
        config.check()?;
        Ok(config)
    }

    /// Read and parse config from a file path.
    pub fn from_file(path: &Path) -> Result<Self, ConfigError> {
        let text = std::fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.display().to_string(),
            source,
        })?;
        Self::from_toml_str(&text)
    }

    fn check(&self) -> Result<(), ConfigError> {
        if self.max_allocation_attempts == 0 {
            return Err(ConfigError::Invalid(
                "max_allocation_attempts must be at least 1".into(),
            ));
        }
        if self.verify_base_url.trim().is_empty() {
            return Err(ConfigError::Invalid("verify_base_url is empty".into()));
        }
        Ok(())
    }

    pub fn ledger_timeout(&self) -> Duration {
        Duration::from_millis(self.ledger_timeout_ms)
    }

    pub fn content_timeout(&self) -> Duration {
        Duration::from_millis(self.content_timeout_ms)
    }

    /// The verification page for a record.
    pub fn verify_url(&self, id: &RecordId) -> String {
        format!("{}/verify/{}", self.verify_base_url.trim_end_matches('/'), id)
    }

    /// The gateway URL of a stored payload.
    pub fn content_url(&self, address: &ContentAddress) -> String {
        format!(
            "{}/{}",
            self.content_gateway_url.trim_end_matches('/'),
            address
        )
    }

    /// The override map with addresses normalized to lower case.
    pub fn role_overrides(&self) -> HashMap<OwnerAddress, Role> {
        self.role_overrides
            .iter()
            .map(|(address, role)| (OwnerAddress::new(address), *role))
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = RegistryConfig::default();
        assert_eq!(config.ledger_timeout(), Duration::from_secs(30));
        assert_eq!(config.content_timeout(), Duration::from_secs(60));
        assert_eq!(config.max_allocation_attempts, 5);
        assert_eq!(
            config.verify_url(&RecordId::from_number(7)),
            "http://localhost:5173/verify/7"
        );
        assert_eq!(
            config.content_url(&ContentAddress::new("bafy")),
            "https://gateway.pinata.cloud/ipfs/bafy"
        );
    }

    #[test]
    fn test_partial_toml_keeps_defaults() {
        let config = RegistryConfig::from_toml_str(
            r#"
            verify_base_url = "https://diplomas.example.edu/"
            ledger_timeout_ms = 500

            [role_overrides]
            "0xABCDEF" = "ADMIN"
            "0x123456" = "STUDENT_SERVICE"
            "#,
        )
        .unwrap();

        assert_eq!(config.ledger_timeout(), Duration::from_millis(500));
        assert_eq!(config.content_timeout_ms, 60_000);
        assert_eq!(
            config.verify_url(&RecordId::from_number(3)),
            "https://diplomas.example.edu/verify/3"
        );

        let overrides = config.role_overrides();
        assert_eq!(overrides.get(&OwnerAddress::new("0xabcdef")), Some(&Role::Admin));
        assert_eq!(
            overrides.get(&OwnerAddress::new("0x123456")),
            Some(&Role::StudentService)
        );
    }

    #[test]
    fn test_rejects_bad_values() {
        assert!(matches!(
            RegistryConfig::from_toml_str("max_allocation_attempts = 0"),
            Err(ConfigError::Invalid(_))
        ));
        assert!(matches!(
            RegistryConfig::from_toml_str("[role_overrides]\n\"0x1\" = \"DEAN\""),
            Err(ConfigError::Parse(_))
        ));
    }

    #[test]
    fn test_from_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("registry.toml");
        std::fs::write(&path, "content_timeout_ms = 1000").unwrap();

        let config = RegistryConfig::from_file(&path).unwrap();
        assert_eq!(config.content_timeout(), Duration::from_secs(1));

        assert!(matches!(
            RegistryConfig::from_file(&dir.path().join("missing.toml")),
            Err(ConfigError::Read { .. })
        ));
    }
}
