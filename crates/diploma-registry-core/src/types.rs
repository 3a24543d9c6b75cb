//! Strong type definitions for the diploma registry.
//!
//! All identifiers are newtypes to prevent misuse at compile time.

use serde::{Deserialize, Serialize};
use std::fmt;

/// The identifier of a record.
///
/// Minted once at creation and never changed. Identifiers are decimal
/// numerals issued in increasing order, but they are treated as opaque
/// strings everywhere except the allocator, which reads them back as numbers.
#[derive(Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct RecordId(String);

impl RecordId {
    /// Wrap an existing identifier string.
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    /// Build the identifier for an allocated number.
    pub fn from_number(n: u64) -> Self {
        Self(n.to_string())
    }

    /// The identifier as a string slice.
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Parse the identifier as a positive integer.
    ///
    /// Returns `None` for anything that is not a positive decimal number,
    /// including `"0"`.
    pub fn as_number(&self) -> Option<u64> {
        match self.0.trim().parse::<u64>() {
            Ok(n) if n > 0 => Some(n),
            _ => None,
        }
    }
}

impl fmt::Debug for RecordId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "RecordId({})", self.0)
    }
}

impl fmt::Display for RecordId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for RecordId {
    fn from(s: &str) -> Self {
        Self(s.to_string())
    }
}

/// The student index a record is issued for.
///
/// Not unique: reissues and corrections share the same index.
#[derive(Clone, Default, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct StudentIndex(String);

impl StudentIndex {
    pub fn new(index: impl Into<String>) -> Self {
        Self(index.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn is_empty(&self) -> bool {
        self.0.trim().is_empty()
    }
}

impl fmt::Debug for StudentIndex {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "StudentIndex({})", self.0)
    }
}

impl fmt::Display for StudentIndex {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for StudentIndex {
    fn from(s: &str) -> Self {
        Self(s.to_string())
    }
}

/// A wallet or account address.
///
/// Always stored lower-cased so that comparisons are case-insensitive.
#[derive(Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub struct OwnerAddress(String);

impl OwnerAddress {
    /// Normalize and wrap an address.
    pub fn new(address: impl AsRef<str>) -> Self {
        Self(address.as_ref().trim().to_lowercase())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// A blank address stands for "no owner".
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Case-insensitive comparison against a raw address.
    pub fn matches(&self, other: &str) -> bool {
        self.0 == other.trim().to_lowercase()
    }
}

impl fmt::Debug for OwnerAddress {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "OwnerAddress({})", self.0)
    }
}

impl fmt::Display for OwnerAddress {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<String> for OwnerAddress {
    fn from(s: String) -> Self {
        Self::new(s)
    }
}

impl From<&str> for OwnerAddress {
    fn from(s: &str) -> Self {
        Self::new(s)
    }
}

impl From<OwnerAddress> for String {
    fn from(a: OwnerAddress) -> Self {
        a.0
    }
}

/// An opaque handle returned by content storage for a stored payload.
#[derive(Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ContentAddress(String);

impl ContentAddress {
    pub fn new(address: impl Into<String>) -> Self {
        Self(address.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// The `ipfs://` URI form used inside metadata documents.
    pub fn to_uri(&self) -> String {
        format!("ipfs://{}", self.0)
    }
}

impl fmt::Debug for ContentAddress {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "ContentAddress({})", self.0)
    }
}

impl fmt::Display for ContentAddress {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_record_id_number() {
        assert_eq!(RecordId::from_number(42).as_number(), Some(42));
        assert_eq!(RecordId::new("7").as_str(), "7");
        assert_eq!(RecordId::new("0").as_number(), None);
        assert_eq!(RecordId::new("-3").as_number(), None);
        assert_eq!(RecordId::new("legacy-abc").as_number(), None);
    }

    #[test]
    fn test_record_id_display() {
        let id = RecordId::from_number(12);
        assert_eq!(format!("{}", id), "12");
        assert_eq!(format!("{:?}", id), "RecordId(12)");
    }

    #[test]
    fn test_owner_address_lowercased() {
        let owner = OwnerAddress::new("0xABCDef01");
        assert_eq!(owner.as_str(), "0xabcdef01");
        assert!(owner.matches("0xAbCdEf01"));
        assert!(!owner.matches("0xabcdef02"));
    }

    #[test]
    fn test_owner_address_deserialize_normalizes() {
        let owner: OwnerAddress = serde_json::from_str("\"0xFFEE\"").unwrap();
        assert_eq!(owner.as_str(), "0xffee");
    }

    proptest::proptest! {
        #[test]
        fn prop_owner_matches_any_case(addr in "0x[0-9a-fA-F]{40}") {
            let owner = OwnerAddress::new(&addr);
            proptest::prop_assert!(owner.matches(&addr.to_uppercase()));
            proptest::prop_assert_eq!(owner.as_str(), addr.to_lowercase());
        }

        #[test]
        fn prop_record_id_number_roundtrip(n in 1u64..u64::MAX) {
            proptest::prop_assert_eq!(RecordId::from_number(n).as_number(), Some(n));
        }
    }

    #[test]
    fn test_content_address_uri() {
        let addr = ContentAddress::new("bafyabc");
        assert_eq!(addr.to_uri(), "ipfs://bafyabc");
    }
}
