//! Content storage abstraction.
//!
//! The content gateway stores opaque byte payloads (diploma documents,
//! verification images, metadata documents) and hands back a content
//! address. Implementations may pin to IPFS, write to object storage, or
//! keep everything in memory.

use async_trait::async_trait;
use bytes::Bytes;

use diploma_registry_core::ContentAddress;

use crate::error::ContentError;

/// Result type for content operations.
pub type Result<T> = std::result::Result<T, ContentError>;

/// Content storage trait.
///
/// Implementations must be thread-safe (Send + Sync). Stored payloads are
/// immutable; storing the same bytes twice may return the same address.
#[async_trait]
pub trait ContentGateway: Send + Sync {
    /// Store a payload under a human-readable name.
    ///
    /// The name is a label for the storage service (e.g. `diploma_7.pdf`);
    /// the returned address is what the registry keeps.
    async fn store(&self, name: &str, bytes: Bytes) -> Result<ContentAddress>;
}

/// Compute the content address of a payload: hex-encoded BLAKE3.
pub fn content_address(bytes: &[u8]) -> ContentAddress {
    ContentAddress::new(hex::encode(blake3::hash(bytes).as_bytes()))
}

/// A simple in-memory content store for testing.
///
/// Supports injecting outages, per-name failures and latency.
pub mod memory {
    use super::*;
    use std::collections::HashMap;
    use std::time::Duration;
    use tokio::sync::RwLock;

    /// A stored payload and the name it was uploaded under.
    #[derive(Debug, Clone)]
    pub struct StoredBlob {
        pub name: String,
        pub bytes: Bytes,
    }

    #[derive(Default)]
    struct Faults {
        offline: bool,
        /// Uploads whose name starts with any of these prefixes fail.
        failing_prefixes: Vec<String>,
        delay: Option<Duration>,
    }

    /// In-memory content gateway.
    #[derive(Default)]
    pub struct MemoryContentGateway {
        blobs: RwLock<HashMap<ContentAddress, StoredBlob>>,
        uploads: RwLock<Vec<String>>,
        faults: RwLock<Faults>,
    }

    impl MemoryContentGateway {
        /// Create a new empty gateway.
        pub fn new() -> Self {
            Self::default()
        }

        /// Make every upload fail with `Unavailable`.
        pub async fn set_offline(&self, offline: bool) {
            self.faults.write().await.offline = offline;
        }

        /// Reject uploads whose name starts with `prefix`.
        pub async fn fail_names_starting_with(&self, prefix: impl Into<String>) {
            self.faults.write().await.failing_prefixes.push(prefix.into());
        }

        /// Delay every upload.
        pub async fn set_delay(&self, delay: Option<Duration>) {
            self.faults.write().await.delay = delay;
        }

        /// Fetch a stored payload.
        pub async fn get(&self, address: &ContentAddress) -> Option<StoredBlob> {
            self.blobs.read().await.get(address).cloned()
        }

        /// Names of every successful upload, in order.
        pub async fn uploads(&self) -> Vec<String> {
            self.uploads.read().await.clone()
        }

        /// Number of distinct stored payloads.
        pub async fn len(&self) -> usize {
            self.blobs.read().await.len()
        }

        pub async fn is_empty(&self) -> bool {
            self.blobs.read().await.is_empty()
        }
    }

    #[async_trait]
    impl ContentGateway for MemoryContentGateway {
        async fn store(&self, name: &str, bytes: Bytes) -> Result<ContentAddress> {
            let delay = {
                let faults = self.faults.read().await;
                if faults.offline {
                    return Err(ContentError::Unavailable("gateway offline".into()));
                }
                if faults.failing_prefixes.iter().any(|p| name.starts_with(p)) {
                    return Err(ContentError::Rejected {
                        name: name.to_string(),
                        reason: "upload refused".into(),
                    });
                }
                faults.delay
            };

            if let Some(delay) = delay {
                tokio::time::sleep(delay).await;
            }

            let address = content_address(&bytes);
            self.blobs.write().await.insert(
                address.clone(),
                StoredBlob {
                    name: name.to_string(),
                    bytes,
                },
            );
            self.uploads.write().await.push(name.to_string());

            tracing::trace!(name, address = %address, "stored content");
            Ok(address)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::memory::MemoryContentGateway;
    use super::*;

    #[tokio::test]
    async fn test_store_and_get() {
        let gateway = MemoryContentGateway::new();
        let address = gateway
            .store("diploma_1.pdf", Bytes::from_static(b"%PDF-1.7"))
            .await
            .unwrap();

        assert_eq!(address, content_address(b"%PDF-1.7"));
        let blob = gateway.get(&address).await.unwrap();
        assert_eq!(blob.name, "diploma_1.pdf");
        assert_eq!(&blob.bytes[..], b"%PDF-1.7");
        assert_eq!(gateway.uploads().await, vec!["diploma_1.pdf"]);
    }

    #[tokio::test]
    async fn test_offline_fails() {
        let gateway = MemoryContentGateway::new();
        gateway.set_offline(true).await;

        let result = gateway.store("qr_1.png", Bytes::from_static(b"png")).await;
        assert!(matches!(result, Err(ContentError::Unavailable(_))));
        assert!(gateway.is_empty().await);
    }

    #[tokio::test]
    async fn test_failing_prefix_only_hits_matching_names() {
        let gateway = MemoryContentGateway::new();
        gateway.fail_names_starting_with("metadata_").await;

        assert!(gateway
            .store("diploma_1.pdf", Bytes::from_static(b"pdf"))
            .await
            .is_ok());
        let result = gateway
            .store("metadata_1", Bytes::from_static(b"{}"))
            .await;
        assert!(matches!(result, Err(ContentError::Rejected { name, .. }) if name == "metadata_1"));
    }
}
