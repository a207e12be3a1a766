//! Carrier registry
//!
//! Carriers are built once per (platform, arch, runtime-version, bucket) and
//! reused for arbitrarily many payloads of that bucket. This crate resolves
//! a [`CarrierId`] to carrier bytes: local cache first, then the remote
//! store, caching what it fetches. Producing a missing carrier is the build
//! orchestrator's job; the registry only reports [`RegistryError::CarrierUnavailable`]
//! and never triggers a rebuild on its own.

pub mod cache;
pub mod identifier;
pub mod metadata;
pub mod remote;

pub use cache::{CacheError, CarrierCache};
pub use identifier::{Arch, CarrierId, IdentifierError, Platform};
pub use metadata::{CarrierMetadata, MetadataError};
pub use remote::{RemoteError, RemoteStore};

use thiserror::Error;

/// Errors from resolving a carrier
#[derive(Debug, Error)]
pub enum RegistryError {
    /// Carrier exists neither locally nor remotely, or could not be fetched
    #[error("carrier unavailable: {id} ({reason})")]
    CarrierUnavailable { id: String, reason: String },

    /// Local cache failure
    #[error(transparent)]
    Cache(#[from] CacheError),
}

/// Resolves carrier identifiers to carrier bytes.
pub struct CarrierRegistry {
    cache: CarrierCache,
    remote: Option<RemoteStore>,
}

impl CarrierRegistry {
    /// A registry over a local cache and an optional remote store.
    pub fn new(cache: CarrierCache, remote: Option<RemoteStore>) -> Self {
        Self { cache, remote }
    }

    /// Resolve a carrier: cache hit, or remote fetch followed by a cache
    /// store. A cache entry that fails its integrity check is discarded and
    /// re-fetched rather than returned.
    pub fn resolve(&self, id: &CarrierId) -> Result<Vec<u8>, RegistryError> {
        match self.cache.get(id) {
            Ok(bytes) => return Ok(bytes),
            Err(CacheError::NotCached(_)) => {}
            Err(CacheError::ChecksumMismatch { .. }) => {
                self.cache.remove(id)?;
            }
            Err(e) => return Err(e.into()),
        }

        let remote = self
            .remote
            .as_ref()
            .ok_or_else(|| RegistryError::CarrierUnavailable {
                id: id.file_name(),
                reason: "not cached and no remote store configured".to_string(),
            })?;

        let bytes = remote
            .download(id)
            .map_err(|e| RegistryError::CarrierUnavailable {
                id: id.file_name(),
                reason: e.to_string(),
            })?;
        self.cache.put(id, &bytes)?;
        Ok(bytes)
    }

    /// Store a locally produced carrier in the cache, optionally publishing
    /// it remotely.
    pub fn store(
        &self,
        id: &CarrierId,
        bytes: &[u8],
        publish: bool,
    ) -> Result<(), RegistryError> {
        self.cache.put(id, bytes)?;
        if publish {
            let remote = self
                .remote
                .as_ref()
                .ok_or_else(|| RegistryError::CarrierUnavailable {
                    id: id.file_name(),
                    reason: "no remote store configured for publish".to_string(),
                })?;
            remote
                .upload(id, bytes)
                .map_err(|e| RegistryError::CarrierUnavailable {
                    id: id.file_name(),
                    reason: e.to_string(),
                })?;
        }
        Ok(())
    }

    /// Local cache handle.
    pub fn cache(&self) -> &CarrierCache {
        &self.cache
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use unibin_core::BucketMb;

    fn test_id() -> CarrierId {
        CarrierId::new(
            Platform::Linux,
            Arch::X64,
            "18.16.0",
            BucketMb::new(2).unwrap(),
        )
    }

    #[test]
    fn test_resolve_cache_hit() {
        let dir = tempfile::tempdir().unwrap();
        let cache = CarrierCache::open(dir.path()).unwrap();
        let id = test_id();
        cache.put(&id, b"cached carrier").unwrap();

        let registry = CarrierRegistry::new(cache, None);
        assert_eq!(registry.resolve(&id).unwrap(), b"cached carrier");
    }

    #[test]
    fn test_resolve_miss_without_remote() {
        let dir = tempfile::tempdir().unwrap();
        let cache = CarrierCache::open(dir.path()).unwrap();
        let registry = CarrierRegistry::new(cache, None);

        assert!(matches!(
            registry.resolve(&test_id()),
            Err(RegistryError::CarrierUnavailable { .. })
        ));
    }

    #[test]
    fn test_store_local_only() {
        let dir = tempfile::tempdir().unwrap();
        let cache = CarrierCache::open(dir.path()).unwrap();
        let registry = CarrierRegistry::new(cache, None);
        let id = test_id();

        registry.store(&id, b"built carrier", false).unwrap();
        assert_eq!(registry.resolve(&id).unwrap(), b"built carrier");
    }
}
