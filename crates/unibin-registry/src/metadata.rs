//! Carrier metadata sidecars
//!
//! Each cached carrier gets a small JSON sidecar recording its identity and
//! checksum, used for integrity verification and `cache ls` style listings.

use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;
use thiserror::Error;

use crate::identifier::CarrierId;

/// Errors from reading or writing metadata sidecars
#[derive(Debug, Error)]
pub enum MetadataError {
    /// IO error
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// JSON serialization/deserialization error
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

/// Metadata for one cached carrier
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct CarrierMetadata {
    /// Rendered carrier identifier
    pub name: String,

    /// Runtime version the carrier was compiled from
    pub runtime_version: String,

    /// Capacity bucket in megabytes
    pub bucket_mb: u32,

    /// SHA-256 checksum of the carrier bytes (hex-encoded)
    pub checksum: String,

    /// Carrier size in bytes
    pub size: u64,

    /// Unix timestamp when cached
    pub cached_at: u64,
}

impl CarrierMetadata {
    pub fn new(id: &CarrierId, checksum: String, size: u64) -> Self {
        let cached_at = std::time::SystemTime::now()
            .duration_since(std::time::UNIX_EPOCH)
            .map(|d| d.as_secs())
            .unwrap_or(0);
        Self {
            name: id.file_name(),
            runtime_version: id.version.clone(),
            bucket_mb: id.bucket.get(),
            checksum,
            size,
            cached_at,
        }
    }

    /// Load metadata from a sidecar file.
    pub fn load(path: &Path) -> Result<Self, MetadataError> {
        let contents = fs::read_to_string(path)?;
        Ok(serde_json::from_str(&contents)?)
    }

    /// Save metadata to a sidecar file.
    pub fn save(&self, path: &Path) -> Result<(), MetadataError> {
        let json = serde_json::to_string_pretty(self)?;
        fs::write(path, json)?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::identifier::{Arch, Platform};
    use unibin_core::BucketMb;

    #[test]
    fn test_metadata_round_trip() {
        let id = CarrierId::new(
            Platform::Darwin,
            Arch::Arm64,
            "18.16.0",
            BucketMb::new(2).unwrap(),
        );
        let meta = CarrierMetadata::new(&id, "abc123".to_string(), 42);

        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("meta.json");
        meta.save(&path).unwrap();
        let loaded = CarrierMetadata::load(&path).unwrap();
        assert_eq!(loaded, meta);
        assert_eq!(loaded.name, "darwin-arm64-18.16.0-v1-2MB");
    }
}
