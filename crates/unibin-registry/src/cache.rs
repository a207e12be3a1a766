//! Filesystem carrier cache
//!
//! Stores carrier binaries under a root directory, one file per carrier
//! identifier, with a JSON metadata sidecar carrying the sha256 checksum.
//! The root is always passed in explicitly (or resolved once via
//! [`CarrierCache::open_default`]); there is no ambient global state.

use sha2::{Digest, Sha256};
use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};
use thiserror::Error;

use crate::identifier::CarrierId;
use crate::metadata::{CarrierMetadata, MetadataError};

/// Errors that can occur during cache operations
#[derive(Debug, Error)]
pub enum CacheError {
    /// IO error (file operations)
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Cache directory could not be determined or created
    #[error("failed to initialize carrier cache: {0}")]
    Init(String),

    /// Carrier not present in the cache
    #[error("carrier not cached: {0}")]
    NotCached(String),

    /// Cached bytes do not match the recorded checksum
    #[error("checksum mismatch for {name}: expected {expected}, got {actual}")]
    ChecksumMismatch {
        name: String,
        expected: String,
        actual: String,
    },

    /// Metadata sidecar could not be read or written
    #[error("metadata error: {0}")]
    Metadata(#[from] MetadataError),
}

/// Filesystem-backed store of carrier binaries, keyed by [`CarrierId`].
#[derive(Debug, Clone)]
pub struct CarrierCache {
    root: PathBuf,
}

impl CarrierCache {
    /// Open a cache rooted at `root`, creating the directory structure if
    /// needed.
    pub fn open(root: impl Into<PathBuf>) -> Result<Self, CacheError> {
        let root = root.into();
        fs::create_dir_all(&root)?;
        fs::create_dir_all(root.join("tmp"))?;
        Ok(Self { root })
    }

    /// Open the user-level default cache (`~/.unibin/cache`).
    pub fn open_default() -> Result<Self, CacheError> {
        let home = dirs::home_dir()
            .ok_or_else(|| CacheError::Init("could not determine home directory".to_string()))?;
        Self::open(home.join(".unibin").join("cache"))
    }

    /// Path a carrier is (or would be) stored at.
    pub fn path(&self, id: &CarrierId) -> PathBuf {
        self.root.join(id.file_name())
    }

    fn metadata_path(&self, id: &CarrierId) -> PathBuf {
        self.root.join(format!("{}.meta.json", id.file_name()))
    }

    /// Whether a carrier is present.
    pub fn exists(&self, id: &CarrierId) -> bool {
        self.path(id).exists()
    }

    /// Store a carrier, overwriting any previous copy.
    ///
    /// Writes to a temporary file first and renames into place so a partial
    /// write is never observable under the carrier's name.
    pub fn put(&self, id: &CarrierId, bytes: &[u8]) -> Result<PathBuf, CacheError> {
        let tmp_dir = self.root.join("tmp");
        fs::create_dir_all(&tmp_dir)?;
        let tmp_path = tmp_dir.join(format!("{}.{}", id.file_name(), std::process::id()));

        let mut tmp_file = fs::File::create(&tmp_path)?;
        tmp_file.write_all(bytes)?;
        tmp_file.sync_all()?;

        let final_path = self.path(id);
        fs::rename(&tmp_path, &final_path)?;

        let checksum = hex::encode(Sha256::digest(bytes));
        let meta = CarrierMetadata::new(id, checksum, bytes.len() as u64);
        meta.save(&self.metadata_path(id))?;
        Ok(final_path)
    }

    /// Retrieve a carrier's bytes, verifying the recorded checksum when a
    /// metadata sidecar is present.
    pub fn get(&self, id: &CarrierId) -> Result<Vec<u8>, CacheError> {
        let path = self.path(id);
        if !path.exists() {
            return Err(CacheError::NotCached(id.file_name()));
        }

        let bytes = fs::read(&path)?;
        if let Ok(meta) = CarrierMetadata::load(&self.metadata_path(id)) {
            let actual = hex::encode(Sha256::digest(&bytes));
            if actual != meta.checksum {
                return Err(CacheError::ChecksumMismatch {
                    name: id.file_name(),
                    expected: meta.checksum,
                    actual,
                });
            }
        }
        Ok(bytes)
    }

    /// Load a carrier's metadata sidecar.
    pub fn metadata(&self, id: &CarrierId) -> Result<CarrierMetadata, CacheError> {
        Ok(CarrierMetadata::load(&self.metadata_path(id))?)
    }

    /// Remove a carrier and its metadata sidecar.
    pub fn remove(&self, id: &CarrierId) -> Result<(), CacheError> {
        let path = self.path(id);
        if path.exists() {
            fs::remove_file(path)?;
        }
        let sidecar = self.metadata_path(id);
        if sidecar.exists() {
            fs::remove_file(sidecar)?;
        }
        Ok(())
    }

    /// Names of all cached carriers.
    pub fn list(&self) -> Result<Vec<String>, CacheError> {
        let mut names = Vec::new();
        for entry in fs::read_dir(&self.root)? {
            let entry = entry?;
            if !entry.file_type()?.is_file() {
                continue;
            }
            let name = entry.file_name().to_string_lossy().into_owned();
            if !name.ends_with(".meta.json") {
                names.push(name);
            }
        }
        names.sort();
        Ok(names)
    }

    /// Remove every cached carrier.
    pub fn clear(&self) -> Result<(), CacheError> {
        for entry in fs::read_dir(&self.root)? {
            let entry = entry?;
            if entry.file_type()?.is_file() {
                fs::remove_file(entry.path())?;
            }
        }
        Ok(())
    }

    /// Cache root directory.
    pub fn root(&self) -> &Path {
        &self.root
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::identifier::{Arch, Platform};
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
    fn test_put_get_exists() {
        let dir = tempfile::tempdir().unwrap();
        let cache = CarrierCache::open(dir.path()).unwrap();
        let id = test_id();

        assert!(!cache.exists(&id));
        cache.put(&id, b"carrier bytes").unwrap();
        assert!(cache.exists(&id));
        assert_eq!(cache.get(&id).unwrap(), b"carrier bytes");
    }

    #[test]
    fn test_get_missing() {
        let dir = tempfile::tempdir().unwrap();
        let cache = CarrierCache::open(dir.path()).unwrap();
        assert!(matches!(
            cache.get(&test_id()),
            Err(CacheError::NotCached(_))
        ));
    }

    #[test]
    fn test_metadata_written() {
        let dir = tempfile::tempdir().unwrap();
        let cache = CarrierCache::open(dir.path()).unwrap();
        let id = test_id();

        cache.put(&id, b"carrier bytes").unwrap();
        let meta = cache.metadata(&id).unwrap();
        assert_eq!(meta.name, id.file_name());
        assert_eq!(meta.bucket_mb, 2);
        assert_eq!(meta.size, b"carrier bytes".len() as u64);
    }

    #[test]
    fn test_corrupted_entry_detected() {
        let dir = tempfile::tempdir().unwrap();
        let cache = CarrierCache::open(dir.path()).unwrap();
        let id = test_id();

        cache.put(&id, b"carrier bytes").unwrap();
        std::fs::write(cache.path(&id), b"tampered").unwrap();

        assert!(matches!(
            cache.get(&id),
            Err(CacheError::ChecksumMismatch { .. })
        ));
    }

    #[test]
    fn test_remove_and_list() {
        let dir = tempfile::tempdir().unwrap();
        let cache = CarrierCache::open(dir.path()).unwrap();
        let id = test_id();

        cache.put(&id, b"carrier bytes").unwrap();
        assert_eq!(cache.list().unwrap(), vec![id.file_name()]);

        cache.remove(&id).unwrap();
        assert!(!cache.exists(&id));
        assert!(cache.list().unwrap().is_empty());
    }
}
