//! Capacity buckets
//!
//! Carriers are pre-built per capacity bucket, an even number of megabytes.
//! Even-MB granularity bounds how many distinct carriers ever need to exist,
//! trading some padding waste for cache-hit rate.

use std::fmt;
use thiserror::Error;

const MB: usize = 1024 * 1024;

/// Errors from bucket validation and selection
#[derive(Debug, Error, PartialEq, Eq)]
pub enum BucketError {
    /// Bucket size must be a positive number of megabytes
    #[error("bucket size must be positive")]
    Zero,

    /// Bucket size must be an even number of megabytes
    #[error("bucket size must be an even number of MB, got {0}")]
    NotEven(u32),
}

/// A capacity bucket: an even, positive number of megabytes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct BucketMb(u32);

impl BucketMb {
    /// Validate and wrap an explicit bucket size.
    pub fn new(mb: u32) -> Result<Self, BucketError> {
        if mb == 0 {
            return Err(BucketError::Zero);
        }
        if mb % 2 != 0 {
            return Err(BucketError::NotEven(mb));
        }
        Ok(Self(mb))
    }

    /// Bucket size in megabytes.
    pub fn get(self) -> u32 {
        self.0
    }

    /// Length in bytes of the placeholder's repeated-marker body.
    pub fn body_bytes(self) -> usize {
        self.0 as usize * MB
    }

    /// Total placeholder length in bytes (body plus the two delimiters).
    /// This is the capacity available to an encoded payload, including the
    /// reserved terminator byte.
    pub fn capacity_bytes(self) -> usize {
        self.body_bytes() + 2
    }
}

impl fmt::Display for BucketMb {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}MB", self.0)
    }
}

/// Select the smallest bucket that can hold an encoded payload of
/// `encoded_len` bytes: megabytes rounded up, then rounded up to even.
pub fn select(encoded_len: usize) -> BucketMb {
    let mut mb = encoded_len.div_ceil(MB).max(1) as u32;
    if mb % 2 != 0 {
        mb += 1;
    }
    BucketMb(mb)
}

/// Select a bucket, honoring an explicit override.
///
/// The override is used verbatim after validation; otherwise the smallest
/// eligible bucket for `encoded_len` is chosen.
pub fn select_with_override(
    encoded_len: usize,
    override_mb: Option<u32>,
) -> Result<BucketMb, BucketError> {
    match override_mb {
        Some(mb) => BucketMb::new(mb),
        None => Ok(select(encoded_len)),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_select_is_even_and_positive() {
        for len in [1, 100, MB - 1, MB, MB + 1, 3 * MB, 16 * MB + 7] {
            let bucket = select(len);
            assert!(bucket.get() > 0);
            assert_eq!(bucket.get() % 2, 0, "len={}", len);
        }
    }

    #[test]
    fn test_select_is_monotonic() {
        let lengths = [1usize, MB, 2 * MB, 2 * MB + 1, 5 * MB, 9 * MB];
        for pair in lengths.windows(2) {
            assert!(select(pair[0]) <= select(pair[1]));
        }
    }

    #[test]
    fn test_select_boundaries() {
        assert_eq!(select(1).get(), 2);
        assert_eq!(select(MB).get(), 2);
        assert_eq!(select(2 * MB).get(), 2);
        assert_eq!(select(2 * MB + 1).get(), 4);
        assert_eq!(select(3 * MB).get(), 4);
        assert_eq!(select(4 * MB + 1).get(), 6);
    }

    #[test]
    fn test_override_used_verbatim() {
        let bucket = select_with_override(1, Some(8)).unwrap();
        assert_eq!(bucket.get(), 8);
    }

    #[test]
    fn test_override_validated() {
        assert_eq!(select_with_override(1, Some(3)), Err(BucketError::NotEven(3)));
        assert_eq!(select_with_override(1, Some(0)), Err(BucketError::Zero));
    }

    #[test]
    fn test_capacity_includes_delimiters() {
        let bucket = BucketMb::new(2).unwrap();
        assert_eq!(bucket.capacity_bytes(), 2 * MB + 2);
    }
}
