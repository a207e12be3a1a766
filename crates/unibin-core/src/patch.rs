//! Carrier patching
//!
//! Given a compiled carrier binary for a bucket, the patcher re-derives the
//! bucket's placeholder content, locates its single occurrence inside the
//! binary, and overwrites it in place with an encoded payload. The output is
//! byte-identical to the carrier everywhere else and has the same length.
//!
//! The placeholder offset is fixed by compilation but unknown a priori, so
//! it is found by search. Carriers run to hundreds of megabytes, so the scan
//! must stay linear: a short seed prefix of the placeholder is matched with
//! a skip-search automaton, and each seed hit is verified against the full
//! placeholder. The occurrence count is checked explicitly rather than
//! assumed, since it is the one place where compiler output and patcher must
//! agree.

use aho_corasick::AhoCorasick;
use thiserror::Error;

use crate::bucket::BucketMb;
use crate::placeholder::{placeholder, MARKER_UNIT};

/// Seed length: the opening delimiter plus one marker unit.
const SEED_LEN: usize = 1 + MARKER_UNIT.len();

/// Errors from patching a carrier binary
#[derive(Debug, Error)]
pub enum PatchError {
    /// The carrier does not contain its bucket's placeholder
    #[error("placeholder for bucket {bucket} not found in carrier")]
    PlaceholderNotFound { bucket: BucketMb },

    /// The carrier contains the placeholder more than once
    #[error("placeholder for bucket {bucket} found {count} times in carrier, expected exactly 1")]
    PlaceholderAmbiguous { bucket: BucketMb, count: usize },

    /// The encoded payload (plus its terminator byte) does not fit
    #[error("encoded payload is {payload_len} bytes but bucket {bucket} holds at most {max_len}")]
    PayloadTooLarge {
        bucket: BucketMb,
        payload_len: usize,
        max_len: usize,
    },
}

/// Overwrite the placeholder region of a carrier with an encoded payload.
///
/// The placeholder range is zero-filled and the payload written at its start
/// offset; the zero tail doubles as the payload terminator, so at least one
/// byte of headroom is always reserved. All-or-nothing: on error no output
/// buffer is produced.
///
/// # Errors
/// - [`PatchError::PlaceholderNotFound`] / [`PatchError::PlaceholderAmbiguous`]
///   when the carrier does not contain the placeholder exactly once.
/// - [`PatchError::PayloadTooLarge`] when `encoded.len() + 1` exceeds the
///   placeholder length.
pub fn patch(carrier: &[u8], bucket: BucketMb, encoded: &[u8]) -> Result<Vec<u8>, PatchError> {
    let filler = placeholder(bucket);
    let offset = locate(carrier, &filler, bucket)?;

    // Reserve one byte so a terminator always follows the payload.
    if encoded.len() + 1 > filler.len() {
        return Err(PatchError::PayloadTooLarge {
            bucket,
            payload_len: encoded.len(),
            max_len: filler.len() - 1,
        });
    }

    let mut out = carrier.to_vec();
    out[offset..offset + filler.len()].fill(0);
    out[offset..offset + encoded.len()].copy_from_slice(encoded);
    Ok(out)
}

/// Find the single occurrence of `filler` in `carrier`, returning its offset.
fn locate(carrier: &[u8], filler: &[u8], bucket: BucketMb) -> Result<usize, PatchError> {
    let seed = &filler[..SEED_LEN];
    let searcher =
        AhoCorasick::new([seed]).expect("failed to build placeholder search automaton");

    let mut offset = None;
    let mut count = 0usize;
    for m in searcher.find_iter(carrier) {
        let start = m.start();
        if carrier[start..].len() >= filler.len() && &carrier[start..start + filler.len()] == filler
        {
            if offset.is_none() {
                offset = Some(start);
            }
            count += 1;
        }
    }

    match (offset, count) {
        (Some(start), 1) => Ok(start),
        (None, _) => Err(PatchError::PlaceholderNotFound { bucket }),
        (_, count) => Err(PatchError::PlaceholderAmbiguous { bucket, count }),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn bucket2() -> BucketMb {
        BucketMb::new(2).unwrap()
    }

    /// A synthetic carrier: opaque bytes around one placeholder.
    fn synthetic_carrier(bucket: BucketMb) -> (Vec<u8>, usize) {
        let mut carrier = b"\x7fELF-ish prefix bytes".to_vec();
        let offset = carrier.len();
        carrier.extend_from_slice(&placeholder(bucket));
        carrier.extend_from_slice(b"trailing machine code");
        (carrier, offset)
    }

    #[test]
    fn test_patch_preserves_length_and_surroundings() {
        let bucket = bucket2();
        let (carrier, offset) = synthetic_carrier(bucket);
        let payload = b"ZGVtbw==\nc29tZSBkYXRh";

        let out = patch(&carrier, bucket, payload).unwrap();
        assert_eq!(out.len(), carrier.len());
        assert_eq!(&out[..offset], &carrier[..offset]);
        let end = offset + placeholder(bucket).len();
        assert_eq!(&out[end..], &carrier[end..]);
    }

    #[test]
    fn test_patch_writes_payload_then_zeros() {
        let bucket = bucket2();
        let (carrier, offset) = synthetic_carrier(bucket);
        let payload = b"ZGVtbw==\nc29tZSBkYXRh";

        let out = patch(&carrier, bucket, payload).unwrap();
        assert_eq!(&out[offset..offset + payload.len()], payload);
        let end = offset + placeholder(bucket).len();
        assert!(out[offset + payload.len()..end].iter().all(|&b| b == 0));
    }

    #[test]
    fn test_patch_missing_placeholder() {
        let carrier = b"no placeholder anywhere in here".to_vec();
        let result = patch(&carrier, bucket2(), b"x");
        assert!(matches!(
            result,
            Err(PatchError::PlaceholderNotFound { .. })
        ));
    }

    #[test]
    fn test_patch_ambiguous_placeholder() {
        let bucket = bucket2();
        let filler = placeholder(bucket);
        let mut carrier = Vec::new();
        carrier.extend_from_slice(&filler);
        carrier.extend_from_slice(b"gap");
        carrier.extend_from_slice(&filler);

        let result = patch(&carrier, bucket, b"x");
        match result {
            Err(PatchError::PlaceholderAmbiguous { count, .. }) => assert_eq!(count, 2),
            other => panic!("expected PlaceholderAmbiguous, got {:?}", other),
        }
    }

    #[test]
    fn test_patch_rejects_oversized_payload() {
        let bucket = bucket2();
        let (carrier, _) = synthetic_carrier(bucket);
        let too_big = vec![b'A'; placeholder(bucket).len() + 1];

        let result = patch(&carrier, bucket, &too_big);
        assert!(matches!(result, Err(PatchError::PayloadTooLarge { .. })));
    }

    #[test]
    fn test_patch_rejects_exact_fit() {
        // An exact-fit payload would leave no terminator byte; the reserve
        // disallows it even though it would physically fit.
        let bucket = bucket2();
        let (carrier, _) = synthetic_carrier(bucket);
        let exact = vec![b'A'; placeholder(bucket).len()];

        assert!(matches!(
            patch(&carrier, bucket, &exact),
            Err(PatchError::PayloadTooLarge { .. })
        ));
        // One byte under capacity is the largest accepted payload.
        let largest = vec![b'A'; placeholder(bucket).len() - 1];
        assert!(patch(&carrier, bucket, &largest).is_ok());
    }

    #[test]
    fn test_seed_hit_without_full_placeholder_is_ignored() {
        let bucket = bucket2();
        // Carrier contains only the seed prefix, not the full placeholder.
        let mut carrier = b"prefix`".to_vec();
        carrier.extend_from_slice(MARKER_UNIT);
        carrier.extend_from_slice(b"suffix");

        let result = patch(&carrier, bucket, b"x");
        assert!(matches!(
            result,
            Err(PatchError::PlaceholderNotFound { .. })
        ));
    }
}
