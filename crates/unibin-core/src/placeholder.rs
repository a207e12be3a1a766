//! Placeholder generation
//!
//! At carrier build time the reserved module's source file is filled with a
//! fixed-capacity placeholder: a 16-byte marker unit repeated to the bucket
//! size, wrapped in backticks so the carrier's build treats it as an inert
//! template-literal string. The content is fully deterministic because the
//! patcher re-derives it later to locate the region inside the compiled
//! binary.

use crate::bucket::BucketMb;

/// The 16-byte unit the placeholder repeats. Chosen so the pattern is
/// vanishingly unlikely to occur elsewhere in a compiled runtime.
pub const MARKER_UNIT: &[u8; 16] = b"~N~o~D~e~o~N~e~\n";

/// Delimiter that makes the filler an inert string literal in the carrier's
/// bootstrap source.
pub const DELIMITER: u8 = b'`';

/// Generate the placeholder content for a capacity bucket.
///
/// Layout: one opening backtick, `bucket_mb * 1024 * 1024 / 16` marker
/// units, one closing backtick. Total length is `bucket.capacity_bytes()`.
pub fn placeholder(bucket: BucketMb) -> Vec<u8> {
    let body_len = bucket.body_bytes();
    let mut out = Vec::with_capacity(body_len + 2);
    out.push(DELIMITER);
    for _ in 0..body_len / MARKER_UNIT.len() {
        out.extend_from_slice(MARKER_UNIT);
    }
    out.push(DELIMITER);
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_placeholder_is_deterministic() {
        let bucket = BucketMb::new(2).unwrap();
        assert_eq!(placeholder(bucket), placeholder(bucket));
    }

    #[test]
    fn test_placeholder_length() {
        let bucket = BucketMb::new(2).unwrap();
        let content = placeholder(bucket);
        assert_eq!(content.len(), 2 * 1024 * 1024 + 2);
        assert_eq!(content.len(), bucket.capacity_bytes());
    }

    #[test]
    fn test_placeholder_shape() {
        let bucket = BucketMb::new(4).unwrap();
        let content = placeholder(bucket);
        assert_eq!(content[0], DELIMITER);
        assert_eq!(*content.last().unwrap(), DELIMITER);
        // Interior is whole marker units.
        let body = &content[1..content.len() - 1];
        assert_eq!(body.len() % MARKER_UNIT.len(), 0);
        for chunk in body.chunks(MARKER_UNIT.len()) {
            assert_eq!(chunk, MARKER_UNIT);
        }
    }
}
