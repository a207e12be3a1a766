//! Payload codec
//!
//! An application payload is a short name plus arbitrary source bytes. Its
//! embedded textual form is `base64(name) + "\n" + base64(gzip9(source))`.
//! Base64 keeps the payload free of NUL bytes, which the patcher relies on:
//! the zero-filled tail left after patching acts as the payload terminator,
//! so the encoded alphabet must never contain 0x00.

use data_encoding::BASE64;
use flate2::read::GzDecoder;
use flate2::write::GzEncoder;
use flate2::Compression;
use std::io::{Read, Write};
use thiserror::Error;

/// Byte value that terminates an embedded payload inside its placeholder
/// region. Never produced by [`encode`].
pub const PAYLOAD_TERMINATOR: u8 = 0;

/// Separator between the encoded name and the encoded source.
const NAME_SEPARATOR: u8 = b'\n';

/// Errors that can occur while encoding or decoding a payload
#[derive(Debug, Error)]
pub enum CodecError {
    /// Payload is structurally invalid and cannot be decoded
    #[error("corrupt payload: {0}")]
    CorruptPayload(String),

    /// Application name contains characters that are unsafe in a filename
    #[error("invalid application name {0:?}: only alphanumerics, '.', '_' and '-' are allowed")]
    InvalidName(String),

    /// IO error while compressing
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// Encode an application payload into its embedded textual form.
///
/// The source is gzip-compressed at maximum ratio (deterministic for a given
/// input), then both halves are base64-encoded and joined with a newline.
///
/// # Errors
/// Returns [`CodecError::InvalidName`] if `name` is empty or contains
/// characters outside `[A-Za-z0-9._-]`.
pub fn encode(name: &str, source: &[u8]) -> Result<Vec<u8>, CodecError> {
    validate_name(name)?;

    let mut encoder = GzEncoder::new(Vec::new(), Compression::best());
    encoder.write_all(source)?;
    let compressed = encoder.finish()?;

    let mut out = BASE64.encode(name.as_bytes()).into_bytes();
    out.push(NAME_SEPARATOR);
    out.extend_from_slice(BASE64.encode(&compressed).as_bytes());
    Ok(out)
}

/// Decode an embedded payload back into `(name, source)`.
///
/// Inverse of [`encode`]; round-trips exactly for arbitrary source bytes.
///
/// # Errors
/// Returns [`CodecError::CorruptPayload`] if the newline separator is
/// missing, either half is not valid base64, the name is not UTF-8, or
/// decompression fails.
pub fn decode(encoded: &[u8]) -> Result<(String, Vec<u8>), CodecError> {
    let sep = encoded
        .iter()
        .position(|&b| b == NAME_SEPARATOR)
        .ok_or_else(|| CodecError::CorruptPayload("missing name separator".to_string()))?;

    let name_bytes = BASE64
        .decode(&encoded[..sep])
        .map_err(|e| CodecError::CorruptPayload(format!("invalid name encoding: {}", e)))?;
    let name = String::from_utf8(name_bytes)
        .map_err(|_| CodecError::CorruptPayload("name is not valid UTF-8".to_string()))?;

    let compressed = BASE64
        .decode(&encoded[sep + 1..])
        .map_err(|e| CodecError::CorruptPayload(format!("invalid source encoding: {}", e)))?;

    let mut source = Vec::new();
    GzDecoder::new(&compressed[..])
        .read_to_end(&mut source)
        .map_err(|e| CodecError::CorruptPayload(format!("decompression failed: {}", e)))?;

    Ok((name, source))
}

/// Check that a name is safe to use as a filename next to the executable.
fn validate_name(name: &str) -> Result<(), CodecError> {
    let ok = !name.is_empty()
        && name
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || matches!(c, '.' | '_' | '-'));
    if ok {
        Ok(())
    } else {
        Err(CodecError::InvalidName(name.to_string()))
    }
}
