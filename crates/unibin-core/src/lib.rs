//! unibin core: the payload-embedding protocol
//!
//! A carrier binary is a pre-compiled runtime executable that reserves a
//! placeholder region of known capacity inside its embedded-module table.
//! This crate implements the pure parts of the protocol:
//! - Payload codec (name + source to/from the embedded textual form)
//! - Placeholder generation (deterministic filler for a capacity bucket)
//! - Bucket selection (encoded length to smallest even-MB capacity)
//! - Binary patching (locate the placeholder, overwrite it in place)
//!
//! Everything here is synchronous and free of I/O; carriers are handled as
//! in-memory byte buffers.

pub mod bucket;
pub mod codec;
pub mod patch;
pub mod placeholder;

pub use bucket::{select, select_with_override, BucketError, BucketMb};
pub use codec::{decode, encode, CodecError, PAYLOAD_TERMINATOR};
pub use patch::{patch, PatchError};
pub use placeholder::{placeholder, MARKER_UNIT};
