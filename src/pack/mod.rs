//! pack transfer stream decoding.
//!
//! a pack stream is how a remote transfers a repository's object set in
//! one response body: a 12-byte header (`PACK`, big-endian version,
//! big-endian object count), then one variably-framed entry per object,
//! then a SHA-1 trailer over everything before it.
//!
//! each entry is a size header (see [`varint`]) followed by one zlib
//! member holding the object payload. Entries encoded as deltas against
//! a base object (type tags 6 and 7) are detected and skipped, not
//! reconstructed; everything else is decompressed and handed to the
//! object store.

mod error;
pub mod varint;

use std::io::Read;

use flate2::read::ZlibDecoder;
use sha1::{Digest, Sha1};

pub use error::{PackError, PackResult};

use crate::storage::{ObjectKind, ObjectStore};

/// the 4-byte literal every pack stream starts with
pub const SIGNATURE: [u8; 4] = *b"PACK";

/// length of the fixed stream header
const HEADER_LEN: usize = 12;

/// length of the SHA-1 trailer
const TRAILER_LEN: usize = 20;

/// the parsed fixed header of a pack stream
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PackHeader {
    pub version: u32,
    pub object_count: u32,
}

/// parse and validate the 12-byte stream header
pub fn parse_header(data: &[u8]) -> PackResult<PackHeader> {
    if data.len() < HEADER_LEN {
        return Err(PackError::Truncated(data.len()));
    }

    let signature: [u8; 4] = data[..4].try_into().expect("slice is 4 bytes");
    if signature != SIGNATURE {
        return Err(PackError::BadSignature(signature));
    }

    let version = u32::from_be_bytes(data[4..8].try_into().expect("slice is 4 bytes"));
    if version != 2 && version != 3 {
        return Err(PackError::UnsupportedVersion(version));
    }

    let object_count = u32::from_be_bytes(data[8..12].try_into().expect("slice is 4 bytes"));
    Ok(PackHeader {
        version,
        object_count,
    })
}

/// Decode a pack stream and store every literal object it carries.
///
/// Runs the entry loop exactly `object_count` times. Literal entries
/// (tags 1-3) are decompressed and written to the store; the cursor
/// advances by the number of compressed bytes the decompressor actually
/// consumed, never by the declared uncompressed size. Delta entries
/// (tags 6 and 7) are skipped. If exactly 20 bytes remain after the
/// last entry they are verified as the stream's SHA-1 trailer.
///
/// Returns the number of objects stored. Any unrecoverable stream error
/// aborts the remaining entries; objects already stored stay in place.
pub fn unpack(store: &ObjectStore, data: &[u8]) -> PackResult<usize> {
    let header = parse_header(data)?;
    let mut pos = HEADER_LEN;
    let mut stored = 0;

    for _ in 0..header.object_count {
        let (tag, declared, consumed) =
            varint::decode_entry_header(&data[pos..]).ok_or(PackError::Truncated(pos))?;
        pos += consumed;

        match tag {
            1 | 2 | 3 => {
                let kind = match tag {
                    1 => ObjectKind::Commit,
                    2 => ObjectKind::Tree,
                    _ => ObjectKind::Blob,
                };

                let mut decoder = ZlibDecoder::new(&data[pos..]);
                // declared comes off the wire; cap the pre-allocation
                // and let the vector grow to the real size
                let mut payload = Vec::with_capacity(declared.min(64 * 1024) as usize);
                decoder
                    .read_to_end(&mut payload)
                    .map_err(|_| PackError::Truncated(pos))?;
                if payload.len() != declared as usize {
                    return Err(PackError::SizeMismatch {
                        declared,
                        actual: payload.len(),
                    });
                }
                pos += decoder.total_in() as usize;

                store.put(kind, &payload)?;
                stored += 1;
            }
            6 | 7 => {
                // delta against a base object we cannot resolve; skip it.
                // The skip width is the declared uncompressed size, which
                // desynchronizes the stream whenever a delta's compressed
                // form differs in length from its declared size.
                // TODO: replay copy/insert instructions against the base
                // object instead of skipping.
                pos += declared as usize;
                if pos > data.len() {
                    return Err(PackError::Truncated(data.len()));
                }
            }
            other => return Err(PackError::UnknownType(other)),
        }
    }

    // real streams end with a SHA-1 of everything before the trailer
    let rest = &data[pos..];
    if rest.len() == TRAILER_LEN {
        let actual: [u8; TRAILER_LEN] = Sha1::digest(&data[..pos]).into();
        if actual[..] != rest[..] {
            return Err(PackError::BadChecksum);
        }
    }

    Ok(stored)
}
