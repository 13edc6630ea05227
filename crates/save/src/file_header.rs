// ---------------------------------------------------------------------------
// file_header – Artifact header with magic bytes, version, and checksum
// ---------------------------------------------------------------------------
//
// Header format (28 bytes, fixed-size, little-endian):
//   [0..4]   Magic bytes: "WALK" (0x57414C4B)
//   [4..8]   Header format version (u32)
//   [8..12]  Flags (u32: bit 0 = lz4-compressed payload)
//   [12..20] Build timestamp (Unix epoch, u64)
//   [20..24] Uncompressed payload size (u32)
//   [24..28] xxHash32 checksum of the payload (everything after the header)
//
// On save: encode artifact -> compress -> prepend header (checksum of the
// stored payload bytes).
// On load: check magic -> check version -> validate checksum -> strip header
// -> decompress -> decode.

use xxhash_rust::xxh32::xxh32;

use crate::cache_error::CacheError;

/// Magic bytes identifying an index cache artifact.
pub const MAGIC: [u8; 4] = *b"WALK";

/// Size of the artifact header in bytes.
pub const HEADER_SIZE: usize = 28;

/// Current header format version. Tracks changes to the header layout, not
/// to the encoded artifact schema.
pub const HEADER_FORMAT_VERSION: u32 = 1;

/// Flag bit: the payload is lz4-compressed with a prepended size.
pub const FLAG_COMPRESSED: u32 = 1;

/// Seed for xxHash32 checksum.
const XXHASH_SEED: u32 = 0;

/// Parsed artifact header.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FileHeader {
    pub format_version: u32,
    pub flags: u32,
    pub timestamp: u64,
    pub uncompressed_size: u32,
    pub checksum: u32,
}

impl FileHeader {
    /// Create a new header for the given stored payload.
    pub fn new(payload: &[u8], flags: u32, uncompressed_size: u32) -> Self {
        let timestamp = std::time::SystemTime::now()
            .duration_since(std::time::UNIX_EPOCH)
            .map(|d| d.as_secs())
            .unwrap_or(0);

        Self {
            format_version: HEADER_FORMAT_VERSION,
            flags,
            timestamp,
            uncompressed_size,
            checksum: xxh32(payload, XXHASH_SEED),
        }
    }
}

/// Wrap a stored payload with an artifact header.
///
/// Returns bytes: [header (28 bytes)] ++ [payload].
pub fn wrap_with_header(payload: &[u8], flags: u32, uncompressed_size: u32) -> Vec<u8> {
    let header = FileHeader::new(payload, flags, uncompressed_size);
    let mut out = Vec::with_capacity(HEADER_SIZE + payload.len());

    out.extend_from_slice(&MAGIC);
    out.extend_from_slice(&header.format_version.to_le_bytes());
    out.extend_from_slice(&header.flags.to_le_bytes());
    out.extend_from_slice(&header.timestamp.to_le_bytes());
    out.extend_from_slice(&header.uncompressed_size.to_le_bytes());
    out.extend_from_slice(&header.checksum.to_le_bytes());

    out.extend_from_slice(payload);
    out
}

/// Parse and validate the artifact header from raw bytes, returning the
/// header and the payload that follows it.
///
/// # Errors
///
/// - [`CacheError::BadMagic`] when the file does not start with "WALK"
/// - [`CacheError::Truncated`] when the file is shorter than a header
/// - [`CacheError::VersionMismatch`] for headers from a newer build
/// - [`CacheError::ChecksumMismatch`] when the payload is corrupted
pub fn unwrap_header(bytes: &[u8]) -> Result<(FileHeader, &[u8]), CacheError> {
    if bytes.len() < 4 || bytes[..4] != MAGIC {
        return Err(CacheError::BadMagic);
    }
    if bytes.len() < HEADER_SIZE {
        return Err(CacheError::Truncated {
            needed: HEADER_SIZE,
            got: bytes.len(),
        });
    }

    // Parse header fields (all little-endian).
    let format_version = u32::from_le_bytes([bytes[4], bytes[5], bytes[6], bytes[7]]);
    let flags = u32::from_le_bytes([bytes[8], bytes[9], bytes[10], bytes[11]]);
    let timestamp = u64::from_le_bytes([
        bytes[12], bytes[13], bytes[14], bytes[15], bytes[16], bytes[17], bytes[18], bytes[19],
    ]);
    let uncompressed_size = u32::from_le_bytes([bytes[20], bytes[21], bytes[22], bytes[23]]);
    let checksum = u32::from_le_bytes([bytes[24], bytes[25], bytes[26], bytes[27]]);

    if format_version > HEADER_FORMAT_VERSION {
        return Err(CacheError::VersionMismatch {
            expected_max: HEADER_FORMAT_VERSION,
            found: format_version,
        });
    }

    let payload = &bytes[HEADER_SIZE..];
    let computed = xxh32(payload, XXHASH_SEED);
    if computed != checksum {
        return Err(CacheError::ChecksumMismatch {
            expected: checksum,
            computed,
        });
    }

    Ok((
        FileHeader {
            format_version,
            flags,
            timestamp,
            uncompressed_size,
            checksum,
        },
        payload,
    ))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_wrap_and_unwrap_roundtrip() {
        let payload = b"encoded index artifact";
        let wrapped = wrap_with_header(payload, FLAG_COMPRESSED, 999);

        assert_eq!(&wrapped[..4], &MAGIC);
        assert_eq!(wrapped.len(), HEADER_SIZE + payload.len());

        let (header, parsed) = unwrap_header(&wrapped).expect("unwrap should succeed");
        assert_eq!(header.format_version, HEADER_FORMAT_VERSION);
        assert_eq!(header.flags, FLAG_COMPRESSED);
        assert_eq!(header.uncompressed_size, 999);
        assert_eq!(parsed, payload);
    }

    #[test]
    fn test_bad_magic() {
        let bytes = b"\x00\x01\x02\x03whatever";
        assert!(matches!(unwrap_header(bytes), Err(CacheError::BadMagic)));
    }

    #[test]
    fn test_truncated_header() {
        let mut bytes = MAGIC.to_vec();
        bytes.extend_from_slice(&[0u8; 10]);
        assert!(matches!(
            unwrap_header(&bytes),
            Err(CacheError::Truncated { needed: 28, got: 14 })
        ));
    }

    #[test]
    fn test_newer_version_rejected() {
        let mut wrapped = wrap_with_header(b"data", 0, 4);
        // Bump the version field past the supported maximum.
        wrapped[4..8].copy_from_slice(&(HEADER_FORMAT_VERSION + 1).to_le_bytes());
        assert!(matches!(
            unwrap_header(&wrapped),
            Err(CacheError::VersionMismatch { .. })
        ));
    }

    #[test]
    fn test_corrupted_payload_detected() {
        let mut wrapped = wrap_with_header(b"sensitive payload bytes", 0, 23);
        let last = wrapped.len() - 1;
        wrapped[last] ^= 0xFF;
        assert!(matches!(
            unwrap_header(&wrapped),
            Err(CacheError::ChecksumMismatch { .. })
        ));
    }

    #[test]
    fn test_every_payload_byte_is_checksummed() {
        let payload: Vec<u8> = (0..64).collect();
        let wrapped = wrap_with_header(&payload, 0, 64);
        for i in HEADER_SIZE..wrapped.len() {
            let mut corrupted = wrapped.clone();
            corrupted[i] ^= 0x01;
            assert!(
                matches!(
                    unwrap_header(&corrupted),
                    Err(CacheError::ChecksumMismatch { .. })
                ),
                "flip at byte {i} went undetected"
            );
        }
    }
}
