// ---------------------------------------------------------------------------
// CacheError: typed errors for artifact save/load operations
// ---------------------------------------------------------------------------

use std::fmt;

/// Errors that can occur while saving or loading durable artifacts.
#[derive(Debug)]
pub enum CacheError {
    /// I/O error (file not found, permission denied, disk full, etc.)
    Io(std::io::Error),
    /// Bitcode decoding failed (corrupt or incompatible artifact).
    Decode(String),
    /// The file does not start with the artifact magic bytes.
    BadMagic,
    /// The file is too short to contain a complete header.
    Truncated { needed: usize, got: usize },
    /// The artifact header format is newer than this build supports.
    VersionMismatch { expected_max: u32, found: u32 },
    /// The payload checksum does not match the header.
    ChecksumMismatch { expected: u32, computed: u32 },
}

impl fmt::Display for CacheError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CacheError::Io(e) => write!(f, "I/O error: {e}"),
            CacheError::Decode(msg) => write!(f, "decoding error: {msg}"),
            CacheError::BadMagic => write!(f, "not an index cache artifact (bad magic bytes)"),
            CacheError::Truncated { needed, got } => {
                write!(f, "artifact truncated: {got} bytes, need at least {needed}")
            }
            CacheError::VersionMismatch {
                expected_max,
                found,
            } => write!(
                f,
                "artifact header version {found} is newer than the supported maximum {expected_max}"
            ),
            CacheError::ChecksumMismatch { expected, computed } => write!(
                f,
                "artifact corrupted: checksum mismatch (expected {expected:#010X}, got {computed:#010X})"
            ),
        }
    }
}

impl std::error::Error for CacheError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            CacheError::Io(e) => Some(e),
            _ => None,
        }
    }
}

impl From<std::io::Error> for CacheError {
    fn from(e: std::io::Error) -> Self {
        CacheError::Io(e)
    }
}

impl From<bitcode::Error> for CacheError {
    fn from(e: bitcode::Error) -> Self {
        CacheError::Decode(e.to_string())
    }
}
