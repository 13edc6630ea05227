//! Grid-index cache artifact.
//!
//! Building a grid index over large category feeds is the expensive step of
//! a run, and the result is deterministic for identical inputs. The cache
//! round-trips the built index through durable storage: bitcode encoding,
//! lz4 compression, and the checksummed artifact header, written with the
//! atomic write-rename pattern.

use std::fs;
use std::path::Path;

use tracing::{debug, info};

use synthesis::grid::GridIndex;

use crate::atomic_write::atomic_write;
use crate::cache_error::CacheError;
use crate::file_header::{unwrap_header, wrap_with_header, FLAG_COMPRESSED};

/// Serialize `index` to `path`.
pub fn save_index(path: &Path, index: &GridIndex) -> Result<(), CacheError> {
    let encoded = bitcode::encode(index);
    let compressed = lz4_flex::compress_prepend_size(&encoded);
    debug!(
        encoded = encoded.len(),
        compressed = compressed.len(),
        "index artifact encoded"
    );
    let bytes = wrap_with_header(&compressed, FLAG_COMPRESSED, encoded.len() as u32);
    atomic_write(path, &bytes)?;
    info!(path = %path.display(), bytes = bytes.len(), "grid index cached");
    Ok(())
}

/// Load a previously cached index from `path`.
pub fn load_index(path: &Path) -> Result<GridIndex, CacheError> {
    let bytes = fs::read(path)?;
    let (header, payload) = unwrap_header(&bytes)?;

    let encoded = if header.flags & FLAG_COMPRESSED != 0 {
        lz4_flex::decompress_size_prepended(payload)
            .map_err(|e| CacheError::Decode(e.to_string()))?
    } else {
        payload.to_vec()
    };
    if encoded.len() != header.uncompressed_size as usize {
        return Err(CacheError::Decode(format!(
            "payload expands to {} bytes, header says {}",
            encoded.len(),
            header.uncompressed_size
        )));
    }

    let index: GridIndex = bitcode::decode(&encoded)?;
    info!(path = %path.display(), "grid index loaded from cache");
    Ok(index)
}
