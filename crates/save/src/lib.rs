//! Durable artifacts for the trajectory synthesizer.
//!
//! Two concerns live here: the grid-index cache (bitcode + lz4 behind a
//! checksummed header, written atomically) and the JSON trajectory outputs
//! of a generation run.

mod atomic_write;
mod cache_error;
mod file_header;
mod index_cache;
mod output;

pub use atomic_write::atomic_write;
pub use cache_error::CacheError;
pub use file_header::{
    unwrap_header, wrap_with_header, FileHeader, FLAG_COMPRESSED, HEADER_FORMAT_VERSION,
    HEADER_SIZE, MAGIC,
};
pub use index_cache::{load_index, save_index};
pub use output::{write_trajectory_set, OutputError};
