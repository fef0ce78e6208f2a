//! The ZIP container holding every collected entry.
//!
//! [`ArchiveWriter`] seals entries in call order and picks a storage mode
//! per entry: names that already denote a compressed format (and command
//! output piped through an external compressor) are stored verbatim, the
//! rest are deflated.

mod storage;
mod writer;

pub use storage::{is_precompressed, PostCompressor, StorageMode};
pub use writer::ArchiveWriter;
