use std::fmt;

use zip::CompressionMethod;

use crate::config::CompressorKind;
use crate::constants::COMPRESSED_EXTENSIONS;
use crate::utils::pipeline::CommandSpec;

/// How an entry's payload is stored in the container.
#[derive(Debug, PartialEq, Eq, Clone, Copy)]
pub enum StorageMode {
    Stored,
    Deflated,
}

impl StorageMode {
    /// Default mode for an entry name: stored when the name already denotes
    /// a compressed format, deflated otherwise.
    pub fn for_entry_name(name: &str) -> Self {
        if is_precompressed(name) {
            StorageMode::Stored
        } else {
            StorageMode::Deflated
        }
    }

    /// An explicit override wins over the name-derived default.
    pub fn resolve(name: &str, requested: Option<StorageMode>) -> Self {
        requested.unwrap_or_else(|| Self::for_entry_name(name))
    }

    pub(crate) fn compression_method(self) -> CompressionMethod {
        match self {
            StorageMode::Stored => CompressionMethod::Stored,
            StorageMode::Deflated => CompressionMethod::Deflated,
        }
    }
}

impl fmt::Display for StorageMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            StorageMode::Stored => f.write_str("stored"),
            StorageMode::Deflated => f.write_str("deflated"),
        }
    }
}

/// Whether the entry name's extension is one of the already-compressed formats.
pub fn is_precompressed(name: &str) -> bool {
    let file_name = name.rsplit('/').next().unwrap_or(name);
    match file_name.rsplit_once('.') {
        Some((stem, ext)) if !stem.is_empty() => {
            let ext = ext.to_ascii_lowercase();
            COMPRESSED_EXTENSIONS.contains(&ext.as_str())
        }
        _ => false,
    }
}

/// External compressor appended as the last stage of a command entry.
#[derive(Debug, PartialEq, Eq, Clone, Copy)]
pub struct PostCompressor {
    pub program: &'static str,
    pub args: &'static [&'static str],
    /// Extension appended to the entry name, without the dot.
    pub extension: &'static str,
}

impl PostCompressor {
    pub const ZSTD: PostCompressor = PostCompressor { program: "zstd", args: &["-q", "-c", "-T0"], extension: "zst" };
    pub const XZ: PostCompressor = PostCompressor { program: "xz", args: &["-c", "-T0"], extension: "xz" };
    pub const GZIP: PostCompressor = PostCompressor { program: "gzip", args: &["-c"], extension: "gz" };

    pub fn from_kind(kind: CompressorKind) -> Option<Self> {
        match kind {
            CompressorKind::Zstd => Some(Self::ZSTD),
            CompressorKind::Xz => Some(Self::XZ),
            CompressorKind::Gzip => Some(Self::GZIP),
            CompressorKind::None => None,
        }
    }

    pub fn command(&self) -> CommandSpec {
        CommandSpec::new(self.program, self.args.iter().copied())
    }

    /// Entry name carrying this compressor's extension.
    pub fn entry_name(&self, name: &str) -> String {
        let suffix = format!(".{}", self.extension);
        if name.ends_with(&suffix) {
            name.to_string()
        } else {
            format!("{}{}", name, suffix)
        }
    }
}
