use std::io;
use std::path::PathBuf;

use thiserror::Error;

/// Errors raised while building or running a process pipeline.
#[derive(Error, Debug)]
pub enum PipelineError {
    #[error("pipeline has no stages")]
    Empty,

    #[error("tool not found: {0}")]
    MissingTool(String),

    #[error("failed to spawn `{command}`: {source}")]
    Spawn {
        command: String,
        #[source]
        source: io::Error,
    },
}

/// Errors from the archive container itself. These are the only fatal
/// conditions of a collection run.
#[derive(Error, Debug)]
pub enum ArchiveError {
    #[error("failed to open archive {path}: {source}")]
    Open {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("failed to write entry {entry}: {source}")]
    Entry {
        entry: String,
        #[source]
        source: zip::result::ZipError,
    },

    #[error("failed to stream into entry {entry}: {source}")]
    Write {
        entry: String,
        #[source]
        source: io::Error,
    },

    #[error("failed to finalize archive: {0}")]
    Finalize(#[source] zip::result::ZipError),
}

/// Reasons the SMBIOS dump could not be synthesized.
#[derive(Error, Debug, PartialEq, Eq)]
pub enum SynthesisError {
    #[error("DMI tables directory {0} not found")]
    TablesDirMissing(PathBuf),

    #[error("entry point {0} unreadable")]
    EntryPointMissing(PathBuf),

    #[error("table bytes {0} unreadable")]
    TableMissing(PathBuf),

    #[error("no recognized SMBIOS anchor in entry point")]
    UnrecognizedHeader,

    #[error("entry point truncated: {actual} bytes, need {expected}")]
    TruncatedHeader { expected: usize, actual: usize },

    #[error("entry point declares invalid length {0:#04x}")]
    InvalidHeaderLength(u8),
}

/// Fatal outcome of a collection run.
#[derive(Error, Debug)]
pub enum CollectionError {
    #[error(transparent)]
    Archive(#[from] ArchiveError),
}
