use std::fmt;

use crate::utils::archive::StorageMode;
use crate::utils::pipeline::PipelineOutcome;

/// A sealed archive entry.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EntryInfo {
    pub name: String,
    /// Payload bytes before compression.
    pub bytes: u64,
    pub mode: StorageMode,
}

impl fmt::Display for EntryInfo {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} ({} bytes, {})", self.name, self.bytes, self.mode)
    }
}

/// An entry written from a pipeline, with how the pipeline ended.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PipelineEntry {
    pub entry: EntryInfo,
    pub outcome: PipelineOutcome,
}

impl PipelineEntry {
    pub fn exit_code(&self) -> i32 {
        self.outcome.exit_code()
    }

    pub fn success(&self) -> bool {
        self.outcome.success()
    }
}
