//! Building blocks shared by every collector.
//!
//! ## Components
//!
//! - **Pipeline**: spawn external tools chained stdout to stdin and capture
//!   every stage's exit status and stderr
//! - **Archive**: streaming ZIP writer with per-entry storage modes and
//!   recovery after a fatal error
//! - **Collection log**: ordered outcome lines, written as the last entry
//! - **SMBIOS**: rebuild a `dmidecode --dump-bin` image from sysfs tables
//!
//! ## Example
//!
//! ```no_run
//! use diag_collector::config::ToolEnvironment;
//! use diag_collector::utils::archive::ArchiveWriter;
//! use diag_collector::utils::collection_log::CollectionLog;
//! use diag_collector::utils::pipeline::Pipeline;
//! use std::path::Path;
//!
//! # fn example() -> Result<(), diag_collector::error::ArchiveError> {
//! let tools = ToolEnvironment::from_process();
//! let mut log = CollectionLog::new();
//! let mut archive = ArchiveWriter::create(Path::new("/tmp/diag.zip"))?;
//!
//! let pipeline = Pipeline::cmd("dmesg");
//! archive.write_from_pipeline("diag/kernel/dmesg.txt", &pipeline, None, &tools, &mut log)?;
//! archive.finish()?;
//! # Ok(())
//! # }
//! ```

/// Streaming ZIP archive writer
pub mod archive;

/// Ordered record of collection outcomes
pub mod collection_log;

/// External tool pipelines
pub mod pipeline;

/// SMBIOS dump synthesis from sysfs
pub mod smbios;
