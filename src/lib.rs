//! # diag-collector
//!
//! Collects a diagnostic archive from a Linux host for offline support
//! analysis.
//!
//! ## Overview
//!
//! A run executes system tools (`ip`, `lspci`, `dmidecode`, `journalctl`
//! and friends), copies pseudo-files from `/proc` and `/sys`, and streams
//! everything into a single ZIP archive. Every step leaves one line in a
//! collection log, written as the last entry, so an analyst can tell
//! missing data from a failed tool.
//!
//! ## Features
//!
//! - **Pipelines**: multi-stage commands with per-stage exit codes and stderr
//! - **Streaming archive**: bounded memory regardless of output size
//! - **Post-compression**: large outputs piped through zstd, xz or gzip
//! - **SMBIOS synthesis**: rebuilds a `dmidecode --dump-bin` image from sysfs
//! - **Fatal recovery**: an archive error still leaves the log in the file
//!
//! ## Usage
//!
//! ```no_run
//! use diag_collector::collectors::collector;
//! use diag_collector::config::{CollectionConfig, RunConfig, ToolEnvironment};
//! use std::path::PathBuf;
//!
//! # fn main() -> Result<(), diag_collector::error::CollectionError> {
//! let config = RunConfig::new(
//!     PathBuf::from("/tmp/diag-host.zip"),
//!     "diag-host".to_string(),
//!     CollectionConfig::default(),
//!     ToolEnvironment::from_process(),
//! );
//!
//! let summary = collector::run(&config)?;
//! println!("Wrote {}", summary.archive.display());
//! # Ok(())
//! # }
//! ```
//!
//! ## Module Organization
//!
//! - [`cli`]: Command-line interface definitions and argument parsing
//! - [`models`]: Descriptions of written entries
//! - [`collectors`]: Category collectors and run orchestration
//! - [`config`]: Configuration loading and the tool environment
//! - [`utils`]: Pipeline runner, archive writer, collection log, SMBIOS
//! - [`privileges`]: Root check
//! - [`constants`]: Application-wide constants
//! - [`error`]: Error types
//!
//! ## Safety
//!
//! The only `unsafe` call is `geteuid` in [`privileges::linux`].

/// Command-line interface definitions and argument parsing
pub mod cli;

/// Descriptions of written archive entries
pub mod models;

/// Category collectors and run orchestration
pub mod collectors;

/// Pipeline runner, archive writer and shared helpers
pub mod utils;

/// Configuration management
pub mod config;

/// Privilege checks
pub mod privileges;

/// Application-wide constants
pub mod constants;

/// Error types
pub mod error;

#[cfg(test)]
pub mod test_utils;
