//! Collection call sites.
//!
//! Each category module records one area of the host through a shared
//! [`context::Collection`]: commands go through the pipeline runner, files
//! and sysfs trees are streamed into the archive, and every outcome lands in
//! the collection log.
//!
//! ## Layout
//!
//! ```text
//! ┌─────────────────────────────────────────┐
//! │        collector::run                   │
//! ├─────────────────────────────────────────┤
//! │        Category collectors              │
//! │  system  hardware  firmware  kernel     │
//! │  network  journal  xen                  │
//! ├─────────────────────────────────────────┤
//! │        Collection context               │
//! │  pipeline runner │ archive │ log        │
//! └─────────────────────────────────────────┘
//! ```
//!
//! ## Usage Example
//!
//! ```no_run
//! use diag_collector::collectors::collector;
//! use diag_collector::config::{CollectionConfig, RunConfig, ToolEnvironment};
//! use std::path::PathBuf;
//!
//! # fn example() -> Result<(), diag_collector::error::CollectionError> {
//! let config = RunConfig::new(
//!     PathBuf::from("/tmp/diag.zip"),
//!     "diag".to_string(),
//!     CollectionConfig::default(),
//!     ToolEnvironment::from_process(),
//! );
//! let summary = collector::run(&config)?;
//! println!("{} failures", summary.failures);
//! # Ok(())
//! # }
//! ```

/// Run orchestration and fatal recovery
pub mod collector;

/// Shared state and write helpers for category collectors
pub mod context;

pub mod firmware;
pub mod hardware;
pub mod journal;
pub mod kernel;
pub mod network;
pub mod system;
pub mod xen;
