//! Run configuration.
//!
//! [`CollectionConfig`] holds the user-facing settings (category toggles,
//! compressor choice, journal units) and can be loaded from YAML.
//! [`ToolEnvironment`] fixes the environment every external tool runs with.
//! [`RunConfig`] ties both to an output path and is built once per run.

mod collection_config;
mod environment;

pub use collection_config::{
    load_or_default, Category, CategoryToggles, CollectionConfig, CompressorKind, RunConfig,
};
pub use environment::ToolEnvironment;
