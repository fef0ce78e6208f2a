use std::env;
use std::fmt;
use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use log::{debug, info};
use serde::{Deserialize, Serialize};

use crate::config::environment::ToolEnvironment;

/// Optional data categories, each independently toggleable.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Category {
    System,
    Hardware,
    Firmware,
    Kernel,
    Network,
    Journal,
    Xen,
}

impl Category {
    /// Every category, in collection order.
    pub const ALL: [Category; 7] = [
        Category::System,
        Category::Hardware,
        Category::Firmware,
        Category::Kernel,
        Category::Network,
        Category::Journal,
        Category::Xen,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            Category::System => "system",
            Category::Hardware => "hardware",
            Category::Firmware => "firmware",
            Category::Kernel => "kernel",
            Category::Network => "network",
            Category::Journal => "journal",
            Category::Xen => "xen",
        }
    }
}

impl fmt::Display for Category {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

fn included() -> bool {
    true
}

/// Inclusion toggles; every category defaults to included.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct CategoryToggles {
    #[serde(default = "included")]
    pub system: bool,
    #[serde(default = "included")]
    pub hardware: bool,
    #[serde(default = "included")]
    pub firmware: bool,
    #[serde(default = "included")]
    pub kernel: bool,
    #[serde(default = "included")]
    pub network: bool,
    #[serde(default = "included")]
    pub journal: bool,
    #[serde(default = "included")]
    pub xen: bool,
}

impl Default for CategoryToggles {
    fn default() -> Self {
        Self {
            system: true,
            hardware: true,
            firmware: true,
            kernel: true,
            network: true,
            journal: true,
            xen: true,
        }
    }
}

impl CategoryToggles {
    /// All categories disabled.
    pub fn none() -> Self {
        Self {
            system: false,
            hardware: false,
            firmware: false,
            kernel: false,
            network: false,
            journal: false,
            xen: false,
        }
    }

    pub fn is_enabled(&self, category: Category) -> bool {
        match category {
            Category::System => self.system,
            Category::Hardware => self.hardware,
            Category::Firmware => self.firmware,
            Category::Kernel => self.kernel,
            Category::Network => self.network,
            Category::Journal => self.journal,
            Category::Xen => self.xen,
        }
    }

    pub fn disable(&mut self, category: Category) {
        match category {
            Category::System => self.system = false,
            Category::Hardware => self.hardware = false,
            Category::Firmware => self.firmware = false,
            Category::Kernel => self.kernel = false,
            Category::Network => self.network = false,
            Category::Journal => self.journal = false,
            Category::Xen => self.xen = false,
        }
    }
}

/// External compressors that can be appended as a final pipeline stage.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, clap::ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum CompressorKind {
    Zstd,
    Xz,
    Gzip,
    None,
}

/// User-facing collection settings, loadable from YAML.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CollectionConfig {
    #[serde(default)]
    pub categories: CategoryToggles,
    #[serde(default = "default_compressor")]
    pub compressor: CompressorKind,
    #[serde(default = "default_journal_units")]
    pub journal_units: Vec<String>,
    #[serde(default = "default_journal_since")]
    pub journal_since: String,
    #[serde(default)]
    pub extra_search_paths: Vec<PathBuf>,
}

fn default_compressor() -> CompressorKind {
    CompressorKind::Zstd
}

fn default_journal_units() -> Vec<String> {
    ["systemd-networkd", "NetworkManager", "systemd-udevd", "xenstored"]
        .iter()
        .map(|s| s.to_string())
        .collect()
}

fn default_journal_since() -> String {
    "-7d".to_string()
}

impl Default for CollectionConfig {
    fn default() -> Self {
        Self {
            categories: CategoryToggles::default(),
            compressor: default_compressor(),
            journal_units: default_journal_units(),
            journal_since: default_journal_since(),
            extra_search_paths: Vec::new(),
        }
    }
}

impl CollectionConfig {
    /// Load configuration from a YAML file
    pub fn from_yaml_file(path: &Path) -> Result<Self> {
        let content = fs::read_to_string(path)
            .context(format!("Failed to read config file: {}", path.display()))?;

        let config: CollectionConfig = serde_yaml::from_str(&content)
            .context("Failed to parse YAML config")?;

        debug!("Loaded configuration from {}", path.display());
        Ok(config)
    }

    /// Save configuration to a YAML file
    pub fn save_to_yaml_file(&self, path: &Path) -> Result<()> {
        let yaml = serde_yaml::to_string(self)
            .context("Failed to serialize config to YAML")?;

        fs::write(path, yaml)
            .context(format!("Failed to write config to {}", path.display()))?;

        info!("Saved configuration to {}", path.display());
        Ok(())
    }
}

/// Load the configuration file if one was given, else the defaults.
pub fn load_or_default(path: Option<&Path>) -> Result<CollectionConfig> {
    match path {
        Some(path) => CollectionConfig::from_yaml_file(path),
        None => Ok(CollectionConfig::default()),
    }
}

/// Everything a collection run needs, fixed before the first entry is written.
#[derive(Debug, Clone)]
pub struct RunConfig {
    pub output: PathBuf,
    pub top_level: String,
    pub collection: CollectionConfig,
    pub tools: ToolEnvironment,
    /// Root under which pseudo-filesystems (`proc`, `sys`) and config files are read.
    pub sysroot: PathBuf,
    /// Directory for short-lived files tools write before they are archived.
    pub scratch_dir: PathBuf,
}

impl RunConfig {
    pub fn new(output: PathBuf, top_level: String, collection: CollectionConfig, tools: ToolEnvironment) -> Self {
        let tools = tools.with_leading_dirs(collection.extra_search_paths.iter().cloned());
        Self {
            output,
            top_level,
            collection,
            tools,
            sysroot: PathBuf::from("/"),
            scratch_dir: env::temp_dir(),
        }
    }

    pub fn with_sysroot(mut self, sysroot: impl Into<PathBuf>) -> Self {
        self.sysroot = sysroot.into();
        self
    }

    pub fn with_scratch_dir(mut self, scratch_dir: impl Into<PathBuf>) -> Self {
        self.scratch_dir = scratch_dir.into();
        self
    }

    /// Path of a host file below the collection root, e.g. `host_path("proc/version")`.
    pub fn host_path(&self, relative: &str) -> PathBuf {
        self.sysroot.join(relative.trim_start_matches('/'))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_partial_yaml_keeps_defaults() {
        let yaml = "categories:\n  network: false\n  xen: false\ncompressor: gzip\n";
        let config: CollectionConfig = serde_yaml::from_str(yaml).unwrap();

        assert!(!config.categories.network);
        assert!(!config.categories.xen);
        assert!(config.categories.system);
        assert!(config.categories.journal);
        assert_eq!(config.compressor, CompressorKind::Gzip);
        assert_eq!(config.journal_units, default_journal_units());
    }

    #[test]
    fn test_yaml_file_roundtrip() {
        let dir = tempfile::TempDir::new().unwrap();
        let path = dir.path().join("config.yaml");

        let mut config = CollectionConfig::default();
        config.categories.disable(Category::Kernel);
        config.journal_units = vec!["sshd".to_string()];
        config.save_to_yaml_file(&path).unwrap();

        assert_eq!(CollectionConfig::from_yaml_file(&path).unwrap(), config);
    }

    #[test]
    fn test_toggles() {
        let mut toggles = CategoryToggles::default();
        assert!(Category::ALL.iter().all(|c| toggles.is_enabled(*c)));

        toggles.disable(Category::Firmware);
        assert!(!toggles.is_enabled(Category::Firmware));
        assert!(toggles.is_enabled(Category::Hardware));

        let none = CategoryToggles::none();
        assert!(Category::ALL.iter().all(|c| !none.is_enabled(*c)));
    }

    #[test]
    fn test_host_path_under_sysroot() {
        let config = RunConfig::new(
            PathBuf::from("/tmp/out.zip"),
            "out".to_string(),
            CollectionConfig::default(),
            ToolEnvironment::from_parts(Vec::new(), Vec::new()),
        )
        .with_sysroot("/mnt/root");

        assert_eq!(config.host_path("/proc/version"), PathBuf::from("/mnt/root/proc/version"));
        assert_eq!(config.host_path("sys/class/net"), PathBuf::from("/mnt/root/sys/class/net"));
        assert_eq!(config.scratch_dir, env::temp_dir());

        let config = config.with_scratch_dir("/var/tmp/diag");
        assert_eq!(config.scratch_dir, PathBuf::from("/var/tmp/diag"));
        assert_eq!(config.sysroot, PathBuf::from("/mnt/root"));
    }
}
