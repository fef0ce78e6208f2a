use clap::{Parser, Subcommand};
use std::path::{Path, PathBuf};

use chrono::Local;

use crate::config::{Category, CollectionConfig, CompressorKind};
use crate::constants::{ARCHIVE_EXTENSION, DEFAULT_OUTPUT_PREFIX};

/// Command-line arguments for the diagnostic collector.
///
/// Options cover the output archive, the optional YAML configuration, and
/// per-category opt-outs. Flags override values from the config file.
#[derive(Parser, Debug)]
#[clap(name = "diag-collector", about = "Collect a Linux host diagnostic archive", version)]
pub struct Args {
    /// Output archive path (default: ./diag-<hostname>-<timestamp>.zip)
    #[clap(short, long)]
    pub output: Option<PathBuf>,

    /// Name of the top-level directory inside the archive (default: archive file stem)
    #[clap(long)]
    pub name: Option<String>,

    /// Path to configuration YAML file
    #[clap(short = 'c', long)]
    pub config: Option<PathBuf>,

    /// External compressor applied to large command outputs
    #[clap(long, value_enum)]
    pub compressor: Option<CompressorKind>,

    /// Skip host identity and resource usage
    #[clap(long)]
    pub no_system: bool,

    /// Skip PCI, USB and block device inventory
    #[clap(long)]
    pub no_hardware: bool,

    /// Skip DMI/SMBIOS and ACPI tables
    #[clap(long)]
    pub no_firmware: bool,

    /// Skip kernel log, modules and sysctl
    #[clap(long)]
    pub no_kernel: bool,

    /// Skip network configuration and per-interface details
    #[clap(long)]
    pub no_network: bool,

    /// Skip systemd journal extracts
    #[clap(long)]
    pub no_journal: bool,

    /// Skip Xen hypervisor state
    #[clap(long)]
    pub no_xen: bool,

    /// Verbose logging
    #[clap(short, long)]
    pub verbose: bool,

    /// Continue even without root privileges
    #[clap(long)]
    pub force: bool,

    #[clap(subcommand)]
    pub command: Option<Commands>,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Write the default configuration to a YAML file
    InitConfig {
        /// Path where to save the configuration file
        #[clap(default_value = "diag_config.yaml")]
        path: PathBuf,
    },
}

impl Args {
    /// Categories switched off on the command line.
    pub fn disabled_categories(&self) -> Vec<Category> {
        let flags = [
            (Category::System, self.no_system),
            (Category::Hardware, self.no_hardware),
            (Category::Firmware, self.no_firmware),
            (Category::Kernel, self.no_kernel),
            (Category::Network, self.no_network),
            (Category::Journal, self.no_journal),
            (Category::Xen, self.no_xen),
        ];
        flags
            .iter()
            .filter(|(_, disabled)| *disabled)
            .map(|(category, _)| *category)
            .collect()
    }

    /// Fold command-line overrides into a loaded configuration.
    pub fn apply_to(&self, config: &mut CollectionConfig) {
        for category in self.disabled_categories() {
            config.categories.disable(category);
        }
        if let Some(compressor) = self.compressor {
            config.compressor = compressor;
        }
    }

    pub fn output_path(&self, hostname: &str) -> PathBuf {
        match &self.output {
            Some(path) => path.clone(),
            None => PathBuf::from(default_output_name(hostname, &Local::now().format("%Y%m%d-%H%M%S").to_string())),
        }
    }

    pub fn top_level_name(&self, output: &Path) -> String {
        match &self.name {
            Some(name) => name.clone(),
            None => output
                .file_stem()
                .map(|stem| stem.to_string_lossy().into_owned())
                .unwrap_or_else(|| DEFAULT_OUTPUT_PREFIX.to_string()),
        }
    }
}

pub fn default_output_name(hostname: &str, timestamp: &str) -> String {
    format!("{}-{}-{}.{}", DEFAULT_OUTPUT_PREFIX, hostname, timestamp, ARCHIVE_EXTENSION)
}

/// Whether `path` names a `.zip` container.
pub fn has_archive_extension(path: &Path) -> bool {
    path.extension()
        .map(|ext| ext.eq_ignore_ascii_case(ARCHIVE_EXTENSION))
        .unwrap_or(false)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_category_flags() {
        let args = Args::parse_from(["diag-collector", "--no-network", "--no-xen", "--compressor", "gzip"]);
        assert_eq!(args.disabled_categories(), vec![Category::Network, Category::Xen]);

        let mut config = CollectionConfig::default();
        args.apply_to(&mut config);
        assert!(!config.categories.network);
        assert!(!config.categories.xen);
        assert!(config.categories.kernel);
        assert_eq!(config.compressor, CompressorKind::Gzip);
    }

    #[test]
    fn test_output_naming() {
        assert_eq!(default_output_name("web01", "20260101-120000"), "diag-web01-20260101-120000.zip");

        let args = Args::parse_from(["diag-collector", "-o", "/tmp/case-42.zip"]);
        let output = args.output_path("ignored");
        assert_eq!(output, PathBuf::from("/tmp/case-42.zip"));
        assert_eq!(args.top_level_name(&output), "case-42");

        let named = Args::parse_from(["diag-collector", "--name", "bundle"]);
        assert_eq!(named.top_level_name(&output), "bundle");
    }

    #[test]
    fn test_archive_extension() {
        assert!(has_archive_extension(Path::new("out.zip")));
        assert!(has_archive_extension(Path::new("OUT.ZIP")));
        assert!(!has_archive_extension(Path::new("out.tar.gz")));
        assert!(!has_archive_extension(Path::new("out")));
    }
}
