//! Global constants for the diagnostic collector.
//!
//! This module centralizes all hardcoded values to improve maintainability
//! and make configuration changes easier.

use std::time::Duration;

// Buffer size constants
/// Chunk size for streaming files and process output into the archive (512KB)
pub const COPY_CHUNK_SIZE: usize = 512 * 1024;

/// Upper bound on how long a finished pipeline waits for its stderr drains
pub const STDERR_DRAIN_TIMEOUT: Duration = Duration::from_secs(5);

// Archive layout
/// Name of the collection log entry, relative to the top-level directory
pub const COLLECTION_LOG_NAME: &str = "collection.log";

/// Log entry name used by recovery when `collection.log` is already taken
pub const RECOVERED_LOG_NAME: &str = "collection.recovered.log";

/// Suffix appended to an entry name to form its stderr sidecar
pub const STDERR_SIDECAR_SUFFIX: &str = ".stderr.txt";

/// Conventional extension of the output container
pub const ARCHIVE_EXTENSION: &str = "zip";

/// Unix permissions recorded on every archive entry
pub const ENTRY_PERMISSIONS: u32 = 0o644;

/// Extensions of formats that are already compressed and must be stored raw
pub const COMPRESSED_EXTENSIONS: &[&str] = &["zst", "zstd", "gz", "xz", "bz2", "lz4", "zip", "7z"];

// Subprocess environment
/// Locale forced onto every spawned command
pub const STABLE_LOCALE: &str = "C.UTF-8";

/// Directories appended to the search path so admin tools are found as non-root
pub const SYSTEM_BIN_DIRS: &[&str] = &["/usr/local/sbin", "/usr/sbin", "/sbin", "/usr/bin", "/bin"];

/// Exit code reported when a stage was terminated by a signal (plus signo)
pub const SIGNAL_EXIT_BASE: i32 = 128;

// SMBIOS entry point constants
/// Anchor of the legacy 32-bit entry point (SMBIOS 2.x)
pub const SMBIOS2_ANCHOR: &[u8] = b"_SM_";

/// Anchor of the 64-bit entry point (SMBIOS 3.x)
pub const SMBIOS3_ANCHOR: &[u8] = b"_SM3_";

/// Size of the legacy entry point structure
pub const SMBIOS2_EPS_LEN: usize = 0x1F;

/// Size of the 64-bit entry point structure
pub const SMBIOS3_EPS_LEN: usize = 0x18;

/// Size of the header region of a dump; the table follows immediately
pub const SMBIOS_DUMP_HEADER_LEN: usize = 0x20;

/// Table address written into dumped entry points (the offset of the table in the dump)
pub const SMBIOS_DUMP_TABLE_ADDRESS: u32 = 0x20;

// Pseudo-filesystem paths, relative to the collection root
pub const DMI_TABLES_DIR: &str = "sys/firmware/dmi/tables";
pub const XEN_CAPABILITIES_PATH: &str = "proc/xen/capabilities";
pub const NET_CLASS_DIR: &str = "sys/class/net";

// Default file names
pub const DEFAULT_OUTPUT_PREFIX: &str = "diag";

// Process exit codes
/// The run aborted on an archive error
pub const EXIT_FATAL: u8 = 1;

/// A precondition failed before anything was written
pub const EXIT_PRECONDITION: u8 = 2;
