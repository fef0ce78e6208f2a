//! Test utilities for the diagnostic collector
//!
//! This module provides common testing utilities and helpers
//! for use across all test modules.

#![cfg(test)]

use std::fs;
use std::io::Read;
use std::os::unix::fs::PermissionsExt;
use std::path::{Path, PathBuf};

use zip::ZipArchive;

/// Install an executable `#!/bin/sh` script named `name` into `dir`.
pub fn install_tool(dir: &Path, name: &str, body: &str) -> PathBuf {
    let path = dir.join(name);
    fs::write(&path, format!("#!/bin/sh\n{}\n", body)).unwrap();
    fs::set_permissions(&path, fs::Permissions::from_mode(0o755)).unwrap();
    path
}

/// Entry names of an archive, in the order they were written.
pub fn entry_names(archive: &Path) -> Vec<String> {
    let mut zip = ZipArchive::new(fs::File::open(archive).unwrap()).unwrap();
    (0..zip.len())
        .map(|i| zip.by_index(i).unwrap().name().to_string())
        .collect()
}

/// Decompressed payload of one entry.
pub fn read_entry(archive: &Path, name: &str) -> Vec<u8> {
    let mut zip = ZipArchive::new(fs::File::open(archive).unwrap()).unwrap();
    let mut entry = zip.by_name(name).unwrap();
    let mut data = Vec::new();
    entry.read_to_end(&mut data).unwrap();
    data
}

pub fn entry_compression(archive: &Path, name: &str) -> zip::CompressionMethod {
    let mut zip = ZipArchive::new(fs::File::open(archive).unwrap()).unwrap();
    let method = zip.by_name(name).unwrap().compression();
    method
}

/// A fake host root with the given files, paths relative to the root.
pub fn fake_sysroot(files: &[(&str, &[u8])]) -> tempfile::TempDir {
    let root = tempfile::TempDir::new().unwrap();
    for (relative, content) in files {
        let path = root.path().join(relative);
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).unwrap();
        }
        fs::write(path, content).unwrap();
    }
    root
}
