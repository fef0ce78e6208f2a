use std::path::{Path, PathBuf};

use log::debug;
use walkdir::WalkDir;

use crate::config::{RunConfig, ToolEnvironment};
use crate::constants::STDERR_SIDECAR_SUFFIX;
use crate::error::ArchiveError;
use crate::models::{EntryInfo, PipelineEntry};
use crate::utils::archive::{ArchiveWriter, PostCompressor, StorageMode};
use crate::utils::collection_log::{CollectionLog, LogSink};
use crate::utils::pipeline::Pipeline;

/// One run's archive, log and settings, borrowed by every category collector.
///
/// Entry names passed to these methods are relative to the top-level
/// directory of the archive. Every outcome lands in the collection log; only
/// a failure of the container itself comes back as `Err`.
pub struct Collection<'a> {
    config: &'a RunConfig,
    archive: &'a mut ArchiveWriter,
    log: &'a mut CollectionLog,
}

impl<'a> Collection<'a> {
    pub fn new(config: &'a RunConfig, archive: &'a mut ArchiveWriter, log: &'a mut CollectionLog) -> Self {
        Self { config, archive, log }
    }

    pub fn config(&self) -> &RunConfig {
        self.config
    }

    pub fn tools(&self) -> &ToolEnvironment {
        &self.config.tools
    }

    pub fn log(&mut self) -> &mut CollectionLog {
        &mut *self.log
    }

    /// Path of a host file, resolved below the configured root.
    pub fn host_path(&self, relative: &str) -> PathBuf {
        self.config.host_path(relative)
    }

    /// Full archive name of an entry.
    pub fn entry_name(&self, relative: &str) -> String {
        format!("{}/{}", self.config.top_level, relative.trim_start_matches('/'))
    }

    fn post_compressor(&self) -> Option<PostCompressor> {
        PostCompressor::from_kind(self.config.collection.compressor)
    }

    /// Run a pipeline into an entry.
    ///
    /// Non-empty stderr is written to a `<entry>.stderr.txt` sidecar. A
    /// nonzero exit of the last stage adds a `FAIL(code)` line; the entry is
    /// kept either way.
    pub fn command(
        &mut self,
        relative: &str,
        pipeline: Pipeline,
        compress: bool,
    ) -> Result<Option<PipelineEntry>, ArchiveError> {
        let name = self.entry_name(relative);
        let post = if compress { self.post_compressor() } else { None };

        let written = self
            .archive
            .write_from_pipeline(&name, &pipeline, post, &self.config.tools, &mut *self.log)?;
        let written = match written {
            Some(written) => written,
            None => return Ok(None),
        };

        if written.outcome.has_stderr() {
            let sidecar = format!("{}{}", written.entry.name, STDERR_SIDECAR_SUFFIX);
            self.archive
                .write_text(&sidecar, &written.outcome.stderr_text(), None, &mut *self.log)?;
        }

        if !written.success() {
            let code = written.exit_code();
            self.log.fail(
                Some(code),
                format!("{}: `{}` exited with {}", written.entry.name, pipeline, code),
            );
        }

        Ok(Some(written))
    }

    /// Try a JSON-producing form of a tool and fall back to its text form.
    ///
    /// The fallback runs only when the JSON attempt exits nonzero, so an old
    /// tool without JSON support costs exactly one failure line. A tool that
    /// is missing entirely is not retried.
    pub fn json_or_text(
        &mut self,
        json_relative: &str,
        json: Pipeline,
        text_relative: &str,
        text: Pipeline,
    ) -> Result<Option<PipelineEntry>, ArchiveError> {
        match self.command(json_relative, json, false)? {
            Some(entry) if !entry.success() => {
                debug!("{} failed, falling back to {}", entry.entry.name, text_relative);
                self.command(text_relative, text, false)
            }
            other => Ok(other),
        }
    }

    /// Copy a host file into an entry.
    pub fn copy_file(&mut self, relative: &str, source: &Path) -> Result<Option<EntryInfo>, ArchiveError> {
        let name = self.entry_name(relative);
        self.archive.write_file(&name, source, None, &mut *self.log)
    }

    /// Copy a file below the collection root, e.g. `copy_host_file("kernel/version", "proc/version")`.
    pub fn copy_host_file(&mut self, relative: &str, host_relative: &str) -> Result<Option<EntryInfo>, ArchiveError> {
        let source = self.host_path(host_relative);
        self.copy_file(relative, &source)
    }

    /// Copy every regular file below `dir` into entries under `prefix`.
    ///
    /// Symlinks below the root are not followed, which keeps sysfs walks
    /// from looping back through the device tree. Returns the number of
    /// entries written.
    pub fn copy_tree(&mut self, prefix: &str, dir: &Path) -> Result<usize, ArchiveError> {
        if !dir.is_dir() {
            let name = self.entry_name(prefix);
            self.log.fail(None, format!("{}: source directory {} not found", name, dir.display()));
            return Ok(0);
        }

        let mut written = 0;
        let walker = WalkDir::new(dir)
            .follow_links(false)
            .sort_by(|a, b| a.file_name().cmp(b.file_name()));
        for entry in walker {
            let entry = match entry {
                Ok(entry) => entry,
                Err(e) => {
                    let name = self.entry_name(prefix);
                    self.log.fail(None, format!("{}: walk of {} failed: {}", name, dir.display(), e));
                    continue;
                }
            };
            if !entry.file_type().is_file() {
                continue;
            }

            let relative = match entry.path().strip_prefix(dir) {
                Ok(relative) => relative,
                Err(_) => continue,
            };
            let parts: Vec<String> = relative
                .components()
                .map(|c| c.as_os_str().to_string_lossy().into_owned())
                .collect();
            let name = format!("{}/{}", prefix.trim_end_matches('/'), parts.join("/"));
            if self.copy_file(&name, entry.path())?.is_some() {
                written += 1;
            }
        }
        Ok(written)
    }

    /// Write generated text into an entry.
    pub fn text(&mut self, relative: &str, text: &str) -> Result<Option<EntryInfo>, ArchiveError> {
        let name = self.entry_name(relative);
        self.archive.write_text(&name, text, None, &mut *self.log)
    }

    pub fn bytes(
        &mut self,
        relative: &str,
        data: &[u8],
        mode: Option<StorageMode>,
    ) -> Result<Option<EntryInfo>, ArchiveError> {
        let name = self.entry_name(relative);
        self.archive.write_bytes(&name, data, mode, &mut *self.log)
    }
}
