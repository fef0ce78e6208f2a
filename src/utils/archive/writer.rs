use std::collections::HashSet;
use std::fs::{self, File, OpenOptions};
use std::io::{self, ErrorKind, Read, Seek, SeekFrom, Write};
use std::path::{Path, PathBuf};

use log::{debug, info};
use zip::write::FileOptions;
use zip::{ZipArchive, ZipWriter};

use crate::config::ToolEnvironment;
use crate::constants::{COPY_CHUNK_SIZE, ENTRY_PERMISSIONS};
use crate::error::{ArchiveError, PipelineError};
use crate::models::{EntryInfo, PipelineEntry};
use crate::utils::archive::storage::{PostCompressor, StorageMode};
use crate::utils::collection_log::LogSink;
use crate::utils::pipeline::Pipeline;

/// Writes named entries into a ZIP container, one at a time, in call order.
///
/// Each write seals its entry before returning and reports exactly one
/// outcome line to the given sink. Failures of a data source (missing file,
/// missing tool, unreadable pseudo-file) are logged and yield `Ok(None)`;
/// only failures writing the container itself are returned as errors.
pub struct ArchiveWriter {
    zip: ZipWriter<File>,
    path: PathBuf,
    names: HashSet<String>,
    buffer: Vec<u8>,
}

/// Bytes copied into an entry, and the source error that cut it short.
struct Copied {
    bytes: u64,
    source_error: Option<io::Error>,
}

impl ArchiveWriter {
    /// Create (or truncate) the container at `path`.
    pub fn create(path: &Path) -> Result<Self, ArchiveError> {
        let file = File::create(path).map_err(|source| ArchiveError::Open {
            path: path.to_path_buf(),
            source,
        })?;
        info!("Writing archive {}", path.display());
        Ok(Self::from_file(file, path))
    }

    /// Reopen a possibly incomplete container for a last entry.
    ///
    /// A container with a readable central directory (zip finalizes on drop,
    /// so an aborted writer leaves one) is reopened in append mode and keeps
    /// every entry already written. Otherwise whatever is in the file is kept
    /// as opaque bytes and a new container is started after it; ZIP readers
    /// locate the newest central directory from the end of the file.
    pub fn recover(path: &Path) -> Result<Self, ArchiveError> {
        let open_error = |source| ArchiveError::Open {
            path: path.to_path_buf(),
            source,
        };
        let open = || {
            OpenOptions::new()
                .read(true)
                .write(true)
                .create(true)
                .open(path)
                .map_err(open_error)
        };

        let mut file = open()?;
        if let Some(names) = existing_names(&mut file) {
            match ZipWriter::new_append(file) {
                Ok(zip) => {
                    debug!("Appending to archive {} ({} existing entries)", path.display(), names.len());
                    return Ok(Self {
                        zip,
                        path: path.to_path_buf(),
                        names,
                        buffer: vec![0u8; COPY_CHUNK_SIZE],
                    });
                }
                Err(e) => debug!("Cannot append to {}: {}", path.display(), e),
            }
            file = open()?;
        }

        let end = file.seek(SeekFrom::End(0)).map_err(open_error)?;
        debug!("Recovering archive {} at offset {}", path.display(), end);
        Ok(Self::from_file(file, path))
    }

    fn from_file(file: File, path: &Path) -> Self {
        Self {
            zip: ZipWriter::new(file),
            path: path.to_path_buf(),
            names: HashSet::new(),
            buffer: vec![0u8; COPY_CHUNK_SIZE],
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Whether an entry of this name was already written in this run.
    pub fn contains(&self, name: &str) -> bool {
        self.names.contains(name)
    }

    /// Write an in-memory text entry.
    pub fn write_text(
        &mut self,
        name: &str,
        text: &str,
        mode: Option<StorageMode>,
        sink: &mut dyn LogSink,
    ) -> Result<Option<EntryInfo>, ArchiveError> {
        self.write_bytes(name, text.as_bytes(), mode, sink)
    }

    /// Write an in-memory binary entry.
    pub fn write_bytes(
        &mut self,
        name: &str,
        data: &[u8],
        mode: Option<StorageMode>,
        sink: &mut dyn LogSink,
    ) -> Result<Option<EntryInfo>, ArchiveError> {
        let mode = StorageMode::resolve(name, mode);
        if !self.claim(name, sink) {
            return Ok(None);
        }

        let large = data.len() as u64 > u64::from(u32::MAX);
        self.start(name, mode, large)?;
        self.zip.write_all(data).map_err(|source| ArchiveError::Write {
            entry: name.to_string(),
            source,
        })?;

        let entry = EntryInfo {
            name: name.to_string(),
            bytes: data.len() as u64,
            mode,
        };
        sink.ok(entry.to_string());
        Ok(Some(entry))
    }

    /// Stream an existing file into an entry in bounded chunks.
    pub fn write_file(
        &mut self,
        name: &str,
        source: &Path,
        mode: Option<StorageMode>,
        sink: &mut dyn LogSink,
    ) -> Result<Option<EntryInfo>, ArchiveError> {
        let mode = StorageMode::resolve(name, mode);
        if self.contains(name) {
            sink.fail(None, format!("{}: duplicate entry name, not written", name));
            return Ok(None);
        }

        let mut file = match File::open(source) {
            Ok(file) => file,
            Err(e) if e.kind() == ErrorKind::NotFound => {
                sink.fail(None, format!("{}: source {} not found", name, source.display()));
                return Ok(None);
            }
            Err(e) => {
                sink.fail(None, format!("{}: cannot open {}: {}", name, source.display(), e));
                return Ok(None);
            }
        };

        self.names.insert(name.to_string());
        self.start(name, mode, true)?;
        let copied = self.copy_into(name, &mut file)?;

        let entry = EntryInfo {
            name: name.to_string(),
            bytes: copied.bytes,
            mode,
        };
        match copied.source_error {
            None => sink.ok(entry.to_string()),
            Some(e) => sink.fail(None, format!("{}: read of {} failed: {}", entry, source.display(), e)),
        }
        Ok(Some(entry))
    }

    /// Run a pipeline and stream its final output into an entry.
    ///
    /// With a post-compressor whose program is available, the compressor is
    /// appended as the last stage, its extension is added to the entry name,
    /// and the entry is stored rather than deflated a second time.
    pub fn write_from_pipeline(
        &mut self,
        name: &str,
        pipeline: &Pipeline,
        post: Option<PostCompressor>,
        tools: &ToolEnvironment,
        sink: &mut dyn LogSink,
    ) -> Result<Option<PipelineEntry>, ArchiveError> {
        let (name, pipeline, mode) = match post {
            Some(post) if tools.has_program(post.program) => (
                post.entry_name(name),
                pipeline.clone().pipe(post.command()),
                StorageMode::Stored,
            ),
            Some(post) => {
                debug!("{} not available, {} will be deflated", post.program, name);
                (name.to_string(), pipeline.clone(), StorageMode::for_entry_name(name))
            }
            None => (name.to_string(), pipeline.clone(), StorageMode::for_entry_name(name)),
        };

        if self.contains(&name) {
            sink.fail(None, format!("{}: duplicate entry name, not written", name));
            return Ok(None);
        }

        let mut running = match pipeline.spawn(tools) {
            Ok(running) => running,
            Err(PipelineError::MissingTool(tool)) => {
                sink.info(format!("{}: tool `{}` not available, skipped", name, tool));
                return Ok(None);
            }
            Err(e) => {
                sink.fail(None, format!("{}: {}", name, e));
                return Ok(None);
            }
        };

        self.names.insert(name.clone());
        self.start(&name, mode, true)?;
        let copied = self.copy_into(&name, &mut running)?;

        let entry = EntryInfo {
            name: name.clone(),
            bytes: copied.bytes,
            mode,
        };
        let outcome = running.wait();

        match copied.source_error {
            None => sink.ok(entry.to_string()),
            Some(e) => sink.fail(None, format!("{}: reading pipeline output failed: {}", entry, e)),
        }
        let total = outcome.stages.len();
        for (index, stage) in outcome.stages.iter().enumerate() {
            sink.info(format!(
                "{}: stage {}/{} exit {}: {}",
                name,
                index + 1,
                total,
                stage.status,
                stage.command
            ));
        }

        Ok(Some(PipelineEntry { entry, outcome }))
    }

    /// Finalize the container. Consumes the writer; nothing can be added after.
    pub fn finish(self) -> Result<PathBuf, ArchiveError> {
        let mut zip = self.zip;
        let mut file = zip.finish().map_err(ArchiveError::Finalize)?;
        file.flush().map_err(|source| ArchiveError::Write {
            entry: "<central directory>".to_string(),
            source,
        })?;
        let size = fs::metadata(&self.path).map(|m| m.len()).unwrap_or(0);
        info!("Archive {} finalized ({} entries, {} bytes)", self.path.display(), self.names.len(), size);
        Ok(self.path)
    }

    /// Reserve a name, logging a failure when it is already taken.
    fn claim(&mut self, name: &str, sink: &mut dyn LogSink) -> bool {
        if self.names.insert(name.to_string()) {
            true
        } else {
            sink.fail(None, format!("{}: duplicate entry name, not written", name));
            false
        }
    }

    fn start(&mut self, name: &str, mode: StorageMode, large: bool) -> Result<(), ArchiveError> {
        let options = FileOptions::default()
            .compression_method(mode.compression_method())
            .unix_permissions(ENTRY_PERMISSIONS)
            .large_file(large);
        self.zip.start_file(name, options).map_err(|source| ArchiveError::Entry {
            entry: name.to_string(),
            source,
        })
    }

    /// Copy a reader into the open entry in `COPY_CHUNK_SIZE` chunks.
    ///
    /// A read error ends the entry early and is handed back; a write error
    /// is an archive failure.
    fn copy_into(&mut self, name: &str, reader: &mut dyn Read) -> Result<Copied, ArchiveError> {
        let Self { zip, buffer, .. } = self;
        let mut bytes = 0u64;
        loop {
            let read = match reader.read(buffer) {
                Ok(0) => break,
                Ok(read) => read,
                Err(e) if e.kind() == ErrorKind::Interrupted => continue,
                Err(e) => {
                    return Ok(Copied {
                        bytes,
                        source_error: Some(e),
                    })
                }
            };
            zip.write_all(&buffer[..read]).map_err(|source| ArchiveError::Write {
                entry: name.to_string(),
                source,
            })?;
            bytes += read as u64;
        }
        Ok(Copied {
            bytes,
            source_error: None,
        })
    }
}

/// Entry names of an existing container, or `None` when it does not parse.
fn existing_names(file: &mut File) -> Option<HashSet<String>> {
    let archive = ZipArchive::new(&mut *file).ok()?;
    Some(archive.file_names().map(str::to_string).collect())
}
