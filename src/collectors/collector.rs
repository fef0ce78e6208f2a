use std::path::PathBuf;

use chrono::Utc;
use log::{error, info, warn};
use uuid::Uuid;

use crate::collectors::context::Collection;
use crate::collectors::{firmware, hardware, journal, kernel, network, system, xen};
use crate::config::{Category, RunConfig};
use crate::constants::{COLLECTION_LOG_NAME, RECOVERED_LOG_NAME};
use crate::error::{ArchiveError, CollectionError};
use crate::utils::archive::ArchiveWriter;
use crate::utils::collection_log::{CollectionLog, LogSink, LogTag, NullSink};

/// What a finished run produced.
#[derive(Debug, Clone)]
pub struct RunSummary {
    pub archive: PathBuf,
    pub log_lines: usize,
    pub failures: usize,
}

/// Collect every enabled category into the configured archive.
///
/// Per-step failures are recorded in the collection log and never stop the
/// run. An archive error does: the partial archive is then re-opened and the
/// log, with a final FATAL line, is appended before the error is returned.
pub fn run(config: &RunConfig) -> Result<RunSummary, CollectionError> {
    let mut log = CollectionLog::new();
    match collect_into_archive(config, &mut log) {
        Ok(archive) => {
            let failures = log.count(|tag| matches!(tag, LogTag::Fail(_)));
            info!(
                "Collection finished: {} ({} log lines, {} failures)",
                archive.display(),
                log.len(),
                failures
            );
            Ok(RunSummary {
                archive,
                log_lines: log.len(),
                failures,
            })
        }
        Err(e) => {
            error!("Collection aborted: {}", e);
            match recover_archive(config, &log, &e) {
                Ok(()) => warn!("Partial archive {} sealed with the collection log", config.output.display()),
                Err(recovery) => warn!("Could not record the failure in {}: {}", config.output.display(), recovery),
            }
            Err(e)
        }
    }
}

fn collect_into_archive(config: &RunConfig, log: &mut CollectionLog) -> Result<PathBuf, CollectionError> {
    let mut archive = ArchiveWriter::create(&config.output)?;
    log_header(config, log);

    {
        let mut collection = Collection::new(config, &mut archive, log);
        for category in Category::ALL {
            if !config.collection.categories.is_enabled(category) {
                collection.log().skip(format!("{}: disabled by request", category));
                continue;
            }
            info!("Collecting {}", category);
            collect_category(&mut collection, category)?;
        }
    }

    archive.write_text(&log_entry_name(config), &log.render(), None, &mut NullSink)?;
    Ok(archive.finish()?)
}

fn collect_category(collection: &mut Collection<'_>, category: Category) -> Result<(), ArchiveError> {
    match category {
        Category::System => system::collect(collection),
        Category::Hardware => hardware::collect(collection),
        Category::Firmware => firmware::collect(collection),
        Category::Kernel => kernel::collect(collection),
        Category::Network => network::collect(collection),
        Category::Journal => journal::collect(collection),
        Category::Xen => xen::collect(collection),
    }
}

fn log_header(config: &RunConfig, log: &mut CollectionLog) {
    let host = hostname::get()
        .map(|h| h.to_string_lossy().into_owned())
        .unwrap_or_else(|_| "unknown".to_string());

    log.info(format!("{} {}", env!("CARGO_PKG_NAME"), env!("CARGO_PKG_VERSION")));
    log.info(format!("collection id {}", Uuid::new_v4()));
    log.info(format!("host {}", host));
    log.info(format!("started {}", Utc::now().format("%Y-%m-%dT%H:%M:%SZ")));
    log.info(format!("root {}", config.sysroot.display()));
}

fn log_entry_name(config: &RunConfig) -> String {
    format!("{}/{}", config.top_level, COLLECTION_LOG_NAME)
}

/// Append the log and a FATAL line to a partially written archive.
fn recover_archive(config: &RunConfig, log: &CollectionLog, cause: &CollectionError) -> Result<(), ArchiveError> {
    let mut archive = ArchiveWriter::recover(&config.output)?;
    let mut name = log_entry_name(config);
    // the fatal error may have struck while the log itself was being written
    if archive.contains(&name) {
        name = format!("{}/{}", config.top_level, RECOVERED_LOG_NAME);
    }
    archive.write_text(&name, &log.render_with_fatal(cause), None, &mut NullSink)?;
    archive.finish()?;
    Ok(())
}
