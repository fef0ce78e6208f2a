//! DMI/SMBIOS and ACPI firmware tables.

use std::fs;
use std::path::PathBuf;

use log::debug;
use uuid::Uuid;

use crate::collectors::context::Collection;
use crate::error::ArchiveError;
use crate::utils::archive::StorageMode;
use crate::utils::collection_log::LogSink;
use crate::utils::pipeline::{run_captured, CommandSpec, Pipeline};
use crate::utils::smbios;

const SMBIOS_DUMP_ENTRY: &str = "firmware/smbios.bin";

pub fn collect(c: &mut Collection<'_>) -> Result<(), ArchiveError> {
    c.command("firmware/dmidecode.txt", Pipeline::cmd("dmidecode"), false)?;
    collect_smbios_dump(c)?;

    let dmi_id = c.host_path("sys/class/dmi/id");
    c.copy_tree("firmware/dmi-id", &dmi_id)?;
    let acpi = c.host_path("sys/firmware/acpi/tables");
    c.copy_tree("firmware/acpi", &acpi)?;

    c.command("firmware/efibootmgr.txt", Pipeline::cmd("efibootmgr -v"), false)?;
    Ok(())
}

/// Raw SMBIOS image in `dmidecode --dump-bin` layout.
///
/// dmidecode produces it when present; otherwise the image is rebuilt from
/// the sysfs entry point and table.
fn collect_smbios_dump(c: &mut Collection<'_>) -> Result<(), ArchiveError> {
    if let Some(dump) = dump_with_dmidecode(c) {
        let written = c.copy_file(SMBIOS_DUMP_ENTRY, &dump);
        if let Err(e) = fs::remove_file(&dump) {
            debug!("Failed to remove {}: {}", dump.display(), e);
        }
        return written.map(|_| ());
    }

    let root = c.config().sysroot.clone();
    match smbios::load_sysfs_dump(&root) {
        Ok(image) => {
            let name = c.entry_name(SMBIOS_DUMP_ENTRY);
            c.log().info(format!("{}: synthesized from sysfs tables", name));
            c.bytes(SMBIOS_DUMP_ENTRY, &image, Some(StorageMode::Deflated))?;
        }
        Err(e) => {
            let name = c.entry_name(SMBIOS_DUMP_ENTRY);
            c.log().fail(None, format!("{}: cannot synthesize SMBIOS dump: {}", name, e));
        }
    }
    Ok(())
}

/// Run `dmidecode --dump-bin` into a scratch file, returning its path on success.
fn dump_with_dmidecode(c: &mut Collection<'_>) -> Option<PathBuf> {
    if !c.tools().has_program("dmidecode") {
        return None;
    }

    let scratch = c.config().scratch_dir.join(format!("diag-smbios-{}.bin", Uuid::new_v4()));
    let pipeline = Pipeline::new(CommandSpec::new(
        "dmidecode",
        ["--dump-bin".to_string(), scratch.to_string_lossy().into_owned()],
    ));

    let name = c.entry_name(SMBIOS_DUMP_ENTRY);
    match run_captured(&pipeline, c.tools()) {
        Ok((_, outcome)) if outcome.success() && scratch.is_file() => Some(scratch),
        Ok((_, outcome)) => {
            c.log().info(format!(
                "{}: `{}` exited with {}, falling back to sysfs",
                name,
                pipeline,
                outcome.exit_code()
            ));
            let _ = fs::remove_file(&scratch);
            None
        }
        Err(e) => {
            c.log().info(format!("{}: {}, falling back to sysfs", name, e));
            None
        }
    }
}
