//! systemd journal extracts.

use crate::collectors::context::Collection;
use crate::error::ArchiveError;
use crate::utils::pipeline::{CommandSpec, Pipeline};

pub fn collect(c: &mut Collection<'_>) -> Result<(), ArchiveError> {
    c.command("journal/list-boots.txt", Pipeline::cmd("journalctl --list-boots --no-pager"), false)?;
    c.command(
        "journal/boot.txt",
        Pipeline::cmd("journalctl -b --no-pager -o short-precise"),
        true,
    )?;
    c.command("journal/kernel.txt", Pipeline::cmd("journalctl -k -b --no-pager"), true)?;

    let since = c.config().collection.journal_since.clone();
    let units = c.config().collection.journal_units.clone();
    for unit in &units {
        let relative = format!("journal/units/{}.txt", unit.replace('/', "_"));
        let command = CommandSpec::new(
            "journalctl",
            ["-u", unit.as_str(), "--since", since.as_str(), "--no-pager"],
        );
        c.command(&relative, Pipeline::new(command), true)?;
    }
    Ok(())
}
