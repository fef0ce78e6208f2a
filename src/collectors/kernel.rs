//! Kernel ring buffer, modules and tunables.

use crate::collectors::context::Collection;
use crate::error::ArchiveError;
use crate::utils::pipeline::{CommandSpec, Pipeline};

pub fn collect(c: &mut Collection<'_>) -> Result<(), ArchiveError> {
    c.command("kernel/dmesg.txt", Pipeline::cmd("dmesg"), true)?;
    c.command("kernel/lsmod.txt", Pipeline::cmd("lsmod"), false)?;
    // sysctl walks in kernel order; sort for stable diffs between hosts
    c.command(
        "kernel/sysctl.txt",
        Pipeline::cmd("sysctl -a").pipe(CommandSpec::new("sort", Vec::<String>::new())),
        false,
    )?;

    c.copy_host_file("kernel/version", "proc/version")?;
    c.copy_host_file("kernel/cmdline", "proc/cmdline")?;
    c.copy_host_file("kernel/modules", "proc/modules")?;
    c.copy_host_file("kernel/config.gz", "proc/config.gz")?;
    Ok(())
}
