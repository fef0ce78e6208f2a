//! PCI, USB and block device inventory.

use crate::collectors::context::Collection;
use crate::error::ArchiveError;
use crate::utils::pipeline::Pipeline;

pub fn collect(c: &mut Collection<'_>) -> Result<(), ArchiveError> {
    c.command("hardware/lspci.txt", Pipeline::cmd("lspci -vvnn"), false)?;
    c.command("hardware/lspci-tree.txt", Pipeline::cmd("lspci -tv"), false)?;
    c.command("hardware/lsusb.txt", Pipeline::cmd("lsusb -v"), false)?;
    c.command("hardware/lsusb-tree.txt", Pipeline::cmd("lsusb -t"), false)?;
    c.json_or_text(
        "hardware/lsblk.json",
        Pipeline::cmd("lsblk -J -O"),
        "hardware/lsblk.txt",
        Pipeline::cmd("lsblk -a"),
    )?;

    c.copy_host_file("hardware/cpuinfo", "proc/cpuinfo")?;
    c.copy_host_file("hardware/meminfo", "proc/meminfo")?;
    c.copy_host_file("hardware/interrupts", "proc/interrupts")?;
    c.copy_host_file("hardware/iomem", "proc/iomem")?;
    Ok(())
}
