//! Host identity and resource usage.

use crate::collectors::context::Collection;
use crate::error::ArchiveError;
use crate::utils::pipeline::Pipeline;

pub fn collect(c: &mut Collection<'_>) -> Result<(), ArchiveError> {
    c.command("system/uname.txt", Pipeline::cmd("uname -a"), false)?;
    c.command("system/hostnamectl.txt", Pipeline::cmd("hostnamectl"), false)?;
    c.command("system/uptime.txt", Pipeline::cmd("uptime"), false)?;
    c.json_or_text(
        "system/lscpu.json",
        Pipeline::cmd("lscpu -J"),
        "system/lscpu.txt",
        Pipeline::cmd("lscpu"),
    )?;
    c.command("system/free.txt", Pipeline::cmd("free -b"), false)?;
    c.command("system/df.txt", Pipeline::cmd("df -h"), false)?;
    c.command("system/systemctl-failed.txt", Pipeline::cmd("systemctl --failed --no-pager"), false)?;

    c.copy_host_file("system/os-release", "etc/os-release")?;
    c.copy_host_file("system/loadavg", "proc/loadavg")?;
    c.copy_host_file("system/mounts", "proc/mounts")?;
    Ok(())
}
