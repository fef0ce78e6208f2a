//! Xen hypervisor state, collected only on a control domain.

use std::fs;
use std::path::Path;

use log::debug;

use crate::collectors::context::Collection;
use crate::constants::XEN_CAPABILITIES_PATH;
use crate::error::ArchiveError;
use crate::utils::collection_log::LogSink;
use crate::utils::pipeline::{run_captured, Pipeline};

/// Capability token the hypervisor reports to dom0.
const CONTROL_DOMAIN_CAPABILITY: &str = "control_d";

pub fn collect(c: &mut Collection<'_>) -> Result<(), ArchiveError> {
    if !is_dom0(c) {
        let name = c.entry_name("xen");
        c.log().info(format!("{}: not a Xen control domain, skipped", name));
        return Ok(());
    }

    let name = c.entry_name("xen");
    c.log().info(format!("{}: Xen control domain detected", name));
    c.copy_host_file("xen/capabilities", XEN_CAPABILITIES_PATH)?;
    c.command("xen/xl-info.txt", Pipeline::cmd("xl info"), false)?;
    c.command("xen/xl-list.json", Pipeline::cmd("xl list -l"), false)?;
    c.command("xen/xl-vcpu-list.txt", Pipeline::cmd("xl vcpu-list"), false)?;
    c.command("xen/xl-dmesg.txt", Pipeline::cmd("xl dmesg"), true)?;
    Ok(())
}

/// Whether this host is dom0.
///
/// The capabilities file is authoritative. When it does not say so, a
/// successful `xl info` triggers one more read, since xenfs may only have
/// become readable once the toolstack touched it.
pub fn is_dom0(c: &Collection<'_>) -> bool {
    let capabilities = c.host_path(XEN_CAPABILITIES_PATH);
    if has_control_capability(&capabilities) {
        return true;
    }
    if !c.tools().has_program("xl") {
        return false;
    }

    match run_captured(&Pipeline::cmd("xl info"), c.tools()) {
        Ok((_, outcome)) if outcome.success() => has_control_capability(&capabilities),
        Ok((_, outcome)) => {
            debug!("xl info exited with {}", outcome.exit_code());
            false
        }
        Err(e) => {
            debug!("xl info failed: {}", e);
            false
        }
    }
}

fn has_control_capability(path: &Path) -> bool {
    match fs::read_to_string(path) {
        Ok(text) => text
            .split(|c: char| c == ',' || c.is_whitespace())
            .any(|token| token == CONTROL_DOMAIN_CAPABILITY),
        Err(_) => false,
    }
}
