use log::debug;

/// Check if the process is running as root
pub fn is_root() -> bool {
    let euid = unsafe { libc::geteuid() };
    debug!("Effective uid {}", euid);
    euid == 0
}
