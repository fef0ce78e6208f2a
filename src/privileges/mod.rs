pub mod linux;

use log::{info, warn};

/// Check if the process is running with elevated privileges
pub fn is_elevated() -> bool {
    linux::is_root()
}

/// Get instructions for elevating privileges
pub fn get_elevation_instructions() -> &'static str {
    "Run as root, e.g. with sudo, so firmware tables and firewall state are readable"
}

/// Decide whether a run may start with the current privileges.
///
/// Without root most firmware and firewall data is unreadable, so the run
/// only goes ahead when the caller forces it.
pub fn check_privileges(force: bool) -> bool {
    if is_elevated() {
        info!("Running as root");
        return true;
    }
    if force {
        warn!("Not running as root, continuing because --force was given");
        warn!("Firmware, journal and firewall entries will likely be incomplete");
        return true;
    }
    false
}
