//! Windows platform implementation
//!
//! Simplified PID file handling: without signal support an existing file
//! cannot be checked, so it is assumed stale and replaced.

use std::fs;
use std::io;
use std::path::Path;

use tracing::{error, info, warn};

use super::PlatformOps;

/// Windows platform operations implementation
pub struct WindowsPlatform;

impl PlatformOps for WindowsPlatform {
    fn init_lockfile(pid_file: &Path) -> io::Result<()> {
        if pid_file.exists() {
            warn!(
                "PID file {} exists, assuming stale (process check unsupported)",
                pid_file.display()
            );
            let _ = fs::remove_file(pid_file);
        }

        fs::write(pid_file, std::process::id().to_string()).inspect_err(|e| {
            error!("Failed to create PID file: {}", e);
        })
    }

    fn cleanup_lockfile(pid_file: &Path) {
        if let Err(e) = fs::remove_file(pid_file) {
            error!("Failed to delete PID file: {}", e);
        } else {
            info!("PID file cleaned: {}", pid_file.display());
        }
    }

    fn is_process_alive(pid: u32) -> bool {
        pid == std::process::id()
    }
}

/// Initialize the PID file
pub fn init_lockfile(pid_file: &Path) -> io::Result<()> {
    WindowsPlatform::init_lockfile(pid_file)
}

/// Clean up the PID file
pub fn cleanup_lockfile(pid_file: &Path) {
    WindowsPlatform::cleanup_lockfile(pid_file)
}

/// Check whether a process is running
pub fn is_process_alive(pid: u32) -> bool {
    WindowsPlatform::is_process_alive(pid)
}
