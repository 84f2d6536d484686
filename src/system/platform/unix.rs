//! Unix/Linux platform implementation
//!
//! PID file management with process liveness checking.

use std::fs;
use std::io;
use std::path::Path;
use std::process;

use tracing::{debug, error, info};

use super::{PlatformOps, read_pid};

/// Unix platform operations implementation
pub struct UnixPlatform;

impl PlatformOps for UnixPlatform {
    fn init_lockfile(pid_file: &Path) -> io::Result<()> {
        if pid_file.exists() {
            match read_pid(pid_file) {
                Some(old_pid) => {
                    let current_pid = process::id();

                    // Docker container restart detection:
                    // If both current and old PID are 1, it's a container restart
                    if current_pid == 1 && old_pid == 1 {
                        info!("Container restart detected, removing old PID file");
                    } else if Self::is_process_alive(old_pid) {
                        error!(
                            "Server already running (PID {}), remove {} if this is wrong",
                            old_pid,
                            pid_file.display()
                        );
                        return Err(io::Error::new(
                            io::ErrorKind::AlreadyExists,
                            format!("server is already running with PID {}", old_pid),
                        ));
                    } else {
                        info!("Stale PID file detected, cleaning up...");
                    }
                }
                None => debug!("Corrupted PID file, overwriting"),
            }
            let _ = fs::remove_file(pid_file);
        }

        let pid = process::id();
        fs::write(pid_file, pid.to_string()).inspect_err(|e| {
            error!("Failed to write PID file {}: {}", pid_file.display(), e);
        })?;
        debug!("Server PID: {}", pid);

        Ok(())
    }

    fn cleanup_lockfile(pid_file: &Path) {
        if let Err(e) = fs::remove_file(pid_file) {
            error!("Failed to delete PID file: {}", e);
        } else {
            info!("PID file cleaned: {}", pid_file.display());
        }
    }

    fn is_process_alive(pid: u32) -> bool {
        use nix::sys::signal;
        use nix::unistd::Pid;

        let Ok(raw @ 1..) = i32::try_from(pid) else {
            return false;
        };
        // EPERM: 进程存在但属于其他用户
        matches!(
            signal::kill(Pid::from_raw(raw), None),
            Ok(()) | Err(nix::errno::Errno::EPERM)
        )
    }
}

/// Initialize the PID file
pub fn init_lockfile(pid_file: &Path) -> io::Result<()> {
    UnixPlatform::init_lockfile(pid_file)
}

/// Clean up the PID file
pub fn cleanup_lockfile(pid_file: &Path) {
    UnixPlatform::cleanup_lockfile(pid_file)
}

/// Check whether a process is running
pub fn is_process_alive(pid: u32) -> bool {
    UnixPlatform::is_process_alive(pid)
}
