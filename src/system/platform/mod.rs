//! Platform abstraction layer
//!
//! PID file handling differs between Unix/Linux and Windows:
//! - `unix.rs`: PID file with liveness check through `kill(pid, 0)`
//! - `windows.rs`: plain PID file, existing files are treated as stale
//!
//! Upper layers call the exported functions, which dispatch to the
//! implementation for the current platform.

#[cfg(unix)]
mod unix;
#[cfg(windows)]
mod windows;

#[cfg(unix)]
pub use unix::*;
#[cfg(windows)]
pub use windows::*;

use std::path::Path;

/// Platform operations trait
pub trait PlatformOps {
    /// Write the current PID to `pid_file`
    ///
    /// Fails with `AlreadyExists` when a live process already owns the file.
    fn init_lockfile(pid_file: &Path) -> std::io::Result<()>;

    /// Remove the PID file during shutdown
    fn cleanup_lockfile(pid_file: &Path);

    /// Whether a process with this PID is running
    fn is_process_alive(pid: u32) -> bool;
}

/// Read the PID stored in `pid_file`
pub fn read_pid(pid_file: &Path) -> Option<u32> {
    std::fs::read_to_string(pid_file)
        .ok()
        .and_then(|s| s.trim().parse().ok())
}

/// Get the platform name for logging/debugging
pub fn platform_name() -> &'static str {
    #[cfg(unix)]
    return "Unix/Linux";
    #[cfg(windows)]
    return "Windows";
}
