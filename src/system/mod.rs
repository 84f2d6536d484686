//! System-level modules
//!
//! - Logging initialization
//! - Platform abstraction (PID file handling)

pub mod logging;
pub mod platform;

pub use logging::init_logging;
