//! Application runtime
//!
//! - `lifetime`: startup and shutdown
//! - `modes`: server and one-shot CLI commands

pub mod lifetime;
pub mod modes;
