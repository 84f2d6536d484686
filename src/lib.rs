//! geoip-api - IP geolocation HTTP API
//!
//! Serves city / country / coordinate lookups from a local GeoLite2 City
//! database that a background task refreshes and swaps in atomically.
//!
//! # Architecture
//! - `storage`: database file with atomic replace
//! - `services`: lookup engine and refresh scheduler
//! - `api`: HTTP handlers and middleware
//! - `config`: configuration loading
//! - `runtime`: application lifecycle and execution modes
//! - `system`: logging and platform utilities

pub mod api;
pub mod cli;
pub mod config;
pub mod errors;
pub mod runtime;
pub mod services;
pub mod storage;
pub mod system;
pub mod utils;
