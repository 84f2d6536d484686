//! Service layer
//!
//! GeoIP lookup and database refresh logic shared by the HTTP API and the CLI.

pub mod geoip;
pub mod refresh;

pub use geoip::{DatabaseFormat, GeoDatabase, GeoLocation, LookupEngine, MaxMindFormat};
pub use refresh::{
    DatabaseFetcher, HttpFetcher, RefreshHandle, RefreshOutcome, RefreshScheduler, RefreshStage,
    RefreshStatus,
};
