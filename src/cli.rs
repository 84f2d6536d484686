//! Command-line interface definitions using clap

use clap::{Parser, Subcommand};

/// geoip-api - IP geolocation HTTP API
#[derive(Parser)]
#[command(name = "geoip-api")]
#[command(version)]
#[command(
    about = "IP geolocation HTTP API backed by a self-refreshing GeoLite2 City database",
    long_about = None
)]
pub struct Cli {
    /// Path to the TOML configuration file (default: config.toml if present)
    #[arg(long, short = 'c', global = true)]
    pub config: Option<String>,

    #[command(subcommand)]
    pub command: Option<Commands>,
}

/// Available commands
#[derive(Subcommand, Debug, PartialEq)]
pub enum Commands {
    /// Run the HTTP server (default)
    Serve,

    /// Look up an IP address in the local database
    Lookup {
        /// IPv4 or IPv6 address
        ip: String,
    },

    /// Download the database once and replace the local copy
    Refresh,

    /// Show database file metadata and server status
    Status,

    /// Print a sample configuration
    Config {
        /// Write to this file instead of stdout
        #[arg(long, short = 'o')]
        output: Option<String>,
    },
}
