//! CLI mode
//!
//! One-shot commands that work on the local database without starting the
//! HTTP server.

use std::path::Path;

use colored::Colorize;

use crate::api::services::{LookupResult, QueryOrigin, SuccessEnvelope};
use crate::cli::Commands;
use crate::config::StaticConfig;
use crate::errors::{GeoIpApiError, LookupError, Result};
use crate::runtime::lifetime::Components;
use crate::services::RefreshOutcome;
use crate::system::platform::{is_process_alive, read_pid};
use crate::utils::round_millis;

/// Run CLI mode
///
/// `Serve` is handled by the caller; passing it here is a no-op.
pub async fn run_cli(command: Commands, config: &StaticConfig) -> Result<()> {
    match command {
        Commands::Serve => Ok(()),
        Commands::Lookup { ip } => lookup(config, &ip).await,
        Commands::Refresh => refresh(config).await,
        Commands::Status => status(config),
        Commands::Config { output } => print_config(output.as_deref()),
    }
}

async fn lookup(config: &StaticConfig, ip: &str) -> Result<()> {
    let components = Components::from_config(&config.database);

    let start = std::time::Instant::now();
    let location = components
        .engine
        .lookup(ip)
        .await
        .map_err(|e| match e {
            LookupError::NotFound => {
                GeoIpApiError::validation(format!("{} is not in the database", ip.trim()))
            }
            LookupError::InvalidAddress(msg) => GeoIpApiError::validation(msg),
            other => GeoIpApiError::invalid_database(other.to_string()),
        })?;

    let result = LookupResult {
        location,
        lookup_time_ms: round_millis(start.elapsed()),
        origin: QueryOrigin::QueriedIp(ip.trim().to_string()),
    };
    let json = serde_json::to_string_pretty(&SuccessEnvelope::new(result))?;
    println!("{}", json);
    Ok(())
}

async fn refresh(config: &StaticConfig) -> Result<()> {
    let components = Components::from_config(&config.database);
    println!(
        "{} {}",
        "Downloading".cyan().bold(),
        config.database.source_url
    );

    match components.scheduler.run_cycle().await {
        RefreshOutcome::Updated { bytes, .. } => {
            println!(
                "{} {} ({} bytes)",
                "Updated".green().bold(),
                components.store.current_path().display(),
                bytes
            );
            Ok(())
        }
        RefreshOutcome::Failed { stage, message } => Err(GeoIpApiError::download(format!(
            "refresh failed at {} stage: {}",
            stage, message
        ))),
    }
}

fn status(config: &StaticConfig) -> Result<()> {
    let components = Components::from_config(&config.database);
    let snapshot = components.store.snapshot();

    println!("{}", "Database".bold());
    println!("  path:     {}", components.store.current_path().display());
    if snapshot.present {
        println!("  present:  {}", "yes".green());
        if let Some(size) = snapshot.size_bytes {
            println!("  size:     {} bytes", size);
        }
        if let Some(modified) = snapshot.modified {
            println!("  modified: {}", modified.to_rfc3339());
        }
    } else {
        println!("  present:  {}", "no".red());
    }

    println!("{}", "Server".bold());
    let pid_file = Path::new(&config.server.pid_file);
    match read_pid(pid_file) {
        Some(pid) if is_process_alive(pid) => {
            println!("  status:   {} (PID {})", "running".green(), pid)
        }
        Some(pid) => println!("  status:   {} (stale PID {})", "stopped".yellow(), pid),
        None => println!("  status:   {}", "stopped".yellow()),
    }

    Ok(())
}

fn print_config(output: Option<&str>) -> Result<()> {
    match output {
        Some(path) => {
            StaticConfig::default().save_to_file(path)?;
            println!("{} {}", "Sample configuration written to".green(), path);
        }
        None => print!("{}", StaticConfig::generate_sample_config()),
    }
    Ok(())
}
