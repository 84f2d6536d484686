use std::process::ExitCode;

use clap::Parser;
use tracing::error;

use geoip_api::cli::{Cli, Commands};
use geoip_api::config::StaticConfig;
use geoip_api::runtime::modes;
use geoip_api::system::init_logging;

#[actix_web::main]
async fn main() -> ExitCode {
    dotenvy::dotenv().ok();
    let cli = Cli::parse();

    // 打印示例配置不需要加载配置
    if let Some(Commands::Config { output }) = &cli.command {
        let command = Commands::Config {
            output: output.clone(),
        };
        return exit_with(modes::run_cli(command, &StaticConfig::default()).await);
    }

    let config = match StaticConfig::load(cli.config.as_deref()) {
        Ok(config) => config,
        Err(e) => {
            eprintln!("{}", e.format_colored());
            return ExitCode::FAILURE;
        }
    };

    match cli.command {
        None | Some(Commands::Serve) => {
            let _guard = match init_logging(&config.logging) {
                Ok(guard) => guard,
                Err(e) => {
                    eprintln!("{}", e.format_colored());
                    return ExitCode::FAILURE;
                }
            };

            if let Err(e) = modes::run_server(config).await {
                error!("Server error: {:#}", e);
                return ExitCode::FAILURE;
            }
            ExitCode::SUCCESS
        }
        Some(Commands::Refresh) => {
            // refresh 输出下载进度日志
            let _guard = init_logging(&config.logging).ok();
            exit_with(modes::run_cli(Commands::Refresh, &config).await)
        }
        Some(command) => exit_with(modes::run_cli(command, &config).await),
    }
}

fn exit_with(result: geoip_api::errors::Result<()>) -> ExitCode {
    match result {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("{}", e.format_colored());
            ExitCode::FAILURE
        }
    }
}
