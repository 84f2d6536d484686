//! Server mode
//!
//! Wires the lookup engine, refresh task and HTTP routes together and runs
//! the server until a shutdown signal arrives.

use actix_cors::Cors;
use actix_web::{
    App, HttpServer,
    middleware::{Compress, DefaultHeaders},
    web,
};
use anyhow::{Context, Result};
use std::path::Path;
use tracing::{error, warn};

use crate::api::configure_routes;
use crate::api::middleware::{RequestIdMiddleware, TimingMiddleware};
use crate::api::services::AppStartTime;
use crate::config::{CorsConfig, StaticConfig};
use crate::runtime::lifetime;

/// Validate CORS configuration at startup (runs once)
fn validate_cors_config(cors_config: &CorsConfig) {
    if cors_config.enabled && cors_config.allowed_origins.is_empty() {
        warn!(
            "CORS enabled but allowed_origins is empty. \
            No cross-origin requests will be allowed. \
            Use '[\"*\"]' for any origin."
        );
    }
}

/// Build CORS middleware from configuration
///
/// Lookups are read-only GETs, so only GET/HEAD/OPTIONS are allowed.
pub fn build_cors_middleware(cors_config: &CorsConfig) -> Cors {
    // 关闭时使用浏览器默认的同源策略
    if !cors_config.enabled {
        return Cors::default();
    }

    let mut cors = Cors::default();

    if cors_config.allowed_origins.iter().any(|o| o == "*") {
        cors = cors.allow_any_origin();
    } else {
        for origin in &cors_config.allowed_origins {
            cors = cors.allowed_origin(origin);
        }
    }

    cors.allowed_methods(vec!["GET", "HEAD", "OPTIONS"])
        .allow_any_header()
        .expose_headers(vec!["x-request-id"])
        .max_age(cors_config.max_age as usize)
}

/// Run the HTTP server
///
/// **Note**: Logging system must be initialized before calling this function
pub async fn run_server(config: StaticConfig) -> Result<()> {
    let app_start_time = AppStartTime::now();

    let startup = lifetime::startup::prepare_server_startup(&config)
        .await
        .inspect_err(|e| error!("Server startup failed: {:#}", e))?;

    let store = startup.components.store.clone();
    let engine = startup.components.engine.clone();
    let scheduler = startup.components.scheduler.clone();
    let pid_file = Path::new(&config.server.pid_file);

    let cpu_count = config.server.cpu_count.clamp(1, 32);
    warn!("Using {} CPU cores for the server", cpu_count);

    let cors_config = config.cors.clone();
    validate_cors_config(&cors_config);

    let bind_address = config.server.bind_address();

    let server = HttpServer::new(move || {
        let cors = build_cors_middleware(&cors_config);

        App::new()
            .wrap(TimingMiddleware) // 最外层，记录请求延迟
            .wrap(RequestIdMiddleware)
            .wrap(cors)
            .wrap(Compress::default())
            .app_data(web::Data::new(store.clone()))
            .app_data(web::Data::new(engine.clone()))
            .app_data(web::Data::new(scheduler.clone()))
            .app_data(web::Data::new(app_start_time.clone()))
            .wrap(
                DefaultHeaders::new()
                    .add(("Cache-Control", "no-cache, no-store, must-revalidate")),
            )
            .configure(configure_routes)
    })
    .keep_alive(std::time::Duration::from_secs(30))
    .client_request_timeout(std::time::Duration::from_millis(5000))
    .client_disconnect_timeout(std::time::Duration::from_millis(1000))
    .workers(cpu_count)
    .disable_signals();

    let server = match server.bind(&bind_address) {
        Ok(server) => server.run(),
        Err(e) => {
            lifetime::shutdown::perform_shutdown(None, startup.refresh, pid_file).await;
            return Err(e).with_context(|| format!("Failed to bind {}", bind_address));
        }
    };
    warn!("Starting server at http://{}", bind_address);

    let handle = server.handle();
    tokio::pin!(server);

    // Wait for server or shutdown signal
    let result = tokio::select! {
        res = &mut server => {
            res.context("HTTP server exited with error")
        }
        _ = lifetime::shutdown::listen_for_shutdown() => Ok(()),
    };

    lifetime::shutdown::perform_shutdown(Some(handle), startup.refresh, pid_file).await;
    result
}
