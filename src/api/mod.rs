//! HTTP API
//!
//! - `services`: 路由与请求处理
//! - `middleware`: Request ID 与耗时日志

pub mod middleware;
pub mod services;

use actix_web::web;

/// 注册全部路由
///
/// `/health` 必须先于根 scope 注册，否则会被 `lookup_routes` 吞掉
pub fn configure_routes(cfg: &mut web::ServiceConfig) {
    cfg.service(services::health_routes())
        .service(services::lookup_routes());
}
