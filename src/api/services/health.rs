use actix_web::{HttpResponse, Responder, web};
use serde::Serialize;
use std::sync::Arc;
use tracing::{debug, trace, warn};

use super::types::SuccessEnvelope;
use crate::services::{RefreshScheduler, RefreshStatus};
use crate::storage::{DatabaseSnapshot, DatabaseStore};

// 应用启动时间结构体
#[derive(Clone, Debug)]
pub struct AppStartTime {
    pub start_datetime: chrono::DateTime<chrono::Utc>,
}

impl AppStartTime {
    pub fn now() -> Self {
        Self {
            start_datetime: chrono::Utc::now(),
        }
    }
}

#[derive(Debug, Serialize)]
pub struct HealthReport {
    pub status: &'static str,
    pub uptime_secs: u64,
    pub timestamp: String,
    pub database: DatabaseSnapshot,
    pub refresh: RefreshStatus,
}

/// Health Service
///
/// 数据库文件存在即视为健康；首次下载完成之前返回 503。
pub struct HealthService;

impl HealthService {
    pub async fn health_check(
        store: web::Data<Arc<DatabaseStore>>,
        scheduler: web::Data<Arc<RefreshScheduler>>,
        app_start_time: web::Data<AppStartTime>,
    ) -> impl Responder {
        trace!("Received health check request");

        let database = store.snapshot();
        let refresh = scheduler.status();
        let now = chrono::Utc::now();
        let uptime_secs = (now - app_start_time.start_datetime).num_seconds().max(0) as u64;

        let healthy = database.present;
        if healthy {
            debug!("Health check passed, uptime {}s", uptime_secs);
        } else {
            warn!("Health check: GeoIP database not available yet");
        }

        let report = HealthReport {
            status: if healthy { "healthy" } else { "unhealthy" },
            uptime_secs,
            timestamp: now.to_rfc3339(),
            database,
            refresh,
        };

        let mut envelope = SuccessEnvelope::new(report);
        envelope.success = healthy;

        let response_status = if healthy {
            actix_web::http::StatusCode::OK
        } else {
            actix_web::http::StatusCode::SERVICE_UNAVAILABLE
        };

        HttpResponse::build(response_status).json(envelope)
    }

    // 活跃性检查
    pub async fn liveness_check() -> impl Responder {
        trace!("Received liveness check request");

        HttpResponse::NoContent().finish()
    }
}

/// Health 路由配置
pub fn health_routes() -> actix_web::Scope {
    web::scope("/health")
        .route("", web::get().to(HealthService::health_check))
        .route("", web::head().to(HealthService::health_check))
        .route("/live", web::get().to(HealthService::liveness_check))
        .route("/live", web::head().to(HealthService::liveness_check))
}
