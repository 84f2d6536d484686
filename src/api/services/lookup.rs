use actix_web::error::{InternalError, QueryPayloadError};
use actix_web::{HttpRequest, HttpResponse, Responder, web};
use std::sync::Arc;
use std::time::Instant;
use tracing::{debug, error, trace, warn};

use super::types::{ErrorEnvelope, IpQuery, LookupResult, QueryOrigin, SuccessEnvelope};
use crate::errors::LookupError;
use crate::services::LookupEngine;
use crate::utils::{extract_client_ip, round_millis};

pub const MISSING_IP_MESSAGE: &str = "IP parameter is required. Usage: /lookup_ip?ip=x.x.x.x";
pub const INVALID_QUERY_MESSAGE: &str = "Invalid query string. Usage: /lookup_ip?ip=x.x.x.x";

/// Lookup Service
///
/// - `GET /lookup`：查询请求方自身的 IP
/// - `GET /lookup_ip?ip=` 与 `GET /lookup/{ip}`：查询指定 IP
pub struct LookupService;

impl LookupService {
    pub async fn lookup_client(
        req: HttpRequest,
        engine: web::Data<Arc<LookupEngine>>,
    ) -> impl Responder {
        let client_ip = extract_client_ip(&req);
        trace!("Implicit lookup for client {}", client_ip);

        Self::respond(&engine, &client_ip, |ip| QueryOrigin::ClientIp(ip.to_string())).await
    }

    pub async fn lookup_query(
        query: web::Query<IpQuery>,
        engine: web::Data<Arc<LookupEngine>>,
    ) -> impl Responder {
        Self::lookup_explicit(&engine, query.into_inner().ip).await
    }

    pub async fn lookup_path(
        path: web::Path<String>,
        engine: web::Data<Arc<LookupEngine>>,
    ) -> impl Responder {
        Self::lookup_explicit(&engine, Some(path.into_inner())).await
    }

    /// `GET /lookup/`：路径形式但没有 IP
    pub async fn lookup_path_missing(engine: web::Data<Arc<LookupEngine>>) -> impl Responder {
        Self::lookup_explicit(&engine, None).await
    }

    async fn lookup_explicit(engine: &Arc<LookupEngine>, ip: Option<String>) -> HttpResponse {
        let Some(ip) = ip.as_deref().map(str::trim).filter(|ip| !ip.is_empty()) else {
            debug!("Explicit lookup without ip parameter");
            return HttpResponse::BadRequest().json(ErrorEnvelope::new(MISSING_IP_MESSAGE));
        };

        Self::respond(engine, ip, |ip| QueryOrigin::QueriedIp(ip.to_string())).await
    }

    async fn respond(
        engine: &Arc<LookupEngine>,
        ip: &str,
        origin: impl FnOnce(&str) -> QueryOrigin,
    ) -> HttpResponse {
        let start = Instant::now();
        let result = engine.lookup(ip).await;
        let lookup_time_ms = round_millis(start.elapsed());

        let origin = origin(ip);
        match result {
            Ok(location) => HttpResponse::Ok().json(SuccessEnvelope::new(LookupResult {
                location,
                lookup_time_ms,
                origin,
            })),
            Err(e) => {
                let status = match &e {
                    LookupError::NotFound => {
                        debug!("IP {} not found in database", ip);
                        actix_web::http::StatusCode::NOT_FOUND
                    }
                    LookupError::InvalidAddress(_) => {
                        warn!("Lookup rejected: {}", e);
                        actix_web::http::StatusCode::INTERNAL_SERVER_ERROR
                    }
                    _ => {
                        error!("Lookup for {} failed: {}", ip, e);
                        actix_web::http::StatusCode::INTERNAL_SERVER_ERROR
                    }
                };

                let envelope = ErrorEnvelope::new(e.public_message()).with_ip(ip);
                let envelope = match origin {
                    QueryOrigin::ClientIp(_) => envelope.with_client_ip(ip),
                    QueryOrigin::QueriedIp(_) => envelope,
                };

                HttpResponse::build(status).json(envelope)
            }
        }
    }
}

/// 查询串解析失败（如重复的 ip 参数）时同样返回 JSON 信封
fn query_error_handler(err: QueryPayloadError, req: &HttpRequest) -> actix_web::Error {
    debug!("Rejected query string for {}: {}", req.path(), err);
    let response = HttpResponse::BadRequest().json(ErrorEnvelope::new(INVALID_QUERY_MESSAGE));
    InternalError::from_response(err, response).into()
}

/// Lookup 路由配置
pub fn lookup_routes() -> actix_web::Scope {
    web::scope("")
        .app_data(web::QueryConfig::default().error_handler(query_error_handler))
        .route("/lookup", web::get().to(LookupService::lookup_client))
        .route("/lookup/", web::get().to(LookupService::lookup_path_missing))
        .route("/lookup/{ip}", web::get().to(LookupService::lookup_path))
        .route("/lookup_ip", web::get().to(LookupService::lookup_query))
}
