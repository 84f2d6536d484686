//! HTTP 响应结构
//!
//! 成功：`{"success": true, "result": {...}}`
//! 失败：`{"success": false, "error": "...", ...上下文字段}`

use serde::{Deserialize, Serialize};

use crate::services::GeoLocation;

/// 成功响应
#[derive(Debug, Serialize)]
pub struct SuccessEnvelope<T: Serialize> {
    pub success: bool,
    pub result: T,
}

impl<T: Serialize> SuccessEnvelope<T> {
    pub fn new(result: T) -> Self {
        Self {
            success: true,
            result,
        }
    }
}

/// 失败响应
#[derive(Debug, Serialize)]
pub struct ErrorEnvelope {
    pub success: bool,
    pub error: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub ip: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub client_ip: Option<String>,
}

impl ErrorEnvelope {
    pub fn new(error: impl Into<String>) -> Self {
        Self {
            success: false,
            error: error.into(),
            ip: None,
            client_ip: None,
        }
    }

    pub fn with_ip(mut self, ip: &str) -> Self {
        self.ip = Some(ip.to_string());
        self
    }

    pub fn with_client_ip(mut self, ip: &str) -> Self {
        self.client_ip = Some(ip.to_string());
        self
    }
}

/// 查询的 IP 来源：客户端自身或显式指定
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum QueryOrigin {
    ClientIp(String),
    QueriedIp(String),
}

/// 查询结果
#[derive(Debug, Serialize)]
pub struct LookupResult {
    #[serde(flatten)]
    pub location: GeoLocation,
    pub lookup_time_ms: f64,
    #[serde(flatten)]
    pub origin: QueryOrigin,
}

/// `/lookup_ip?ip=` 查询参数
#[derive(Debug, Deserialize)]
pub struct IpQuery {
    pub ip: Option<String>,
}
