//! 客户端 IP 提取
//!
//! 按固定优先级读取代理头，全部缺失时回退到 TCP 连接地址：
//! 1. `X-Forwarded-For`（逗号分隔，取第一个，去掉空白）
//! 2. `X-Real-IP`
//! 3. `CF-Connecting-IP`
//! 4. `X-Originating-IP`
//! 5. 连接对端地址（不含端口）
//!
//! 头部值不做格式校验，原样交给查询引擎，由引擎判断是否为合法 IP。

use std::borrow::Cow;
use std::net::SocketAddr;

use actix_web::HttpRequest;
use actix_web::http::header::HeaderMap;
use tracing::trace;

/// 代理头，按优先级排列
pub const FORWARDED_HEADERS: [&str; 4] = [
    "x-forwarded-for",
    "x-real-ip",
    "cf-connecting-ip",
    "x-originating-ip",
];

/// 从请求头和连接地址解析客户端 IP
///
/// 值为空（去掉空白后）的头部视为缺失；无法得知对端地址时返回空字符串
pub fn resolve_client_ip(headers: &HeaderMap, peer_addr: Option<SocketAddr>) -> String {
    if let Some((name, ip)) = extract_forwarded_ip_from_headers(headers) {
        trace!("Client IP {} taken from {}", ip, name);
        return ip;
    }

    peer_addr
        .map(|addr| addr.ip().to_string())
        .unwrap_or_default()
}

/// 从 HttpRequest 提取客户端 IP
pub fn extract_client_ip(req: &HttpRequest) -> String {
    resolve_client_ip(req.headers(), req.peer_addr())
}

/// 返回第一个有值的代理头及其 IP
pub fn extract_forwarded_ip_from_headers(headers: &HeaderMap) -> Option<(&'static str, String)> {
    FORWARDED_HEADERS.iter().find_map(|&name| {
        let raw = headers.get(name)?;
        let value = match raw.to_str() {
            Ok(value) => Cow::Borrowed(value),
            Err(_) => {
                trace!("Header {} is not visible ASCII, decoding lossily", name);
                String::from_utf8_lossy(raw.as_bytes())
            }
        };
        let candidate = if name == "x-forwarded-for" {
            value.split(',').next().unwrap_or_default()
        } else {
            &*value
        };
        let candidate = candidate.trim();
        (!candidate.is_empty()).then(|| (name, candidate.to_string()))
    })
}
