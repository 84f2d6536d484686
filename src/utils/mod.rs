pub mod ip;

pub use ip::{extract_client_ip, resolve_client_ip};

/// 将毫秒耗时保留两位小数
pub fn round_millis(elapsed: std::time::Duration) -> f64 {
    (elapsed.as_secs_f64() * 1000.0 * 100.0).round() / 100.0
}
