//! GeoIP 服务模块
//!
//! 提供基于本地数据库的 IP 地理位置查询：
//! - MaxMind GeoLite2 数据库格式
//! - 查询引擎（感知数据库文件替换）

mod engine;
mod maxmind;
mod provider;

pub use engine::LookupEngine;
pub use maxmind::{MaxMindDatabase, MaxMindFormat};
pub use provider::{DatabaseFormat, GeoDatabase, GeoLocation};
