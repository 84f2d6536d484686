//! GeoIP 数据库抽象层
//!
//! 查询引擎只依赖这两个 trait：
//! - `DatabaseFormat`：知道如何打开 / 校验某种格式的数据库文件
//! - `GeoDatabase`：已打开的数据库，回答单个 IP 的查询
//!
//! 生产环境使用 MaxMind 实现，测试可以提供自己的格式。

use std::net::IpAddr;
use std::path::Path;
use std::sync::Arc;

use serde::Serialize;

use crate::errors::LookupError;

/// 地理位置信息
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct GeoLocation {
    /// 城市名称（数据库没有城市级数据时为空）
    pub city: Option<String>,
    /// 国家名称
    pub country: Option<String>,
    pub latitude: Option<f64>,
    pub longitude: Option<f64>,
}

/// 已打开的数据库
pub trait GeoDatabase: Send + Sync {
    /// 查询 IP 地址
    ///
    /// `Ok(None)` 表示地址合法但数据库中没有记录
    fn locate(&self, ip: IpAddr) -> Result<Option<GeoLocation>, LookupError>;
}

/// 数据库文件格式
pub trait DatabaseFormat: Send + Sync {
    /// 打开数据库文件
    ///
    /// 返回的句柄持有自己的数据，正式路径随后被替换也不受影响
    fn open(&self, path: &Path) -> Result<Arc<dyn GeoDatabase>, LookupError>;

    /// 校验下载得到的内容是否为可用的数据库
    fn verify(&self, bytes: &[u8]) -> Result<(), LookupError>;

    /// 获取格式名称（用于日志）
    fn name(&self) -> &'static str;
}
