//! MaxMind GeoLite2 数据库实现
//!
//! 使用本地 MaxMind GeoLite2-City.mmdb 文件进行 IP 地理位置查询

use std::net::IpAddr;
use std::path::Path;
use std::sync::Arc;

use maxminddb::Reader;
use tracing::{debug, trace};

use super::provider::{DatabaseFormat, GeoDatabase, GeoLocation};
use crate::errors::LookupError;

/// 已打开的 MaxMind 数据库（文件内容完整读入内存）
pub struct MaxMindDatabase {
    reader: Reader<Vec<u8>>,
}

impl MaxMindDatabase {
    /// 从文件路径打开
    pub fn open(path: &Path) -> Result<Self, LookupError> {
        if !path.is_file() {
            return Err(LookupError::DatabaseUnavailable(format!(
                "database file {} does not exist",
                path.display()
            )));
        }

        let reader = Reader::open_readfile(path).map_err(|e| {
            LookupError::CorruptDatabase(format!("failed to open {}: {}", path.display(), e))
        })?;

        debug!(
            "Opened MaxMind database {} (type: {}, build epoch: {})",
            path.display(),
            reader.metadata.database_type,
            reader.metadata.build_epoch
        );

        Ok(Self { reader })
    }
}

impl GeoDatabase for MaxMindDatabase {
    fn locate(&self, ip: IpAddr) -> Result<Option<GeoLocation>, LookupError> {
        let result = self
            .reader
            .lookup(ip)
            .map_err(|e| LookupError::CorruptDatabase(format!("lookup of {} failed: {}", ip, e)))?;

        if !result.has_data() {
            return Ok(None);
        }

        let city: maxminddb::geoip2::City = match result.decode() {
            Ok(Some(city)) => city,
            Ok(None) => return Ok(None),
            Err(e) => {
                return Err(LookupError::CorruptDatabase(format!(
                    "failed to decode record for {}: {}",
                    ip, e
                )));
            }
        };

        let location = GeoLocation {
            city: city.city.names.english.map(String::from),
            country: city.country.names.english.map(String::from),
            latitude: city.location.latitude,
            longitude: city.location.longitude,
        };

        trace!(
            "MaxMind lookup for {}: country={:?}, city={:?}",
            ip, location.country, location.city
        );

        Ok(Some(location))
    }
}

/// MaxMind `.mmdb` 格式
#[derive(Debug, Clone, Copy, Default)]
pub struct MaxMindFormat;

impl DatabaseFormat for MaxMindFormat {
    fn open(&self, path: &Path) -> Result<Arc<dyn GeoDatabase>, LookupError> {
        Ok(Arc::new(MaxMindDatabase::open(path)?))
    }

    fn verify(&self, bytes: &[u8]) -> Result<(), LookupError> {
        let reader = Reader::from_source(bytes).map_err(|e| {
            LookupError::CorruptDatabase(format!(
                "downloaded file is not a MaxMind database: {}",
                e
            ))
        })?;

        debug!(
            "Verified MaxMind database (type: {}, build epoch: {}, node count: {})",
            reader.metadata.database_type,
            reader.metadata.build_epoch,
            reader.metadata.node_count
        );
        Ok(())
    }

    fn name(&self) -> &'static str {
        "MaxMind"
    }
}
