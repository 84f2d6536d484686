//! IP 查询引擎
//!
//! 每次查询都先检查正式路径当前指向的文件：
//! - `cache_reader = false`：每次调用重新打开数据库，查询结束即释放
//! - `cache_reader = true`：缓存已打开的数据库，store generation 或文件身份戳
//!   变化时重新打开
//!
//! 两种模式下，`replace` 完成之后开始的查询都只会看到新文件；
//! 已经在进行中的查询持有旧数据库的 `Arc`，不受 rename 影响。

use std::net::IpAddr;
use std::sync::Arc;

use arc_swap::ArcSwapOption;
use tracing::{debug, trace, warn};

use super::maxmind::MaxMindFormat;
use super::provider::{DatabaseFormat, GeoDatabase, GeoLocation};
use crate::config::DatabaseConfig;
use crate::errors::LookupError;
use crate::storage::{DatabaseStore, FileStamp};

struct CachedDatabase {
    generation: u64,
    stamp: FileStamp,
    database: Arc<dyn GeoDatabase>,
}

pub struct LookupEngine {
    store: Arc<DatabaseStore>,
    format: Arc<dyn DatabaseFormat>,
    cache_reader: bool,
    cached: ArcSwapOption<CachedDatabase>,
}

impl LookupEngine {
    pub fn new(
        store: Arc<DatabaseStore>,
        format: Arc<dyn DatabaseFormat>,
        cache_reader: bool,
    ) -> Self {
        Self {
            store,
            format,
            cache_reader,
            cached: ArcSwapOption::empty(),
        }
    }

    /// 使用 MaxMind 格式创建
    pub fn from_config(config: &DatabaseConfig, store: Arc<DatabaseStore>) -> Self {
        Self::new(store, Arc::new(MaxMindFormat), config.cache_reader)
    }

    pub fn format_name(&self) -> &'static str {
        self.format.name()
    }

    /// 查询 IP 地址（阻塞）
    pub fn resolve(&self, ip: &str) -> Result<GeoLocation, LookupError> {
        let addr = parse_ip(ip)?;
        let database = self.acquire()?;

        match database.locate(addr)? {
            Some(location) => Ok(location),
            None => {
                trace!("{} not found in database", addr);
                Err(LookupError::NotFound)
            }
        }
    }

    /// 查询 IP 地址（异步包装）
    ///
    /// 文件读取与解码在 blocking 线程池中执行，只阻塞当前请求
    pub async fn lookup(self: &Arc<Self>, ip: &str) -> Result<GeoLocation, LookupError> {
        let engine = Arc::clone(self);
        let ip = ip.to_string();

        tokio::task::spawn_blocking(move || engine.resolve(&ip))
            .await
            .unwrap_or_else(|e| {
                warn!("GeoIP spawn_blocking failed: {}", e);
                Err(LookupError::Internal(format!("lookup task failed: {}", e)))
            })
    }

    /// 获取当前数据库句柄
    fn acquire(&self) -> Result<Arc<dyn GeoDatabase>, LookupError> {
        let path = self.store.current_path();
        let generation = self.store.generation();

        let stamp = FileStamp::read(path).map_err(|e| {
            if e.kind() == std::io::ErrorKind::NotFound {
                LookupError::DatabaseUnavailable(format!(
                    "database file {} does not exist",
                    path.display()
                ))
            } else {
                LookupError::Internal(format!("failed to stat {}: {}", path.display(), e))
            }
        })?;

        if !self.cache_reader {
            return self.format.open(path);
        }

        if let Some(cached) = self.cached.load().as_ref()
            && cached.generation == generation
            && cached.stamp == stamp
        {
            return Ok(Arc::clone(&cached.database));
        }

        debug!(
            "Opening {} database {} (generation {})",
            self.format.name(),
            path.display(),
            generation
        );
        let database = self.format.open(path)?;
        self.cached.store(Some(Arc::new(CachedDatabase {
            generation,
            stamp,
            database: Arc::clone(&database),
        })));

        Ok(database)
    }
}

fn parse_ip(ip: &str) -> Result<IpAddr, LookupError> {
    ip.trim()
        .parse::<IpAddr>()
        .map_err(|_| LookupError::invalid_address(ip))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;
    use std::path::Path;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use tempfile::TempDir;

    /// 测试格式：每行 `ip city`
    #[derive(Default)]
    struct LineFormat {
        opens: AtomicUsize,
    }

    struct LineDatabase(HashMap<IpAddr, String>);

    impl GeoDatabase for LineDatabase {
        fn locate(&self, ip: IpAddr) -> Result<Option<GeoLocation>, LookupError> {
            Ok(self.0.get(&ip).map(|city| GeoLocation {
                city: Some(city.clone()),
                country: None,
                latitude: Some(1.0),
                longitude: Some(2.0),
            }))
        }
    }

    impl DatabaseFormat for LineFormat {
        fn open(&self, path: &Path) -> Result<Arc<dyn GeoDatabase>, LookupError> {
            self.opens.fetch_add(1, Ordering::SeqCst);
            let text = std::fs::read_to_string(path)
                .map_err(|e| LookupError::DatabaseUnavailable(e.to_string()))?;
            let mut map = HashMap::new();
            for line in text.lines() {
                let (ip, city) = line
                    .split_once(' ')
                    .ok_or_else(|| LookupError::CorruptDatabase(line.to_string()))?;
                let ip: IpAddr = ip
                    .parse()
                    .map_err(|_| LookupError::CorruptDatabase(line.to_string()))?;
                map.insert(ip, city.to_string());
            }
            Ok(Arc::new(LineDatabase(map)))
        }

        fn verify(&self, _bytes: &[u8]) -> Result<(), LookupError> {
            Ok(())
        }

        fn name(&self) -> &'static str {
            "line"
        }
    }

    fn engine(
        dir: &TempDir,
        cache_reader: bool,
    ) -> (Arc<DatabaseStore>, Arc<LineFormat>, LookupEngine) {
        let store = Arc::new(DatabaseStore::new(dir.path().join("db.txt")));
        let format = Arc::new(LineFormat::default());
        let engine = LookupEngine::new(store.clone(), format.clone(), cache_reader);
        (store, format, engine)
    }

    #[test]
    fn test_resolve_without_database_is_unavailable() {
        let dir = TempDir::new().unwrap();
        let (_, _, engine) = engine(&dir, true);
        assert!(matches!(
            engine.resolve("8.8.8.8"),
            Err(LookupError::DatabaseUnavailable(_))
        ));
    }

    #[test]
    fn test_resolve_invalid_address_before_touching_database() {
        let dir = TempDir::new().unwrap();
        let (_, format, engine) = engine(&dir, true);
        assert!(matches!(
            engine.resolve("not-an-ip"),
            Err(LookupError::InvalidAddress(_))
        ));
        assert_eq!(format.opens.load(Ordering::SeqCst), 0);
    }

    #[test]
    fn test_resolve_trims_whitespace() {
        let dir = TempDir::new().unwrap();
        let (store, _, engine) = engine(&dir, true);
        store.replace(b"1.2.3.4 Hanoi").unwrap();
        let location = engine.resolve(" 1.2.3.4 ").unwrap();
        assert_eq!(location.city.as_deref(), Some("Hanoi"));
    }

    #[test]
    fn test_cached_reader_is_reused_until_replace() {
        let dir = TempDir::new().unwrap();
        let (store, format, engine) = engine(&dir, true);
        store.replace(b"1.2.3.4 Hanoi").unwrap();

        engine.resolve("1.2.3.4").unwrap();
        engine.resolve("1.2.3.4").unwrap();
        assert_eq!(format.opens.load(Ordering::SeqCst), 1);

        store.replace(b"1.2.3.4 Saigon").unwrap();
        let location = engine.resolve("1.2.3.4").unwrap();
        assert_eq!(location.city.as_deref(), Some("Saigon"));
        assert_eq!(format.opens.load(Ordering::SeqCst), 2);
    }

    #[test]
    fn test_uncached_reader_opens_every_call() {
        let dir = TempDir::new().unwrap();
        let (store, format, engine) = engine(&dir, false);
        store.replace(b"1.2.3.4 Hanoi").unwrap();

        engine.resolve("1.2.3.4").unwrap();
        assert!(engine.resolve("5.6.7.8").unwrap_err().is_not_found());
        assert_eq!(format.opens.load(Ordering::SeqCst), 2);
    }

    #[test]
    fn test_external_replacement_is_detected() {
        let dir = TempDir::new().unwrap();
        let (store, _, engine) = engine(&dir, true);
        store.replace(b"1.2.3.4 Hanoi").unwrap();
        engine.resolve("1.2.3.4").unwrap();

        // 绕过 store 直接写文件（generation 不变），依靠文件身份戳发现变化
        std::fs::write(store.current_path(), b"1.2.3.4 Da Nang City").unwrap();
        let location = engine.resolve("1.2.3.4").unwrap();
        assert_eq!(location.city.as_deref(), Some("Da Nang City"));
    }

    #[test]
    fn test_deleted_database_is_not_served_from_cache() {
        let dir = TempDir::new().unwrap();
        let (store, _, engine) = engine(&dir, true);
        store.replace(b"1.2.3.4 Hanoi").unwrap();
        engine.resolve("1.2.3.4").unwrap();

        std::fs::remove_file(store.current_path()).unwrap();
        assert!(matches!(
            engine.resolve("1.2.3.4"),
            Err(LookupError::DatabaseUnavailable(_))
        ));
    }

    #[tokio::test]
    async fn test_async_lookup() {
        let dir = TempDir::new().unwrap();
        let (store, _, engine) = engine(&dir, true);
        store.replace(b"9.9.9.9 Zurich").unwrap();

        let engine = Arc::new(engine);
        let location = engine.lookup("9.9.9.9").await.unwrap();
        assert_eq!(location.city.as_deref(), Some("Zurich"));
    }
}
