use std::path::Path;
use std::sync::Arc;

use anyhow::{Context, Result};
use tracing::{debug, info, warn};

use crate::config::{DatabaseConfig, StaticConfig};
use crate::services::{HttpFetcher, LookupEngine, MaxMindFormat, RefreshHandle, RefreshScheduler};
use crate::storage::DatabaseStore;

/// 数据库相关组件（Server 与 CLI 共用）
pub struct Components {
    pub store: Arc<DatabaseStore>,
    pub engine: Arc<LookupEngine>,
    pub scheduler: Arc<RefreshScheduler>,
}

impl Components {
    pub fn from_config(config: &DatabaseConfig) -> Self {
        let store = Arc::new(DatabaseStore::from_config(config));
        let engine = Arc::new(LookupEngine::from_config(config, store.clone()));
        let scheduler = Arc::new(RefreshScheduler::from_config(
            config,
            store.clone(),
            Arc::new(HttpFetcher::from_config(config)),
            Arc::new(MaxMindFormat),
        ));

        Self {
            store,
            engine,
            scheduler,
        }
    }
}

pub struct StartupContext {
    pub components: Components,
    pub refresh: Option<RefreshHandle>,
}

/// 准备服务器启动的上下文
///
/// 写入 PID 文件，构建查询引擎，并启动后台刷新任务
pub async fn prepare_server_startup(config: &StaticConfig) -> Result<StartupContext> {
    let start_time = std::time::Instant::now();
    debug!(
        "Starting pre-startup processing on {}...",
        crate::system::platform::platform_name()
    );

    crate::system::platform::init_lockfile(Path::new(&config.server.pid_file))
        .context("Failed to initialize PID file")?;

    let components = Components::from_config(&config.database);
    info!(
        "Using {} database at {}",
        components.engine.format_name(),
        components.store.current_path().display()
    );

    if !components.store.exists() {
        warn!(
            "GeoIP database not present yet, lookups will fail until the first download completes"
        );
    }

    let refresh = if config.database.refresh_enabled {
        Some(components.scheduler.clone().spawn())
    } else {
        warn!("GeoIP auto-update disabled, serving the local database as-is");
        None
    };

    debug!("Pre-startup processing completed in {:?}", start_time.elapsed());

    Ok(StartupContext {
        components,
        refresh,
    })
}
