//! 数据库后台刷新任务
//!
//! 启动时立即执行一次，之后按固定间隔循环：下载 → 校验 → 原子替换。
//! 任何阶段失败只记录日志，继续等待下一个周期，不会影响正在服务的数据库。

use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, Utc};
use parking_lot::RwLock;
use serde::Serialize;
use strum::{AsRefStr, Display};
use tokio::task::JoinHandle;
use tokio::time::{Instant, MissedTickBehavior};
use tracing::{debug, error, info, warn};

use super::fetcher::DatabaseFetcher;
use crate::config::DatabaseConfig;
use crate::services::geoip::DatabaseFormat;
use crate::storage::DatabaseStore;

/// 刷新失败的阶段
#[derive(Debug, Clone, Copy, PartialEq, Eq, AsRefStr, Display)]
#[strum(serialize_all = "lowercase")]
pub enum RefreshStage {
    Fetch,
    Verify,
    Replace,
}

/// 单个刷新周期的结果
#[derive(Debug, Clone, PartialEq)]
pub enum RefreshOutcome {
    Updated { bytes: u64, generation: u64 },
    Failed { stage: RefreshStage, message: String },
}

impl RefreshOutcome {
    pub fn is_updated(&self) -> bool {
        matches!(self, RefreshOutcome::Updated { .. })
    }
}

/// 刷新状态快照（供 health 接口展示）
#[derive(Debug, Clone, Default, Serialize)]
pub struct RefreshStatus {
    pub enabled: bool,
    pub interval_secs: u64,
    pub cycles: u64,
    pub last_attempt: Option<DateTime<Utc>>,
    pub last_success: Option<DateTime<Utc>>,
    pub last_error: Option<String>,
}

/// 后台刷新调度器
pub struct RefreshScheduler {
    store: Arc<DatabaseStore>,
    fetcher: Arc<dyn DatabaseFetcher>,
    format: Arc<dyn DatabaseFormat>,
    interval: Duration,
    run_on_startup: bool,
    status: RwLock<RefreshStatus>,
}

impl RefreshScheduler {
    pub fn new(
        store: Arc<DatabaseStore>,
        fetcher: Arc<dyn DatabaseFetcher>,
        format: Arc<dyn DatabaseFormat>,
        interval: Duration,
        run_on_startup: bool,
    ) -> Self {
        let status = RefreshStatus {
            interval_secs: interval.as_secs(),
            ..Default::default()
        };

        Self {
            store,
            fetcher,
            format,
            interval,
            run_on_startup,
            status: RwLock::new(status),
        }
    }

    pub fn from_config(
        config: &DatabaseConfig,
        store: Arc<DatabaseStore>,
        fetcher: Arc<dyn DatabaseFetcher>,
        format: Arc<dyn DatabaseFormat>,
    ) -> Self {
        Self::new(
            store,
            fetcher,
            format,
            config.refresh_interval(),
            config.refresh_on_startup,
        )
    }

    pub fn interval(&self) -> Duration {
        self.interval
    }

    pub fn status(&self) -> RefreshStatus {
        self.status.read().clone()
    }

    /// 执行一个刷新周期
    ///
    /// 错误在周期边界被吸收，不会向外传播
    pub async fn run_cycle(&self) -> RefreshOutcome {
        let started = std::time::Instant::now();
        let attempt_at = Utc::now();
        debug!("Refresh cycle started, source: {}", self.fetcher.source());

        let outcome = match self.fetcher.fetch().await {
            Ok(bytes) => self.install(bytes).await,
            Err(e) => RefreshOutcome::Failed {
                stage: RefreshStage::Fetch,
                message: e.to_string(),
            },
        };

        match &outcome {
            RefreshOutcome::Updated { bytes, generation } => {
                info!(
                    "GeoIP database updated successfully ({} bytes, generation {}, took {:?})",
                    bytes,
                    generation,
                    started.elapsed()
                );
            }
            RefreshOutcome::Failed { stage, message } => {
                error!(
                    stage = %stage,
                    "Failed to update GeoIP database at {}: {}",
                    attempt_at.to_rfc3339(),
                    message
                );
            }
        }

        self.record(&outcome, attempt_at);
        outcome
    }

    /// 校验并替换（文件 IO 在 blocking 线程池中执行）
    async fn install(&self, bytes: Vec<u8>) -> RefreshOutcome {
        let store = Arc::clone(&self.store);
        let format = Arc::clone(&self.format);

        let result = tokio::task::spawn_blocking(move || {
            format.verify(&bytes).map_err(|e| RefreshOutcome::Failed {
                stage: RefreshStage::Verify,
                message: e.to_string(),
            })?;

            let generation = store.replace(&bytes).map_err(|e| RefreshOutcome::Failed {
                stage: RefreshStage::Replace,
                message: e.to_string(),
            })?;

            Ok(RefreshOutcome::Updated {
                bytes: bytes.len() as u64,
                generation,
            })
        })
        .await;

        match result {
            Ok(Ok(outcome)) | Ok(Err(outcome)) => outcome,
            Err(e) => RefreshOutcome::Failed {
                stage: RefreshStage::Replace,
                message: format!("install task failed: {}", e),
            },
        }
    }

    fn record(&self, outcome: &RefreshOutcome, attempt_at: DateTime<Utc>) {
        let mut status = self.status.write();
        status.cycles += 1;
        status.last_attempt = Some(attempt_at);
        match outcome {
            RefreshOutcome::Updated { .. } => {
                status.last_success = Some(Utc::now());
                status.last_error = None;
            }
            RefreshOutcome::Failed { stage, message } => {
                status.last_error = Some(format!("{}: {}", stage, message));
            }
        }
    }

    /// 启动后台刷新任务
    ///
    /// 返回的句柄在进程关闭时调用 `shutdown`，不等待进行中的周期完成
    pub fn spawn(self: Arc<Self>) -> RefreshHandle {
        self.status.write().enabled = true;

        let interval = self.interval;
        let run_on_startup = self.run_on_startup;
        let first_tick = if run_on_startup {
            Instant::now()
        } else {
            Instant::now() + interval
        };

        let handle = tokio::spawn(async move {
            let mut ticker = tokio::time::interval_at(first_tick, interval);
            ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

            loop {
                ticker.tick().await;
                self.run_cycle().await;
            }
        });

        info!(
            "GeoIP auto-update task started (interval: {:?}, run on startup: {})",
            interval, run_on_startup
        );

        RefreshHandle { handle }
    }
}

/// 后台刷新任务句柄
pub struct RefreshHandle {
    handle: JoinHandle<()>,
}

impl RefreshHandle {
    pub fn is_running(&self) -> bool {
        !self.handle.is_finished()
    }

    /// 终止后台任务
    pub fn shutdown(self) {
        self.handle.abort();
        warn!("GeoIP auto-update task stopped");
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::errors::{GeoIpApiError, LookupError, Result};
    use crate::services::geoip::GeoDatabase;
    use async_trait::async_trait;
    use std::path::Path;
    use tempfile::TempDir;

    struct StaticFetcher(Result<Vec<u8>>);

    #[async_trait]
    impl DatabaseFetcher for StaticFetcher {
        async fn fetch(&self) -> Result<Vec<u8>> {
            self.0.clone()
        }

        fn source(&self) -> &str {
            "static"
        }
    }

    /// 只接受以 "DB" 开头的内容
    struct PrefixFormat;

    impl DatabaseFormat for PrefixFormat {
        fn open(&self, _path: &Path) -> std::result::Result<Arc<dyn GeoDatabase>, LookupError> {
            Err(LookupError::Internal("not used".into()))
        }

        fn verify(&self, bytes: &[u8]) -> std::result::Result<(), LookupError> {
            if bytes.starts_with(b"DB") {
                Ok(())
            } else {
                Err(LookupError::CorruptDatabase("bad magic".into()))
            }
        }

        fn name(&self) -> &'static str {
            "prefix"
        }
    }

    fn scheduler(
        dir: &TempDir,
        fetched: Result<Vec<u8>>,
    ) -> (Arc<DatabaseStore>, RefreshScheduler) {
        let store = Arc::new(DatabaseStore::new(dir.path().join("db.bin")));
        let scheduler = RefreshScheduler::new(
            store.clone(),
            Arc::new(StaticFetcher(fetched)),
            Arc::new(PrefixFormat),
            Duration::from_secs(60),
            true,
        );
        (store, scheduler)
    }

    #[tokio::test]
    async fn test_cycle_replaces_database() {
        let dir = TempDir::new().unwrap();
        let (store, scheduler) = scheduler(&dir, Ok(b"DB v2".to_vec()));

        let outcome = scheduler.run_cycle().await;
        assert_eq!(
            outcome,
            RefreshOutcome::Updated {
                bytes: 5,
                generation: 1
            }
        );
        assert_eq!(std::fs::read(store.current_path()).unwrap(), b"DB v2");

        let status = scheduler.status();
        assert_eq!(status.cycles, 1);
        assert!(status.last_success.is_some());
        assert!(status.last_error.is_none());
    }

    #[tokio::test]
    async fn test_fetch_failure_keeps_database() {
        let dir = TempDir::new().unwrap();
        let (store, scheduler) = scheduler(&dir, Err(GeoIpApiError::download("503")));
        store.replace(b"DB v1").unwrap();

        let outcome = scheduler.run_cycle().await;
        assert!(matches!(
            outcome,
            RefreshOutcome::Failed {
                stage: RefreshStage::Fetch,
                ..
            }
        ));
        assert_eq!(std::fs::read(store.current_path()).unwrap(), b"DB v1");
        assert_eq!(store.generation(), 1);

        let status = scheduler.status();
        assert!(status.last_error.unwrap().starts_with("fetch:"));
    }

    #[tokio::test]
    async fn test_corrupt_download_is_rejected() {
        let dir = TempDir::new().unwrap();
        let (store, scheduler) = scheduler(&dir, Ok(b"<html>".to_vec()));
        store.replace(b"DB v1").unwrap();

        let outcome = scheduler.run_cycle().await;
        assert!(matches!(
            outcome,
            RefreshOutcome::Failed {
                stage: RefreshStage::Verify,
                ..
            }
        ));
        assert_eq!(std::fs::read(store.current_path()).unwrap(), b"DB v1");
    }

    #[test]
    fn test_stage_names() {
        assert_eq!(RefreshStage::Fetch.as_ref(), "fetch");
        assert_eq!(RefreshStage::Replace.to_string(), "replace");
    }
}
