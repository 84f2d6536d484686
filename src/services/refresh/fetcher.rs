//! 远程数据库下载
//!
//! 使用 ureq 同步下载完整的数据库快照，只负责网络请求，不接触文件系统。
//!
//! 下载在独立线程中执行，结果通过 oneshot 返回。调用方被取消时
//! 接收端随之丢弃，下载线程自行结束，tokio runtime 关闭时不会等待它。

use std::time::Duration;

use async_trait::async_trait;
use tokio::sync::oneshot;
use tracing::{debug, info, warn};
use ureq::Agent;

use crate::config::DatabaseConfig;
use crate::errors::{GeoIpApiError, Result};

/// 数据库下载 trait
#[async_trait]
pub trait DatabaseFetcher: Send + Sync {
    /// 下载完整的数据库内容
    ///
    /// 任何非 2xx 状态或传输错误都返回 Err，不会返回部分内容
    async fn fetch(&self) -> Result<Vec<u8>>;

    /// 下载源（用于日志）
    fn source(&self) -> &str;
}

/// HTTP 下载实现
pub struct HttpFetcher {
    url: String,
    agent: Agent,
    max_bytes: u64,
}

impl HttpFetcher {
    pub fn new(url: &str, timeout: Duration, max_bytes: u64) -> Self {
        let agent: Agent = Agent::config_builder()
            .timeout_global(Some(timeout))
            .build()
            .into();

        Self {
            url: url.to_string(),
            agent,
            max_bytes,
        }
    }

    pub fn from_config(config: &DatabaseConfig) -> Self {
        Self::new(
            &config.source_url,
            config.download_timeout(),
            config.max_download_bytes,
        )
    }

    /// 同步下载（在下载线程中调用）
    fn fetch_sync(agent: Agent, url: String, max_bytes: u64) -> Result<Vec<u8>> {
        let resp = agent.get(&url).call().map_err(|e| {
            GeoIpApiError::download(format!("request to \"{}\" failed: {}", url, e))
        })?;

        let status = resp.status();
        if !status.is_success() {
            return Err(GeoIpApiError::download(format!(
                "\"{}\" responded with status {}",
                url, status
            )));
        }

        let bytes = resp
            .into_body()
            .with_config()
            .limit(max_bytes)
            .read_to_vec()
            .map_err(|e| {
                GeoIpApiError::download(format!("reading body from \"{}\" failed: {}", url, e))
            })?;

        if bytes.is_empty() {
            return Err(GeoIpApiError::download(format!(
                "\"{}\" returned an empty body",
                url
            )));
        }

        debug!("Downloaded {} bytes from {}", bytes.len(), url);
        Ok(bytes)
    }
}

#[async_trait]
impl DatabaseFetcher for HttpFetcher {
    async fn fetch(&self) -> Result<Vec<u8>> {
        info!("Downloading latest GeoIP database from {}", self.url);

        let agent = self.agent.clone();
        let url = self.url.clone();
        let max_bytes = self.max_bytes;

        let (tx, rx) = oneshot::channel();
        std::thread::Builder::new()
            .name("geoip-download".to_string())
            .spawn(move || {
                let result = Self::fetch_sync(agent, url, max_bytes);
                if tx.send(result).is_err() {
                    debug!("Download finished after the refresh task was cancelled");
                }
            })
            .map_err(|e| {
                GeoIpApiError::download(format!("failed to start download thread: {}", e))
            })?;

        rx.await.unwrap_or_else(|_| {
            warn!("Download thread exited without a result");
            Err(GeoIpApiError::download("download thread exited without a result"))
        })
    }

    fn source(&self) -> &str {
        &self.url
    }
}
