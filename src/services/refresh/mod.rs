//! GeoIP 数据库刷新
//!
//! - `fetcher`: 从远程地址下载数据库快照
//! - `scheduler`: 后台周期刷新任务

mod fetcher;
mod scheduler;

pub use fetcher::{DatabaseFetcher, HttpFetcher};
pub use scheduler::{RefreshHandle, RefreshOutcome, RefreshScheduler, RefreshStage, RefreshStatus};
