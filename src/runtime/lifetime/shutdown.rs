use std::path::Path;
use std::time::Duration;

use actix_web::dev::ServerHandle;
use tokio::signal;
use tokio::time::timeout;
use tracing::{error, info, warn};

use crate::services::RefreshHandle;

/// 关闭超时时间（秒）
const SHUTDOWN_TIMEOUT_SECS: u64 = 30;

/// 等待 Ctrl+C 或 SIGTERM
pub async fn listen_for_shutdown() {
    let ctrl_c = async {
        if let Err(e) = signal::ctrl_c().await {
            warn!("Failed to listen for Ctrl+C: {}", e);
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        use tokio::signal::unix::{SignalKind, signal};
        match signal(SignalKind::terminate()) {
            Ok(mut stream) => {
                stream.recv().await;
            }
            Err(e) => {
                warn!("Failed to create SIGTERM handler: {}", e);
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => info!("Ctrl+C received, shutting down..."),
        _ = terminate => info!("SIGTERM received, shutting down..."),
    }
}

/// 停止后台任务与 HTTP 服务，清理 PID 文件
pub async fn perform_shutdown(
    server: Option<ServerHandle>,
    refresh: Option<RefreshHandle>,
    pid_file: &Path,
) {
    // 进行中的刷新周期直接放弃，正式文件只会通过 rename 整体替换
    if let Some(refresh) = refresh {
        refresh.shutdown();
    }

    if let Some(server) = server {
        match timeout(Duration::from_secs(SHUTDOWN_TIMEOUT_SECS), server.stop(true)).await {
            Ok(()) => info!("HTTP server stopped"),
            Err(_) => error!(
                "HTTP server did not stop within {} seconds",
                SHUTDOWN_TIMEOUT_SECS
            ),
        }
    }

    crate::system::platform::cleanup_lockfile(pid_file);
    info!("Shutdown complete");
}
