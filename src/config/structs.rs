use std::path::Path;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::errors::{GeoIpApiError, Result};

/// 默认配置文件路径
pub const DEFAULT_CONFIG_PATH: &str = "config.toml";

/// 环境变量前缀，示例：GEOIP__SERVER__PORT=8080
pub const ENV_PREFIX: &str = "GEOIP";

/// 静态配置（从 TOML 加载，启动时使用）
///
/// 包含：
/// - server: 监听地址、端口、worker 数量、PID 文件
/// - database: GeoIP 数据库文件与刷新策略
/// - logging: 日志配置
/// - cors: 跨域配置
///
/// 启动时构建一次，通过构造函数显式传递给各组件，不存在全局实例。
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct StaticConfig {
    #[serde(default)]
    pub server: ServerConfig,
    #[serde(default)]
    pub database: DatabaseConfig,
    #[serde(default)]
    pub logging: LoggingConfig,
    #[serde(default)]
    pub cors: CorsConfig,
}

impl StaticConfig {
    /// 从 TOML 文件和环境变量加载配置
    ///
    /// 优先级：ENV > 配置文件 > 默认值
    /// `path` 为 None 时尝试读取 `config.toml`（可选）
    pub fn load(path: Option<&str>) -> Result<Self> {
        use config::{Config, Environment, File};

        let explicit = path.is_some();
        let path = path.unwrap_or(DEFAULT_CONFIG_PATH);

        let settings = Config::builder()
            // 显式指定的配置文件必须存在
            .add_source(File::with_name(path).required(explicit))
            .add_source(
                Environment::with_prefix(ENV_PREFIX)
                    .separator("__")
                    .try_parsing(true),
            )
            .build()?;

        let config: StaticConfig = settings.try_deserialize()?;
        if Path::new(path).exists() {
            eprintln!("[INFO] Configuration loaded from: {}", path);
        }

        config.validate()?;
        Ok(config)
    }

    /// 校验配置取值
    pub fn validate(&self) -> Result<()> {
        if self.database.path.trim().is_empty() {
            return Err(GeoIpApiError::config("database.path must not be empty"));
        }
        if self.database.source_url.trim().is_empty() {
            return Err(GeoIpApiError::config("database.source_url must not be empty"));
        }
        if self.database.refresh_interval_secs == 0 {
            return Err(GeoIpApiError::config(
                "database.refresh_interval_secs must be greater than 0",
            ));
        }
        if self.database.download_timeout_secs == 0 {
            return Err(GeoIpApiError::config(
                "database.download_timeout_secs must be greater than 0",
            ));
        }
        if self.database.max_download_bytes == 0 {
            return Err(GeoIpApiError::config(
                "database.max_download_bytes must be greater than 0",
            ));
        }
        if !matches!(self.logging.format.as_str(), "text" | "json") {
            return Err(GeoIpApiError::config(format!(
                "Invalid logging.format '{}'. Valid: text, json",
                self.logging.format
            )));
        }
        Ok(())
    }

    /// 生成示例 TOML 配置文件
    pub fn generate_sample_config() -> String {
        let sample_config = Self::default();
        toml::to_string_pretty(&sample_config)
            .unwrap_or_else(|e| format!("Error generating sample config: {}", e))
    }

    /// 保存配置到 TOML 文件
    pub fn save_to_file<P: AsRef<Path>>(&self, path: P) -> Result<()> {
        let content = toml::to_string_pretty(self)
            .map_err(|e| GeoIpApiError::serialization(e.to_string()))?;

        if let Some(parent) = path.as_ref().parent()
            && !parent.as_os_str().is_empty()
            && !parent.exists()
        {
            std::fs::create_dir_all(parent)?;
        }

        std::fs::write(path, content)?;
        Ok(())
    }
}

/// 服务器配置
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerConfig {
    #[serde(default = "default_server_host")]
    pub host: String,
    #[serde(default = "default_server_port")]
    pub port: u16,
    #[serde(default = "default_cpu_count")]
    pub cpu_count: usize,
    /// 进程管理工具使用的 PID 文件
    #[serde(default = "default_pid_file")]
    pub pid_file: String,
}

impl ServerConfig {
    pub fn bind_address(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}

/// GeoIP 数据库与后台刷新配置
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DatabaseConfig {
    /// 本地数据库文件路径 (GeoLite2-City.mmdb)
    #[serde(default = "default_database_path")]
    pub path: String,
    /// 下载最新数据库的 URL
    #[serde(default = "default_source_url")]
    pub source_url: String,
    #[serde(default = "default_refresh_interval_secs")]
    pub refresh_interval_secs: u64,
    #[serde(default = "default_download_timeout_secs")]
    pub download_timeout_secs: u64,
    #[serde(default = "default_max_download_bytes")]
    pub max_download_bytes: u64,
    /// 启动时立即刷新一次
    #[serde(default = "default_true")]
    pub refresh_on_startup: bool,
    /// 关闭后由外部负责更新数据库文件
    #[serde(default = "default_true")]
    pub refresh_enabled: bool,
    /// 缓存已打开的数据库，文件被替换后自动重新打开
    #[serde(default = "default_true")]
    pub cache_reader: bool,
}

impl DatabaseConfig {
    pub fn refresh_interval(&self) -> Duration {
        Duration::from_secs(self.refresh_interval_secs)
    }

    pub fn download_timeout(&self) -> Duration {
        Duration::from_secs(self.download_timeout_secs)
    }
}

/// 日志配置
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoggingConfig {
    #[serde(default = "default_log_level")]
    pub level: String,
    #[serde(default = "default_log_format")]
    pub format: String,
    #[serde(default)]
    pub file: Option<String>,
    #[serde(default = "default_max_backups")]
    pub max_backups: u32,
    #[serde(default = "default_true")]
    pub enable_rotation: bool,
}

/// CORS 配置
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CorsConfig {
    #[serde(default = "default_true")]
    pub enabled: bool,
    #[serde(default = "default_allowed_origins")]
    pub allowed_origins: Vec<String>,
    #[serde(default = "default_cors_max_age")]
    pub max_age: u64,
}

// ============================================================
// Default values
// ============================================================

fn default_true() -> bool {
    true
}

fn default_server_host() -> String {
    "0.0.0.0".to_string()
}

fn default_server_port() -> u16 {
    80
}

fn default_cpu_count() -> usize {
    num_cpus::get()
}

fn default_pid_file() -> String {
    "geoip-api.pid".to_string()
}

fn default_database_path() -> String {
    "GeoLite2-City.mmdb".to_string()
}

fn default_source_url() -> String {
    "https://git.io/GeoLite2-City.mmdb".to_string()
}

fn default_refresh_interval_secs() -> u64 {
    24 * 60 * 60
}

fn default_download_timeout_secs() -> u64 {
    60 * 60
}

fn default_max_download_bytes() -> u64 {
    512 * 1024 * 1024
}

fn default_log_level() -> String {
    "info".to_string()
}

fn default_log_format() -> String {
    "text".to_string()
}

fn default_max_backups() -> u32 {
    5
}

fn default_allowed_origins() -> Vec<String> {
    vec!["*".to_string()]
}

fn default_cors_max_age() -> u64 {
    3600
}

// ============================================================
// Default implementations
// ============================================================

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: default_server_host(),
            port: default_server_port(),
            cpu_count: default_cpu_count(),
            pid_file: default_pid_file(),
        }
    }
}

impl Default for DatabaseConfig {
    fn default() -> Self {
        Self {
            path: default_database_path(),
            source_url: default_source_url(),
            refresh_interval_secs: default_refresh_interval_secs(),
            download_timeout_secs: default_download_timeout_secs(),
            max_download_bytes: default_max_download_bytes(),
            refresh_on_startup: true,
            refresh_enabled: true,
            cache_reader: true,
        }
    }
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
            format: default_log_format(),
            file: None,
            max_backups: default_max_backups(),
            enable_rotation: true,
        }
    }
}

impl Default for CorsConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            allowed_origins: default_allowed_origins(),
            max_age: default_cors_max_age(),
        }
    }
}
