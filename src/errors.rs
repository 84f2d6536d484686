use std::fmt;

#[derive(Debug, Clone)]
pub enum GeoIpApiError {
    Config(String),
    FileOperation(String),
    Download(String),
    InvalidDatabase(String),
    Validation(String),
    Serialization(String),
    Process(String),
}

impl GeoIpApiError {
    /// 获取错误代码
    pub fn code(&self) -> &'static str {
        match self {
            GeoIpApiError::Config(_) => "E001",
            GeoIpApiError::FileOperation(_) => "E002",
            GeoIpApiError::Download(_) => "E003",
            GeoIpApiError::InvalidDatabase(_) => "E004",
            GeoIpApiError::Validation(_) => "E005",
            GeoIpApiError::Serialization(_) => "E006",
            GeoIpApiError::Process(_) => "E007",
        }
    }

    /// 获取错误类型名称
    pub fn error_type(&self) -> &'static str {
        match self {
            GeoIpApiError::Config(_) => "Configuration Error",
            GeoIpApiError::FileOperation(_) => "File Operation Error",
            GeoIpApiError::Download(_) => "Download Error",
            GeoIpApiError::InvalidDatabase(_) => "Invalid Database",
            GeoIpApiError::Validation(_) => "Validation Error",
            GeoIpApiError::Serialization(_) => "Serialization Error",
            GeoIpApiError::Process(_) => "Process Error",
        }
    }

    /// 获取错误详情
    pub fn message(&self) -> &str {
        match self {
            GeoIpApiError::Config(msg) => msg,
            GeoIpApiError::FileOperation(msg) => msg,
            GeoIpApiError::Download(msg) => msg,
            GeoIpApiError::InvalidDatabase(msg) => msg,
            GeoIpApiError::Validation(msg) => msg,
            GeoIpApiError::Serialization(msg) => msg,
            GeoIpApiError::Process(msg) => msg,
        }
    }

    /// 格式化为彩色输出（用于 Server 模式）
    pub fn format_colored(&self) -> String {
        use colored::Colorize;
        format!(
            "{} {} {}\n  {}",
            "[ERROR]".red().bold(),
            self.code().yellow(),
            self.error_type().red(),
            self.message().white()
        )
    }

    /// 格式化为简洁输出（用于 CLI 模式）
    pub fn format_simple(&self) -> String {
        format!("{}: {}", self.error_type(), self.message())
    }
}

impl fmt::Display for GeoIpApiError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.format_simple())
    }
}

impl std::error::Error for GeoIpApiError {}

// 便捷的构造函数
impl GeoIpApiError {
    pub fn config<T: Into<String>>(msg: T) -> Self {
        GeoIpApiError::Config(msg.into())
    }

    pub fn file_operation<T: Into<String>>(msg: T) -> Self {
        GeoIpApiError::FileOperation(msg.into())
    }

    pub fn download<T: Into<String>>(msg: T) -> Self {
        GeoIpApiError::Download(msg.into())
    }

    pub fn invalid_database<T: Into<String>>(msg: T) -> Self {
        GeoIpApiError::InvalidDatabase(msg.into())
    }

    pub fn validation<T: Into<String>>(msg: T) -> Self {
        GeoIpApiError::Validation(msg.into())
    }

    pub fn serialization<T: Into<String>>(msg: T) -> Self {
        GeoIpApiError::Serialization(msg.into())
    }

    pub fn process<T: Into<String>>(msg: T) -> Self {
        GeoIpApiError::Process(msg.into())
    }
}

impl From<std::io::Error> for GeoIpApiError {
    fn from(err: std::io::Error) -> Self {
        GeoIpApiError::FileOperation(err.to_string())
    }
}

impl From<tempfile::PersistError> for GeoIpApiError {
    fn from(err: tempfile::PersistError) -> Self {
        GeoIpApiError::FileOperation(format!("atomic rename failed: {}", err.error))
    }
}

impl From<serde_json::Error> for GeoIpApiError {
    fn from(err: serde_json::Error) -> Self {
        GeoIpApiError::Serialization(err.to_string())
    }
}

impl From<ureq::Error> for GeoIpApiError {
    fn from(err: ureq::Error) -> Self {
        GeoIpApiError::Download(err.to_string())
    }
}

impl From<maxminddb::MaxMindDbError> for GeoIpApiError {
    fn from(err: maxminddb::MaxMindDbError) -> Self {
        GeoIpApiError::InvalidDatabase(err.to_string())
    }
}

impl From<config::ConfigError> for GeoIpApiError {
    fn from(err: config::ConfigError) -> Self {
        GeoIpApiError::Config(err.to_string())
    }
}

pub type Result<T> = std::result::Result<T, GeoIpApiError>;

/// 单次 IP 查询的失败分类
///
/// `NotFound` 是预期结果（映射为 404），其余都属于查询错误（映射为 500）。
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LookupError {
    /// 地址合法，但数据库中没有对应记录
    NotFound,
    /// 无法解析为 IPv4 / IPv6 地址
    InvalidAddress(String),
    /// 数据库文件不存在（例如首次刷新尚未完成）
    DatabaseUnavailable(String),
    /// 数据库文件无法解析或读取记录失败
    CorruptDatabase(String),
    Internal(String),
}

impl LookupError {
    pub fn invalid_address(ip: &str) -> Self {
        LookupError::InvalidAddress(format!(
            "'{}' does not appear to be an IPv4 or IPv6 address",
            ip
        ))
    }

    pub fn is_not_found(&self) -> bool {
        matches!(self, LookupError::NotFound)
    }

    /// 返回给 API 调用方的消息，不包含服务器内部路径
    pub fn public_message(&self) -> String {
        match self {
            LookupError::NotFound => "IP address not found in database".to_string(),
            LookupError::InvalidAddress(msg) => msg.clone(),
            LookupError::DatabaseUnavailable(_) => {
                "GeoIP database is not available yet, please retry later".to_string()
            }
            LookupError::CorruptDatabase(_) => "GeoIP database could not be read".to_string(),
            LookupError::Internal(_) => "Internal lookup error".to_string(),
        }
    }
}

impl fmt::Display for LookupError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            LookupError::NotFound => write!(f, "IP address not found in database"),
            LookupError::InvalidAddress(msg) => write!(f, "Invalid address: {}", msg),
            LookupError::DatabaseUnavailable(msg) => write!(f, "Database unavailable: {}", msg),
            LookupError::CorruptDatabase(msg) => write!(f, "Corrupt database: {}", msg),
            LookupError::Internal(msg) => write!(f, "Internal lookup error: {}", msg),
        }
    }
}

impl std::error::Error for LookupError {}
