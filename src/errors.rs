use thiserror::Error;

#[derive(Error, Debug)]
pub enum DataSyncError {
    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),

    #[error("HTTP request error: {0}")]
    RequestError(#[from] reqwest::Error),

    #[error("JSON parsing error: {0}")]
    JsonError(#[from] serde_json::Error),

    #[error("Database error: {0}")]
    DataAccessError(#[from] rusqlite::Error),

    #[error("Date parsing error: {0}")]
    DateError(#[from] chrono::ParseError),

    #[error("Provider authentication error: {0}")]
    ProviderAuthError(String),

    #[error("Provider rate limit exceeded: {0}")]
    RateLimitExceeded(String),

    #[error("Provider transient error: {0}")]
    ProviderTransientError(String),

    #[error("Primary key violation on {table}: {detail}")]
    PrimaryKeyViolation { table: &'static str, detail: String },

    #[error("Data error: {0}")]
    DataError(String),

    #[error("Unknown error: {0}")]
    Unknown(String),
}

pub type Result<T> = std::result::Result<T, DataSyncError>;

impl DataSyncError {
    /// 该错误是否适合退避后重试。认证失败和主键冲突不可重试。
    pub fn is_retryable(&self) -> bool {
        matches!(
            self,
            DataSyncError::RequestError(_)
                | DataSyncError::RateLimitExceeded(_)
                | DataSyncError::ProviderTransientError(_)
        )
    }
}

// 用于从字符串创建错误
impl From<String> for DataSyncError {
    fn from(s: String) -> Self {
        DataSyncError::Unknown(s)
    }
}

// 用于从&str创建错误
impl From<&str> for DataSyncError {
    fn from(s: &str) -> Self {
        DataSyncError::Unknown(s.to_string())
    }
}
