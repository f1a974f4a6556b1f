use thiserror::Error;

#[derive(Error, Debug)]
pub enum JokeError {
    #[error("API request failed: {0}")]
    ApiError(#[from] reqwest::Error),

    #[error("Unexpected status {status} from {url}")]
    UnexpectedStatus { status: u16, url: String },

    #[error("Malformed upstream payload: {message}")]
    MappingError { message: String },

    #[error("Circuit breaker '{name}' is open")]
    CircuitOpen { name: String },

    #[error("Rate limiter '{name}' rejected the call")]
    RateLimited { name: String },

    #[error("Bulkhead '{name}' is full")]
    BulkheadFull { name: String },

    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),

    #[error("Configuration error: {message}")]
    ConfigError { message: String },

    #[error("Invalid value '{value}' for {field}: {reason}")]
    InvalidConfigValueError {
        field: String,
        value: String,
        reason: String,
    },
}

/// 錯誤分類，對應 fallback 路徑的處理方式
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorCategory {
    /// 網路錯誤、逾時、非 2xx 狀態：可重試
    Transient,
    /// 速率限制或 bulkhead 已滿：直接 fallback
    Saturation,
    /// 斷路器開啟：不發出網路請求
    CircuitOpen,
    /// 上游回應格式錯誤：與 Transient 同樣重試
    Mapping,
    Configuration,
}

impl JokeError {
    pub fn category(&self) -> ErrorCategory {
        match self {
            JokeError::ApiError(_) | JokeError::UnexpectedStatus { .. } => {
                ErrorCategory::Transient
            }
            JokeError::MappingError { .. } => ErrorCategory::Mapping,
            JokeError::CircuitOpen { .. } => ErrorCategory::CircuitOpen,
            JokeError::RateLimited { .. } | JokeError::BulkheadFull { .. } => {
                ErrorCategory::Saturation
            }
            JokeError::IoError(_)
            | JokeError::ConfigError { .. }
            | JokeError::InvalidConfigValueError { .. } => ErrorCategory::Configuration,
        }
    }

    pub fn is_retryable(&self) -> bool {
        matches!(
            self.category(),
            ErrorCategory::Transient | ErrorCategory::Mapping
        )
    }
}

pub type Result<T> = std::result::Result<T, JokeError>;
