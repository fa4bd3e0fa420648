use thiserror::Error;

#[derive(Error, Debug)]
pub enum ConfError {
    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Already exists: {0}")]
    AlreadyExists(String),

    #[error("Encoding error: {0}")]
    Encoding(#[from] serde_json::Error),

    #[error("Store unavailable: {0}")]
    StoreUnavailable(String),

    #[error("Invalid request: {0}")]
    InvalidRequest(String),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl ConfError {
    /// Only transport-level failures are worth retrying; everything else is
    /// either a caller error or a stable fact about the stored data.
    pub fn is_retryable(&self) -> bool {
        matches!(self, ConfError::StoreUnavailable(_))
    }
}

impl From<etcd_client::Error> for ConfError {
    fn from(error: etcd_client::Error) -> Self {
        ConfError::StoreUnavailable(format!("etcd: {}", error))
    }
}

impl From<redis::RedisError> for ConfError {
    fn from(error: redis::RedisError) -> Self {
        ConfError::StoreUnavailable(format!("redis: {}", error))
    }
}

pub type Result<T> = std::result::Result<T, ConfError>;
