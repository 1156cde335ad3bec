use thiserror::Error;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum RuntimeError {
    #[error("Validation Error: {0}")]
    ValidationError(String),
    #[error("Not Found: {0}")]
    NotFound(String),
    #[error("Unauthorized: {0}")]
    Unauthorized(String),
    #[error("DataStore Error: {0}")]
    DataStoreError(String),
    #[error("Internal Error: {0}")]
    InternalError(String),
}

impl RuntimeError {
    /// The bare message, without the category prefix.
    pub fn message(&self) -> &str {
        match self {
            RuntimeError::ValidationError(msg)
            | RuntimeError::NotFound(msg)
            | RuntimeError::Unauthorized(msg)
            | RuntimeError::DataStoreError(msg)
            | RuntimeError::InternalError(msg) => msg,
        }
    }

    /// Backing-store and internal failures are not the caller's fault.
    pub fn is_server_error(&self) -> bool {
        matches!(self, RuntimeError::DataStoreError(_) | RuntimeError::InternalError(_))
    }
}

// Helper conversion from String
impl From<String> for RuntimeError {
    fn from(err: String) -> Self {
        RuntimeError::InternalError(err)
    }
}

// Helper conversion from &str
impl From<&str> for RuntimeError {
    fn from(err: &str) -> Self {
        RuntimeError::InternalError(err.to_string())
    }
}
