use thiserror::Error;

pub type Result<T> = std::result::Result<T, Error>;

#[derive(Debug, Error)]
pub enum Error {
    #[error("configuration error: {0}")]
    Config(String),

    #[error("validation error: {0}")]
    Validation(String),

    #[error("not found: {0}")]
    NotFound(String),

    #[error("already exists: {0}")]
    AlreadyExists(String),

    #[error("not empty: {0}")]
    NotEmpty(String),

    #[error("content mismatch for '{path}'; read the file again before editing")]
    ContentMismatch { path: String, current: String },

    #[error("invalid state: {0}")]
    InvalidState(String),

    #[error("unknown tool: {0}")]
    UnknownTool(String),

    #[error("forbidden: {0}")]
    Forbidden(String),

    #[error("storage error: {0}")]
    Storage(String),
}

/// Domain-level classification used by the tool envelope.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    NotFound,
    AlreadyExists,
    NotEmpty,
    ContentMismatch,
    InvalidState,
    UnknownTool,
    InvalidArguments,
    Forbidden,
    Internal,
}

impl ErrorKind {
    pub fn code(self) -> &'static str {
        match self {
            Self::NotFound => "NOT_FOUND",
            Self::AlreadyExists => "ALREADY_EXISTS",
            Self::NotEmpty => "NOT_EMPTY",
            Self::ContentMismatch => "CONTENT_MISMATCH",
            Self::InvalidState => "INVALID_STATE",
            Self::UnknownTool => "UNKNOWN_TOOL",
            Self::InvalidArguments => "INVALID_ARGUMENTS",
            Self::Forbidden => "FORBIDDEN",
            Self::Internal => "INTERNAL",
        }
    }
}

impl Error {
    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::NotFound(_) => ErrorKind::NotFound,
            Self::AlreadyExists(_) => ErrorKind::AlreadyExists,
            Self::NotEmpty(_) => ErrorKind::NotEmpty,
            Self::ContentMismatch { .. } => ErrorKind::ContentMismatch,
            Self::InvalidState(_) => ErrorKind::InvalidState,
            Self::UnknownTool(_) => ErrorKind::UnknownTool,
            Self::Validation(_) => ErrorKind::InvalidArguments,
            Self::Forbidden(_) => ErrorKind::Forbidden,
            Self::Config(_) | Self::Storage(_) => ErrorKind::Internal,
        }
    }
}

impl From<sqlx::Error> for Error {
    fn from(err: sqlx::Error) -> Self {
        if let sqlx::Error::Database(db_err) = &err {
            if db_err.is_unique_violation() {
                return Self::AlreadyExists(db_err.message().to_owned());
            }
        }
        Self::Storage(err.to_string())
    }
}

impl From<serde_json::Error> for Error {
    fn from(err: serde_json::Error) -> Self {
        Self::Storage(format!("serialization failed: {err}"))
    }
}

impl From<std::io::Error> for Error {
    fn from(err: std::io::Error) -> Self {
        Self::Storage(format!("io failure: {err}"))
    }
}

impl From<toml::de::Error> for Error {
    fn from(err: toml::de::Error) -> Self {
        Self::Config(format!("failed to parse config: {err}"))
    }
}
