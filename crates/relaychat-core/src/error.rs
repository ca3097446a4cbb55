use thiserror::Error;

/// Failures talking to the completion endpoint.
///
/// The `Display` text of each variant is what the user sees in place of an
/// assistant reply, so keep it short and human.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ApiError {
    #[error("Invalid API key")]
    InvalidKey,

    #[error("Rate limit exceeded. Please wait.")]
    RateLimited,

    #[error("Server error. Please try again.")]
    ServerError,

    #[error("Error: {0}")]
    Unexpected(u16),

    #[error("Connection failed. Check your internet.")]
    ConnectionFailed,
}

impl ApiError {
    /// Map a non-success HTTP status code onto the error taxonomy.
    pub fn from_status(code: u16) -> Self {
        match code {
            401 => Self::InvalidKey,
            429 => Self::RateLimited,
            500 => Self::ServerError,
            other => Self::Unexpected(other),
        }
    }
}

#[derive(Error, Debug)]
pub enum EncodingError {
    #[error("Failed to read image: {0}")]
    Read(#[from] std::io::Error),

    #[error("Failed to decode image: {0}")]
    Decode(String),

    #[error("Failed to encode image: {0}")]
    Encode(String),

    #[error("Image too large ({bytes} bytes, max 4MB)")]
    TooLarge { bytes: usize },
}

#[derive(Error, Debug)]
pub enum StorageError {
    #[error("Storage IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Failed to serialize value: {0}")]
    Serialize(#[from] serde_json::Error),

    #[error("Malformed record {key}: {reason}")]
    Malformed { key: String, reason: String },
}

impl StorageError {
    pub fn malformed(key: impl Into<String>, reason: impl ToString) -> Self {
        Self::Malformed {
            key: key.into(),
            reason: reason.to_string(),
        }
    }
}

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ValidationError {
    #[error("Enter a message or select an image")]
    Empty,

    #[error("Message too long ({len} characters, max {max})")]
    TooLong { len: usize, max: usize },

    #[error("API key not set or invalid")]
    MissingApiKey,

    #[error("Model already exists: {0}")]
    DuplicateModel(String),

    #[error("Unknown model: {0}")]
    UnknownModel(String),

    #[error("Built-in model cannot be removed: {0}")]
    DefaultModelImmutable(String),

    #[error("Model name and id must not be empty")]
    InvalidModel,

    #[error("Unknown background preset: {0}")]
    UnknownBackground(String),
}

#[derive(Error, Debug)]
pub enum ChatError {
    #[error(transparent)]
    Api(#[from] ApiError),

    #[error(transparent)]
    Encoding(#[from] EncodingError),

    #[error(transparent)]
    Storage(#[from] StorageError),

    #[error(transparent)]
    Validation(#[from] ValidationError),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Request cancelled")]
    Cancelled,
}

pub type Result<T> = std::result::Result<T, ChatError>;
