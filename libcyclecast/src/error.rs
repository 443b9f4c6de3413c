//! Error types for Cyclecast

use thiserror::Error;

pub type Result<T> = std::result::Result<T, CyclecastError>;

#[derive(Error, Debug)]
pub enum CyclecastError {
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    #[error("Content source error: {0}")]
    Content(#[from] ContentError),

    #[error("Posted log error: {0}")]
    Log(#[from] LogError),

    #[error("Platform error: {0}")]
    Platform(#[from] PlatformError),

    #[error("Invalid input: {0}")]
    InvalidInput(String),
}

impl CyclecastError {
    /// Returns the appropriate exit code for this error
    pub fn exit_code(&self) -> i32 {
        match self {
            CyclecastError::InvalidInput(_) => 3,
            CyclecastError::Config(_) => 2,
            CyclecastError::Platform(PlatformError::MissingCredentials(_)) => 2,
            CyclecastError::Platform(_) => 1,
            CyclecastError::Content(_) => 1,
            CyclecastError::Log(_) => 1,
        }
    }
}

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Failed to read config file: {0}")]
    ReadError(#[from] std::io::Error),

    #[error("Failed to parse config: {0}")]
    ParseError(#[from] toml::de::Error),

    #[error("Missing required field: {0}")]
    MissingField(String),

    #[error("Invalid value for {field}: {reason}")]
    InvalidValue { field: String, reason: String },
}

#[derive(Error, Debug)]
pub enum ContentError {
    #[error("Failed to read content file {path}: {source}")]
    Read {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("Malformed content file: {0}")]
    Malformed(#[from] csv::Error),

    #[error("Missing column '{0}' in content header")]
    MissingColumn(String),

    #[error("Line {line} has an empty id")]
    EmptyId { line: u64 },

    #[error("Duplicate post id '{0}'")]
    DuplicateId(String),
}

#[derive(Error, Debug)]
pub enum LogError {
    #[error("Failed to access posted log {path}: {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to parse posted log {path}: {source}")]
    Parse {
        path: String,
        #[source]
        source: serde_json::Error,
    },

    #[error("Failed to serialize posted log: {0}")]
    Serialize(#[source] serde_json::Error),
}

#[derive(Error, Debug, Clone)]
pub enum PlatformError {
    #[error("Missing credentials: {0}")]
    MissingCredentials(String),

    #[error("Identity resolution failed: {0}")]
    Identity(String),

    #[error("Posting failed: {0}")]
    Posting(String),

    #[error("Network error: {0}")]
    Network(String),

    #[error("Media attachment failed: {0}")]
    Media(String),

    #[error("Not supported: {0}")]
    NotSupported(String),
}

impl PlatformError {
    /// Media failures downgrade a publish to text-only instead of aborting it
    pub fn is_recoverable(&self) -> bool {
        matches!(self, PlatformError::Media(_) | PlatformError::NotSupported(_))
    }
}
