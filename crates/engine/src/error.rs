use std::fmt;

#[derive(Debug)]
pub enum SyncError {
    /// TOML parse / deserialization error.
    ConfigParse(String),
    /// Config validation error (zero chunk size, empty key field).
    ConfigValidation(String),
    /// Failure serializing the failed-rows CSV export.
    ExportWrite(String),
}

impl fmt::Display for SyncError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::ConfigParse(msg) => write!(f, "config parse error: {msg}"),
            Self::ConfigValidation(msg) => write!(f, "config validation error: {msg}"),
            Self::ExportWrite(msg) => write!(f, "export write error: {msg}"),
        }
    }
}

impl std::error::Error for SyncError {}
