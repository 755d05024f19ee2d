use thiserror::Error;

#[derive(Error, Debug)]
pub enum RegisterError {
    #[error("failed to read workbook: {0}")]
    Workbook(#[from] calamine::Error),

    #[error("JSON serialization failed: {0}")]
    Json(#[from] serde_json::Error),

    #[error("TOML deserialization failed: {0}")]
    Toml(#[from] toml::de::Error),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("no column-header row found in the first {scanned} rows")]
    HeaderRowNotFound { scanned: usize },

    #[error("workbook has no readable worksheet")]
    NoWorksheet,

    #[error("store error: {0}")]
    Store(String),
}

pub type Result<T> = std::result::Result<T, RegisterError>;
