use thiserror::Error as ThisError;

#[derive(ThisError, Debug)]
pub enum AppError {
    #[error("Configuration error: {0}")]
    Config(String),

    #[error("IO error: {0}")]
    Io(String),

    #[error("Parse error: {0}")]
    Parse(String),

    #[error("Invalid input: {0}")]
    InvalidInput(String),

    /// The requested ticker does not exist in storage
    #[error("Ticker not found: {0}")]
    NotFound(String),

    /// The ticker exists but has no persisted records
    #[error("No records stored for ticker: {0}")]
    EmptyHistory(String),

    /// Every close price of the ticker is missing
    #[error("Insufficient data for ticker {0}: no close prices available")]
    InsufficientData(String),

    /// The atomic batch update for a ticker failed and was rolled back
    #[error("Storage conflict for ticker {ticker}: {reason}")]
    StorageConflict { ticker: String, reason: String },

    #[error("Database error: {0}")]
    Database(String),

    #[error("{0}")]
    Other(String),
}

impl AppError {
    /// Errors that end one ticker's run without stopping the whole backfill
    pub fn is_per_ticker(&self) -> bool {
        matches!(
            self,
            AppError::NotFound(_)
                | AppError::EmptyHistory(_)
                | AppError::InsufficientData(_)
                | AppError::StorageConflict { .. }
                | AppError::Database(_)
                | AppError::Other(_)
        )
    }

    /// Short machine-friendly label used in run summaries
    pub fn kind(&self) -> &'static str {
        match self {
            AppError::Config(_) => "config",
            AppError::Io(_) => "io",
            AppError::Parse(_) => "parse",
            AppError::InvalidInput(_) => "invalid_input",
            AppError::NotFound(_) => "not_found",
            AppError::EmptyHistory(_) => "empty_history",
            AppError::InsufficientData(_) => "insufficient_data",
            AppError::StorageConflict { .. } => "storage_conflict",
            AppError::Database(_) => "database",
            AppError::Other(_) => "other",
        }
    }
}

impl From<std::io::Error> for AppError {
    fn from(err: std::io::Error) -> Self {
        AppError::Io(err.to_string())
    }
}

impl From<serde_json::Error> for AppError {
    fn from(err: serde_json::Error) -> Self {
        AppError::Parse(format!("JSON error: {}", err))
    }
}

impl From<sqlx::Error> for AppError {
    fn from(err: sqlx::Error) -> Self {
        AppError::Database(err.to_string())
    }
}

pub type Result<T> = std::result::Result<T, AppError>;

// Alias for convenience
pub type Error = AppError;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_per_ticker_classification() {
        assert!(AppError::NotFound("AAPL".to_string()).is_per_ticker());
        assert!(AppError::EmptyHistory("AAPL".to_string()).is_per_ticker());
        assert!(AppError::InsufficientData("XYZ".to_string()).is_per_ticker());
        assert!(AppError::StorageConflict {
            ticker: "AAPL".to_string(),
            reason: "unique".to_string()
        }
        .is_per_ticker());
        assert!(!AppError::Config("bad contamination".to_string()).is_per_ticker());
    }

    #[test]
    fn test_display_includes_ticker() {
        let err = AppError::InsufficientData("XYZ".to_string());
        assert!(err.to_string().contains("XYZ"));
        assert_eq!(err.kind(), "insufficient_data");
    }
}
