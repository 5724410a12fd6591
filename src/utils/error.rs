use thiserror::Error;

#[derive(Error, Debug)]
pub enum ConceptsError {
    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    SerializationError(#[from] serde_json::Error),

    #[error("Database error: {0}")]
    DatabaseError(#[from] rusqlite::Error),

    #[error("Connection pool error: {0}")]
    PoolError(#[from] r2d2::Error),

    #[error("Configuration error: {message}")]
    ConfigError { message: String },

    #[error("Missing required configuration: {field}")]
    MissingConfigError { field: String },

    #[error("Invalid value '{value}' for {field}: {reason}")]
    InvalidConfigValueError {
        field: String,
        value: String,
        reason: String,
    },

    #[error("Object storage error: {message}")]
    StorageError { message: String },

    #[error("Failed to parse concept document {path}: {source}")]
    DocumentError {
        path: String,
        #[source]
        source: serde_json::Error,
    },

    #[error("Data processing error: {message}")]
    ProcessingError { message: String },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorCategory {
    Configuration,
    Storage,
    Database,
    Data,
    System,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum ErrorSeverity {
    Low,
    Medium,
    High,
    Critical,
}

impl ConceptsError {
    pub fn storage(message: impl Into<String>) -> Self {
        Self::StorageError {
            message: message.into(),
        }
    }

    pub fn processing(message: impl Into<String>) -> Self {
        Self::ProcessingError {
            message: message.into(),
        }
    }

    pub fn category(&self) -> ErrorCategory {
        match self {
            Self::ConfigError { .. }
            | Self::MissingConfigError { .. }
            | Self::InvalidConfigValueError { .. } => ErrorCategory::Configuration,
            Self::StorageError { .. } => ErrorCategory::Storage,
            Self::DatabaseError(_) | Self::PoolError(_) => ErrorCategory::Database,
            Self::SerializationError(_)
            | Self::DocumentError { .. }
            | Self::ProcessingError { .. } => ErrorCategory::Data,
            Self::IoError(_) => ErrorCategory::System,
        }
    }

    pub fn severity(&self) -> ErrorSeverity {
        match self {
            // remote listing and downloads are worth retrying
            Self::StorageError { .. } | Self::PoolError(_) => ErrorSeverity::Medium,
            Self::ConfigError { .. }
            | Self::MissingConfigError { .. }
            | Self::InvalidConfigValueError { .. }
            | Self::SerializationError(_)
            | Self::DocumentError { .. }
            | Self::ProcessingError { .. } => ErrorSeverity::High,
            Self::IoError(_) | Self::DatabaseError(_) => ErrorSeverity::Critical,
        }
    }

    pub fn recovery_suggestion(&self) -> &'static str {
        match self {
            Self::ConfigError { .. } | Self::InvalidConfigValueError { .. } => {
                "Check the command line flags and the TOML configuration file"
            }
            Self::MissingConfigError { .. } => {
                "Provide the missing value via flag, config file or environment variable"
            }
            Self::StorageError { .. } => {
                "Run `concepts check-credentials` and verify bucket access, then retry"
            }
            Self::DocumentError { .. } | Self::SerializationError(_) => {
                "Re-run `concepts fetch` to refresh the downloaded concept documents"
            }
            Self::DatabaseError(_) | Self::PoolError(_) => {
                "Make sure the database file exists and was built with `concepts build`"
            }
            Self::IoError(_) => "Check file permissions and available disk space",
            Self::ProcessingError { .. } => "Inspect the source data for unexpected values",
        }
    }

    pub fn user_friendly_message(&self) -> String {
        match self.category() {
            ErrorCategory::Configuration => format!("Configuration problem: {}", self),
            ErrorCategory::Storage => format!("Could not reach object storage: {}", self),
            ErrorCategory::Database => format!("Database problem: {}", self),
            ErrorCategory::Data => format!("Concept data problem: {}", self),
            ErrorCategory::System => format!("System error: {}", self),
        }
    }

    /// Process exit code for the CLI.
    pub fn exit_code(&self) -> i32 {
        match self.severity() {
            ErrorSeverity::Low => 0,
            ErrorSeverity::Medium => 2,
            ErrorSeverity::High => 1,
            ErrorSeverity::Critical => 3,
        }
    }
}

impl From<toml::de::Error> for ConceptsError {
    fn from(e: toml::de::Error) -> Self {
        Self::ConfigError {
            message: format!("TOML parsing error: {}", e),
        }
    }
}

pub type Result<T> = std::result::Result<T, ConceptsError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_storage_errors_are_retryable() {
        let err = ConceptsError::storage("timeout");
        assert_eq!(err.category(), ErrorCategory::Storage);
        assert_eq!(err.severity(), ErrorSeverity::Medium);
        assert_eq!(err.exit_code(), 2);
    }

    #[test]
    fn test_config_errors_map_to_exit_code_one() {
        let err = ConceptsError::MissingConfigError {
            field: "source.bucket".to_string(),
        };
        assert_eq!(err.category(), ErrorCategory::Configuration);
        assert_eq!(err.exit_code(), 1);
        assert!(err.user_friendly_message().contains("source.bucket"));
    }

    #[test]
    fn test_document_error_names_file() {
        let source = serde_json::from_str::<serde_json::Value>("{").unwrap_err();
        let err = ConceptsError::DocumentError {
            path: "concepts/Q1.json".to_string(),
            source,
        };
        assert!(err.to_string().contains("concepts/Q1.json"));
        assert_eq!(err.category(), ErrorCategory::Data);
    }
}
