use thiserror::Error;

/// Top-level error type for the Sentio service.
///
/// Subsystem crates define their own error types and implement
/// `From<SubsystemError> for SentioError` so that `?` works across crate
/// boundaries in the composition root.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum SentioError {
    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Storage error: {0}")]
    Storage(String),

    #[error("Generation error: {0}")]
    Generation(String),

    #[error("API error: {0}")]
    Api(String),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    Serialization(String),
}

impl From<toml::de::Error> for SentioError {
    fn from(err: toml::de::Error) -> Self {
        SentioError::Config(err.to_string())
    }
}

impl From<toml::ser::Error> for SentioError {
    fn from(err: toml::ser::Error) -> Self {
        SentioError::Config(err.to_string())
    }
}

impl From<serde_json::Error> for SentioError {
    fn from(err: serde_json::Error) -> Self {
        SentioError::Serialization(err.to_string())
    }
}

/// A specialized `Result` type for Sentio operations.
pub type Result<T> = std::result::Result<T, SentioError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        let err = SentioError::Config("missing field".to_string());
        assert_eq!(err.to_string(), "Configuration error: missing field");

        let err = SentioError::Generation("quota exceeded".to_string());
        assert_eq!(err.to_string(), "Generation error: quota exceeded");
    }

    #[test]
    fn test_io_error_conversion() {
        let io_err = std::io::Error::new(std::io::ErrorKind::NotFound, "file not found");
        let err: SentioError = io_err.into();
        assert!(matches!(err, SentioError::Io(_)));
        assert!(err.to_string().contains("file not found"));
    }

    #[test]
    fn test_toml_error_conversion() {
        let toml_err = toml::from_str::<toml::Value>("not = [valid").unwrap_err();
        let err: SentioError = toml_err.into();
        assert!(matches!(err, SentioError::Config(_)));
    }

    #[test]
    fn test_serde_json_error_conversion() {
        let json_err = serde_json::from_str::<serde_json::Value>("{broken").unwrap_err();
        let err: SentioError = json_err.into();
        assert!(matches!(err, SentioError::Serialization(_)));
    }
}
