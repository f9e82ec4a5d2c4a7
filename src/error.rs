//! Error types for pipeline operations.

use thiserror::Error;

/// Convenient result alias used across the crate.
pub type Result<T> = std::result::Result<T, PipelineError>;

/// Error type for every pipeline operation.
///
/// Unseen categories and unseen vocabulary terms at inference time are not
/// errors; encoders and vectorizers handle them with their fallback.
#[derive(Debug, Error)]
pub enum PipelineError {
    /// Invalid or incomplete pipeline configuration. Raised before any data is touched.
    #[error("Configuration error: {0}")]
    Configuration(String),
    /// A sub-component could not be fit on the training data.
    #[error("Fit error in {component}: {detail}")]
    Fit { component: String, detail: String },
    /// An operation that needs fitted state was called on an unfit model.
    #[error("Not fitted: {0} requires a fitted model; call fit or load first")]
    NotFitted(String),
    /// Inference input does not match what the fitted pipeline expects.
    #[error("Transform mismatch: {0}")]
    TransformMismatch(String),
    /// Malformed input data (lengths, non-finite targets, unparsable rows).
    #[error("Invalid data: {0}")]
    InvalidData(String),
    /// Artifact or parameter (de)serialization failure.
    #[error("Serialization error: {0}")]
    Serialization(String),
    /// I/O error during file operations.
    #[error("I/O error: {0}")]
    Io(String),
}

impl PipelineError {
    /// Shorthand for a [`PipelineError::Fit`] error.
    pub fn fit(component: impl Into<String>, detail: impl Into<String>) -> Self {
        PipelineError::Fit {
            component: component.into(),
            detail: detail.into(),
        }
    }
}

impl From<std::io::Error> for PipelineError {
    fn from(err: std::io::Error) -> Self {
        PipelineError::Io(err.to_string())
    }
}

impl From<bincode::Error> for PipelineError {
    fn from(err: bincode::Error) -> Self {
        PipelineError::Serialization(err.to_string())
    }
}

impl From<serde_json::Error> for PipelineError {
    fn from(err: serde_json::Error) -> Self {
        PipelineError::Serialization(err.to_string())
    }
}

impl From<csv::Error> for PipelineError {
    fn from(err: csv::Error) -> Self {
        PipelineError::InvalidData(err.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display_configuration() {
        let err = PipelineError::Configuration("column 'designer' assigned twice".to_string());
        assert!(err.to_string().contains("Configuration error"));
        assert!(err.to_string().contains("designer"));
    }

    #[test]
    fn test_error_display_fit_names_component() {
        let err = PipelineError::fit("text vectorizer[description]", "empty vocabulary");
        let msg = err.to_string();
        assert!(msg.contains("text vectorizer[description]"));
        assert!(msg.contains("empty vocabulary"));
    }

    #[test]
    fn test_error_display_not_fitted() {
        let err = PipelineError::NotFitted("predict".to_string());
        assert!(err.to_string().contains("predict"));
    }

    #[test]
    fn test_error_display_transform_mismatch() {
        let err = PipelineError::TransformMismatch("row 0 is missing 'size'".to_string());
        assert!(err.to_string().contains("Transform mismatch"));
    }

    #[test]
    fn test_error_from_io_error() {
        let io_err = std::io::Error::new(std::io::ErrorKind::NotFound, "test");
        let err: PipelineError = io_err.into();
        assert!(matches!(err, PipelineError::Io(_)));
    }

    #[test]
    fn test_error_from_bincode_error() {
        let bad_bytes: &[u8] = &[0xff, 0xff, 0xff, 0xff];
        let bincode_result: std::result::Result<String, bincode::Error> =
            bincode::deserialize(bad_bytes);
        if let Err(e) = bincode_result {
            let err: PipelineError = e.into();
            assert!(matches!(err, PipelineError::Serialization(_)));
        }
    }

    #[test]
    fn test_error_from_json_error() {
        let json_err = serde_json::from_str::<serde_json::Value>("{").unwrap_err();
        let err: PipelineError = json_err.into();
        assert!(matches!(err, PipelineError::Serialization(_)));
    }

    #[test]
    fn test_error_is_std_error() {
        let err = PipelineError::InvalidData("test".to_string());
        let _: &dyn std::error::Error = &err;
    }
}
