use std::path::PathBuf;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ChartError {
    #[error("feature file not found: {}", path.display())]
    MissingFeatures { path: PathBuf },

    #[error("failed to read feature file {}: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("feature file {} is not valid feature JSON: {source}", path.display())]
    MalformedFeatures {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },

    #[error("invalid features: {0}")]
    InvalidFeatures(String),
}

impl ChartError {
    /// Stable machine-readable code used in error responses.
    pub fn code(&self) -> &'static str {
        match self {
            ChartError::MissingFeatures { .. } => "missing_features",
            ChartError::Io { .. } => "io",
            ChartError::MalformedFeatures { .. } => "malformed_features",
            ChartError::InvalidFeatures(_) => "invalid_features",
        }
    }
}

pub type Result<T> = std::result::Result<T, ChartError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_codes_are_stable() {
        let err = ChartError::MissingFeatures { path: PathBuf::from("song.json") };
        assert_eq!(err.code(), "missing_features");
        assert!(err.to_string().contains("song.json"));

        let err = ChartError::InvalidFeatures("duration must be positive".into());
        assert_eq!(err.code(), "invalid_features");
    }
}
