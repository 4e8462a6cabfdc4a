use thiserror::Error;

use crate::config::ConfigError;
use crate::container::diagnostics::ResolutionFailure;

/// Core error type for the resolver crate
#[derive(Debug, Error)]
pub enum CoreError {
    #[error("YAML parsing error: {0}")]
    Yaml(#[from] serde_yaml::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error(transparent)]
    Resolution(#[from] ResolutionFailure),

    #[error("Configuration error: {0}")]
    Configuration(#[from] ConfigError),

    #[error("Invalid registration: {message}")]
    Registration { message: String },

    #[error("Registry validation failed with {} failure(s)", .failures.len())]
    Validation { failures: Vec<ResolutionFailure> },
}

impl CoreError {
    /// Create a new registration error
    pub fn registration(message: impl Into<String>) -> Self {
        Self::Registration {
            message: message.into(),
        }
    }

    /// Check if the error is a resolution failure
    pub fn is_resolution(&self) -> bool {
        matches!(self, Self::Resolution(_))
    }

    /// Check if the error is a registration error
    pub fn is_registration(&self) -> bool {
        matches!(self, Self::Registration { .. })
    }

    /// Borrow the underlying resolution failure, if any
    pub fn as_resolution(&self) -> Option<&ResolutionFailure> {
        match self {
            Self::Resolution(failure) => Some(failure),
            _ => None,
        }
    }

    /// Failures collected by registry validation
    pub fn validation_failures(&self) -> &[ResolutionFailure] {
        match self {
            Self::Validation { failures } => failures,
            _ => &[],
        }
    }
}
