//! Error types for the CineMatch recommendation backend
//!
//! A single closed taxonomy shared across crates. Errors raised inside the
//! recompute pipeline stay inside the scheduler (they only affect model
//! freshness); errors on the read path are surfaced to the caller.

use thiserror::Error;

type BoxedSource = Box<dyn std::error::Error + Send + Sync>;

/// Error taxonomy for the recommendation backend
#[derive(Debug, Error)]
pub enum CineMatchError {
    /// A malformed interaction record. Individual records are skipped and
    /// counted during a matrix build; the build itself carries on.
    #[error("Invalid interaction: {message}")]
    InvalidInteraction { message: String },

    /// A caller-supplied argument failed validation. Surfaced synchronously,
    /// never retried.
    #[error("Invalid argument: {message}")]
    InvalidArgument {
        message: String,
        field: Option<String>,
    },

    /// A recompute cycle failed end to end. The previous snapshot stays
    /// live; the scheduler retries on the next cycle with backoff.
    #[error("Model rebuild failed: {message}")]
    BuildFailure {
        message: String,
        #[source]
        source: Option<BoxedSource>,
    },

    /// The interaction store could not be read or written.
    #[error("Interaction store error: {message}")]
    StorageError {
        message: String,
        #[source]
        source: Option<BoxedSource>,
    },

    /// Configuration could not be loaded or failed validation.
    #[error("Configuration error: {message}")]
    ConfigurationError { message: String },
}

impl CineMatchError {
    pub fn invalid_interaction(message: impl Into<String>) -> Self {
        Self::InvalidInteraction {
            message: message.into(),
        }
    }

    pub fn invalid_argument(message: impl Into<String>) -> Self {
        Self::InvalidArgument {
            message: message.into(),
            field: None,
        }
    }

    /// Invalid argument tied to a named field
    pub fn invalid_argument_field(message: impl Into<String>, field: impl Into<String>) -> Self {
        Self::InvalidArgument {
            message: message.into(),
            field: Some(field.into()),
        }
    }

    pub fn build_failure(message: impl Into<String>, source: Option<BoxedSource>) -> Self {
        Self::BuildFailure {
            message: message.into(),
            source,
        }
    }

    pub fn storage(message: impl Into<String>, source: Option<BoxedSource>) -> Self {
        Self::StorageError {
            message: message.into(),
            source,
        }
    }

    pub fn configuration(message: impl Into<String>) -> Self {
        Self::ConfigurationError {
            message: message.into(),
        }
    }

    /// Whether a later attempt could plausibly succeed.
    ///
    /// Build and storage failures are transient from the scheduler's point of
    /// view; validation and configuration problems are not.
    pub fn is_retryable(&self) -> bool {
        matches!(
            self,
            Self::BuildFailure { .. } | Self::StorageError { .. }
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_retryable_classification() {
        assert!(CineMatchError::build_failure("store down", None).is_retryable());
        assert!(CineMatchError::storage("io", None).is_retryable());
        assert!(!CineMatchError::invalid_argument("topN must be positive").is_retryable());
        assert!(!CineMatchError::configuration("bad metric").is_retryable());
        assert!(!CineMatchError::invalid_interaction("empty user id").is_retryable());
    }

    #[test]
    fn test_display_includes_message() {
        let err = CineMatchError::invalid_argument_field("must be positive", "top_n");
        assert!(err.to_string().contains("must be positive"));
    }
}
