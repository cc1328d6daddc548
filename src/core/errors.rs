use thiserror::Error;

/// Unified error type for the coroflow library
#[derive(Debug, Error)]
pub enum CoroError {
    /// Identity requested before the coroutine was scheduled
    #[error("Coroutine has not been scheduled yet")]
    Unscheduled,

    /// The coroutine existed once but has since terminated
    #[error("Coroutine #{id} has been destroyed")]
    Destroyed { id: u64 },

    /// An operation requiring a coroutine context was called from outside one
    #[error("Not running inside a coroutine: {operation}")]
    NotInCoroutine { operation: String },

    /// Resource exhaustion errors
    #[error("Resource exhausted: {resource} (current: {current}, limit: {limit})")]
    ResourceExhaustion {
        resource: String,
        current: u64,
        limit: u64,
    },

    /// Configuration errors
    #[error("Configuration error: {message}")]
    Configuration {
        message: String,
        field: Option<String>,
    },

    /// Serialization errors
    #[error("Serialization failed: {format}")]
    Serialization {
        format: String,
        #[source]
        source: Box<dyn std::error::Error + Send + Sync>,
    },

    /// Network/IO errors
    #[error("IO operation failed: {operation}")]
    Io {
        operation: String,
        #[source]
        source: std::io::Error,
    },

    /// Generic internal errors
    #[error("Internal error: {message}")]
    Internal {
        message: String,
        #[source]
        source: Option<Box<dyn std::error::Error + Send + Sync>>,
    },
}

impl CoroError {
    /// Create a destroyed-coroutine error
    pub fn destroyed(id: u64) -> Self {
        Self::Destroyed { id }
    }

    /// Create a non-coroutine-environment error
    pub fn not_in_coroutine<S: Into<String>>(operation: S) -> Self {
        Self::NotInCoroutine {
            operation: operation.into(),
        }
    }

    /// Create a resource exhaustion error
    pub fn resource_exhausted<S: Into<String>>(resource: S, current: u64, limit: u64) -> Self {
        Self::ResourceExhaustion {
            resource: resource.into(),
            current,
            limit,
        }
    }

    /// Create a configuration error
    pub fn configuration<S: Into<String>>(message: S) -> Self {
        Self::Configuration {
            message: message.into(),
            field: None,
        }
    }

    /// Create a configuration error with field
    pub fn configuration_field<S: Into<String>, F: Into<String>>(message: S, field: F) -> Self {
        Self::Configuration {
            message: message.into(),
            field: Some(field.into()),
        }
    }

    /// Create a serialization error
    pub fn serialization<S: Into<String>, E: std::error::Error + Send + Sync + 'static>(
        format: S,
        source: E,
    ) -> Self {
        Self::Serialization {
            format: format.into(),
            source: Box::new(source),
        }
    }

    /// Create an IO error
    pub fn io<S: Into<String>>(operation: S, source: std::io::Error) -> Self {
        Self::Io {
            operation: operation.into(),
            source,
        }
    }

    /// Create an internal error
    pub fn internal<S: Into<String>>(message: S) -> Self {
        Self::Internal {
            message: message.into(),
            source: None,
        }
    }

    /// Check if error is recoverable
    pub fn is_recoverable(&self) -> bool {
        match self {
            // "No longer exists" is an answer, not a crash
            Self::Destroyed { .. } => true,
            Self::Io { .. } => true,
            Self::ResourceExhaustion { .. } => true, // May be recoverable after coroutines drain
            Self::Unscheduled | Self::NotInCoroutine { .. } => false,
            Self::Configuration { .. } | Self::Serialization { .. } => false,
            Self::Internal { .. } => false,
        }
    }

    /// Get error category for metrics/logging
    pub fn category(&self) -> &'static str {
        match self {
            Self::Unscheduled => "unscheduled",
            Self::Destroyed { .. } => "destroyed",
            Self::NotInCoroutine { .. } => "not_in_coroutine",
            Self::ResourceExhaustion { .. } => "resource",
            Self::Configuration { .. } => "configuration",
            Self::Serialization { .. } => "serialization",
            Self::Io { .. } => "io",
            Self::Internal { .. } => "internal",
        }
    }
}

/// Result type alias for convenience
pub type Result<T> = std::result::Result<T, CoroError>;

/// Convert from common error types
impl From<std::io::Error> for CoroError {
    fn from(err: std::io::Error) -> Self {
        Self::io("io_operation", err)
    }
}

impl From<serde_json::Error> for CoroError {
    fn from(err: serde_json::Error) -> Self {
        Self::serialization("json", err)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_creation() {
        let err = CoroError::destroyed(7);
        assert!(matches!(err, CoroError::Destroyed { id: 7 }));
        assert_eq!(err.category(), "destroyed");

        let err = CoroError::not_in_coroutine("parent_of");
        assert_eq!(err.category(), "not_in_coroutine");
        assert_eq!(err.to_string(), "Not running inside a coroutine: parent_of");
    }

    #[test]
    fn test_error_recoverability() {
        assert!(CoroError::destroyed(1).is_recoverable());
        assert!(CoroError::resource_exhausted("coroutines", 101, 100).is_recoverable());
        assert!(!CoroError::Unscheduled.is_recoverable());
        assert!(!CoroError::not_in_coroutine("defer").is_recoverable());
        assert!(!CoroError::configuration("bad").is_recoverable());
    }

    #[test]
    fn test_resource_exhaustion_message() {
        let err = CoroError::resource_exhausted("coroutines", 101, 100);
        assert_eq!(
            err.to_string(),
            "Resource exhausted: coroutines (current: 101, limit: 100)"
        );
    }
}
