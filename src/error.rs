//! Error types for mockset.
//!
//! All errors are strongly typed using thiserror so tests can match on the
//! exact misconfiguration instead of parsing messages. Every message names the
//! entity or type involved.

use thiserror::Error;

/// Configuration errors: the set cannot do what was asked until the caller
/// supplies something (an identity function, a registered set).
#[derive(Debug, Error)]
pub enum ConfigurationError {
    #[error(
        "Couldn't determine the key of entity '{entity}' (tried properties {tried:?}); \
         supply one with set_identity_function() before calling find()"
    )]
    KeyNotDerivable {
        entity: String,
        tried: Vec<String>,
    },

    #[error("Key property '{property}' of entity '{entity}' has unsupported shape: {shape}")]
    UnsupportedKeyShape {
        entity: String,
        property: String,
        shape: String,
    },

    #[error("No entity set registered for type '{type_name}'")]
    UnregisteredSet {
        type_name: String,
    },
}

/// Invalid operations: the call itself is malformed.
#[derive(Debug, Error)]
pub enum InvalidOperationError {
    #[error(
        "Number of keys passed to find() on '{entity}' is {actual}, \
         but the entity key has {expected}"
    )]
    KeyCountMismatch {
        entity: String,
        expected: usize,
        actual: usize,
    },

    #[error("{operation}() on '{element}': sequence contains no elements")]
    EmptySequence {
        operation: &'static str,
        element: &'static str,
    },
}

/// Instantiation errors from `create` / `create_derived`.
#[derive(Debug, Error)]
pub enum InstantiationError {
    #[error("Type '{type_name}' has no registered factory and cannot be default-constructed")]
    NoFactory {
        type_name: String,
    },
}

/// Top-level error type for mockset.
#[derive(Debug, Error)]
pub enum MockError {
    #[error("Configuration error: {0}")]
    Configuration(#[from] ConfigurationError),

    #[error("Invalid operation: {0}")]
    InvalidOperation(#[from] InvalidOperationError),

    #[error("Instantiation error: {0}")]
    Instantiation(#[from] InstantiationError),

    #[error("Failed to extract key from '{entity}': {message}")]
    KeyExtraction {
        entity: String,
        message: String,
    },

    #[error("Poisoned lock: {context}")]
    Poisoned {
        context: &'static str,
    },
}

impl MockError {
    /// Returns true if this is a configuration error.
    #[must_use]
    pub const fn is_configuration(&self) -> bool {
        matches!(self, Self::Configuration(_))
    }

    /// Returns true if this is an invalid operation error.
    #[must_use]
    pub const fn is_invalid_operation(&self) -> bool {
        matches!(self, Self::InvalidOperation(_))
    }

    /// Returns true if this is an instantiation error.
    #[must_use]
    pub const fn is_instantiation(&self) -> bool {
        matches!(self, Self::Instantiation(_))
    }

    /// Returns true if a shared lock was poisoned by a panicking holder.
    #[must_use]
    pub const fn is_poisoned(&self) -> bool {
        matches!(self, Self::Poisoned { .. })
    }
}

/// Maps a poisoned-lock failure into a [`MockError`].
pub(crate) fn lock_err(context: &'static str) -> MockError {
    MockError::Poisoned { context }
}

/// Result type alias for mockset operations.
pub type MockResult<T> = Result<T, MockError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_key_not_derivable_names_entity_and_candidates() {
        let err = ConfigurationError::KeyNotDerivable {
            entity: "Plan".to_string(),
            tried: vec!["Id".to_string(), "PlanId".to_string()],
        };
        let msg = format!("{err}");
        assert!(msg.contains("Plan"));
        assert!(msg.contains("PlanId"));
        assert!(msg.contains("set_identity_function"));
    }

    #[test]
    fn test_key_count_mismatch_reports_expected_and_actual() {
        let err = InvalidOperationError::KeyCountMismatch {
            entity: "Investment".to_string(),
            expected: 2,
            actual: 1,
        };
        let msg = format!("{err}");
        assert!(msg.contains("Investment"));
        assert!(msg.contains("is 1"));
        assert!(msg.contains("has 2"));
    }

    #[test]
    fn test_no_factory_names_type() {
        let err = InstantiationError::NoFactory {
            type_name: "Employee".to_string(),
        };
        assert!(err.to_string().contains("Employee"));
    }

    #[test]
    fn test_mock_error_classification() {
        let err: MockError = ConfigurationError::UnregisteredSet {
            type_name: "Person".to_string(),
        }
        .into();
        assert!(err.is_configuration());
        assert!(!err.is_invalid_operation());

        let err: MockError = InvalidOperationError::EmptySequence {
            operation: "first",
            element: "Person",
        }
        .into();
        assert!(err.is_invalid_operation());
        assert!(err.to_string().contains("first()"));

        let err: MockError = InstantiationError::NoFactory {
            type_name: "Person".to_string(),
        }
        .into();
        assert!(err.is_instantiation());

        let err = lock_err("set.store");
        assert!(err.is_poisoned());
        assert!(err.to_string().contains("set.store"));
    }
}
