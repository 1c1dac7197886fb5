//! Error types for the failure-persistence handler.
//!
//! Every error aborts the current invocation. None of them are retried here;
//! the orchestrator that invoked the handler owns retry and backoff.

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// The main error type for the failure-persistence handler.
#[derive(Debug, Error)]
pub enum PersistError {
    /// The history holds no `TaskStateEntered` event to resume from.
    #[error("No resumable state found in execution history of {execution_arn}")]
    MissingState {
        /// The execution whose history was scanned
        execution_arn: String,
    },

    /// The resume state's input could not be used to build a payload.
    #[error("Malformed input for state '{state_name}': {message}")]
    MalformedInput {
        /// Name of the state whose input was rejected
        state_name: String,
        /// What was wrong with the input
        message: String,
    },

    /// The execution history document could not be decoded.
    #[error("Malformed execution history: {message}")]
    MalformedHistory {
        /// Error message describing the decode failure
        message: String,
    },

    /// A call to an external collaborator failed.
    #[error("Transport error during {operation}: {message}")]
    Transport {
        /// The collaborator operation that failed
        operation: String,
        /// Error message reported by the collaborator
        message: String,
    },

    /// A required setting is missing or invalid.
    #[error("Configuration error: {message}")]
    Configuration {
        /// Error message describing the configuration problem
        message: String,
    },

    /// Serialization/deserialization error.
    #[error("Serialization error: {message}")]
    SerDes {
        /// Error message describing the serialization failure
        message: String,
    },
}

impl PersistError {
    /// Creates a new MissingState error.
    pub fn missing_state(execution_arn: impl Into<String>) -> Self {
        Self::MissingState {
            execution_arn: execution_arn.into(),
        }
    }

    /// Creates a new MalformedInput error.
    pub fn malformed_input(state_name: impl Into<String>, message: impl Into<String>) -> Self {
        Self::MalformedInput {
            state_name: state_name.into(),
            message: message.into(),
        }
    }

    /// Creates a new MalformedHistory error.
    pub fn malformed_history(message: impl Into<String>) -> Self {
        Self::MalformedHistory {
            message: message.into(),
        }
    }

    /// Creates a new Transport error.
    pub fn transport(operation: impl Into<String>, message: impl Into<String>) -> Self {
        Self::Transport {
            operation: operation.into(),
            message: message.into(),
        }
    }

    /// Creates a new Configuration error.
    pub fn configuration(message: impl Into<String>) -> Self {
        Self::Configuration {
            message: message.into(),
        }
    }

    /// Returns true if the failure came from an external collaborator.
    ///
    /// Only these are worth retrying from the orchestrator's side; every
    /// other variant fails again on the same history.
    pub fn is_transport(&self) -> bool {
        matches!(self, Self::Transport { .. })
    }
}

/// Error object for structured logging and Lambda error responses.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ErrorObject {
    /// The error type/name
    #[serde(rename = "errorType")]
    pub error_type: String,
    /// The error message
    #[serde(rename = "errorMessage")]
    pub error_message: String,
}

impl ErrorObject {
    /// Creates a new ErrorObject.
    pub fn new(error_type: impl Into<String>, error_message: impl Into<String>) -> Self {
        Self {
            error_type: error_type.into(),
            error_message: error_message.into(),
        }
    }
}

impl From<&PersistError> for ErrorObject {
    fn from(error: &PersistError) -> Self {
        let error_type = match error {
            PersistError::MissingState { .. } => "MissingStateError",
            PersistError::MalformedInput { .. } => "MalformedInputError",
            PersistError::MalformedHistory { .. } => "MalformedHistoryError",
            PersistError::Transport { .. } => "TransportError",
            PersistError::Configuration { .. } => "ConfigurationError",
            PersistError::SerDes { .. } => "SerDesError",
        };
        ErrorObject::new(error_type, error.to_string())
    }
}

impl From<serde_json::Error> for PersistError {
    fn from(error: serde_json::Error) -> Self {
        Self::SerDes {
            message: error.to_string(),
        }
    }
}
