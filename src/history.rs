//! Execution history types.
//!
//! These mirror the event shape returned by the Step Functions
//! `GetExecutionHistory` API. Only the event types that drive routing are
//! modelled in detail; every other type is carried through untouched.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::error::PersistError;

/// One entry of an execution history.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct HistoryEvent {
    /// When the event was recorded
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub timestamp: Option<DateTime<Utc>>,

    /// Monotonically increasing id within one history
    pub id: i64,

    /// Id of the preceding event, 0 for the first one
    #[serde(default)]
    pub previous_event_id: i64,

    /// The event type
    #[serde(rename = "type")]
    pub event_type: HistoryEventType,

    /// Details of an `ExecutionStarted` event
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub execution_started_event_details: Option<ExecutionStartedDetails>,

    /// Details of a `TaskStateEntered` event
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub state_entered_event_details: Option<StateEnteredDetails>,

    /// Details of a `LambdaFunctionFailed` event
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub lambda_function_failed_event_details: Option<FailureDetails>,
}

impl HistoryEvent {
    /// Creates a new event with no details attached.
    pub fn new(id: i64, previous_event_id: i64, event_type: HistoryEventType) -> Self {
        Self {
            timestamp: None,
            id,
            previous_event_id,
            event_type,
            execution_started_event_details: None,
            state_entered_event_details: None,
            lambda_function_failed_event_details: None,
        }
    }

    /// Creates a `TaskStateEntered` event.
    pub fn state_entered(
        id: i64,
        previous_event_id: i64,
        name: impl Into<String>,
        input: impl Into<String>,
    ) -> Self {
        let mut event = Self::new(id, previous_event_id, HistoryEventType::TaskStateEntered);
        event.state_entered_event_details = Some(StateEnteredDetails {
            name: name.into(),
            input: Some(input.into()),
        });
        event
    }

    /// Creates a `LambdaFunctionFailed` event.
    pub fn lambda_failed(id: i64, previous_event_id: i64, cause: impl Into<String>) -> Self {
        let mut event = Self::new(id, previous_event_id, HistoryEventType::LambdaFunctionFailed);
        event.lambda_function_failed_event_details = Some(FailureDetails {
            error: None,
            cause: Some(cause.into()),
        });
        event
    }

    /// Sets the timestamp for this event.
    pub fn with_timestamp(mut self, timestamp: DateTime<Utc>) -> Self {
        self.timestamp = Some(timestamp);
        self
    }

    /// Returns true if this event marks entry into a task state.
    pub fn is_state_entered(&self) -> bool {
        self.event_type == HistoryEventType::TaskStateEntered
    }

    /// Returns true if this event records a failed task.
    pub fn is_failure(&self) -> bool {
        self.event_type == HistoryEventType::LambdaFunctionFailed
    }

    /// Returns the state-entered details, if this is a `TaskStateEntered` event.
    pub fn state_entered_details(&self) -> Option<&StateEnteredDetails> {
        if self.is_state_entered() {
            self.state_entered_event_details.as_ref()
        } else {
            None
        }
    }

    /// Returns the failure details, if this is a `LambdaFunctionFailed` event.
    pub fn failure_details(&self) -> Option<&FailureDetails> {
        if self.is_failure() {
            self.lambda_function_failed_event_details.as_ref()
        } else {
            None
        }
    }
}

/// The type of a history event.
///
/// Types the handler does not act on are kept as [`HistoryEventType::Other`]
/// so that a history round-trips without loss.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum HistoryEventType {
    /// The execution started
    ExecutionStarted,
    /// A task state was entered
    TaskStateEntered,
    /// A Lambda task failed
    LambdaFunctionFailed,
    /// Any other event type
    Other(String),
}

impl HistoryEventType {
    /// Returns the wire name of this event type.
    pub fn as_str(&self) -> &str {
        match self {
            Self::ExecutionStarted => "ExecutionStarted",
            Self::TaskStateEntered => "TaskStateEntered",
            Self::LambdaFunctionFailed => "LambdaFunctionFailed",
            Self::Other(name) => name,
        }
    }
}

impl From<&str> for HistoryEventType {
    fn from(name: &str) -> Self {
        match name {
            "ExecutionStarted" => Self::ExecutionStarted,
            "TaskStateEntered" => Self::TaskStateEntered,
            "LambdaFunctionFailed" => Self::LambdaFunctionFailed,
            other => Self::Other(other.to_string()),
        }
    }
}

impl From<String> for HistoryEventType {
    fn from(name: String) -> Self {
        Self::from(name.as_str())
    }
}

impl From<HistoryEventType> for String {
    fn from(event_type: HistoryEventType) -> Self {
        event_type.as_str().to_string()
    }
}

impl std::fmt::Display for HistoryEventType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Details of an `ExecutionStarted` event.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct ExecutionStartedDetails {
    /// JSON-encoded execution input
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub input: Option<String>,
}

/// Details of a `TaskStateEntered` event.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StateEnteredDetails {
    /// Name of the state that was entered
    pub name: String,

    /// JSON-encoded state input
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub input: Option<String>,
}

/// Details of a `LambdaFunctionFailed` event.
///
/// Only the presence of a failure matters for routing; the contents are logged.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct FailureDetails {
    /// Error name reported by the task
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,

    /// JSON-encoded failure cause
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub cause: Option<String>,
}

/// Ordered execution history, oldest event first.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ExecutionHistory {
    /// The events, in chronological order
    #[serde(default)]
    pub events: Vec<HistoryEvent>,

    /// Pagination token if more events are available
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub next_token: Option<String>,
}

impl ExecutionHistory {
    /// Creates a history from events that are already in order.
    pub fn with_events(events: Vec<HistoryEvent>) -> Self {
        Self {
            events,
            next_token: None,
        }
    }

    /// Decodes a history from its JSON form.
    pub fn from_json(json: &str) -> Result<Self, PersistError> {
        serde_json::from_str(json).map_err(|e| PersistError::malformed_history(e.to_string()))
    }

    /// Returns the number of events.
    pub fn len(&self) -> usize {
        self.events.len()
    }

    /// Returns true if there are no events.
    pub fn is_empty(&self) -> bool {
        self.events.is_empty()
    }
}
