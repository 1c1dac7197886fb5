//! History scanning.
//!
//! Finds the state a failed execution should resume from: the last task
//! state entered at or before the last recorded failure. Histories arrive
//! already ordered, so the scan never re-sorts.

use serde_json::{Map, Value};

use crate::error::PersistError;
use crate::history::{ExecutionHistory, FailureDetails};

/// What the scanner found in an execution history.
#[derive(Debug, Clone, PartialEq)]
pub struct ScanResult {
    /// Name of the state to resume
    pub resume_state: String,

    /// Decoded input of the resume state, fields in their original order
    pub base_input: Map<String, Value>,

    /// Id of the `TaskStateEntered` event the resume state came from
    pub state_event_id: i64,

    /// The last failure in the history, with its event id
    pub failure: Option<(i64, FailureDetails)>,
}

/// Scans `history` for the resume state and the failure point.
///
/// The failure point is the last `LambdaFunctionFailed` event, or the end of
/// the history when there is none. The resume state is the last
/// `TaskStateEntered` event before that point.
///
/// # Errors
///
/// - [`PersistError::MissingState`] when no state was entered before the
///   failure point.
/// - [`PersistError::MalformedInput`] when the state's input is not a JSON
///   object.
pub fn scan(execution_arn: &str, history: &ExecutionHistory) -> Result<ScanResult, PersistError> {
    let events = &history.events;
    let failure_index = events.iter().rposition(|event| event.is_failure());
    let search_end = failure_index.unwrap_or(events.len());

    let (state_event_id, details) = events[..search_end]
        .iter()
        .rev()
        .find_map(|event| event.state_entered_details().map(|d| (event.id, d)))
        .ok_or_else(|| PersistError::missing_state(execution_arn))?;

    let failure = failure_index.map(|index| {
        let event = &events[index];
        (event.id, event.failure_details().cloned().unwrap_or_default())
    });

    tracing::debug!(
        execution_arn = %execution_arn,
        resume_state = %details.name,
        state_event_id = state_event_id,
        failure_event_id = ?failure.as_ref().map(|(id, _)| *id),
        "Scanned execution history"
    );

    Ok(ScanResult {
        resume_state: details.name.clone(),
        base_input: decode_input(&details.name, details.input.as_deref())?,
        state_event_id,
        failure,
    })
}

/// Decodes a state's JSON input into an ordered object.
///
/// A state without input decodes to an empty object.
pub fn decode_input(state_name: &str, input: Option<&str>) -> Result<Map<String, Value>, PersistError> {
    let Some(input) = input else {
        return Ok(Map::new());
    };

    match serde_json::from_str::<Value>(input) {
        Ok(Value::Object(fields)) => Ok(fields),
        Ok(other) => Err(PersistError::malformed_input(
            state_name,
            format!("expected a JSON object, found {}", json_kind(&other)),
        )),
        Err(e) => Err(PersistError::malformed_input(state_name, e.to_string())),
    }
}

fn json_kind(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "a boolean",
        Value::Number(_) => "a number",
        Value::String(_) => "a string",
        Value::Array(_) => "an array",
        Value::Object(_) => "an object",
    }
}
