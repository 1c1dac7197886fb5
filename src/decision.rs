//! Failure counting and the resume-or-escalate decision.
//!
//! The running failure count travels inside the state input itself under
//! [`STEP_FUNCTION_FAILS_KEY`]. Each failure increments it; the routing
//! decision then either sends the state back to the queue or gives up and
//! notifies.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::error::PersistError;
use crate::scanner::ScanResult;

/// Payload key holding the accumulated failure count.
pub const STEP_FUNCTION_FAILS_KEY: &str = "stepFunctionFails";

/// Payload key holding the state to resume.
pub const RESUME_STATE_KEY: &str = "resumeState";

/// Policy deciding when a failing state is given up on.
///
/// An invocation flagged with `stepFunctionFails` always escalates. When
/// `max_fails` is set, a state whose incremented count reaches it escalates
/// as well.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct FailurePolicy {
    /// Failure count at which a state is given up on
    pub max_fails: Option<u64>,
}

impl FailurePolicy {
    /// Creates a policy that escalates on the invocation flag only.
    pub fn flag_only() -> Self {
        Self { max_fails: None }
    }

    /// Creates a policy that also escalates once `max_fails` is reached.
    pub fn with_max_fails(max_fails: u64) -> Self {
        Self {
            max_fails: Some(max_fails),
        }
    }

    /// Returns why a state at `new_fails` should escalate, if it should.
    pub fn escalation(&self, flagged: bool, new_fails: u64) -> Option<EscalationReason> {
        if flagged {
            return Some(EscalationReason::Flagged);
        }
        match self.max_fails {
            Some(max_fails) if new_fails >= max_fails => {
                Some(EscalationReason::ThresholdReached { max_fails })
            }
            _ => None,
        }
    }
}

/// Why an invocation was routed to the terminal path.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EscalationReason {
    /// The invocation itself carried `stepFunctionFails`
    Flagged,
    /// The incremented count reached the configured maximum
    ThresholdReached {
        /// The configured maximum
        max_fails: u64,
    },
}

/// Ordered JSON object sent to the queue or the notification topic.
///
/// All fields of the original state input are kept verbatim and in order;
/// only [`STEP_FUNCTION_FAILS_KEY`] and [`RESUME_STATE_KEY`] are overwritten.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(transparent)]
pub struct FailurePayload(Map<String, Value>);

impl FailurePayload {
    /// Returns the accumulated failure count.
    pub fn step_function_fails(&self) -> Option<u64> {
        self.0.get(STEP_FUNCTION_FAILS_KEY).and_then(Value::as_u64)
    }

    /// Returns the state to resume.
    pub fn resume_state(&self) -> Option<&str> {
        self.0.get(RESUME_STATE_KEY).and_then(Value::as_str)
    }

    /// Returns the payload fields.
    pub fn as_map(&self) -> &Map<String, Value> {
        &self.0
    }

    /// Consumes the payload, returning its fields.
    pub fn into_map(self) -> Map<String, Value> {
        self.0
    }

    /// Serializes the payload into a message body.
    pub fn to_json(&self) -> Result<String, PersistError> {
        Ok(serde_json::to_string(&self.0)?)
    }
}

impl From<FailurePayload> for Value {
    fn from(payload: FailurePayload) -> Self {
        Value::Object(payload.0)
    }
}

/// Outcome of a failure decision.
#[derive(Debug, Clone, PartialEq)]
pub enum FailureDecision {
    /// Retry: send the payload to the resume queue
    Resume(FailurePayload),
    /// Give up: publish the payload as a terminal notification
    Terminal(FailurePayload),
}

impl FailureDecision {
    /// Returns the payload regardless of route.
    pub fn payload(&self) -> &FailurePayload {
        match self {
            Self::Resume(payload) | Self::Terminal(payload) => payload,
        }
    }

    /// Returns true if the decision is to resume.
    pub fn is_resume(&self) -> bool {
        matches!(self, Self::Resume(_))
    }

    /// Returns true if the decision is to give up.
    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Terminal(_))
    }
}

/// Decides how to route a failed state.
///
/// `flagged` is true when the invocation event carried a `stepFunctionFails`
/// field, whatever its value.
///
/// # Errors
///
/// [`PersistError::MalformedInput`] if the state's declared failure count is
/// not a non-negative integer.
pub fn decide(
    scan: ScanResult,
    flagged: bool,
    policy: &FailurePolicy,
) -> Result<FailureDecision, PersistError> {
    let declared = declared_fails(&scan.resume_state, &scan.base_input)?;
    let new_fails = declared.saturating_add(1);
    let ScanResult {
        resume_state,
        base_input: mut fields,
        ..
    } = scan;

    match policy.escalation(flagged, new_fails) {
        Some(reason) => {
            tracing::warn!(
                resume_state = %resume_state,
                step_function_fails = new_fails,
                reason = ?reason,
                "Failure limit reached, escalating"
            );
            fields.insert(STEP_FUNCTION_FAILS_KEY.to_string(), Value::from(new_fails));
            fields.insert(RESUME_STATE_KEY.to_string(), Value::String(resume_state));
            Ok(FailureDecision::Terminal(FailurePayload(fields)))
        }
        None => {
            tracing::info!(
                resume_state = %resume_state,
                step_function_fails = new_fails,
                "Scheduling resume"
            );
            fields.insert(RESUME_STATE_KEY.to_string(), Value::String(resume_state));
            fields.insert(STEP_FUNCTION_FAILS_KEY.to_string(), Value::from(new_fails));
            Ok(FailureDecision::Resume(FailurePayload(fields)))
        }
    }
}

/// Reads the failure count a state's input declares. Absent or null is 0.
fn declared_fails(state_name: &str, input: &Map<String, Value>) -> Result<u64, PersistError> {
    match input.get(STEP_FUNCTION_FAILS_KEY) {
        None | Some(Value::Null) => Ok(0),
        Some(Value::Number(n)) => n.as_u64().or_else(|| integral(n.as_f64()?)).ok_or_else(|| {
            PersistError::malformed_input(
                state_name,
                format!("{} must be a non-negative integer, got {}", STEP_FUNCTION_FAILS_KEY, n),
            )
        }),
        Some(Value::String(s)) => s.trim().parse::<u64>().map_err(|_| {
            PersistError::malformed_input(
                state_name,
                format!("{} must be a non-negative integer, got {:?}", STEP_FUNCTION_FAILS_KEY, s),
            )
        }),
        Some(other) => Err(PersistError::malformed_input(
            state_name,
            format!("{} must be a non-negative integer, got {}", STEP_FUNCTION_FAILS_KEY, other),
        )),
    }
}

/// Accepts floats such as `10.0` that carry a whole, non-negative count.
fn integral(value: f64) -> Option<u64> {
    if value.fract() == 0.0 && value >= 0.0 && value <= u64::MAX as f64 {
        Some(value as u64)
    } else {
        None
    }
}
