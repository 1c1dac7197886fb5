//! Shared test utilities for integration tests.
//!
//! Recording mocks for the handler's collaborators, history fixtures and
//! proptest strategies.

#![allow(dead_code)] // These utilities are used by other integration test files

use std::collections::VecDeque;
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use persist_error::{
    ExecutionHistory, ExecutionHistorySource, FailureHandler, HandlerConfig, HistoryEvent,
    HistoryEventType, PersistError, ResumeQueue, TerminalNotifier,
};
use proptest::prelude::*;

pub const QUEUE_URL: &str = "https://sqs.us-south-10.amazonaws.com/887501/some-queue-name";
pub const TOPIC_ARN: &str = "arn:aws:sns:us-south-23:5746521541:fake-notification";
pub const REGION: &str = "us-south-10";
pub const EXECUTION_ARN: &str = "arn:aws:states:us-south-10:98877654311:blah:a17h83j-p84321";

// =============================================================================
// Mock collaborators
// =============================================================================

/// History source returning pre-configured responses.
///
/// Responses are consumed in order; once exhausted, an empty history is
/// returned.
pub struct MockHistorySource {
    responses: Mutex<VecDeque<Result<ExecutionHistory, PersistError>>>,
    calls: Mutex<Vec<String>>,
}

impl MockHistorySource {
    pub fn new() -> Self {
        Self {
            responses: Mutex::new(VecDeque::new()),
            calls: Mutex::new(Vec::new()),
        }
    }

    pub fn with_history(self, history: ExecutionHistory) -> Self {
        self.responses.lock().unwrap().push_back(Ok(history));
        self
    }

    pub fn with_response(self, response: Result<ExecutionHistory, PersistError>) -> Self {
        self.responses.lock().unwrap().push_back(response);
        self
    }

    pub fn get_calls(&self) -> Vec<String> {
        self.calls.lock().unwrap().clone()
    }
}

#[async_trait]
impl ExecutionHistorySource for MockHistorySource {
    async fn fetch_execution_history(
        &self,
        execution_arn: &str,
    ) -> Result<ExecutionHistory, PersistError> {
        self.calls.lock().unwrap().push(execution_arn.to_string());
        self.responses
            .lock()
            .unwrap()
            .pop_front()
            .unwrap_or_else(|| Ok(ExecutionHistory::default()))
    }
}

/// Record of a resume message send.
#[derive(Debug, Clone, PartialEq)]
pub struct SendMessageCall {
    pub queue_url: String,
    pub message_body: String,
    pub region: String,
}

/// Record of a terminal notification publish.
#[derive(Debug, Clone, PartialEq)]
pub struct NotificationCall {
    pub topic_arn: String,
    pub message: String,
}

/// Queue and notifier mock that records every send.
pub struct RecordingSender {
    error: Mutex<Option<PersistError>>,
    messages: Mutex<Vec<SendMessageCall>>,
    notifications: Mutex<Vec<NotificationCall>>,
}

impl RecordingSender {
    pub fn new() -> Self {
        Self {
            error: Mutex::new(None),
            messages: Mutex::new(Vec::new()),
            notifications: Mutex::new(Vec::new()),
        }
    }

    /// Makes the next send fail with `error`.
    pub fn with_error(self, error: PersistError) -> Self {
        *self.error.lock().unwrap() = Some(error);
        self
    }

    pub fn get_messages(&self) -> Vec<SendMessageCall> {
        self.messages.lock().unwrap().clone()
    }

    pub fn get_notifications(&self) -> Vec<NotificationCall> {
        self.notifications.lock().unwrap().clone()
    }

    pub fn total_sends(&self) -> usize {
        self.messages.lock().unwrap().len() + self.notifications.lock().unwrap().len()
    }
}

#[async_trait]
impl ResumeQueue for RecordingSender {
    async fn send_resume_message(
        &self,
        queue_url: &str,
        message_body: &str,
        region: &str,
    ) -> Result<(), PersistError> {
        if let Some(error) = self.error.lock().unwrap().take() {
            return Err(error);
        }
        self.messages.lock().unwrap().push(SendMessageCall {
            queue_url: queue_url.to_string(),
            message_body: message_body.to_string(),
            region: region.to_string(),
        });
        Ok(())
    }
}

#[async_trait]
impl TerminalNotifier for RecordingSender {
    async fn send_terminal_notification(
        &self,
        topic_arn: &str,
        message: &str,
    ) -> Result<(), PersistError> {
        if let Some(error) = self.error.lock().unwrap().take() {
            return Err(error);
        }
        self.notifications.lock().unwrap().push(NotificationCall {
            topic_arn: topic_arn.to_string(),
            message: message.to_string(),
        });
        Ok(())
    }
}

pub fn test_config() -> HandlerConfig {
    HandlerConfig::new(QUEUE_URL, TOPIC_ARN, REGION)
}

/// Builds a handler whose queue and notifier share one recorder.
pub fn create_handler(
    config: HandlerConfig,
    history: Arc<MockHistorySource>,
    sender: Arc<RecordingSender>,
) -> FailureHandler {
    FailureHandler::new(config, history, sender.clone(), sender)
}

// =============================================================================
// History fixtures
// =============================================================================

/// History with a failure in `someState` followed by entry into
/// `someOtherState`.
pub fn failure_history(some_state_input: &str) -> ExecutionHistory {
    ExecutionHistory::with_events(vec![
        HistoryEvent::new(1, 0, HistoryEventType::ExecutionStarted)
            .with_timestamp(at("2375-05-06T17:20:33Z")),
        HistoryEvent::state_entered(2, 1, "someState", some_state_input)
            .with_timestamp(at("2375-05-06T17:21:05Z")),
        HistoryEvent::lambda_failed(3, 2, r#"{"errorMessage": "ValueError"}"#)
            .with_timestamp(at("2375-05-06T17:21:17Z")),
        HistoryEvent::state_entered(4, 3, "someOtherState", r#"{"value": "3"}"#)
            .with_timestamp(at("2375-05-06T17:21:17Z")),
    ])
}

fn at(timestamp: &str) -> DateTime<Utc> {
    timestamp.parse().unwrap()
}

// =============================================================================
// Proptest strategies
// =============================================================================

/// Kind of event generated by [`arbitrary_history`].
#[derive(Debug, Clone)]
pub enum EventKind {
    Entered(String, Option<u64>),
    Failed,
    Other(String),
}

pub fn arbitrary_event_kind() -> impl Strategy<Value = EventKind> {
    prop_oneof![
        3 => ("[a-z][a-zA-Z]{0,11}", proptest::option::of(0u64..1000))
            .prop_map(|(name, fails)| EventKind::Entered(name, fails)),
        1 => Just(EventKind::Failed),
        1 => prop_oneof![
            Just("TaskStateExited".to_string()),
            Just("ExecutionStarted".to_string()),
            Just("LambdaFunctionScheduled".to_string()),
        ]
        .prop_map(EventKind::Other),
    ]
}

/// Builds a history from event kinds, linking ids in order.
pub fn history_from_kinds(kinds: &[EventKind]) -> ExecutionHistory {
    let events = kinds
        .iter()
        .enumerate()
        .map(|(index, kind)| {
            let id = index as i64 + 1;
            let previous = index as i64;
            match kind {
                EventKind::Entered(name, fails) => {
                    let input = match fails {
                        Some(n) => format!(r#"{{"payload": "{}", "stepFunctionFails": {}}}"#, name, n),
                        None => format!(r#"{{"payload": "{}"}}"#, name),
                    };
                    HistoryEvent::state_entered(id, previous, name.clone(), input)
                }
                EventKind::Failed => HistoryEvent::lambda_failed(id, previous, "{}"),
                EventKind::Other(name) => {
                    HistoryEvent::new(id, previous, HistoryEventType::from(name.as_str()))
                }
            }
        })
        .collect();
    ExecutionHistory::with_events(events)
}

/// Returns the name and declared count the handler should resume, computed
/// independently of the scanner.
pub fn expected_resume(kinds: &[EventKind]) -> Option<(String, Option<u64>)> {
    let end = kinds
        .iter()
        .rposition(|kind| matches!(kind, EventKind::Failed))
        .unwrap_or(kinds.len());
    kinds[..end].iter().rev().find_map(|kind| match kind {
        EventKind::Entered(name, fails) => Some((name.clone(), *fails)),
        _ => None,
    })
}

pub fn arbitrary_history() -> impl Strategy<Value = Vec<EventKind>> {
    prop::collection::vec(arbitrary_event_kind(), 0..20)
}
