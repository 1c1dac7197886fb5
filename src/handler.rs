//! The failure handler.
//!
//! One invocation fetches the execution history, finds the state to resume,
//! decides whether to retry it, and performs the single resulting send.

use std::sync::Arc;

use aws_config::SdkConfig;
use serde::{Deserialize, Deserializer, Serialize};
use serde_json::Value;

use crate::client::{
    ExecutionHistorySource, ResumeQueue, SnsTerminalNotifier, SqsResumeQueue,
    StepFunctionsHistorySource, TerminalNotifier,
};
use crate::config::HandlerConfig;
use crate::decision::{decide, FailurePayload};
use crate::dispatch::Dispatcher;
use crate::error::PersistError;
use crate::scanner::scan;

/// Event the orchestrator sends when a task fails.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FailureInvocation {
    /// ARN of the failing execution
    pub execution_arn: String,

    /// Escalation flag. Its presence matters, not its value; an explicit
    /// `null` still counts as present.
    #[serde(
        default,
        deserialize_with = "deserialize_present",
        skip_serializing_if = "Option::is_none"
    )]
    pub step_function_fails: Option<Value>,
}

impl FailureInvocation {
    /// Creates an ordinary (non-escalation) invocation.
    pub fn new(execution_arn: impl Into<String>) -> Self {
        Self {
            execution_arn: execution_arn.into(),
            step_function_fails: None,
        }
    }

    /// Marks the invocation as an escalation.
    pub fn with_step_function_fails(mut self, value: impl Into<Value>) -> Self {
        self.step_function_fails = Some(value.into());
        self
    }

    /// Returns true if the invocation carries the escalation flag.
    pub fn is_escalation(&self) -> bool {
        self.step_function_fails.is_some()
    }
}

fn deserialize_present<'de, D>(deserializer: D) -> Result<Option<Value>, D::Error>
where
    D: Deserializer<'de>,
{
    Value::deserialize(deserializer).map(Some)
}

/// Handles task failures reported by the orchestrator.
///
/// Holds only immutable configuration and shared collaborators, so one
/// instance serves every invocation of the process.
pub struct FailureHandler {
    config: HandlerConfig,
    history: Arc<dyn ExecutionHistorySource>,
    dispatcher: Dispatcher,
}

impl FailureHandler {
    /// Creates a new handler from its collaborators.
    pub fn new(
        config: HandlerConfig,
        history: Arc<dyn ExecutionHistorySource>,
        queue: Arc<dyn ResumeQueue>,
        notifier: Arc<dyn TerminalNotifier>,
    ) -> Self {
        Self {
            config,
            history,
            dispatcher: Dispatcher::new(queue, notifier),
        }
    }

    /// Creates a handler backed by Step Functions, SQS and SNS.
    pub fn from_aws_config(config: HandlerConfig, aws_config: &SdkConfig) -> Self {
        let queue = SqsResumeQueue::from_aws_config(aws_config, &config.region);
        Self::new(
            config,
            Arc::new(StepFunctionsHistorySource::from_aws_config(aws_config)),
            Arc::new(queue),
            Arc::new(SnsTerminalNotifier::from_aws_config(aws_config)),
        )
    }

    /// Returns the handler configuration.
    pub fn config(&self) -> &HandlerConfig {
        &self.config
    }

    /// Handles one failure.
    ///
    /// Returns the resume payload when the state was re-enqueued, or `None`
    /// when a terminal notification was published instead. On error nothing
    /// has been sent, unless the error is the send itself.
    pub async fn handle(
        &self,
        invocation: &FailureInvocation,
    ) -> Result<Option<FailurePayload>, PersistError> {
        let execution_arn = invocation.execution_arn.as_str();
        tracing::debug!(
            execution_arn = %execution_arn,
            escalation = invocation.is_escalation(),
            "Handling task failure"
        );

        let history = self.history.fetch_execution_history(execution_arn).await?;
        let scanned = scan(execution_arn, &history)?;
        let decision = decide(scanned, invocation.is_escalation(), &self.config.policy)?;
        self.dispatcher.dispatch(decision, &self.config).await
    }
}
