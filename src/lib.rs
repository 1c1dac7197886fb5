//! # Failure persistence for Step Functions executions
//!
//! A Lambda handler invoked when a state machine task fails. It reads the
//! execution history, works out which task state failed and how many times
//! it has failed already, and then either
//!
//! - re-enqueues a resume message carrying the incremented failure count, or
//! - publishes a terminal notification when the failure is escalated, so a
//!   broken state cannot retry forever.
//!
//! ## Flow
//!
//! 1. [`ExecutionHistorySource`] fetches the ordered event history.
//! 2. [`scanner::scan`] finds the last task state entered before the last
//!    failure and decodes its input.
//! 3. [`decision::decide`] increments the `stepFunctionFails` count carried
//!    in that input and picks [`FailureDecision::Resume`] or
//!    [`FailureDecision::Terminal`].
//! 4. [`Dispatcher`] performs exactly one send: to the [`ResumeQueue`] or to
//!    the [`TerminalNotifier`].
//!
//! ## Escalation
//!
//! An invocation whose event carries a `stepFunctionFails` field, whatever
//! its value, is an escalation and always goes to the notification topic.
//! A [`FailurePolicy`] with `max_fails` set also escalates once the
//! incremented count reaches it.
//!
//! ## Example
//!
//! ```rust,ignore
//! use persist_error::{FailureHandler, FailureInvocation, HandlerConfig};
//!
//! let config = HandlerConfig::from_env()?;
//! let aws_config = aws_config::load_from_env().await;
//! let handler = FailureHandler::from_aws_config(config, &aws_config);
//!
//! let resumed = handler
//!     .handle(&FailureInvocation::new("arn:aws:states:us-east-1:123456789012:execution:sm:run"))
//!     .await?;
//! ```

pub mod client;
pub mod config;
pub mod decision;
pub mod dispatch;
pub mod error;
pub mod handler;
pub mod history;
pub mod lambda;
pub mod scanner;

pub use client::{
    ExecutionHistorySource, ResumeQueue, SnsTerminalNotifier, SqsResumeQueue,
    StepFunctionsHistorySource, TerminalNotifier,
};
pub use config::HandlerConfig;
pub use decision::{
    EscalationReason, FailureDecision, FailurePayload, FailurePolicy, RESUME_STATE_KEY,
    STEP_FUNCTION_FAILS_KEY,
};
pub use dispatch::Dispatcher;
pub use error::{ErrorObject, PersistError};
pub use handler::{FailureHandler, FailureInvocation};
pub use history::{
    ExecutionHistory, ExecutionStartedDetails, FailureDetails, HistoryEvent, HistoryEventType,
    StateEnteredDetails,
};
pub use scanner::ScanResult;
