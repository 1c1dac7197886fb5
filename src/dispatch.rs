//! Routing of failure decisions to their destination.

use std::sync::Arc;

use crate::client::{ResumeQueue, TerminalNotifier};
use crate::config::HandlerConfig;
use crate::decision::{FailureDecision, FailurePayload};
use crate::error::PersistError;

/// Sends a decision to the resume queue or the notification topic.
///
/// Each call performs exactly one send. The payload is serialized before
/// anything is sent, so a failure to serialize sends nothing.
#[derive(Clone)]
pub struct Dispatcher {
    queue: Arc<dyn ResumeQueue>,
    notifier: Arc<dyn TerminalNotifier>,
}

impl Dispatcher {
    /// Creates a new dispatcher.
    pub fn new(queue: Arc<dyn ResumeQueue>, notifier: Arc<dyn TerminalNotifier>) -> Self {
        Self { queue, notifier }
    }

    /// Routes `decision` using the targets in `config`.
    ///
    /// Returns the payload on the resume path so the caller can chain on it,
    /// and `None` once the state has been given up on.
    pub async fn dispatch(
        &self,
        decision: FailureDecision,
        config: &HandlerConfig,
    ) -> Result<Option<FailurePayload>, PersistError> {
        match decision {
            FailureDecision::Resume(payload) => {
                let body = payload.to_json()?;
                self.queue
                    .send_resume_message(&config.queue_url, &body, &config.region)
                    .await?;
                tracing::info!(queue_url = %config.queue_url, "Resume message sent");
                Ok(Some(payload))
            }
            FailureDecision::Terminal(payload) => {
                let body = payload.to_json()?;
                self.notifier
                    .send_terminal_notification(&config.topic_arn, &body)
                    .await?;
                tracing::info!(topic_arn = %config.topic_arn, "Terminal notification sent");
                Ok(None)
            }
        }
    }
}
