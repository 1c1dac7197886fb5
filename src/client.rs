//! External collaborators of the failure handler.
//!
//! This module defines the traits the handler talks to (history source,
//! resume queue, terminal notifier) and their AWS implementations backed by
//! Step Functions, SQS and SNS. Tests substitute recording mocks.

use async_trait::async_trait;
use aws_config::SdkConfig;

use crate::error::PersistError;
use crate::history::{
    ExecutionHistory, ExecutionStartedDetails, FailureDetails, HistoryEvent, HistoryEventType,
    StateEnteredDetails,
};

/// Source of execution histories.
#[async_trait]
pub trait ExecutionHistorySource: Send + Sync {
    /// Retrieves the full history of an execution, oldest event first.
    ///
    /// # Arguments
    ///
    /// * `execution_arn` - The ARN of the execution
    async fn fetch_execution_history(
        &self,
        execution_arn: &str,
    ) -> Result<ExecutionHistory, PersistError>;
}

/// Queue that receives resume messages.
#[async_trait]
pub trait ResumeQueue: Send + Sync {
    /// Enqueues a serialized resume payload.
    ///
    /// # Arguments
    ///
    /// * `queue_url` - The target queue
    /// * `message_body` - The serialized payload
    /// * `region` - The region the queue lives in
    async fn send_resume_message(
        &self,
        queue_url: &str,
        message_body: &str,
        region: &str,
    ) -> Result<(), PersistError>;
}

/// Channel that receives terminal notifications.
#[async_trait]
pub trait TerminalNotifier: Send + Sync {
    /// Publishes a serialized terminal payload.
    ///
    /// # Arguments
    ///
    /// * `topic_arn` - The target notification topic
    /// * `message` - The serialized payload
    async fn send_terminal_notification(
        &self,
        topic_arn: &str,
        message: &str,
    ) -> Result<(), PersistError>;
}

/// Step Functions implementation of [`ExecutionHistorySource`].
pub struct StepFunctionsHistorySource {
    client: aws_sdk_sfn::Client,
}

impl StepFunctionsHistorySource {
    /// Creates a new source from AWS SDK config.
    pub fn from_aws_config(aws_config: &SdkConfig) -> Self {
        Self {
            client: aws_sdk_sfn::Client::new(aws_config),
        }
    }
}

#[async_trait]
impl ExecutionHistorySource for StepFunctionsHistorySource {
    async fn fetch_execution_history(
        &self,
        execution_arn: &str,
    ) -> Result<ExecutionHistory, PersistError> {
        let mut events = Vec::new();
        let mut next_token: Option<String> = None;
        let mut pages = 0usize;

        loop {
            let output = self
                .client
                .get_execution_history()
                .execution_arn(execution_arn)
                .reverse_order(false)
                .set_next_token(next_token.take())
                .send()
                .await
                .map_err(|e| {
                    PersistError::transport(
                        "GetExecutionHistory",
                        aws_sdk_sfn::error::DisplayErrorContext(&e).to_string(),
                    )
                })?;

            pages += 1;
            events.extend(output.events().iter().map(convert_event));

            match output.next_token() {
                Some(token) if !token.is_empty() => next_token = Some(token.to_string()),
                _ => break,
            }
        }

        tracing::debug!(
            execution_arn = %execution_arn,
            events = events.len(),
            pages = pages,
            "Fetched execution history"
        );

        Ok(ExecutionHistory::with_events(events))
    }
}

/// Converts an SDK history event into the handler's event model.
fn convert_event(event: &aws_sdk_sfn::types::HistoryEvent) -> HistoryEvent {
    let timestamp = event.timestamp();
    let mut converted = HistoryEvent::new(
        event.id(),
        event.previous_event_id(),
        HistoryEventType::from(event.r#type().as_str()),
    );
    converted.timestamp = chrono::DateTime::from_timestamp(timestamp.secs(), timestamp.subsec_nanos());
    converted.execution_started_event_details =
        event
            .execution_started_event_details()
            .map(|details| ExecutionStartedDetails {
                input: details.input().map(str::to_string),
            });
    converted.state_entered_event_details =
        event
            .state_entered_event_details()
            .map(|details| StateEnteredDetails {
                name: details.name().to_string(),
                input: details.input().map(str::to_string),
            });
    converted.lambda_function_failed_event_details = event
        .lambda_function_failed_event_details()
        .map(|details| FailureDetails {
            error: details.error().map(str::to_string),
            cause: details.cause().map(str::to_string),
        });
    converted
}

/// SQS implementation of [`ResumeQueue`].
///
/// The client for the deployment region is built once and reused. A send
/// addressed to any other region gets a client configured on the spot.
pub struct SqsResumeQueue {
    aws_config: SdkConfig,
    region: String,
    client: aws_sdk_sqs::Client,
}

impl SqsResumeQueue {
    /// Creates a new queue sender from AWS SDK config.
    ///
    /// # Arguments
    ///
    /// * `aws_config` - Shared SDK config
    /// * `region` - The region most messages are sent to
    pub fn from_aws_config(aws_config: &SdkConfig, region: &str) -> Self {
        Self {
            aws_config: aws_config.clone(),
            region: region.to_string(),
            client: regional_client(aws_config, region),
        }
    }

    /// Returns the prebuilt client if it serves `region`.
    fn cached_client(&self, region: &str) -> Option<&aws_sdk_sqs::Client> {
        (self.region == region).then_some(&self.client)
    }
}

fn regional_client(aws_config: &SdkConfig, region: &str) -> aws_sdk_sqs::Client {
    let config = aws_sdk_sqs::config::Builder::from(aws_config)
        .region(aws_sdk_sqs::config::Region::new(region.to_string()))
        .build();
    aws_sdk_sqs::Client::from_conf(config)
}

#[async_trait]
impl ResumeQueue for SqsResumeQueue {
    async fn send_resume_message(
        &self,
        queue_url: &str,
        message_body: &str,
        region: &str,
    ) -> Result<(), PersistError> {
        let other;
        let client = match self.cached_client(region) {
            Some(client) => client,
            None => {
                other = regional_client(&self.aws_config, region);
                &other
            }
        };

        let output = client
            .send_message()
            .queue_url(queue_url)
            .message_body(message_body)
            .send()
            .await
            .map_err(|e| {
                PersistError::transport(
                    "SendMessage",
                    aws_sdk_sqs::error::DisplayErrorContext(&e).to_string(),
                )
            })?;

        tracing::debug!(
            queue_url = %queue_url,
            message_id = ?output.message_id(),
            "Resume message enqueued"
        );
        Ok(())
    }
}

/// SNS implementation of [`TerminalNotifier`].
pub struct SnsTerminalNotifier {
    client: aws_sdk_sns::Client,
}

impl SnsTerminalNotifier {
    /// Creates a new notifier from AWS SDK config.
    pub fn from_aws_config(aws_config: &SdkConfig) -> Self {
        Self {
            client: aws_sdk_sns::Client::new(aws_config),
        }
    }
}

#[async_trait]
impl TerminalNotifier for SnsTerminalNotifier {
    async fn send_terminal_notification(
        &self,
        topic_arn: &str,
        message: &str,
    ) -> Result<(), PersistError> {
        let output = self
            .client
            .publish()
            .topic_arn(topic_arn)
            .message(message)
            .send()
            .await
            .map_err(|e| {
                PersistError::transport(
                    "Publish",
                    aws_sdk_sns::error::DisplayErrorContext(&e).to_string(),
                )
            })?;

        tracing::debug!(
            topic_arn = %topic_arn,
            message_id = ?output.message_id(),
            "Terminal notification published"
        );
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use aws_sdk_sfn::primitives::DateTime;
    use aws_sdk_sfn::types;

    #[test]
    fn test_convert_state_entered_event() {
        let event = types::HistoryEvent::builder()
            .timestamp(DateTime::from_secs(1_700_000_000))
            .r#type(types::HistoryEventType::TaskStateEntered)
            .id(2)
            .previous_event_id(1)
            .state_entered_event_details(
                types::StateEnteredEventDetails::builder()
                    .name("someState")
                    .input(r#"{"value": "3"}"#)
                    .build()
                    .unwrap(),
            )
            .build()
            .unwrap();

        let converted = convert_event(&event);
        assert_eq!(converted.id, 2);
        assert_eq!(converted.previous_event_id, 1);
        assert_eq!(converted.event_type, HistoryEventType::TaskStateEntered);
        assert_eq!(converted.timestamp.map(|t| t.timestamp()), Some(1_700_000_000));

        let details = converted.state_entered_details().unwrap();
        assert_eq!(details.name, "someState");
        assert_eq!(details.input.as_deref(), Some(r#"{"value": "3"}"#));
    }

    #[test]
    fn test_convert_failure_event() {
        let event = types::HistoryEvent::builder()
            .timestamp(DateTime::from_secs(1_700_000_017))
            .r#type(types::HistoryEventType::LambdaFunctionFailed)
            .id(3)
            .previous_event_id(2)
            .lambda_function_failed_event_details(
                types::LambdaFunctionFailedEventDetails::builder()
                    .error("ValueError")
                    .cause(r#"{"errorMessage": "ValueError"}"#)
                    .build(),
            )
            .build()
            .unwrap();

        let converted = convert_event(&event);
        let details = converted.failure_details().unwrap();
        assert_eq!(details.error.as_deref(), Some("ValueError"));
        assert_eq!(details.cause.as_deref(), Some(r#"{"errorMessage": "ValueError"}"#));
    }

    fn sdk_config(region: &'static str) -> SdkConfig {
        SdkConfig::builder()
            .behavior_version(aws_config::BehaviorVersion::latest())
            .region(aws_config::Region::new(region))
            .build()
    }

    #[test]
    fn test_resume_queue_reuses_deployment_region_client() {
        let queue = SqsResumeQueue::from_aws_config(&sdk_config("us-east-1"), "us-south-10");

        let first = queue.cached_client("us-south-10").unwrap();
        let second = queue.cached_client("us-south-10").unwrap();
        assert!(std::ptr::eq(first, second));
        assert_eq!(
            first.config().region(),
            Some(&aws_sdk_sqs::config::Region::new("us-south-10"))
        );
        assert!(queue.cached_client("eu-west-1").is_none());
    }

    #[test]
    fn test_regional_client_overrides_shared_region() {
        let client = regional_client(&sdk_config("us-east-1"), "eu-west-1");
        assert_eq!(
            client.config().region(),
            Some(&aws_sdk_sqs::config::Region::new("eu-west-1"))
        );
    }

    #[test]
    fn test_convert_other_event_type() {
        let event = types::HistoryEvent::builder()
            .timestamp(DateTime::from_secs(0))
            .r#type(types::HistoryEventType::TaskStateExited)
            .id(4)
            .build()
            .unwrap();

        let converted = convert_event(&event);
        assert_eq!(
            converted.event_type,
            HistoryEventType::Other("TaskStateExited".to_string())
        );
        assert_eq!(converted.previous_event_id, 0);
    }
}
