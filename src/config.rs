//! Handler configuration.
//!
//! Settings are resolved once per process by the entry point and then passed
//! to the handler. Nothing below the entry point reads the environment.

use serde::{Deserialize, Serialize};

use crate::decision::FailurePolicy;
use crate::error::PersistError;

/// Environment variable holding the resume queue URL.
pub const QUEUE_URL_VAR: &str = "AWS_SQS_QUEUE_URL";

/// Environment variable holding the notification topic ARN.
pub const TOPIC_ARN_VAR: &str = "AWS_SNS_ARN";

/// Environment variable holding the deployment region.
pub const REGION_VAR: &str = "AWS_DEPLOYMENT_REGION";

/// Optional environment variable holding the failure count at which a state
/// is given up on.
pub const MAX_FAILS_VAR: &str = "PERSIST_ERROR_MAX_FAILS";

/// Configuration for the failure handler.
///
/// # Example
///
/// ```rust
/// use persist_error::{FailurePolicy, HandlerConfig};
///
/// let config = HandlerConfig::new(
///     "https://sqs.us-east-1.amazonaws.com/123456789012/resume",
///     "arn:aws:sns:us-east-1:123456789012:failures",
///     "us-east-1",
/// )
/// .with_policy(FailurePolicy::with_max_fails(5));
///
/// assert_eq!(config.policy.max_fails, Some(5));
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct HandlerConfig {
    /// URL of the queue that receives resume messages
    pub queue_url: String,
    /// ARN of the topic that receives terminal notifications
    pub topic_arn: String,
    /// Region the resume queue lives in
    pub region: String,
    /// When to give up on a failing state
    #[serde(default)]
    pub policy: FailurePolicy,
}

impl HandlerConfig {
    /// Creates a new configuration with the default failure policy.
    pub fn new(
        queue_url: impl Into<String>,
        topic_arn: impl Into<String>,
        region: impl Into<String>,
    ) -> Self {
        Self {
            queue_url: queue_url.into(),
            topic_arn: topic_arn.into(),
            region: region.into(),
            policy: FailurePolicy::default(),
        }
    }

    /// Sets the failure policy.
    pub fn with_policy(mut self, policy: FailurePolicy) -> Self {
        self.policy = policy;
        self
    }

    /// Loads the configuration from the process environment.
    pub fn from_env() -> Result<Self, PersistError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Loads the configuration through an arbitrary key lookup.
    ///
    /// Empty values count as missing.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, PersistError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let required = |key: &str| {
            lookup(key)
                .filter(|value| !value.trim().is_empty())
                .ok_or_else(|| PersistError::configuration(format!("{} is not set", key)))
        };

        let queue_url = required(QUEUE_URL_VAR)?;
        let topic_arn = required(TOPIC_ARN_VAR)?;
        let region = required(REGION_VAR)?;

        let max_fails = match lookup(MAX_FAILS_VAR).filter(|value| !value.trim().is_empty()) {
            Some(value) => Some(value.trim().parse::<u64>().map_err(|_| {
                PersistError::configuration(format!(
                    "{} must be a non-negative integer, got {:?}",
                    MAX_FAILS_VAR, value
                ))
            })?),
            None => None,
        };

        Ok(Self {
            queue_url,
            topic_arn,
            region,
            policy: FailurePolicy { max_fails },
        })
    }
}
