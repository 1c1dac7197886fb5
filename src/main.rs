use persist_error::{lambda, FailureHandler, HandlerConfig};

#[tokio::main]
async fn main() -> Result<(), lambda_runtime::Error> {
    // Initialize the default subscriber
    lambda_runtime::tracing::init_default_subscriber();

    let config = HandlerConfig::from_env()?;
    let aws_config = aws_config::defaults(aws_config::BehaviorVersion::latest())
        .load()
        .await;

    tracing::info!(
        queue_url = %config.queue_url,
        topic_arn = %config.topic_arn,
        region = %config.region,
        max_fails = ?config.policy.max_fails,
        "Starting failure handler"
    );

    lambda::run(FailureHandler::from_aws_config(config, &aws_config)).await
}
