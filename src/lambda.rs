//! Lambda runtime integration.

use lambda_runtime::{service_fn, LambdaEvent};
use serde_json::Value;

use crate::error::ErrorObject;
use crate::handler::{FailureHandler, FailureInvocation};

/// Handles one Lambda event.
///
/// The resume payload is returned as the function result; a terminal
/// outcome returns `null`.
pub async fn handle_event(
    handler: &FailureHandler,
    event: LambdaEvent<FailureInvocation>,
) -> Result<Value, lambda_runtime::Error> {
    let (invocation, context) = event.into_parts();

    match handler.handle(&invocation).await {
        Ok(Some(payload)) => Ok(Value::Object(payload.into_map())),
        Ok(None) => Ok(Value::Null),
        Err(error) => {
            let object = ErrorObject::from(&error);
            tracing::error!(
                request_id = %context.request_id,
                execution_arn = %invocation.execution_arn,
                error_type = %object.error_type,
                retriable = error.is_transport(),
                "{}",
                object.error_message
            );
            Err(error.into())
        }
    }
}

/// Runs the handler under the Lambda runtime until the process is stopped.
pub async fn run(handler: FailureHandler) -> Result<(), lambda_runtime::Error> {
    let handler = &handler;
    lambda_runtime::run(service_fn(move |event: LambdaEvent<FailureInvocation>| async move {
        handle_event(handler, event).await
    }))
    .await
}
