use lambda_runtime::{Error, LambdaEvent};
use serde_json::Value;
use tracing;

use crate::{
    error::error_chain,
    provider::{handle_event, LifecycleResponse, ResourceProvider},
};

pub(crate) async fn function_handler<P: ResourceProvider>(
    event: LambdaEvent<Value>,
    provider: &P,
) -> Result<LifecycleResponse, Error> {
    let (payload, context) = event.into_parts();
    tracing::info!(request_id = %context.request_id, event = %payload, "Handling event");

    on_event(provider, payload).await
}

/// Runs one lifecycle event. Failures are logged in full here and reach the
/// caller only as an opaque `Failed`.
pub(crate) async fn on_event<P: ResourceProvider>(
    provider: &P,
    payload: Value,
) -> Result<LifecycleResponse, Error> {
    let raw = payload.to_string();

    match handle_event(provider, payload).await {
        Ok(response) => {
            tracing::info!(physical_resource_id = %response.physical_resource_id, "Event handled");
            Ok(response)
        }
        Err(err) => {
            tracing::error!(
                error = %err,
                causes = ?error_chain(&err),
                event = %raw,
                "Unhandled error, failing"
            );
            Err(Error::from("Failed"))
        }
    }
}
