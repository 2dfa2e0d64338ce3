use std::time::Duration;

use aws_config::{retry::RetryConfig, timeout::TimeoutConfig, BehaviorVersion};
use aws_types::SdkConfig;

pub mod s3;
pub mod secrets;
pub mod ssm;

/// Shared SDK configuration: ambient region and credentials, a bounded
/// operation timeout and no SDK-level retries.
pub async fn load_sdk_config(operation_timeout: Duration) -> SdkConfig {
    aws_config::defaults(BehaviorVersion::latest())
        .timeout_config(
            TimeoutConfig::builder()
                .operation_timeout(operation_timeout)
                .build(),
        )
        .retry_config(RetryConfig::disabled())
        .load()
        .await
}
