use std::sync::Arc;

use lambda_runtime::{run, service_fn, Error, LambdaEvent};
use serde_json::Value;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

pub mod aws;
pub mod config;
pub mod error;
pub mod event_handler;
pub mod mapping;
pub mod provider;
pub mod sops;
#[cfg(test)]
mod testing;

use crate::{
    aws::{s3::S3ObjectStore, secrets::SecretsManager, ssm::SsmParameterStore},
    config::{ProviderConfig, ProviderKind},
    provider::{ResourceProvider, SecretsManagerProvider, SsmParameterProvider},
    sops::{SopsDecryptor, SopsSource},
};

#[tokio::main]
async fn main() -> Result<(), Error> {
    tracing_subscriber::registry()
        .with(tracing_subscriber::fmt::layer().json())
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    let config = ProviderConfig::from_env()?;
    tracing::info!(?config, "Starting sops provider");

    let shared_config = aws::load_sdk_config(config.aws_operation_timeout).await;
    let s3_client = aws_sdk_s3::Client::new(&shared_config);

    let source = SopsSource::new(
        Arc::new(S3ObjectStore::new_with_client(s3_client)),
        Arc::new(SopsDecryptor::new(
            config.sops_binary.clone(),
            config.sops_timeout,
        )),
    );

    match config.kind {
        ProviderKind::SecretsManager => {
            let secrets_client = aws_sdk_secretsmanager::Client::new(&shared_config);
            serve(SecretsManagerProvider::new(
                source,
                Arc::new(SecretsManager::new_with_client(secrets_client)),
            ))
            .await
        }
        ProviderKind::SsmParameter => {
            let ssm_client = aws_sdk_ssm::Client::new(&shared_config);
            serve(SsmParameterProvider::new(
                source,
                Arc::new(SsmParameterStore::new_with_client(ssm_client)),
                config.write_failure_policy,
            ))
            .await
        }
    }
}

async fn serve<P: ResourceProvider + 'static>(provider: P) -> Result<(), Error> {
    let provider = Arc::new(provider);

    run(service_fn(move |event: LambdaEvent<Value>| {
        let provider = provider.clone();
        async move { event_handler::function_handler(event, provider.as_ref()).await }
    }))
    .await
}
