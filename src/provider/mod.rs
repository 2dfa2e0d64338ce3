//! Custom-resource lifecycle handling for the two publishing targets.

use async_trait::async_trait;
use serde::de::DeserializeOwned;
use serde_json::Value;
use tracing::info;

use crate::error::ProviderError;

pub mod event;
pub mod secrets_manager;
pub mod ssm_parameter;

pub use event::{LifecycleEvent, LifecycleResponse};
pub use secrets_manager::SecretsManagerProvider;
pub use ssm_parameter::SsmParameterProvider;

#[async_trait]
pub trait ResourceProvider: Send + Sync {
    type Properties: DeserializeOwned + Send;

    async fn create(&self, props: Self::Properties) -> Result<LifecycleResponse, ProviderError>;

    /// Full re-publish, keeping the identifier the caller already has.
    async fn update(
        &self,
        props: Self::Properties,
        physical_id: String,
    ) -> Result<LifecycleResponse, ProviderError> {
        let response = self.create(props).await?;
        Ok(response.with_physical_id(physical_id))
    }

    /// Nothing is removed from the target; its own retention policy applies.
    async fn delete(&self, physical_id: String) -> Result<LifecycleResponse, ProviderError> {
        Ok(LifecycleResponse::new(physical_id))
    }
}

/// Parses a raw event and runs it against `provider`.
pub async fn handle_event<P: ResourceProvider>(
    provider: &P,
    payload: Value,
) -> Result<LifecycleResponse, ProviderError> {
    let event = LifecycleEvent::<P::Properties>::from_value(payload)?;
    info!(request_type = event.request_type(), "Dispatching lifecycle event");

    match event {
        LifecycleEvent::Create { props } => provider.create(props).await,
        LifecycleEvent::Update { props, physical_id } => provider.update(props, physical_id).await,
        LifecycleEvent::Delete { physical_id } => provider.delete(physical_id).await,
    }
}
