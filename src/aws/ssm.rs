use anyhow::{Context, Result};
use async_trait::async_trait;
use aws_sdk_ssm::{types::ParameterType, Client};

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SecureParameter {
    pub name: String,
    pub value: String,
    pub key_id: Option<String>,
}

#[async_trait]
pub trait ParameterStore: Send + Sync {
    /// Writes `parameter` as a `SecureString`, overwriting any existing value.
    async fn put_secure_parameter(&self, parameter: &SecureParameter) -> Result<()>;
}

#[derive(Clone)]
pub struct SsmParameterStore {
    client: Client,
}

impl SsmParameterStore {
    pub fn new_with_client(client: Client) -> Self {
        Self { client }
    }
}

#[async_trait]
impl ParameterStore for SsmParameterStore {
    async fn put_secure_parameter(&self, parameter: &SecureParameter) -> Result<()> {
        self.client
            .put_parameter()
            .name(&parameter.name)
            .value(&parameter.value)
            .r#type(ParameterType::SecureString)
            .overwrite(true)
            .set_key_id(parameter.key_id.clone())
            .send()
            .await
            .with_context(|| format!("SSM PutParameter failed for '{}'", parameter.name))?;

        Ok(())
    }
}
