use anyhow::{Context, Result};
use async_trait::async_trait;
use aws_sdk_secretsmanager::Client;

#[async_trait]
pub trait SecretStore: Send + Sync {
    /// Replaces the current value of `secret_id` with `value`.
    async fn put_secret_string(&self, secret_id: &str, value: &str) -> Result<()>;
}

#[derive(Clone)]
pub struct SecretsManager {
    client: Client,
}

impl SecretsManager {
    pub fn new_with_client(client: Client) -> Self {
        Self { client }
    }
}

#[async_trait]
impl SecretStore for SecretsManager {
    async fn put_secret_string(&self, secret_id: &str, value: &str) -> Result<()> {
        self.client
            .put_secret_value()
            .secret_id(secret_id)
            .secret_string(value)
            .send()
            .await
            .context("Failed to put secret value to Secrets Manager")?;

        Ok(())
    }
}
