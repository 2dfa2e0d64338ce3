use std::error::Error as StdError;
use std::time::Duration;

use thiserror::Error;

pub type BoxError = Box<dyn StdError + Send + Sync + 'static>;

#[derive(Debug, Error)]
pub enum ProviderError {
    #[error("invalid configuration: {0}")]
    Configuration(String),

    #[error("failed to fetch s3://{bucket}/{key}")]
    Fetch {
        bucket: String,
        key: String,
        #[source]
        source: BoxError,
    },

    #[error("failed to run sops")]
    Spawn(#[source] std::io::Error),

    #[error("sops exited with code {exit_code:?}: {stderr}")]
    DecryptionFailed {
        exit_code: Option<i32>,
        stderr: String,
    },

    #[error("sops output is not valid JSON")]
    DecodeFailed(#[source] serde_json::Error),

    #[error("sops did not finish within {0:?}")]
    DecryptionTimeout(Duration),

    #[error("secret could not be found at path {0}")]
    SecretNotFound(String),

    #[error("unknown encoding '{0}'")]
    InvalidEncoding(String),

    #[error("unknown event type '{0}'")]
    UnknownEventType(String),

    #[error("failed to write {target}")]
    Publish {
        target: String,
        #[source]
        source: BoxError,
    },
}

impl ProviderError {
    pub fn config(message: impl Into<String>) -> Self {
        Self::Configuration(message.into())
    }
}

/// Flattens an error and its sources into one line per cause, outermost first.
pub fn error_chain(err: &(dyn StdError + 'static)) -> Vec<String> {
    let mut chain = vec![err.to_string()];
    let mut current = err.source();
    while let Some(cause) = current {
        chain.push(cause.to_string());
        current = cause.source();
    }
    chain
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn chain_lists_every_cause() {
        let err = ProviderError::Fetch {
            bucket: "bucket".into(),
            key: "secrets.yaml".into(),
            source: anyhow::anyhow!("access denied").into(),
        };

        assert_eq!(
            error_chain(&err),
            vec![
                "failed to fetch s3://bucket/secrets.yaml".to_string(),
                "access denied".to_string()
            ]
        );
    }
}
