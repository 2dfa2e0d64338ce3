use std::sync::Arc;

use async_trait::async_trait;
use serde::Deserialize;
use tracing::{error, info};
use uuid::Uuid;

use super::{LifecycleResponse, ResourceProvider};
use crate::aws::ssm::{ParameterStore, SecureParameter};
use crate::config::WriteFailurePolicy;
use crate::error::ProviderError;
use crate::mapping::{self, Encoding, PathSpec};
use crate::sops::{FileFormat, ObjectLocation, SopsFile, SopsSource};

const PHYSICAL_ID_PREFIX: &str = "ssm_secretdata_";

#[derive(Debug, Clone, Deserialize)]
pub struct SsmParameterProperties {
    #[serde(rename = "SopsSSMParameter")]
    pub parameter_name: String,
    #[serde(rename = "SopsPath")]
    pub sops_path: Vec<String>,
    #[serde(rename = "S3Bucket")]
    pub s3_bucket: String,
    #[serde(rename = "S3Path")]
    pub s3_path: String,
    #[serde(rename = "KMSKeyArn", default)]
    pub kms_key_arn: Option<String>,
    #[serde(rename = "FileType", default)]
    pub file_type: Option<String>,
}

/// `arn:aws:kms:<region>:<account>:key/<id>` -> `<id>`
fn parameter_key_id(kms_key_arn: Option<&str>) -> Option<String> {
    kms_key_arn
        .and_then(|arn| arn.split('/').nth(1))
        .map(str::to_string)
}

/// Publishes a single value of a decrypted sops file as a `SecureString`
/// parameter.
#[derive(Clone)]
pub struct SsmParameterProvider {
    source: SopsSource,
    parameters: Arc<dyn ParameterStore>,
    write_failure_policy: WriteFailurePolicy,
}

impl SsmParameterProvider {
    pub fn new(
        source: SopsSource,
        parameters: Arc<dyn ParameterStore>,
        write_failure_policy: WriteFailurePolicy,
    ) -> Self {
        Self {
            source,
            parameters,
            write_failure_policy,
        }
    }

    fn new_physical_id() -> String {
        format!("{PHYSICAL_ID_PREFIX}{}", Uuid::new_v4())
    }
}

#[async_trait]
impl ResourceProvider for SsmParameterProvider {
    type Properties = SsmParameterProperties;

    async fn create(&self, props: Self::Properties) -> Result<LifecycleResponse, ProviderError> {
        if props.parameter_name.is_empty() {
            return Err(ProviderError::config("SopsSSMParameter must be set"));
        }
        let path = PathSpec::new(props.sops_path)?;
        let file = SopsFile {
            location: ObjectLocation::new(props.s3_bucket, props.s3_path)?,
            declared_format: FileFormat::from_property(props.file_type.as_deref())?,
            kms_key: props.kms_key_arn.filter(|k| !k.is_empty()),
            whole_file: false,
        };
        file.format()?;

        let doc = self.source.load(&file).await?;
        let value = mapping::resolve(&doc, &path, Encoding::String)
            .ok_or_else(|| ProviderError::SecretNotFound(path.to_string()))?;

        let parameter = SecureParameter {
            name: props.parameter_name,
            key_id: parameter_key_id(file.kms_key.as_deref()),
            value,
        };
        info!(parameter = %parameter.name, "Writing SSM parameter");

        match self.parameters.put_secure_parameter(&parameter).await {
            Ok(()) => info!(parameter = %parameter.name, "Wrote data to SSM parameter"),
            Err(e) => match self.write_failure_policy {
                WriteFailurePolicy::Lenient => {
                    error!(parameter = %parameter.name, error = ?e, "Failed to write SSM parameter, continuing");
                }
                WriteFailurePolicy::Strict => {
                    return Err(ProviderError::Publish {
                        target: parameter.name,
                        source: e.into(),
                    })
                }
            },
        }

        let physical_id = Self::new_physical_id();
        info!(%physical_id, "Generated SSM physical resource id");
        Ok(LifecycleResponse::new(physical_id))
    }
}
