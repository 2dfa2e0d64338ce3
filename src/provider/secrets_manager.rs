use std::sync::Arc;

use async_trait::async_trait;
use serde::Deserialize;
use serde_json::Value;
use tracing::info;

use super::event::deserialize_flag;
use super::{LifecycleResponse, ResourceProvider};
use crate::aws::secrets::SecretStore;
use crate::error::ProviderError;
use crate::mapping::{self, Encoding, Mappings, PathSpec};
use crate::sops::{FileFormat, ObjectLocation, SopsFile, SopsSource};

const PHYSICAL_ID_PREFIX: &str = "secretdata_";
const WHOLE_FILE_FIELD: &str = "data";

#[derive(Debug, Clone, Deserialize)]
pub struct SecretsManagerProperties {
    #[serde(rename = "SecretArn")]
    pub secret_arn: String,
    #[serde(rename = "S3Bucket")]
    pub s3_bucket: String,
    #[serde(rename = "S3Path")]
    pub s3_path: String,
    #[serde(rename = "KMSKeyArn", default)]
    pub kms_key_arn: Option<String>,
    #[serde(rename = "FileType", default)]
    pub file_type: Option<String>,
    #[serde(rename = "Mappings", default)]
    pub mappings: Option<String>,
    #[serde(rename = "WholeFile", default, deserialize_with = "deserialize_flag")]
    pub whole_file: bool,
    #[serde(rename = "SourceHash", default)]
    pub source_hash: Option<String>,
}

/// What gets written to the secret.
#[derive(Debug, Clone, PartialEq, Eq)]
enum Publication {
    WholeFile,
    Mapped(Mappings),
}

#[derive(Debug, Clone)]
struct SecretRequest {
    secret_arn: String,
    file: SopsFile,
    publication: Publication,
}

impl TryFrom<SecretsManagerProperties> for SecretRequest {
    type Error = ProviderError;

    fn try_from(props: SecretsManagerProperties) -> Result<Self, Self::Error> {
        if props.secret_arn.is_empty() {
            return Err(ProviderError::config("SecretArn must be set"));
        }

        let mappings = match props.mappings.as_deref().map(str::trim) {
            None | Some("") => Mappings::default(),
            Some(json) => Mappings::from_json(json)?,
        };

        let publication = match (props.whole_file, mappings.is_empty()) {
            (true, false) => {
                return Err(ProviderError::config(
                    "cannot set Mappings and set WholeFile to true",
                ))
            }
            (false, true) => {
                return Err(ProviderError::config(
                    "must set Mappings or set WholeFile to true",
                ))
            }
            (true, true) => Publication::WholeFile,
            (false, false) => Publication::Mapped(mappings),
        };

        let file = SopsFile {
            location: ObjectLocation::new(props.s3_bucket, props.s3_path)?,
            declared_format: FileFormat::from_property(props.file_type.as_deref())?,
            kms_key: props.kms_key_arn.filter(|k| !k.is_empty()),
            whole_file: props.whole_file,
        };
        file.format()?;

        Ok(Self {
            secret_arn: props.secret_arn,
            file,
            publication,
        })
    }
}

/// Publishes a decrypted sops file, or a projection of it, into one
/// Secrets Manager secret.
#[derive(Clone)]
pub struct SecretsManagerProvider {
    source: SopsSource,
    secrets: Arc<dyn SecretStore>,
}

impl SecretsManagerProvider {
    pub fn new(source: SopsSource, secrets: Arc<dyn SecretStore>) -> Self {
        Self { source, secrets }
    }

    pub fn physical_id(secret_arn: &str) -> String {
        format!("{PHYSICAL_ID_PREFIX}{secret_arn}")
    }
}

fn secret_string(doc: &Value, publication: &Publication) -> Result<String, ProviderError> {
    match publication {
        Publication::WholeFile => {
            let field = PathSpec::new(vec![WHOLE_FILE_FIELD.to_string()])?;
            Ok(mapping::resolve(doc, &field, Encoding::String).unwrap_or_default())
        }
        Publication::Mapped(mappings) => {
            let keys: Vec<&str> = mappings.keys().collect();
            info!(mappings = ?keys, "Mapping values from decoded data");
            let values: serde_json::Map<String, Value> = mapping::project(doc, mappings)
                .into_iter()
                .map(|(key, value)| (key, Value::String(value)))
                .collect();
            Ok(Value::Object(values).to_string())
        }
    }
}

#[async_trait]
impl ResourceProvider for SecretsManagerProvider {
    type Properties = SecretsManagerProperties;

    async fn create(&self, props: Self::Properties) -> Result<LifecycleResponse, ProviderError> {
        let source_hash = props.source_hash.clone();
        let request = SecretRequest::try_from(props)?;
        info!(secret_arn = %request.secret_arn, location = %request.file.location, ?source_hash, "Publishing sops file to Secrets Manager");

        let doc = self.source.load(&request.file).await?;
        let secret = secret_string(&doc, &request.publication)?;

        info!(secret_arn = %request.secret_arn, whole_file = request.file.whole_file, "Writing decoded data to Secrets Manager");
        self.secrets
            .put_secret_string(&request.secret_arn, &secret)
            .await
            .map_err(|e| ProviderError::Publish {
                target: request.secret_arn.clone(),
                source: e.into(),
            })?;
        info!("Wrote data to Secrets Manager");

        Ok(LifecycleResponse::new(Self::physical_id(&request.secret_arn)))
    }
}
