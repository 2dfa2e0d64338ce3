//! Fetching sops-encrypted files and turning them into JSON documents.

use std::fmt;
use std::str::FromStr;
use std::sync::Arc;

use async_trait::async_trait;
use serde_json::Value;
use tracing::info;

use crate::aws::s3::ObjectStore;
use crate::error::ProviderError;

pub mod decryptor;

pub use decryptor::SopsDecryptor;

/// Input types understood by `sops --input-type`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FileFormat {
    Json,
    Yaml,
    Dotenv,
    Ini,
    Binary,
}

impl FileFormat {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Json => "json",
            Self::Yaml => "yaml",
            Self::Dotenv => "dotenv",
            Self::Ini => "ini",
            Self::Binary => "binary",
        }
    }

    /// Parses an optional `FileType` property, treating an empty string as unset.
    pub fn from_property(value: Option<&str>) -> Result<Option<Self>, ProviderError> {
        match value.map(str::trim) {
            None | Some("") => Ok(None),
            Some(name) => name.parse().map(Some),
        }
    }
}

impl FromStr for FileFormat {
    type Err = ProviderError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "json" => Ok(Self::Json),
            "yaml" | "yml" => Ok(Self::Yaml),
            "dotenv" | "env" => Ok(Self::Dotenv),
            "ini" => Ok(Self::Ini),
            "binary" => Ok(Self::Binary),
            other => Err(ProviderError::config(format!(
                "unsupported sops file type '{other}'"
            ))),
        }
    }
}

impl fmt::Display for FileFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ObjectLocation {
    pub bucket: String,
    pub key: String,
}

impl ObjectLocation {
    pub fn new(bucket: impl Into<String>, key: impl Into<String>) -> Result<Self, ProviderError> {
        let location = Self {
            bucket: bucket.into(),
            key: key.into(),
        };
        if location.bucket.is_empty() || location.key.is_empty() {
            return Err(ProviderError::config("S3Bucket and S3Path must both be set"));
        }
        Ok(location)
    }

    /// Text after the last `.` of the key, if there is one.
    pub fn extension(&self) -> Option<&str> {
        self.key.rsplit_once('.').map(|(_, ext)| ext)
    }
}

impl fmt::Display for ObjectLocation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "s3://{}/{}", self.bucket, self.key)
    }
}

/// Decides the `--input-type`: an explicit format wins, whole-file mode
/// forces JSON, otherwise the key's extension decides.
pub fn effective_format(
    declared: Option<FileFormat>,
    whole_file: bool,
    location: &ObjectLocation,
) -> Result<FileFormat, ProviderError> {
    if let Some(format) = declared {
        return Ok(format);
    }
    if whole_file {
        return Ok(FileFormat::Json);
    }
    location
        .extension()
        .ok_or_else(|| {
            ProviderError::config(format!(
                "no FileType given and {location} has no extension"
            ))
        })?
        .parse()
}

/// Raw encrypted bytes plus the format sops should read them as.
#[derive(Debug, Clone)]
pub struct EncryptedPayload {
    pub bytes: Vec<u8>,
    pub format: FileFormat,
    pub location: ObjectLocation,
}

#[async_trait]
pub trait Decrypt: Send + Sync {
    async fn decrypt(
        &self,
        payload: &EncryptedPayload,
        kms_key: Option<&str>,
    ) -> Result<Value, ProviderError>;
}

/// What to fetch and how to decrypt it.
#[derive(Debug, Clone)]
pub struct SopsFile {
    pub location: ObjectLocation,
    pub declared_format: Option<FileFormat>,
    pub kms_key: Option<String>,
    pub whole_file: bool,
}

impl SopsFile {
    pub fn format(&self) -> Result<FileFormat, ProviderError> {
        effective_format(self.declared_format, self.whole_file, &self.location)
    }
}

/// Fetches the encrypted object and runs it through the decryptor.
#[derive(Clone)]
pub struct SopsSource {
    objects: Arc<dyn ObjectStore>,
    decryptor: Arc<dyn Decrypt>,
}

impl SopsSource {
    pub fn new(objects: Arc<dyn ObjectStore>, decryptor: Arc<dyn Decrypt>) -> Self {
        Self { objects, decryptor }
    }

    pub async fn load(&self, file: &SopsFile) -> Result<Value, ProviderError> {
        let format = file.format()?;

        info!(bucket = %file.location.bucket, key = %file.location.key, "Getting object from S3");
        let bytes = self
            .objects
            .get_object(&file.location)
            .await
            .map_err(|e| ProviderError::Fetch {
                bucket: file.location.bucket.clone(),
                key: file.location.key.clone(),
                source: e.into(),
            })?;

        let payload = EncryptedPayload {
            bytes,
            format,
            location: file.location.clone(),
        };
        self.decryptor
            .decrypt(&payload, file.kms_key.as_deref())
            .await
    }
}
