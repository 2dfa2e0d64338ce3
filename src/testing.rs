//! In-memory stand-ins for S3, sops, Secrets Manager and SSM.

use std::collections::HashMap;
use std::sync::{Mutex, MutexGuard};

use anyhow::{anyhow, Result};
use async_trait::async_trait;
use serde_json::Value;

use crate::aws::s3::ObjectStore;
use crate::aws::secrets::SecretStore;
use crate::aws::ssm::{ParameterStore, SecureParameter};
use crate::error::ProviderError;
use crate::sops::{Decrypt, EncryptedPayload, FileFormat, ObjectLocation};

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
}

#[derive(Default)]
pub struct FakeObjectStore {
    objects: HashMap<(String, String), Vec<u8>>,
    requests: Mutex<Vec<(String, String)>>,
}

impl FakeObjectStore {
    pub fn with_object(bucket: &str, key: &str, body: &[u8]) -> Self {
        let mut store = Self::default();
        store
            .objects
            .insert((bucket.to_string(), key.to_string()), body.to_vec());
        store
    }

    pub fn requests(&self) -> Vec<(String, String)> {
        lock(&self.requests).clone()
    }
}

#[async_trait]
impl ObjectStore for FakeObjectStore {
    async fn get_object(&self, location: &ObjectLocation) -> Result<Vec<u8>> {
        let id = (location.bucket.clone(), location.key.clone());
        lock(&self.requests).push(id.clone());
        self.objects
            .get(&id)
            .cloned()
            .ok_or_else(|| anyhow!("NoSuchKey: {location}"))
    }
}

#[derive(Debug, Clone)]
pub struct DecryptCall {
    pub bytes: Vec<u8>,
    pub format: FileFormat,
    pub kms_key: Option<String>,
}

pub struct FakeDecryptor {
    doc: Value,
    exit_code: Mutex<Option<i32>>,
    calls: Mutex<Vec<DecryptCall>>,
}

impl FakeDecryptor {
    pub fn returning(doc: Value) -> Self {
        Self {
            doc,
            exit_code: Mutex::new(None),
            calls: Mutex::new(Vec::new()),
        }
    }

    pub fn fail_with_exit_code(&self, code: i32) {
        *lock(&self.exit_code) = Some(code);
    }

    pub fn calls(&self) -> Vec<DecryptCall> {
        lock(&self.calls).clone()
    }
}

#[async_trait]
impl Decrypt for FakeDecryptor {
    async fn decrypt(
        &self,
        payload: &EncryptedPayload,
        kms_key: Option<&str>,
    ) -> Result<Value, ProviderError> {
        lock(&self.calls).push(DecryptCall {
            bytes: payload.bytes.clone(),
            format: payload.format,
            kms_key: kms_key.map(str::to_string),
        });

        match *lock(&self.exit_code) {
            Some(code) => Err(ProviderError::DecryptionFailed {
                exit_code: Some(code),
                stderr: "Failed to get the data key required to decrypt the SOPS file.".into(),
            }),
            None => Ok(self.doc.clone()),
        }
    }
}

#[derive(Default)]
pub struct FakeSecretStore {
    fail: Mutex<bool>,
    writes: Mutex<Vec<(String, String)>>,
}

impl FakeSecretStore {
    pub fn fail_writes(&self) {
        *lock(&self.fail) = true;
    }

    pub fn writes(&self) -> Vec<(String, String)> {
        lock(&self.writes).clone()
    }
}

#[async_trait]
impl SecretStore for FakeSecretStore {
    async fn put_secret_string(&self, secret_id: &str, value: &str) -> Result<()> {
        if *lock(&self.fail) {
            return Err(anyhow!("AccessDeniedException"));
        }
        lock(&self.writes).push((secret_id.to_string(), value.to_string()));
        Ok(())
    }
}

#[derive(Default)]
pub struct FakeParameterStore {
    fail: Mutex<bool>,
    writes: Mutex<Vec<SecureParameter>>,
}

impl FakeParameterStore {
    pub fn fail_writes(&self) {
        *lock(&self.fail) = true;
    }

    pub fn writes(&self) -> Vec<SecureParameter> {
        lock(&self.writes).clone()
    }
}

#[async_trait]
impl ParameterStore for FakeParameterStore {
    async fn put_secure_parameter(&self, parameter: &SecureParameter) -> Result<()> {
        if *lock(&self.fail) {
            return Err(anyhow!("ParameterLimitExceeded"));
        }
        lock(&self.writes).push(parameter.clone());
        Ok(())
    }
}
