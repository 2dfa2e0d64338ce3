use std::collections::BTreeMap;

use serde::de::{DeserializeOwned, Error as _};
use serde::{Deserialize, Deserializer, Serialize};
use serde_json::Value;

use crate::error::ProviderError;

/// A custom-resource lifecycle event with its properties already typed.
#[derive(Debug, Clone, PartialEq)]
pub enum LifecycleEvent<P> {
    Create { props: P },
    Update { props: P, physical_id: String },
    Delete { physical_id: String },
}

#[derive(Debug, Deserialize)]
struct EventEnvelope {
    #[serde(rename = "RequestType")]
    request_type: String,
    #[serde(rename = "ResourceProperties", default)]
    resource_properties: Option<Value>,
    #[serde(rename = "PhysicalResourceId", default)]
    physical_resource_id: Option<String>,
}

impl EventEnvelope {
    fn props<P: DeserializeOwned>(&mut self) -> Result<P, ProviderError> {
        let raw = self
            .resource_properties
            .take()
            .ok_or_else(|| ProviderError::config("event has no ResourceProperties"))?;

        serde_json::from_value(raw)
            .map_err(|e| ProviderError::config(format!("invalid ResourceProperties: {e}")))
    }

    fn physical_id(&mut self) -> Result<String, ProviderError> {
        self.physical_resource_id
            .take()
            .ok_or_else(|| ProviderError::config("event has no PhysicalResourceId"))
    }
}

impl<P: DeserializeOwned> LifecycleEvent<P> {
    pub fn from_value(value: Value) -> Result<Self, ProviderError> {
        let mut envelope: EventEnvelope = serde_json::from_value(value)
            .map_err(|e| ProviderError::config(format!("malformed lifecycle event: {e}")))?;

        match envelope.request_type.as_str() {
            "Create" => Ok(Self::Create {
                props: envelope.props()?,
            }),
            "Update" => Ok(Self::Update {
                physical_id: envelope.physical_id()?,
                props: envelope.props()?,
            }),
            "Delete" => Ok(Self::Delete {
                physical_id: envelope.physical_id()?,
            }),
            other => Err(ProviderError::UnknownEventType(other.to_string())),
        }
    }
}

impl<P> LifecycleEvent<P> {
    pub fn request_type(&self) -> &'static str {
        match self {
            Self::Create { .. } => "Create",
            Self::Update { .. } => "Update",
            Self::Delete { .. } => "Delete",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct LifecycleResponse {
    #[serde(rename = "PhysicalResourceId")]
    pub physical_resource_id: String,
    #[serde(rename = "Data")]
    pub data: BTreeMap<String, Value>,
}

impl LifecycleResponse {
    pub fn new(physical_resource_id: impl Into<String>) -> Self {
        Self {
            physical_resource_id: physical_resource_id.into(),
            data: BTreeMap::new(),
        }
    }

    pub fn with_physical_id(self, physical_resource_id: impl Into<String>) -> Self {
        Self {
            physical_resource_id: physical_resource_id.into(),
            ..self
        }
    }
}

/// CloudFormation hands every scalar property over as a string, so booleans
/// arrive either as `true` or as `"true"`.
pub fn deserialize_flag<'de, D>(deserializer: D) -> Result<bool, D::Error>
where
    D: Deserializer<'de>,
{
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum Flag {
        Bool(bool),
        Text(String),
    }

    match Flag::deserialize(deserializer)? {
        Flag::Bool(value) => Ok(value),
        Flag::Text(text) => match text.as_str() {
            "true" => Ok(true),
            "false" => Ok(false),
            other => Err(D::Error::custom(format!(
                "unexpected string value when normalising boolean: {other}"
            ))),
        },
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[derive(Debug, Deserialize, PartialEq)]
    struct Props {
        #[serde(rename = "Name")]
        name: String,
        #[serde(rename = "Flag", default, deserialize_with = "deserialize_flag")]
        flag: bool,
    }

    #[test]
    fn parses_create() {
        let event = LifecycleEvent::<Props>::from_value(json!({
            "RequestType": "Create",
            "ServiceToken": "arn:aws:lambda:...",
            "ResourceProperties": {"Name": "a", "Flag": "true", "ServiceToken": "x"}
        }))
        .unwrap();

        assert_eq!(
            event,
            LifecycleEvent::Create {
                props: Props {
                    name: "a".into(),
                    flag: true
                }
            }
        );
    }

    #[test]
    fn parses_update_and_delete() {
        let update = LifecycleEvent::<Props>::from_value(json!({
            "RequestType": "Update",
            "PhysicalResourceId": "secretdata_abc",
            "ResourceProperties": {"Name": "a", "Flag": false}
        }))
        .unwrap();
        assert_eq!(update.request_type(), "Update");
        assert!(matches!(update, LifecycleEvent::Update { ref physical_id, .. } if physical_id == "secretdata_abc"));

        let delete = LifecycleEvent::<Props>::from_value(json!({
            "RequestType": "Delete",
            "PhysicalResourceId": "secretdata_abc"
        }))
        .unwrap();
        assert_eq!(
            delete,
            LifecycleEvent::Delete {
                physical_id: "secretdata_abc".into()
            }
        );
    }

    #[test]
    fn unknown_request_type_is_reported() {
        let err = LifecycleEvent::<Props>::from_value(json!({
            "RequestType": "BadEventType",
            "PhysicalResourceId": "x",
            "ResourceProperties": {"Name": "a"}
        }))
        .unwrap_err();

        assert!(matches!(err, ProviderError::UnknownEventType(t) if t == "BadEventType"));
    }

    #[test]
    fn update_without_physical_id_is_rejected() {
        let err = LifecycleEvent::<Props>::from_value(json!({
            "RequestType": "Update",
            "ResourceProperties": {"Name": "a"}
        }))
        .unwrap_err();

        assert!(matches!(err, ProviderError::Configuration(_)));
    }

    #[test]
    fn flag_rejects_other_strings() {
        for bad in ["foo", "1", "True"] {
            let err = LifecycleEvent::<Props>::from_value(json!({
                "RequestType": "Create",
                "ResourceProperties": {"Name": "a", "Flag": bad}
            }))
            .unwrap_err();
            assert!(matches!(err, ProviderError::Configuration(msg) if msg.contains(bad)));
        }
    }

    #[test]
    fn response_serializes_with_cloudformation_keys() {
        let response = LifecycleResponse::new("secretdata_x").with_physical_id("kept");
        assert_eq!(
            serde_json::to_value(&response).unwrap(),
            json!({"PhysicalResourceId": "kept", "Data": {}})
        );
    }
}
