//! Locating values inside a decrypted document and projecting them into a
//! flat set of named strings.

use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;

use serde::Deserialize;

use crate::error::ProviderError;

pub mod projector;
pub mod resolver;

pub use projector::project;
pub use resolver::resolve;

/// How a resolved node is turned into a string.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Encoding {
    /// Scalars only, rendered as their plain string form.
    #[default]
    String,
    /// Any node, serialized as compact JSON.
    Json,
}

impl FromStr for Encoding {
    type Err = ProviderError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "string" => Ok(Self::String),
            "json" => Ok(Self::Json),
            other => Err(ProviderError::InvalidEncoding(other.to_string())),
        }
    }
}

/// Non-empty sequence of map keys.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PathSpec(Vec<String>);

impl PathSpec {
    pub fn new(segments: Vec<String>) -> Result<Self, ProviderError> {
        if segments.is_empty() {
            return Err(ProviderError::config("path must have at least one segment"));
        }
        Ok(Self(segments))
    }

    pub fn segments(&self) -> &[String] {
        &self.0
    }
}

impl fmt::Display for PathSpec {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0.join("."))
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Mapping {
    pub path: PathSpec,
    pub encoding: Encoding,
}

#[derive(Debug, Deserialize)]
struct RawMapping {
    path: Vec<String>,
    #[serde(default)]
    encoding: Option<String>,
}

impl TryFrom<RawMapping> for Mapping {
    type Error = ProviderError;

    fn try_from(raw: RawMapping) -> Result<Self, Self::Error> {
        let encoding = match raw.encoding.as_deref() {
            Some(name) => name.parse()?,
            None => Encoding::default(),
        };
        Ok(Self {
            path: PathSpec::new(raw.path)?,
            encoding,
        })
    }
}

/// Output key to mapping. Keys are unique and their order is irrelevant.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Mappings(BTreeMap<String, Mapping>);

impl Mappings {
    /// Parses the JSON-encoded mapping object carried in resource properties.
    pub fn from_json(json: &str) -> Result<Self, ProviderError> {
        let raw: BTreeMap<String, RawMapping> = serde_json::from_str(json)
            .map_err(|e| ProviderError::config(format!("malformed Mappings: {e}")))?;

        raw.into_iter()
            .map(|(key, mapping)| {
                Mapping::try_from(mapping)
                    .map(|m| (key.clone(), m))
                    .map_err(|e| match e {
                        ProviderError::Configuration(msg) => {
                            ProviderError::config(format!("mapping '{key}': {msg}"))
                        }
                        other => other,
                    })
            })
            .collect::<Result<BTreeMap<_, _>, _>>()
            .map(Self)
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn keys(&self) -> impl Iterator<Item = &str> {
        self.0.keys().map(String::as_str)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &Mapping)> {
        self.0.iter().map(|(key, mapping)| (key.as_str(), mapping))
    }
}
