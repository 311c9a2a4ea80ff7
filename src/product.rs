//! Products attached to a detail event record.
//!
//! A product (ShakeMap, origin solution, moment tensor, ...) bundles string
//! properties and a set of named content entries. Each content entry is
//! either inline bytes or a pointer to a remote file; the upstream contract
//! makes the two mutually exclusive, so the decoder treats "both" and
//! "neither" as hard errors instead of guessing.

use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use serde_json::{Map, Value};

use crate::decode::{
    as_object, join, opt_i64, opt_str, require_ms, require_str, require_u64, serde_via_value,
    structural, type_of,
};
use crate::error::ValidationError;
use crate::time::{isoformat, Timespec};

/// Content stored inline in the feed, as an encoded string payload.
#[derive(Debug, Clone, PartialEq)]
pub struct ByteContent {
    pub content_type: String,
    pub last_modified: DateTime<Utc>,
    /// Size in bytes.
    pub length: u64,
    pub sha256: Option<String>,
    pub bytes: String,
}

/// Content stored remotely, addressed by URL.
#[derive(Debug, Clone, PartialEq)]
pub struct UrlContent {
    pub content_type: String,
    pub last_modified: DateTime<Utc>,
    /// Size in bytes.
    pub length: u64,
    pub sha256: Option<String>,
    pub url: String,
}

/// A product content entry: exactly one of the two storage variants.
#[derive(Debug, Clone, PartialEq)]
pub enum Content {
    Bytes(ByteContent),
    Url(UrlContent),
}

impl Content {
    pub fn from_value(value: &Value) -> Result<Self, ValidationError> {
        Self::from_value_at(value, "")
    }

    pub(crate) fn from_value_at(value: &Value, path: &str) -> Result<Self, ValidationError> {
        let obj = as_object(value, path)?;

        // The variant decision comes first: an ambiguous entry is reported
        // as such even when other fields are broken too.
        let has_bytes = matches!(obj.get("bytes"), Some(value) if !value.is_null());
        let has_url = matches!(obj.get("url"), Some(value) if !value.is_null());
        let inline = match (has_bytes, has_url) {
            (true, true) => {
                return Err(ValidationError::ContentDiscrimination {
                    path: path.to_string(),
                    detail: "both `bytes` and `url` are present".to_string(),
                });
            }
            (false, false) => {
                return Err(ValidationError::ContentDiscrimination {
                    path: path.to_string(),
                    detail: "neither `bytes` nor `url` is present".to_string(),
                });
            }
            (has_bytes, _) => has_bytes,
        };

        let content_type = require_str(obj, path, "contentType")?;
        let last_modified = require_ms(obj, path, "lastModified")?;
        let length = require_u64(obj, path, "length")?;
        let sha256 = opt_str(obj, path, "sha256")?;

        if inline {
            Ok(Self::Bytes(ByteContent {
                content_type,
                last_modified,
                length,
                sha256,
                bytes: require_str(obj, path, "bytes")?,
            }))
        } else {
            Ok(Self::Url(UrlContent {
                content_type,
                last_modified,
                length,
                sha256,
                url: require_str(obj, path, "url")?,
            }))
        }
    }

    pub fn content_type(&self) -> &str {
        match self {
            Self::Bytes(content) => &content.content_type,
            Self::Url(content) => &content.content_type,
        }
    }

    pub fn last_modified(&self) -> DateTime<Utc> {
        match self {
            Self::Bytes(content) => content.last_modified,
            Self::Url(content) => content.last_modified,
        }
    }

    /// Size in bytes.
    pub fn length(&self) -> u64 {
        match self {
            Self::Bytes(content) => content.length,
            Self::Url(content) => content.length,
        }
    }

    pub fn sha256(&self) -> Option<&str> {
        match self {
            Self::Bytes(content) => content.sha256.as_deref(),
            Self::Url(content) => content.sha256.as_deref(),
        }
    }

    /// The remote variant, when this entry is one.
    pub fn as_url(&self) -> Option<&UrlContent> {
        match self {
            Self::Url(content) => Some(content),
            Self::Bytes(_) => None,
        }
    }

    pub fn to_value(&self) -> Value {
        let mut obj = Map::new();
        obj.insert(
            "contentType".to_string(),
            Value::from(self.content_type().to_string()),
        );
        obj.insert(
            "lastModified".to_string(),
            Value::from(isoformat(&self.last_modified(), Timespec::Auto)),
        );
        obj.insert("length".to_string(), Value::from(self.length()));
        if let Some(sha256) = self.sha256() {
            obj.insert("sha256".to_string(), Value::from(sha256.to_string()));
        }
        match self {
            Self::Bytes(content) => {
                obj.insert("bytes".to_string(), Value::from(content.bytes.clone()));
            }
            Self::Url(content) => {
                obj.insert("url".to_string(), Value::from(content.url.clone()));
            }
        }
        Value::Object(obj)
    }
}

serde_via_value!(Content);

/// One versioned product submission for an event.
#[derive(Debug, Clone, PartialEq)]
pub struct Product {
    pub indexid: Option<String>,
    pub index_time: DateTime<Utc>,
    pub id: String,
    /// Product type code, e.g. `"shakemap"`.
    pub product_type: String,
    pub code: String,
    pub source: String,
    pub update_time: DateTime<Utc>,
    /// Submission status; the feed omits it for plain updates.
    pub status: String,
    pub properties: BTreeMap<String, String>,
    pub preferred_weight: Option<i64>,
    /// Content entries keyed by path-like names such as `"quakeml.xml"`.
    pub contents: BTreeMap<String, Content>,
}

impl Product {
    pub const DEFAULT_STATUS: &'static str = "UPDATE";

    pub fn from_value(value: &Value) -> Result<Self, ValidationError> {
        Self::from_value_at(value, "")
    }

    pub(crate) fn from_value_at(value: &Value, path: &str) -> Result<Self, ValidationError> {
        let obj = as_object(value, path)?;

        let ppath = join(path, "properties");
        let properties_value = obj
            .get("properties")
            .ok_or_else(|| structural(&ppath, "object", "missing"))?;
        let properties = as_object(properties_value, &ppath)?
            .iter()
            .map(|(key, value)| match value {
                Value::String(text) => Ok((key.clone(), text.clone())),
                other => Err(structural(&join(&ppath, key), "string", type_of(other))),
            })
            .collect::<Result<BTreeMap<_, _>, _>>()?;

        let cpath = join(path, "contents");
        let contents_value = obj
            .get("contents")
            .ok_or_else(|| structural(&cpath, "object", "missing"))?;
        let contents = as_object(contents_value, &cpath)?
            .iter()
            .map(|(key, value)| {
                Content::from_value_at(value, &join(&cpath, key)).map(|content| (key.clone(), content))
            })
            .collect::<Result<BTreeMap<_, _>, _>>()?;

        Ok(Self {
            indexid: opt_str(obj, path, "indexid")?,
            index_time: require_ms(obj, path, "indexTime")?,
            id: require_str(obj, path, "id")?,
            product_type: require_str(obj, path, "type")?,
            code: require_str(obj, path, "code")?,
            source: require_str(obj, path, "source")?,
            update_time: require_ms(obj, path, "updateTime")?,
            status: opt_str(obj, path, "status")?
                .unwrap_or_else(|| Self::DEFAULT_STATUS.to_string()),
            properties,
            preferred_weight: opt_i64(obj, path, "preferredWeight")?,
            contents,
        })
    }

    pub fn to_value(&self) -> Value {
        let mut obj = Map::new();
        if let Some(indexid) = &self.indexid {
            obj.insert("indexid".to_string(), Value::from(indexid.clone()));
        }
        obj.insert(
            "indexTime".to_string(),
            Value::from(isoformat(&self.index_time, Timespec::Auto)),
        );
        obj.insert("id".to_string(), Value::from(self.id.clone()));
        obj.insert("type".to_string(), Value::from(self.product_type.clone()));
        obj.insert("code".to_string(), Value::from(self.code.clone()));
        obj.insert("source".to_string(), Value::from(self.source.clone()));
        obj.insert(
            "updateTime".to_string(),
            Value::from(isoformat(&self.update_time, Timespec::Auto)),
        );
        obj.insert("status".to_string(), Value::from(self.status.clone()));
        let properties = self
            .properties
            .iter()
            .map(|(key, value)| (key.clone(), Value::from(value.clone())))
            .collect();
        obj.insert("properties".to_string(), Value::Object(properties));
        if let Some(weight) = self.preferred_weight {
            obj.insert("preferredWeight".to_string(), Value::from(weight));
        }
        let contents = self
            .contents
            .iter()
            .map(|(key, content)| (key.clone(), content.to_value()))
            .collect();
        obj.insert("contents".to_string(), Value::Object(contents));
        Value::Object(obj)
    }
}

serde_via_value!(Product);
