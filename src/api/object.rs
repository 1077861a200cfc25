//! Purpose: Object CRUD over `object/{pid}`.
//! Exports: `ObjectProfile` and the object operations on `IslandoraClient`.
//! Role: Thin verb mapping; create is form-encoded, update is JSON.
//! Invariants: Unknown response fields survive decoding in `ObjectProfile::extra`.
#![allow(clippy::result_large_err)]

use super::client::{ApiResult, IslandoraClient, require};
use super::transport::{Method, RequestBody, Transport};
use crate::core::params::Params;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

#[derive(Clone, Debug, Default, Deserialize, Serialize, PartialEq)]
pub struct ObjectProfile {
    #[serde(default)]
    pub pid: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub label: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub owner: Option<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub models: Vec<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub state: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub created: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub modified: Option<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub datastreams: Vec<Value>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl<T: Transport> IslandoraClient<T> {
    pub fn get_object(&self, pid: &str) -> ApiResult<ObjectProfile> {
        require(pid, "PID")?;
        self.execute_json(
            Method::Get,
            &object_path(pid),
            &Params::new(),
            RequestBody::Empty,
        )
    }

    /// `fields` is forwarded as form data untouched: `pid`, `namespace`, `label`, `owner`, ...
    /// The server assigns a PID when neither `pid` nor a full identifier is supplied.
    pub fn create_object(&self, fields: &Params) -> ApiResult<ObjectProfile> {
        self.execute_json(
            Method::Post,
            "object",
            &Params::new(),
            RequestBody::Form(fields.clone()),
        )
    }

    /// `changes` usually carries `label`, `owner` or `state`; sent as a JSON object.
    pub fn update_object(&self, pid: &str, changes: &Params) -> ApiResult<ObjectProfile> {
        require(pid, "PID")?;
        self.execute_json(
            Method::Put,
            &object_path(pid),
            &Params::new(),
            RequestBody::Json(changes.to_json_object()),
        )
    }

    pub fn delete_object(&self, pid: &str) -> ApiResult<()> {
        require(pid, "PID")?;
        self.execute(
            Method::Delete,
            &object_path(pid),
            &Params::new(),
            RequestBody::Empty,
        )?;
        Ok(())
    }
}

pub(crate) fn object_path(pid: &str) -> String {
    format!("object/{pid}")
}

#[cfg(test)]
mod tests {
    use super::ObjectProfile;
    use serde_json::json;

    #[test]
    fn profile_keeps_unknown_fields() {
        let profile: ObjectProfile = serde_json::from_value(json!({
            "pid": "samples:1",
            "label": "Sample Article 01",
            "models": ["islandora:sp_pdf", "fedora-system:FedoraObject-3.0"],
            "state": "A",
            "custom": {"k": 1}
        }))
        .expect("profile");
        assert_eq!(profile.pid, "samples:1");
        assert_eq!(profile.models.len(), 2);
        assert_eq!(profile.extra.get("custom"), Some(&json!({"k": 1})));
    }
}
