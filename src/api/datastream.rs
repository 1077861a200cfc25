//! Purpose: Datastream CRUD on `object/{pid}/datastream[/{dsid}]`.
//! Exports: `DatastreamContent`, `DatastreamOptions`, `DatastreamReader` and the datastream operations.
//! Role: Multipart uploads (file streamed from disk or in-memory string) and content retrieval.
//! Invariants: `versionable` goes over the wire as 1/0, never true/false.
//! Invariants: Updates are POSTs carrying `method=PUT`; the server cannot take multipart PUTs.
//! Invariants: A 201 create with an empty/invalid body is a success with an empty object.
#![allow(clippy::result_large_err)]

use super::client::{ApiResult, IslandoraClient, decode_json, require};
use super::object::object_path;
use super::transport::{Method, RequestBody, Transport};
use crate::core::error::{Error, ErrorKind};
use crate::core::multipart::{FilePart, MultipartForm};
use crate::core::params::Params;
use serde_json::{Map, Value};
use std::io::Read;
use std::path::PathBuf;

pub const DEFAULT_CHECKSUM_TYPE: &str = "MD5";
pub const DEFAULT_STRING_MIME_TYPE: &str = "application/xml";

pub type DatastreamReader = Box<dyn Read + Send + Sync>;

#[derive(Clone, Debug, Eq, PartialEq)]
pub enum DatastreamContent {
    /// Streamed from disk at send time.
    File(PathBuf),
    String(String),
}

impl DatastreamContent {
    /// Collapse the two optional sources a caller may hold into at most one.
    pub fn from_sources(file: Option<PathBuf>, string: Option<String>) -> ApiResult<Option<Self>> {
        match (file, string) {
            (Some(_), Some(_)) => Err(Error::new(ErrorKind::AmbiguousContent)
                .with_message("give either a file or a string as datastream content, not both")),
            (Some(path), None) => Ok(Some(DatastreamContent::File(path))),
            (None, Some(text)) => Ok(Some(DatastreamContent::String(text))),
            (None, None) => Ok(None),
        }
    }

    // String parts take the declared `mimeType` so the part header and the form field agree.
    fn into_part(self, dsid: &str, metadata: &Params) -> FilePart {
        match self {
            DatastreamContent::File(path) => FilePart::from_path("file", path),
            DatastreamContent::String(text) => FilePart::from_bytes(
                "file",
                format!("{dsid} data"),
                metadata.get("mimeType").unwrap_or("text/plain"),
                text.into_bytes(),
            ),
        }
    }
}

/// Form metadata for create/update. `metadata` is forwarded untouched
/// (`label`, `state`, `mimeType`, `checksumType`, `controlGroup`, ...).
#[derive(Clone, Debug, Default, Eq, PartialEq)]
pub struct DatastreamOptions {
    pub versionable: Option<bool>,
    pub metadata: Params,
}

impl DatastreamOptions {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn versionable(mut self, versionable: bool) -> Self {
        self.versionable = Some(versionable);
        self
    }

    pub fn field(mut self, key: impl Into<String>, value: impl ToString) -> Self {
        self.metadata.insert(key, value);
        self
    }

    pub fn label(self, label: impl Into<String>) -> Self {
        self.field("label", label.into())
    }

    pub fn state(self, state: impl Into<String>) -> Self {
        self.field("state", state.into())
    }

    pub fn mime_type(self, mime_type: impl Into<String>) -> Self {
        self.field("mimeType", mime_type.into())
    }
}

impl<T: Transport> IslandoraClient<T> {
    /// Raw datastream bytes, fully buffered.
    pub fn get_datastream(
        &self,
        pid: &str,
        dsid: &str,
        version: Option<&str>,
    ) -> ApiResult<Vec<u8>> {
        self.open_datastream(pid, dsid, version).and_then(|mut reader| {
            let mut out = Vec::new();
            reader.read_to_end(&mut out).map_err(|err| {
                Error::new(ErrorKind::Io)
                    .with_message("failed to read datastream content")
                    .with_source(err)
            })?;
            Ok(out)
        })
    }

    /// Datastream bytes as a reader over the live response body.
    pub fn open_datastream(
        &self,
        pid: &str,
        dsid: &str,
        version: Option<&str>,
    ) -> ApiResult<DatastreamReader> {
        require(pid, "PID")?;
        require(dsid, "DSID")?;
        let response = self.execute(
            Method::Get,
            &datastream_path(pid, dsid),
            &content_query(true, version),
            RequestBody::Empty,
        )?;
        Ok(response.into_reader())
    }

    pub fn get_datastream_info(
        &self,
        pid: &str,
        dsid: &str,
        version: Option<&str>,
    ) -> ApiResult<Value> {
        require(pid, "PID")?;
        require(dsid, "DSID")?;
        self.execute_json(
            Method::Get,
            &datastream_path(pid, dsid),
            &content_query(false, version),
            RequestBody::Empty,
        )
    }

    /// `versionable` defaults to true and `checksumType` to MD5.
    /// String content defaults `mimeType` to `application/xml`.
    pub fn create_datastream(
        &self,
        pid: &str,
        dsid: &str,
        content: Option<DatastreamContent>,
        options: DatastreamOptions,
    ) -> ApiResult<Value> {
        require(pid, "PID")?;
        require(dsid, "DSID")?;
        let content = content.ok_or_else(|| {
            Error::new(ErrorKind::MissingContent)
                .with_message("datastream create needs a file or a string")
        })?;

        let DatastreamOptions {
            versionable,
            mut metadata,
        } = options;
        metadata.insert("dsid", dsid);
        metadata.insert("versionable", versionable_flag(versionable.unwrap_or(true)));
        metadata.insert_if_absent("checksumType", DEFAULT_CHECKSUM_TYPE);
        if matches!(content, DatastreamContent::String(_)) {
            metadata.insert_if_absent("mimeType", DEFAULT_STRING_MIME_TYPE);
        }

        let part = content.into_part(dsid, &metadata);
        let form = MultipartForm::new().fields(metadata).file(Some(part));
        let response = self.execute(
            Method::Post,
            &format!("{}/datastream", object_path(pid)),
            &Params::new(),
            RequestBody::Multipart(form),
        )?;

        let status = response.status();
        let body = response.into_bytes()?;
        match decode_json::<Value>(status, &body) {
            Ok(value) => Ok(value),
            Err(err) if status == 201 => {
                tracing::warn!(pid, dsid, error = %err, "datastream created without a JSON body");
                Ok(Value::Object(Map::new()))
            }
            Err(err) => Err(err),
        }
    }

    /// Content is optional; without it only the metadata fields change.
    pub fn update_datastream(
        &self,
        pid: &str,
        dsid: &str,
        content: Option<DatastreamContent>,
        options: DatastreamOptions,
    ) -> ApiResult<()> {
        require(pid, "PID")?;
        require(dsid, "DSID")?;
        let DatastreamOptions {
            versionable,
            mut metadata,
        } = options;
        if let Some(versionable) = versionable {
            metadata.insert("versionable", versionable_flag(versionable));
        }
        if matches!(content, Some(DatastreamContent::String(_))) {
            metadata.insert_if_absent("mimeType", DEFAULT_STRING_MIME_TYPE);
        }
        metadata.insert("method", "PUT");

        let part = content.map(|content| content.into_part(dsid, &metadata));
        let form = MultipartForm::new().fields(metadata).file(part);
        self.execute(
            Method::Post,
            &datastream_path(pid, dsid),
            &Params::new(),
            RequestBody::Multipart(form),
        )?;
        Ok(())
    }

    pub fn delete_datastream(&self, pid: &str, dsid: &str) -> ApiResult<()> {
        require(pid, "PID")?;
        require(dsid, "DSID")?;
        self.execute(
            Method::Delete,
            &datastream_path(pid, dsid),
            &Params::new(),
            RequestBody::Empty,
        )?;
        Ok(())
    }
}

fn datastream_path(pid: &str, dsid: &str) -> String {
    format!("{}/datastream/{dsid}", object_path(pid))
}

fn content_query(content: bool, version: Option<&str>) -> Params {
    let mut query = Params::new().with("content", content);
    if let Some(version) = version {
        query.insert("version", version);
    }
    query
}

fn versionable_flag(versionable: bool) -> u8 {
    u8::from(versionable)
}
