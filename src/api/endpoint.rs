//! Purpose: Resolve relative resource paths against the configured REST base URL.
//! Exports: `Endpoint`, `API_VERSION`, `KU_API_VERSION`.
//! Role: URL resolver shared by the core client and the KU extensions.
//! Invariants: The base always ends with `/`; resolved URLs are `base + version + "/" + path`.
//! Invariants: Only an absent/blank base is rejected up front; bad URLs surface when resolved.
#![allow(clippy::result_large_err)]

use crate::core::error::{Error, ErrorKind};
use crate::core::params::Params;
use url::Url;

pub const API_VERSION: &str = "v1";
pub const KU_API_VERSION: &str = "v1ku";

#[derive(Clone, Debug, Eq, PartialEq)]
pub struct Endpoint {
    base: String,
    version: String,
}

impl Endpoint {
    pub fn new(base_url: impl Into<String>) -> Result<Self, Error> {
        let mut base = base_url.into();
        if base.trim().is_empty() {
            return Err(Error::new(ErrorKind::Usage)
                .with_message("missing REST base url")
                .with_hint("Pass --rest-url or set ISLANDORA_REST."));
        }
        if !base.ends_with('/') {
            base.push('/');
        }
        Ok(Self {
            base,
            version: API_VERSION.to_string(),
        })
    }

    pub fn with_version(mut self, version: impl Into<String>) -> Self {
        self.version = version.into();
        self
    }

    pub fn base(&self) -> &str {
        &self.base
    }

    pub fn version(&self) -> &str {
        &self.version
    }

    pub fn resolve(&self, path: &str) -> Result<Url, Error> {
        let raw = format!("{}{}/{}", self.base, self.version, path);
        Url::parse(&raw).map_err(|err| {
            Error::new(ErrorKind::Usage)
                .with_message("invalid request url")
                .with_url(raw)
                .with_source(err)
        })
    }

    pub fn resolve_with_query(&self, path: &str, query: &Params) -> Result<Url, Error> {
        let mut url = self.resolve(path)?;
        if !query.is_empty() {
            let mut pairs = url.query_pairs_mut();
            for (key, value) in query.iter() {
                pairs.append_pair(key, value);
            }
        }
        Ok(url)
    }
}
