//! Purpose: University of Kansas local endpoints served under `v1ku/`.
//! Exports: `KuClient`, `DEFAULT_REGEN_DSID`.
//! Role: Derivative regeneration, PREMIS export and reindexing over the core client's transport.
//! Invariants: Same base URL and credentials as the core client; only the version segment differs.
#![allow(clippy::result_large_err)]

use super::client::{ApiResult, dispatch, require};
use super::endpoint::{Endpoint, KU_API_VERSION};
use super::transport::{HttpResponse, Method, RequestBody, Transport};
use crate::core::params::Params;

pub const DEFAULT_REGEN_DSID: &str = "DC";

pub struct KuClient<'a, T> {
    transport: &'a T,
    endpoint: Endpoint,
}

impl<'a, T: Transport> KuClient<'a, T> {
    pub(crate) fn new(transport: &'a T, endpoint: Endpoint) -> Self {
        Self {
            transport,
            endpoint: endpoint.with_version(KU_API_VERSION),
        }
    }

    pub fn endpoint(&self) -> &Endpoint {
        &self.endpoint
    }

    /// Rebuild a derivative. `params` carry DSID-specific flags such as `language=spa`
    /// for OCR or `force_children=true`.
    pub fn regen(&self, pid: &str, dsid: Option<&str>, params: &Params) -> ApiResult<()> {
        require(pid, "PID")?;
        let dsid = dsid
            .filter(|dsid| !dsid.trim().is_empty())
            .unwrap_or(DEFAULT_REGEN_DSID);
        self.send(Method::Put, &format!("regen/{pid}/{dsid}"), params)?;
        Ok(())
    }

    /// Raw PREMIS XML for the object.
    pub fn premis(&self, pid: &str, params: &Params) -> ApiResult<Vec<u8>> {
        require(pid, "PID")?;
        self.send(Method::Get, &format!("object/{pid}/premis"), params)?
            .into_bytes()
    }

    pub fn reindex(&self, pid: &str, params: &Params) -> ApiResult<()> {
        require(pid, "PID")?;
        self.send(Method::Get, &format!("reindex/{pid}"), params)?;
        Ok(())
    }

    fn send(&self, method: Method, path: &str, params: &Params) -> ApiResult<HttpResponse> {
        dispatch(
            self.transport,
            &self.endpoint,
            method,
            path,
            params,
            RequestBody::Empty,
        )
    }
}
