//! Purpose: Define the Islandora REST client and the request plumbing every operation shares.
//! Exports: `IslandoraClient`, `ApiResult`.
//! Role: Composes an `Endpoint` (URL resolver) with a `Transport`; resource modules add impl blocks.
//! Invariants: Identifier checks run before any request is built.
//! Invariants: The client holds no mutable state; the transport owns credentials and connections.
#![allow(clippy::result_large_err)]

use super::endpoint::Endpoint;
use super::ku::KuClient;
use super::transport::{
    Credentials, HttpRequest, HttpResponse, Method, RequestBody, Transport, UreqTransport,
};
use crate::config::Config;
use crate::core::error::{Error, ErrorKind};
use crate::core::params::Params;
use serde::de::DeserializeOwned;

pub type ApiResult<T> = Result<T, Error>;

#[derive(Clone, Debug)]
pub struct IslandoraClient<T = UreqTransport> {
    endpoint: Endpoint,
    transport: T,
}

impl IslandoraClient<UreqTransport> {
    pub fn new(rest_url: impl Into<String>, credentials: Option<Credentials>) -> ApiResult<Self> {
        let endpoint = Endpoint::new(rest_url)?;
        let mut transport = UreqTransport::new();
        if let Some(credentials) = credentials {
            transport = transport.with_credentials(credentials);
        }
        Ok(Self::with_transport(endpoint, transport))
    }

    pub fn from_config(config: &Config) -> ApiResult<Self> {
        Self::new(config.rest_url.clone(), config.credentials())
    }
}

impl<T: Transport> IslandoraClient<T> {
    pub fn with_transport(endpoint: Endpoint, transport: T) -> Self {
        Self {
            endpoint,
            transport,
        }
    }

    pub fn endpoint(&self) -> &Endpoint {
        &self.endpoint
    }

    pub fn transport(&self) -> &T {
        &self.transport
    }

    /// KU local endpoints (`v1ku`) sharing this client's base URL and transport.
    pub fn ku(&self) -> KuClient<'_, T> {
        KuClient::new(&self.transport, self.endpoint.clone())
    }

    pub(crate) fn execute(
        &self,
        method: Method,
        path: &str,
        query: &Params,
        body: RequestBody,
    ) -> ApiResult<HttpResponse> {
        dispatch(&self.transport, &self.endpoint, method, path, query, body)
    }

    pub(crate) fn execute_json<R>(
        &self,
        method: Method,
        path: &str,
        query: &Params,
        body: RequestBody,
    ) -> ApiResult<R>
    where
        R: DeserializeOwned,
    {
        let response = self.execute(method, path, query, body)?;
        read_json(response)
    }
}

pub(crate) fn dispatch<T: Transport + ?Sized>(
    transport: &T,
    endpoint: &Endpoint,
    method: Method,
    path: &str,
    query: &Params,
    body: RequestBody,
) -> ApiResult<HttpResponse> {
    let url = endpoint.resolve_with_query(path, query)?;
    transport.send(HttpRequest::new(method, url).with_body(body))
}

pub(crate) fn read_json<R>(response: HttpResponse) -> ApiResult<R>
where
    R: DeserializeOwned,
{
    let status = response.status();
    let body = response.into_bytes()?;
    decode_json(status, &body)
}

pub(crate) fn decode_json<R>(status: u16, body: &[u8]) -> ApiResult<R>
where
    R: DeserializeOwned,
{
    serde_json::from_slice(body).map_err(|err| {
        Error::new(ErrorKind::DecodeAnomaly)
            .with_message("invalid response json")
            .with_status(status)
            .with_body(String::from_utf8_lossy(body).into_owned())
            .with_source(err)
    })
}

pub(crate) fn require(value: &str, what: &str) -> ApiResult<()> {
    if value.trim().is_empty() {
        return Err(Error::missing_identifier(what));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::{IslandoraClient, decode_json, require};
    use crate::api::transport::Credentials;
    use crate::core::error::ErrorKind;
    use serde_json::Value;

    #[test]
    fn require_rejects_blank_identifiers() {
        assert!(require("islandora:1", "PID").is_ok());
        let err = require(" ", "DSID").expect_err("blank");
        assert_eq!(err.kind(), ErrorKind::MissingIdentifier);
        assert_eq!(err.message(), Some("missing DSID"));
    }

    #[test]
    fn decode_failure_is_an_anomaly_with_body() {
        let err = decode_json::<Value>(200, b"<html>oops</html>").expect_err("html");
        assert_eq!(err.kind(), ErrorKind::DecodeAnomaly);
        assert_eq!(err.status(), Some(200));
        assert_eq!(err.body(), Some("<html>oops</html>"));
    }

    #[test]
    fn ku_client_shares_base_url() {
        let client = IslandoraClient::new(
            "http://localhost:8000/islandora/rest",
            Some(Credentials::new("admin", "secret")),
        )
        .expect("client");
        assert_eq!(client.ku().endpoint().version(), "v1ku");
        assert_eq!(
            client.ku().endpoint().base(),
            "http://localhost:8000/islandora/rest/"
        );
        assert_eq!(
            client.transport().credentials(),
            Some(&Credentials::new("admin", "secret"))
        );
    }
}
