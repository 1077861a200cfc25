//! Purpose: Abstract the HTTP round trip behind a `Transport` trait and provide the ureq-backed default.
//! Exports: `Transport`, `HttpRequest`, `HttpResponse`, `RequestBody`, `Method`, `Credentials`, `UreqTransport`.
//! Role: The only place that touches the network; resource operations compose over it.
//! Invariants: `send` returns `RequestFailed` (status + body) for every non-2xx response.
//! Invariants: Transports never retry; one `send` is one HTTP exchange.
#![allow(clippy::result_large_err)]

use crate::core::error::{Error, ErrorKind};
use crate::core::multipart::MultipartForm;
use crate::core::params::Params;
use base64::Engine as _;
use base64::engine::general_purpose::STANDARD as BASE64;
use serde_json::Value;
use std::io::{Cursor, Read};
use std::path::Path;
use std::sync::Arc;
use std::time::Duration;
use ureq::rustls::client::danger::{
    HandshakeSignatureValid, ServerCertVerified, ServerCertVerifier,
};
use ureq::rustls::pki_types::{CertificateDer, ServerName, UnixTime};
use ureq::rustls::{DigitallySignedStruct, Error as TlsError, SignatureScheme};
use url::Url;

type ApiResult<T> = Result<T, Error>;

#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum Method {
    Get,
    Post,
    Put,
    Delete,
}

impl Method {
    pub fn as_str(self) -> &'static str {
        match self {
            Method::Get => "GET",
            Method::Post => "POST",
            Method::Put => "PUT",
            Method::Delete => "DELETE",
        }
    }
}

#[derive(Debug)]
pub enum RequestBody {
    Empty,
    /// `application/x-www-form-urlencoded`.
    Form(Params),
    Json(Value),
    Multipart(MultipartForm),
}

#[derive(Debug)]
pub struct HttpRequest {
    pub method: Method,
    /// Fully resolved URL, query string included.
    pub url: Url,
    pub body: RequestBody,
}

impl HttpRequest {
    pub fn new(method: Method, url: Url) -> Self {
        Self {
            method,
            url,
            body: RequestBody::Empty,
        }
    }

    pub fn with_body(mut self, body: RequestBody) -> Self {
        self.body = body;
        self
    }

    /// Decoded query parameters, in URL order.
    pub fn query(&self) -> Params {
        self.url
            .query_pairs()
            .map(|(key, value)| (key.into_owned(), value.into_owned()))
            .collect()
    }
}

pub struct HttpResponse {
    status: u16,
    body: Box<dyn Read + Send + Sync>,
}

impl HttpResponse {
    pub fn new(status: u16, body: Box<dyn Read + Send + Sync>) -> Self {
        Self { status, body }
    }

    pub fn from_bytes(status: u16, body: impl Into<Vec<u8>>) -> Self {
        Self::new(status, Box::new(Cursor::new(body.into())))
    }

    pub fn status(&self) -> u16 {
        self.status
    }

    pub fn into_reader(self) -> Box<dyn Read + Send + Sync> {
        self.body
    }

    pub fn into_bytes(mut self) -> ApiResult<Vec<u8>> {
        let mut out = Vec::new();
        self.body.read_to_end(&mut out).map_err(|err| {
            Error::new(ErrorKind::Io)
                .with_message("failed to read response body")
                .with_source(err)
        })?;
        Ok(out)
    }
}

impl std::fmt::Debug for HttpResponse {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("HttpResponse")
            .field("status", &self.status)
            .finish_non_exhaustive()
    }
}

/// One blocking HTTP exchange with raise-on-error semantics.
pub trait Transport {
    fn send(&self, request: HttpRequest) -> ApiResult<HttpResponse>;
}

impl<T: Transport + ?Sized> Transport for &T {
    fn send(&self, request: HttpRequest) -> ApiResult<HttpResponse> {
        (**self).send(request)
    }
}

impl<T: Transport + ?Sized> Transport for Arc<T> {
    fn send(&self, request: HttpRequest) -> ApiResult<HttpResponse> {
        (**self).send(request)
    }
}

#[derive(Clone, Debug, Eq, PartialEq)]
pub struct Credentials {
    pub user: String,
    pub token: String,
}

impl Credentials {
    pub fn new(user: impl Into<String>, token: impl Into<String>) -> Self {
        Self {
            user: user.into(),
            token: token.into(),
        }
    }

    fn basic_header(&self) -> String {
        let raw = format!("{}:{}", self.user, self.token);
        format!("Basic {}", BASE64.encode(raw))
    }
}

#[derive(Clone)]
pub struct UreqTransport {
    inner: Arc<UreqTransportInner>,
}

struct UreqTransportInner {
    credentials: Option<Credentials>,
    timeout: Option<Duration>,
    tls_config: Option<Arc<ureq::rustls::ClientConfig>>,
    agent: ureq::Agent,
}

#[derive(Debug)]
struct AcceptAllServerCertVerifier;

impl ServerCertVerifier for AcceptAllServerCertVerifier {
    fn verify_server_cert(
        &self,
        _end_entity: &CertificateDer<'_>,
        _intermediates: &[CertificateDer<'_>],
        _server_name: &ServerName<'_>,
        _ocsp_response: &[u8],
        _now: UnixTime,
    ) -> Result<ServerCertVerified, TlsError> {
        Ok(ServerCertVerified::assertion())
    }

    fn verify_tls12_signature(
        &self,
        _message: &[u8],
        _cert: &CertificateDer<'_>,
        _dss: &DigitallySignedStruct,
    ) -> Result<HandshakeSignatureValid, TlsError> {
        Ok(HandshakeSignatureValid::assertion())
    }

    fn verify_tls13_signature(
        &self,
        _message: &[u8],
        _cert: &CertificateDer<'_>,
        _dss: &DigitallySignedStruct,
    ) -> Result<HandshakeSignatureValid, TlsError> {
        Ok(HandshakeSignatureValid::assertion())
    }

    fn supported_verify_schemes(&self) -> Vec<SignatureScheme> {
        ureq::rustls::crypto::aws_lc_rs::default_provider()
            .signature_verification_algorithms
            .supported_schemes()
    }
}

impl UreqTransport {
    pub fn new() -> Self {
        Self {
            inner: Arc::new(UreqTransportInner {
                credentials: None,
                timeout: None,
                tls_config: None,
                agent: ureq::AgentBuilder::new().build(),
            }),
        }
    }

    pub fn with_credentials(self, credentials: Credentials) -> Self {
        self.update(|inner| inner.credentials = Some(credentials))
    }

    pub fn credentials(&self) -> Option<&Credentials> {
        self.inner.credentials.as_ref()
    }

    /// Overall per-request deadline, enforced by the agent.
    pub fn with_timeout(self, timeout: Duration) -> Self {
        self.update(|inner| inner.timeout = Some(timeout))
            .rebuild_agent()
    }

    pub fn with_tls_ca_file(self, path: impl AsRef<Path>) -> ApiResult<Self> {
        let path = path.as_ref();
        let cert_bytes = std::fs::read(path).map_err(|err| {
            Error::new(ErrorKind::Usage)
                .with_message(format!(
                    "failed to read TLS CA/certificate file {}",
                    path.display()
                ))
                .with_source(err)
        })?;
        let mut cert_reader = Cursor::new(cert_bytes);
        let certs = rustls_pemfile::certs(&mut cert_reader)
            .collect::<Result<Vec<_>, _>>()
            .map_err(|err| {
                Error::new(ErrorKind::Usage)
                    .with_message("failed to parse TLS CA/certificate file")
                    .with_source(err)
            })?;
        if certs.is_empty() {
            return Err(Error::new(ErrorKind::Usage)
                .with_message("TLS CA/certificate file contains no certificates"));
        }

        let _ = ureq::rustls::crypto::aws_lc_rs::default_provider().install_default();
        let mut root_store = ureq::rustls::RootCertStore::empty();
        let (added, _) = root_store.add_parsable_certificates(certs);
        if added == 0 {
            return Err(Error::new(ErrorKind::Usage)
                .with_message("TLS CA/certificate file contains no parsable certificates"));
        }

        let tls_config = ureq::rustls::ClientConfig::builder()
            .with_root_certificates(root_store)
            .with_no_client_auth();
        Ok(self.with_tls_config(tls_config))
    }

    pub fn with_tls_skip_verify(self) -> Self {
        let _ = ureq::rustls::crypto::aws_lc_rs::default_provider().install_default();
        let tls_config = ureq::rustls::ClientConfig::builder()
            .dangerous()
            .with_custom_certificate_verifier(Arc::new(AcceptAllServerCertVerifier))
            .with_no_client_auth();
        self.with_tls_config(tls_config)
    }

    fn with_tls_config(self, tls_config: ureq::rustls::ClientConfig) -> Self {
        self.update(|inner| inner.tls_config = Some(Arc::new(tls_config)))
            .rebuild_agent()
    }

    // Timeout and TLS settings compose; the agent is rebuilt from both whenever either changes.
    fn rebuild_agent(self) -> Self {
        let mut builder = ureq::AgentBuilder::new();
        if let Some(timeout) = self.inner.timeout {
            builder = builder.timeout(timeout);
        }
        if let Some(tls_config) = &self.inner.tls_config {
            builder = builder.tls_config(Arc::clone(tls_config));
        }
        let agent = builder.build();
        self.update(|inner| inner.agent = agent)
    }

    fn update(mut self, apply: impl FnOnce(&mut UreqTransportInner)) -> Self {
        match Arc::get_mut(&mut self.inner) {
            Some(inner) => apply(inner),
            None => {
                let mut inner = UreqTransportInner {
                    credentials: self.inner.credentials.clone(),
                    timeout: self.inner.timeout,
                    tls_config: self.inner.tls_config.clone(),
                    agent: self.inner.agent.clone(),
                };
                apply(&mut inner);
                self.inner = Arc::new(inner);
            }
        }
        self
    }

    fn request(&self, method: Method, url: &Url) -> ureq::Request {
        let mut request = self.inner.agent.request(method.as_str(), url.as_str());
        if let Some(credentials) = &self.inner.credentials {
            request = request.set("Authorization", &credentials.basic_header());
        }
        request
    }
}

impl std::fmt::Debug for UreqTransport {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("UreqTransport")
            .field("user", &self.inner.credentials.as_ref().map(|c| &c.user))
            .field("timeout", &self.inner.timeout)
            .field("custom_tls", &self.inner.tls_config.is_some())
            .finish()
    }
}

impl Default for UreqTransport {
    fn default() -> Self {
        Self::new()
    }
}

impl Transport for UreqTransport {
    fn send(&self, request: HttpRequest) -> ApiResult<HttpResponse> {
        let HttpRequest { method, url, body } = request;
        tracing::debug!(method = method.as_str(), url = %url, "sending request");
        let builder = self.request(method, &url);
        let response = match body {
            RequestBody::Empty => builder.call(),
            RequestBody::Form(fields) => {
                let pairs: Vec<(&str, &str)> = fields.iter().collect();
                builder.send_form(&pairs)
            }
            RequestBody::Json(value) => {
                let payload = serde_json::to_string(&value).map_err(|err| {
                    Error::new(ErrorKind::Internal)
                        .with_message("failed to encode request json")
                        .with_source(err)
                })?;
                builder
                    .set("Content-Type", "application/json")
                    .send_string(&payload)
            }
            RequestBody::Multipart(form) => {
                let encoded = form.encode()?;
                builder
                    .set("Content-Type", &encoded.content_type)
                    .set("Content-Length", &encoded.content_length.to_string())
                    .send(encoded.reader)
            }
        };

        match response {
            Ok(resp) => Ok(HttpResponse::new(resp.status(), resp.into_reader())),
            Err(ureq::Error::Status(code, resp)) => {
                let body = resp.into_string().unwrap_or_default();
                Err(Error::request_failed(code, body).with_url(url.as_str()))
            }
            Err(ureq::Error::Transport(err)) => Err(Error::new(ErrorKind::Io)
                .with_message("request failed")
                .with_url(url.as_str())
                .with_source(err)),
        }
    }
}
