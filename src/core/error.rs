//! Purpose: Define the single error type surfaced by every client operation.
//! Exports: `Error`, `ErrorKind`, `to_exit_code`.
//! Role: Shared error contract for the library, CLI and tests.
//! Invariants: Kinds are stable; exit codes derived from kinds never change meaning.
//! Invariants: `RequestFailed` errors carry the HTTP status and the raw response body.
use std::error::Error as StdError;
use std::fmt;

#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum ErrorKind {
    Internal,
    Usage,
    /// A required PID or DSID was empty; nothing was sent.
    MissingIdentifier,
    /// Datastream create was given neither a file nor a string.
    MissingContent,
    /// Datastream create/update was given both a file and a string.
    AmbiguousContent,
    /// The server answered with a non-2xx status.
    RequestFailed,
    /// The body was not the JSON the operation expected.
    DecodeAnomaly,
    Io,
}

impl ErrorKind {
    pub fn as_str(self) -> &'static str {
        match self {
            ErrorKind::Internal => "Internal",
            ErrorKind::Usage => "Usage",
            ErrorKind::MissingIdentifier => "MissingIdentifier",
            ErrorKind::MissingContent => "MissingContent",
            ErrorKind::AmbiguousContent => "AmbiguousContent",
            ErrorKind::RequestFailed => "RequestFailed",
            ErrorKind::DecodeAnomaly => "DecodeAnomaly",
            ErrorKind::Io => "Io",
        }
    }
}

#[derive(Debug)]
pub struct Error {
    kind: ErrorKind,
    message: Option<String>,
    hint: Option<String>,
    status: Option<u16>,
    body: Option<String>,
    url: Option<String>,
    source: Option<Box<dyn StdError + Send + Sync>>,
}

impl Error {
    pub fn new(kind: ErrorKind) -> Self {
        Self {
            kind,
            message: None,
            hint: None,
            status: None,
            body: None,
            url: None,
            source: None,
        }
    }

    pub fn kind(&self) -> ErrorKind {
        self.kind
    }

    pub fn message(&self) -> Option<&str> {
        self.message.as_deref()
    }

    pub fn hint(&self) -> Option<&str> {
        self.hint.as_deref()
    }

    pub fn status(&self) -> Option<u16> {
        self.status
    }

    pub fn body(&self) -> Option<&str> {
        self.body.as_deref()
    }

    pub fn url(&self) -> Option<&str> {
        self.url.as_deref()
    }

    pub fn with_message(mut self, message: impl Into<String>) -> Self {
        self.message = Some(message.into());
        self
    }

    pub fn with_hint(mut self, hint: impl Into<String>) -> Self {
        self.hint = Some(hint.into());
        self
    }

    pub fn with_status(mut self, status: u16) -> Self {
        self.status = Some(status);
        self
    }

    pub fn with_body(mut self, body: impl Into<String>) -> Self {
        self.body = Some(body.into());
        self
    }

    pub fn with_url(mut self, url: impl Into<String>) -> Self {
        self.url = Some(url.into());
        self
    }

    pub fn with_source(mut self, source: impl StdError + Send + Sync + 'static) -> Self {
        self.source = Some(Box::new(source));
        self
    }

    pub(crate) fn missing_identifier(what: &str) -> Self {
        Error::new(ErrorKind::MissingIdentifier).with_message(format!("missing {what}"))
    }

    pub(crate) fn request_failed(status: u16, body: String) -> Self {
        Error::new(ErrorKind::RequestFailed)
            .with_message(format!("server answered with status {status}"))
            .with_status(status)
            .with_body(body)
    }
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.kind.as_str())?;
        if let Some(message) = &self.message {
            write!(f, ": {message}")?;
        }
        if let Some(url) = &self.url {
            write!(f, " (url: {url})")?;
        }
        if let Some(status) = self.status {
            write!(f, " (status: {status})")?;
        }
        Ok(())
    }
}

impl StdError for Error {
    fn source(&self) -> Option<&(dyn StdError + 'static)> {
        self.source
            .as_ref()
            .map(|source| source.as_ref() as &(dyn StdError + 'static))
    }
}

pub fn to_exit_code(kind: ErrorKind) -> i32 {
    match kind {
        ErrorKind::Internal => 1,
        ErrorKind::Usage => 2,
        ErrorKind::MissingIdentifier => 3,
        ErrorKind::MissingContent => 4,
        ErrorKind::AmbiguousContent => 5,
        ErrorKind::RequestFailed => 6,
        ErrorKind::DecodeAnomaly => 7,
        ErrorKind::Io => 8,
    }
}

#[cfg(test)]
mod tests {
    use super::{Error, ErrorKind, to_exit_code};
    use std::error::Error as _;

    #[test]
    fn exit_code_mapping_is_stable() {
        let cases = [
            (ErrorKind::Internal, 1),
            (ErrorKind::Usage, 2),
            (ErrorKind::MissingIdentifier, 3),
            (ErrorKind::MissingContent, 4),
            (ErrorKind::AmbiguousContent, 5),
            (ErrorKind::RequestFailed, 6),
            (ErrorKind::DecodeAnomaly, 7),
            (ErrorKind::Io, 8),
        ];

        for (kind, code) in cases {
            assert_eq!(to_exit_code(kind), code);
        }
    }

    #[test]
    fn request_failed_keeps_status_and_body() {
        let err = Error::request_failed(404, "no such object".to_string())
            .with_url("http://localhost/v1/object/a:1");
        assert_eq!(err.kind(), ErrorKind::RequestFailed);
        assert_eq!(err.status(), Some(404));
        assert_eq!(err.body(), Some("no such object"));
        let rendered = err.to_string();
        assert!(rendered.starts_with("RequestFailed"));
        assert!(rendered.contains("status: 404"));
        assert!(rendered.contains("/v1/object/a:1"));
    }

    #[test]
    fn source_is_chained() {
        let io = std::io::Error::new(std::io::ErrorKind::NotFound, "gone");
        let err = Error::new(ErrorKind::Io).with_source(io);
        assert!(err.source().is_some());
    }
}
