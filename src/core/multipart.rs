//! Purpose: Describe `multipart/form-data` uploads and turn them into a sized request body.
//! Exports: `MultipartForm`, `FilePart`, `PartSource`, `EncodedBody`.
//! Role: Transport-agnostic form description; wire encoding is delegated to `multipart`'s lazy client.
//! Invariants: Text fields precede the file part, in insertion order.
//! Invariants: File sources are streamed from disk; in-memory parts are buffered so the length is known.
use crate::core::error::{Error, ErrorKind};
use crate::core::params::Params;
use mime_guess::Mime;
use multipart::client::lazy::Multipart;
use std::io::{Cursor, Read};
use std::path::PathBuf;

#[derive(Clone, Debug, Eq, PartialEq)]
pub enum PartSource {
    /// Filename and content type are derived from the path when encoded.
    Path(PathBuf),
    Bytes {
        filename: String,
        content_type: String,
        bytes: Vec<u8>,
    },
}

#[derive(Clone, Debug, Eq, PartialEq)]
pub struct FilePart {
    pub name: String,
    pub source: PartSource,
}

impl FilePart {
    pub fn from_path(name: impl Into<String>, path: impl Into<PathBuf>) -> Self {
        Self {
            name: name.into(),
            source: PartSource::Path(path.into()),
        }
    }

    pub fn from_bytes(
        name: impl Into<String>,
        filename: impl Into<String>,
        content_type: impl Into<String>,
        bytes: impl Into<Vec<u8>>,
    ) -> Self {
        Self {
            name: name.into(),
            source: PartSource::Bytes {
                filename: filename.into(),
                content_type: content_type.into(),
                bytes: bytes.into(),
            },
        }
    }
}

#[derive(Clone, Debug, Default, Eq, PartialEq)]
pub struct MultipartForm {
    fields: Params,
    file: Option<FilePart>,
}

pub struct EncodedBody {
    pub content_type: String,
    pub content_length: u64,
    pub reader: Box<dyn Read>,
}

impl MultipartForm {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn fields(mut self, fields: Params) -> Self {
        self.fields = fields;
        self
    }

    pub fn file(mut self, file: Option<FilePart>) -> Self {
        self.file = file;
        self
    }

    pub fn field_params(&self) -> &Params {
        &self.fields
    }

    pub fn file_part(&self) -> Option<&FilePart> {
        self.file.as_ref()
    }

    /// Produce the wire body. Opens the file source, if any, so missing files fail here.
    pub fn encode(self) -> Result<EncodedBody, Error> {
        let mut form = Multipart::new();
        for (name, value) in self.fields.iter() {
            form.add_text(name.to_string(), value.to_string());
        }
        if let Some(file) = self.file {
            match file.source {
                PartSource::Path(path) => {
                    form.add_file(file.name, path);
                }
                PartSource::Bytes {
                    filename,
                    content_type,
                    bytes,
                } => {
                    let mime = parse_mime(&content_type)?;
                    form.add_stream(file.name, Cursor::new(bytes), Some(filename), Some(mime));
                }
            }
        }

        let mut prepared = form.prepare().map_err(|err| {
            let field = err.field_name.as_deref().unwrap_or("form").to_string();
            Error::new(ErrorKind::Io)
                .with_message(format!("failed to prepare multipart field {field}"))
                .with_source(err.error)
        })?;
        let content_type = format!("multipart/form-data; boundary={}", prepared.boundary());

        if let Some(content_length) = prepared.content_len() {
            return Ok(EncodedBody {
                content_type,
                content_length,
                reader: Box::new(prepared),
            });
        }

        // Stream parts have no declared size.
        let mut buffered = Vec::new();
        prepared.read_to_end(&mut buffered).map_err(|err| {
            Error::new(ErrorKind::Io)
                .with_message("failed to buffer multipart body")
                .with_source(err)
        })?;
        Ok(EncodedBody {
            content_type,
            content_length: buffered.len() as u64,
            reader: Box::new(Cursor::new(buffered)),
        })
    }
}

fn parse_mime(content_type: &str) -> Result<Mime, Error> {
    content_type.parse::<Mime>().map_err(|err| {
        Error::new(ErrorKind::Usage)
            .with_message(format!("invalid content type `{content_type}`"))
            .with_source(err)
    })
}
