//! Purpose: Public client surface for the Islandora REST API.
//! Exports: Client, transport seam, resource types and the pagination cursor.
//! Role: Additive-only API used by the CLI, tests and downstream crates.
//! Invariants: Every network call goes through a `Transport`; nothing here opens sockets directly.

mod client;
mod datastream;
mod endpoint;
mod ku;
mod object;
mod relationship;
mod search;
mod transport;

#[doc(hidden)]
pub use crate::core::error::to_exit_code;
pub use crate::core::error::{Error, ErrorKind};
pub use crate::core::multipart::{EncodedBody, FilePart, MultipartForm, PartSource};
pub use crate::core::params::Params;
pub use client::{ApiResult, IslandoraClient};
pub use datastream::{
    DEFAULT_CHECKSUM_TYPE, DEFAULT_STRING_MIME_TYPE, DatastreamContent, DatastreamOptions,
    DatastreamReader,
};
pub use endpoint::{API_VERSION, Endpoint, KU_API_VERSION};
pub use ku::{DEFAULT_REGEN_DSID, KuClient};
pub use object::ObjectProfile;
pub use relationship::{
    FEDORA_MODEL_NS, HAS_MODEL, IS_MEMBER_OF_COLLECTION, ObjectType, Predicate, RELS_EXT_NS,
    Reconciliation, Relationship, RelationshipObject, RelationshipQuery, Triple,
};
pub use search::{
    CURSOR_PARAM, CURSOR_START, DEFAULT_FIELDS, DEFAULT_ROWS, DEFAULT_SORT, ResponseHeader,
    ResultSet, SearchCursor, SearchPage, cursor_params,
};
pub use transport::{
    Credentials, HttpRequest, HttpResponse, Method, RequestBody, Transport, UreqTransport,
};
