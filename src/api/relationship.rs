//! Purpose: Relationship CRUD on `object/{pid}/relationship` plus idempotent membership helpers.
//! Exports: `Relationship`, `Triple`, `ObjectType`, `RelationshipQuery`, `Reconciliation`,
//!          namespace/predicate constants.
//! Role: Read-then-write reconciliation of content models and collection membership.
//! Invariants: Reconciliation dedups on (predicate, namespace, object value) and never re-adds.
//! Invariants: Exclusive content-model assignment never removes the target model.
//! Invariants: Membership removal is unconditional; missing triples fail on the server.
#![allow(clippy::result_large_err)]

use super::client::{ApiResult, IslandoraClient, require};
use super::object::object_path;
use super::transport::{Method, RequestBody, Transport};
use crate::core::params::Params;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

pub const FEDORA_MODEL_NS: &str = "info:fedora/fedora-system:def/model#";
pub const RELS_EXT_NS: &str = "info:fedora/fedora-system:def/relations-external#";
pub const HAS_MODEL: &str = "hasModel";
pub const IS_MEMBER_OF_COLLECTION: &str = "isMemberOfCollection";

#[derive(Clone, Copy, Debug, Default, Eq, PartialEq)]
pub enum ObjectType {
    #[default]
    Uri,
    String,
    Int,
    Date,
}

impl ObjectType {
    pub fn as_str(self) -> &'static str {
        match self {
            ObjectType::Uri => "uri",
            ObjectType::String => "string",
            ObjectType::Int => "int",
            ObjectType::Date => "date",
        }
    }

    pub fn is_literal(self) -> bool {
        self != ObjectType::Uri
    }
}

#[derive(Clone, Debug, Default, Deserialize, Serialize, PartialEq)]
pub struct Predicate {
    #[serde(default)]
    pub value: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub alias: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub namespace: Option<String>,
}

#[derive(Clone, Debug, Default, Deserialize, Serialize, PartialEq)]
pub struct RelationshipObject {
    pub value: String,
    #[serde(default)]
    pub literal: bool,
}

/// One triple as listed by the server.
#[derive(Clone, Debug, Deserialize, Serialize, PartialEq)]
pub struct Relationship {
    #[serde(default)]
    pub subject: Value,
    #[serde(default)]
    pub predicate: Predicate,
    pub object: RelationshipObject,
}

/// A triple to assert on an object.
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct Triple {
    pub namespace: String,
    pub predicate: String,
    pub object: String,
    pub object_type: ObjectType,
}

impl Triple {
    pub fn uri(
        namespace: impl Into<String>,
        predicate: impl Into<String>,
        object: impl Into<String>,
    ) -> Self {
        Self {
            namespace: namespace.into(),
            predicate: predicate.into(),
            object: object.into(),
            object_type: ObjectType::Uri,
        }
    }

    pub fn with_type(mut self, object_type: ObjectType) -> Self {
        self.object_type = object_type;
        self
    }

    fn form_fields(&self) -> Params {
        Params::new()
            .with("uri", &self.namespace)
            .with("predicate", &self.predicate)
            .with("object", &self.object)
            .with("type", self.object_type.as_str())
    }
}

/// Filter for listing relationships, or the pattern for removing them.
#[derive(Clone, Debug, Default, Eq, PartialEq)]
pub struct RelationshipQuery {
    pub predicate: Option<String>,
    pub namespace: Option<String>,
    pub object: Option<String>,
    pub literal: Option<bool>,
}

impl RelationshipQuery {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn predicate(mut self, predicate: impl Into<String>) -> Self {
        self.predicate = Some(predicate.into());
        self
    }

    pub fn namespace(mut self, namespace: impl Into<String>) -> Self {
        self.namespace = Some(namespace.into());
        self
    }

    pub fn object(mut self, object: impl Into<String>) -> Self {
        self.object = Some(object.into());
        self
    }

    pub fn literal(mut self, literal: bool) -> Self {
        self.literal = Some(literal);
        self
    }

    fn query_params(&self) -> Params {
        let mut params = Params::new();
        if let Some(predicate) = &self.predicate {
            params.insert("predicate", predicate);
        }
        if let Some(namespace) = &self.namespace {
            params.insert("uri", namespace);
        }
        if let Some(object) = &self.object {
            params.insert("object", object);
        }
        if let Some(literal) = self.literal {
            params.insert("literal", literal);
        }
        params
    }

    // The endpoint only reliably honors `literal` as 1/0 here.
    fn removal_body(&self) -> Value {
        let mut body = Map::new();
        let non_empty = |value: &Option<String>| value.clone().filter(|value| !value.is_empty());
        if let Some(predicate) = non_empty(&self.predicate) {
            body.insert("predicate".to_string(), Value::String(predicate));
        }
        if let Some(namespace) = non_empty(&self.namespace) {
            body.insert("uri".to_string(), Value::String(namespace));
        }
        if let Some(object) = non_empty(&self.object) {
            body.insert("object".to_string(), Value::String(object));
        }
        let literal = u8::from(self.literal.unwrap_or(false));
        body.insert("literal".to_string(), Value::from(literal));
        Value::Object(body)
    }
}

/// What a reconciliation call changed.
#[derive(Clone, Debug, Default, Eq, PartialEq, Serialize)]
pub struct Reconciliation {
    pub pid: String,
    pub target: String,
    pub added: bool,
    pub removed: Vec<String>,
}

impl Reconciliation {
    fn new(pid: &str, target: &str) -> Self {
        Self {
            pid: pid.to_string(),
            target: target.to_string(),
            added: false,
            removed: Vec::new(),
        }
    }

    pub fn is_noop(&self) -> bool {
        !self.added && self.removed.is_empty()
    }
}

impl<T: Transport> IslandoraClient<T> {
    pub fn get_relationships(
        &self,
        pid: &str,
        query: &RelationshipQuery,
    ) -> ApiResult<Vec<Relationship>> {
        require(pid, "PID")?;
        self.execute_json(
            Method::Get,
            &relationship_path(pid),
            &query.query_params(),
            RequestBody::Empty,
        )
    }

    pub fn add_relationship(&self, pid: &str, triple: &Triple) -> ApiResult<()> {
        require(pid, "PID")?;
        self.execute(
            Method::Post,
            &relationship_path(pid),
            &Params::new(),
            RequestBody::Form(triple.form_fields()),
        )?;
        Ok(())
    }

    pub fn remove_relationship(&self, pid: &str, pattern: &RelationshipQuery) -> ApiResult<()> {
        require(pid, "PID")?;
        self.execute(
            Method::Delete,
            &relationship_path(pid),
            &Params::new(),
            RequestBody::Json(pattern.removal_body()),
        )?;
        Ok(())
    }

    /// Ensure `pid` has the `hasModel` relationship to `cmodel`.
    /// With `exclusive`, every other content model on the object is removed.
    pub fn add_content_model(
        &self,
        pid: &str,
        cmodel: &str,
        exclusive: bool,
    ) -> ApiResult<Reconciliation> {
        require(pid, "PID")?;
        require(cmodel, "content model")?;
        let current = self.get_relationships(
            pid,
            &RelationshipQuery::new()
                .predicate(HAS_MODEL)
                .namespace(FEDORA_MODEL_NS),
        )?;

        let mut outcome = Reconciliation::new(pid, cmodel);
        let mut present = false;
        for rel in current.iter().filter(|rel| is_predicate(rel, HAS_MODEL)) {
            let value = &rel.object.value;
            if value == cmodel {
                present = true;
            } else if exclusive && !outcome.removed.contains(value) {
                self.remove_relationship(
                    pid,
                    &RelationshipQuery::new()
                        .predicate(HAS_MODEL)
                        .namespace(FEDORA_MODEL_NS)
                        .object(value.clone()),
                )?;
                tracing::info!(pid, model = %value, "removed content model");
                outcome.removed.push(value.clone());
            }
        }

        if !present {
            self.add_relationship(pid, &Triple::uri(FEDORA_MODEL_NS, HAS_MODEL, cmodel))?;
            tracing::info!(pid, model = cmodel, "added content model");
            outcome.added = true;
        }
        Ok(outcome)
    }

    /// Ensure `pid` is a member of `parent_pid`; other memberships are left alone.
    pub fn add_collection_membership(
        &self,
        pid: &str,
        parent_pid: &str,
    ) -> ApiResult<Reconciliation> {
        require(pid, "PID")?;
        require(parent_pid, "parent PID")?;
        let existing = self.get_relationships(
            pid,
            &RelationshipQuery::new()
                .predicate(IS_MEMBER_OF_COLLECTION)
                .namespace(RELS_EXT_NS),
        )?;

        let mut outcome = Reconciliation::new(pid, parent_pid);
        let present = existing
            .iter()
            .filter(|rel| is_predicate(rel, IS_MEMBER_OF_COLLECTION))
            .any(|rel| rel.object.value == parent_pid);
        if !present {
            self.add_relationship(
                pid,
                &Triple::uri(RELS_EXT_NS, IS_MEMBER_OF_COLLECTION, parent_pid),
            )?;
            tracing::info!(pid, collection = parent_pid, "added collection membership");
            outcome.added = true;
        }
        Ok(outcome)
    }

    pub fn remove_collection_membership(&self, pid: &str, parent_pid: &str) -> ApiResult<()> {
        require(parent_pid, "parent PID")?;
        self.remove_relationship(
            pid,
            &RelationshipQuery::new()
                .predicate(IS_MEMBER_OF_COLLECTION)
                .namespace(RELS_EXT_NS)
                .object(parent_pid),
        )?;
        tracing::info!(pid, collection = parent_pid, "removed collection membership");
        Ok(())
    }
}

// The listing is already filtered server-side; an absent predicate value counts as a match.
fn is_predicate(rel: &Relationship, predicate: &str) -> bool {
    rel.predicate.value.is_empty() || rel.predicate.value == predicate
}

fn relationship_path(pid: &str) -> String {
    format!("{}/relationship", object_path(pid))
}
