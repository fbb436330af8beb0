//! Record-level value types: version tokens, per-record metadata, normalized
//! records, and outbound snapshots.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::fmt;

/// A flat Solr document: field name → value.
pub type Fields = Map<String, Value>;

/// Solr's per-document `_version_` token.
///
/// Two values are sentinels with special meaning on write:
/// [`Version::MUST_NOT_EXIST`] (`-1`) and [`Version::OVERWRITE`] (`0`).
/// `0` is a real, meaningful value; presence is always tested through
/// `Option<Version>`, never by comparing against zero.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Version(pub i64);

impl Version {
    /// Write succeeds only if no document with this id exists.
    pub const MUST_NOT_EXIST: Version = Version(-1);
    /// Write succeeds unconditionally.
    pub const OVERWRITE: Version = Version(0);

    /// Read a version out of a document field value.
    ///
    /// Accepts JSON integers and numeric strings (some response writers
    /// stringify longs).
    pub fn from_value(value: &Value) -> Option<Version> {
        match value {
            Value::Number(n) => n.as_i64().map(Version),
            Value::String(s) => s.trim().parse().ok().map(Version),
            _ => None,
        }
    }

    pub fn to_value(self) -> Value {
        Value::from(self.0)
    }
}

impl fmt::Display for Version {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Render a document id as the string key used by the metadata table and
/// in error messages. Strings are used verbatim; numbers and other scalars
/// use their JSON text.
pub fn id_key(id: &Value) -> String {
    match id {
        Value::String(s) => s.clone(),
        other => other.to_string(),
    }
}

/// Server-assigned metadata attached to a normalized record.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct RecordMeta {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub version: Option<Version>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub score: Option<f64>,
}

/// A Solr document after normalization.
///
/// The unique key becomes `id`; `attributes` holds the remaining
/// caller-visible fields, mapped back through the
/// [`AttributeMapper`](crate::serializer::AttributeMapper). The version
/// field and `score` are lifted out into `meta`.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct NormalizedRecord {
    pub id: String,
    pub attributes: Fields,
    pub meta: RecordMeta,
}

impl NormalizedRecord {
    pub fn get(&self, attr: &str) -> Option<&Value> {
        self.attributes.get(attr)
    }
}

/// An outbound record as the caller currently holds it.
///
/// `previous` carries the attribute values last loaded from Solr and is
/// only consulted by atomic updates.
#[derive(Debug, Clone, PartialEq)]
pub struct Snapshot {
    pub type_name: String,
    pub id: Option<Value>,
    pub is_new: bool,
    pub attributes: Fields,
    pub previous: Option<Fields>,
}

impl Snapshot {
    /// A record that has never been persisted.
    pub fn new_record(type_name: impl Into<String>, id: Option<Value>, attributes: Fields) -> Self {
        Self {
            type_name: type_name.into(),
            id,
            is_new: true,
            attributes,
            previous: None,
        }
    }

    /// A record that was previously loaded from Solr.
    pub fn existing(type_name: impl Into<String>, id: impl Into<Value>, attributes: Fields) -> Self {
        Self {
            type_name: type_name.into(),
            id: Some(id.into()),
            is_new: false,
            attributes,
            previous: None,
        }
    }

    /// Attach the last loaded attribute values, for atomic diffing.
    pub fn with_previous(mut self, previous: Fields) -> Self {
        self.previous = Some(previous);
        self
    }

    pub fn id_key(&self) -> Option<String> {
        self.id.as_ref().map(id_key)
    }
}
