//! Outbound document serialization and inbound record normalization.
//!
//! [`SolrSerializer`] turns a [`Snapshot`] into the flat Solr document
//! sent to the `Update`/`Delete` handlers and attaches the version
//! constraint required by the active [`UpdateMode`]. It also performs
//! the reverse mapping for documents read back from Solr.
//!
//! Attribute key naming (dynamic-field suffixes and the like) belongs to
//! the application and is plugged in through [`AttributeMapper`].
//!
//! # Atomic updates
//!
//! With [`UpdateMode::Atomic`] only changed attributes are sent, each as
//! an update operation compared against [`Snapshot::previous`]:
//!
//! - scalars: `{"set": value}` (including `{"set": null}`)
//! - arrays with [`ArrayUpdate::Set`]: ordered, duplicates kept; the whole
//!   array is sent with `set`
//! - arrays with [`ArrayUpdate::AddRemove`]: compared as distinct sets;
//!   only the difference is sent with `add` / `remove`

use serde::{Deserialize, Serialize};
use serde_json::{json, Map, Value};
use std::sync::Arc;

use crate::error::{Result, SolrError};
use crate::metadata::MetadataStore;
use crate::record::{id_key, Fields, NormalizedRecord, RecordMeta, Snapshot, Version};
use crate::request::DEFAULT_VERSION_FIELD;
use crate::update_mode::UpdateMode;

/// Maps domain attribute names to Solr field names and back.
pub trait AttributeMapper: Send + Sync {
    fn key_for_attribute(&self, _type_name: &str, attr: &str) -> String {
        attr.to_string()
    }

    /// Returning `None` drops the field from the normalized record.
    fn attribute_for_key(&self, _type_name: &str, key: &str) -> Option<String> {
        Some(key.to_string())
    }
}

/// Uses attribute names as Solr field names unchanged.
#[derive(Debug, Clone, Copy, Default)]
pub struct IdentityMapper;

impl AttributeMapper for IdentityMapper {}

/// How atomic updates treat multi-valued fields.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum ArrayUpdate {
    #[default]
    Set,
    AddRemove,
}

#[derive(Clone)]
pub struct SolrSerializer {
    version_field: String,
    array_update: ArrayUpdate,
    mapper: Arc<dyn AttributeMapper>,
}

impl Default for SolrSerializer {
    fn default() -> Self {
        Self::new(DEFAULT_VERSION_FIELD, ArrayUpdate::Set, Arc::new(IdentityMapper))
    }
}

impl SolrSerializer {
    pub fn new(
        version_field: impl Into<String>,
        array_update: ArrayUpdate,
        mapper: Arc<dyn AttributeMapper>,
    ) -> Self {
        Self {
            version_field: version_field.into(),
            array_update,
            mapper,
        }
    }

    pub fn version_field(&self) -> &str {
        &self.version_field
    }

    pub fn array_update(&self) -> ArrayUpdate {
        self.array_update
    }

    /// Serialize a snapshot for the `Update` handler.
    ///
    /// Blank attributes (`null`, empty or whitespace-only strings, empty
    /// arrays) are dropped from full-document writes; `0` and `false` are
    /// kept. The unique key is always present when the snapshot has an id.
    pub fn serialize(
        &self,
        snapshot: &Snapshot,
        unique_key: &str,
        mode: UpdateMode,
        metadata: &MetadataStore,
    ) -> Result<Fields> {
        let mut doc = if mode == UpdateMode::Atomic && !snapshot.is_new {
            self.atomic_fields(snapshot, unique_key)?
        } else {
            self.document_fields(snapshot, unique_key)
        };

        if let Some(id) = &snapshot.id {
            doc.insert(unique_key.to_string(), id.clone());
        }

        self.set_version_constraint(snapshot, mode, metadata, &mut doc)?;
        Ok(doc)
    }

    /// Serialize the id-plus-version document the `Delete` handler expects.
    pub fn serialize_for_delete(
        &self,
        snapshot: &Snapshot,
        unique_key: &str,
        mode: UpdateMode,
        metadata: &MetadataStore,
    ) -> Result<Fields> {
        let mut doc = Fields::new();
        if let Some(id) = &snapshot.id {
            doc.insert(unique_key.to_string(), id.clone());
        }
        let persisted = Snapshot {
            is_new: false,
            ..snapshot.clone()
        };
        self.set_version_constraint(&persisted, mode, metadata, &mut doc)?;
        Ok(doc)
    }

    /// Attach the version field to `doc` according to `mode`.
    ///
    /// Returns the version attached, if any. For a persisted record under
    /// optimistic concurrency or atomic mode the version comes from
    /// `metadata`; a missing entry is an error.
    pub fn set_version_constraint(
        &self,
        snapshot: &Snapshot,
        mode: UpdateMode,
        metadata: &MetadataStore,
        doc: &mut Fields,
    ) -> Result<Option<Version>> {
        let version = mode.resolve_version(snapshot.is_new, || {
            let id = snapshot.id_key().unwrap_or_default();
            metadata.version_for(&snapshot.type_name, &id)
        })?;

        tracing::debug!(
            type_name = %snapshot.type_name,
            id = snapshot.id_key().as_deref().unwrap_or(""),
            mode = mode.as_str(),
            version = ?version,
            "version constraint"
        );

        match version {
            Some(v) => {
                doc.insert(self.version_field.clone(), v.to_value());
            }
            None => {
                doc.remove(&self.version_field);
            }
        }
        Ok(version)
    }

    /// Normalize one Solr document into a [`NormalizedRecord`].
    ///
    /// The version field and `score` move into [`RecordMeta`]; the unique
    /// key becomes [`NormalizedRecord::id`].
    pub fn normalize_record(
        &self,
        type_name: &str,
        unique_key: &str,
        doc: &Value,
    ) -> Result<NormalizedRecord> {
        let Value::Object(fields) = doc else {
            return Err(SolrError::malformed(format!(
                "expected a document object for type '{}'",
                type_name
            )));
        };

        let id = fields.get(unique_key).map(id_key).ok_or_else(|| {
            SolrError::malformed(format!(
                "document of type '{}' is missing its unique key '{}'",
                type_name, unique_key
            ))
        })?;

        let mut meta = RecordMeta::default();
        let mut attributes = Map::new();

        for (key, value) in fields {
            if key == unique_key {
                continue;
            }
            if key == &self.version_field {
                meta.version = Version::from_value(value);
                continue;
            }
            if key == "score" {
                meta.score = value.as_f64();
                continue;
            }
            if let Some(attr) = self.mapper.attribute_for_key(type_name, key) {
                attributes.insert(attr, value.clone());
            }
        }

        Ok(NormalizedRecord {
            id,
            attributes,
            meta,
        })
    }

    fn is_reserved(&self, attr: &str, unique_key: &str) -> bool {
        attr == unique_key || attr == self.version_field
    }

    fn document_fields(&self, snapshot: &Snapshot, unique_key: &str) -> Fields {
        let mut doc = Fields::new();
        for (attr, value) in &snapshot.attributes {
            if self.is_reserved(attr, unique_key) || is_blank(value) {
                continue;
            }
            let key = self.mapper.key_for_attribute(&snapshot.type_name, attr);
            doc.insert(key, value.clone());
        }
        doc
    }

    fn atomic_fields(&self, snapshot: &Snapshot, unique_key: &str) -> Result<Fields> {
        let empty = Fields::new();
        let previous = snapshot.previous.as_ref().unwrap_or(&empty);
        let mut doc = Fields::new();

        let removed = previous
            .keys()
            .filter(|attr| !snapshot.attributes.contains_key(*attr));
        let attrs: Vec<&String> = snapshot.attributes.keys().chain(removed).collect();

        for attr in attrs {
            if self.is_reserved(attr, unique_key) {
                continue;
            }
            let value = snapshot.attributes.get(attr).unwrap_or(&Value::Null);
            let prev = previous.get(attr).unwrap_or(&Value::Null);

            if !self.is_modified(value, prev) {
                continue;
            }

            let key = self.mapper.key_for_attribute(&snapshot.type_name, attr);
            if value.is_array() || prev.is_array() {
                let diff = self.array_operations(value, prev);
                if !diff.is_empty() {
                    doc.insert(key, Value::Object(diff));
                }
            } else {
                doc.insert(key, json!({ "set": value }));
            }
        }

        if doc.is_empty() {
            return Err(SolrError::NotDirty {
                type_name: snapshot.type_name.clone(),
                id: snapshot.id_key().unwrap_or_default(),
            });
        }
        Ok(doc)
    }

    fn is_modified(&self, value: &Value, prev: &Value) -> bool {
        if !value.is_array() && !prev.is_array() {
            return value != prev;
        }
        let current = as_items(value);
        let before = as_items(prev);
        match self.array_update {
            ArrayUpdate::Set => current != before,
            ArrayUpdate::AddRemove => {
                let current = distinct(&current);
                let before = distinct(&before);
                current.len() != before.len() || !current.iter().all(|v| before.contains(v))
            }
        }
    }

    fn array_operations(&self, value: &Value, prev: &Value) -> Fields {
        let mut ops = Fields::new();
        match self.array_update {
            ArrayUpdate::Set => {
                ops.insert("set".into(), value.clone());
            }
            ArrayUpdate::AddRemove => {
                let current = distinct(&as_items(value));
                let before = distinct(&as_items(prev));
                let added: Vec<Value> = current
                    .iter()
                    .filter(|v| !before.contains(v))
                    .cloned()
                    .collect();
                let removed: Vec<Value> = before
                    .iter()
                    .filter(|v| !current.contains(v))
                    .cloned()
                    .collect();
                if let Some(v) = collapse(added) {
                    ops.insert("add".into(), v);
                }
                if let Some(v) = collapse(removed) {
                    ops.insert("remove".into(), v);
                }
            }
        }
        ops
    }
}

/// Treat `null` as empty and a scalar as a one-element list.
fn as_items(value: &Value) -> Vec<Value> {
    match value {
        Value::Null => Vec::new(),
        Value::Array(items) => items.clone(),
        other => vec![other.clone()],
    }
}

fn distinct(items: &[Value]) -> Vec<Value> {
    let mut out: Vec<Value> = Vec::with_capacity(items.len());
    for item in items {
        if !out.contains(item) {
            out.push(item.clone());
        }
    }
    out
}

/// Empty → nothing, one value → the value, more → an array.
fn collapse(mut values: Vec<Value>) -> Option<Value> {
    match values.len() {
        0 => None,
        1 => values.pop(),
        _ => Some(Value::Array(values)),
    }
}

fn is_blank(value: &Value) -> bool {
    match value {
        Value::Null => true,
        Value::String(s) => s.trim().is_empty(),
        Value::Array(items) => items.is_empty(),
        _ => false,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn fields(value: Value) -> Fields {
        match value {
            Value::Object(map) => map,
            _ => panic!("not an object"),
        }
    }

    fn atomic(array_update: ArrayUpdate) -> SolrSerializer {
        SolrSerializer::new("_version_", array_update, Arc::new(IdentityMapper))
    }

    fn with_version(id: &str, version: i64) -> MetadataStore {
        let mut meta = MetadataStore::new();
        meta.record_version("atomic", id, Version(version));
        meta
    }

    #[test]
    fn test_blank_attributes_dropped_falsy_kept() {
        let snapshot = Snapshot::new_record(
            "article",
            Some(json!("a1")),
            fields(json!({
                "title": "T",
                "empty": "",
                "spaces": "   ",
                "none": null,
                "tags": [],
                "count": 0,
                "flag": false
            })),
        );
        let doc = SolrSerializer::default()
            .serialize(&snapshot, "id", UpdateMode::None, &MetadataStore::new())
            .unwrap();
        assert_eq!(
            Value::Object(doc),
            json!({"id": "a1", "title": "T", "count": 0, "flag": false})
        );
    }

    #[test]
    fn test_new_record_gets_must_not_exist() {
        let snapshot = Snapshot::new_record("article", Some(json!("a1")), fields(json!({"t": 1})));
        let doc = SolrSerializer::default()
            .serialize(
                &snapshot,
                "id",
                UpdateMode::OptimisticConcurrency,
                &MetadataStore::new(),
            )
            .unwrap();
        assert_eq!(doc["_version_"], json!(-1));
    }

    #[test]
    fn test_existing_record_under_occ_uses_recorded_version() {
        let mut meta = MetadataStore::new();
        meta.record_version("article", "a1", Version(77));
        let snapshot = Snapshot::existing("article", "a1", fields(json!({"t": 1})));
        let doc = SolrSerializer::default()
            .serialize(&snapshot, "id", UpdateMode::OptimisticConcurrency, &meta)
            .unwrap();
        assert_eq!(doc["_version_"], json!(77));
    }

    #[test]
    fn test_none_mode_strips_stray_version_attribute() {
        let snapshot = Snapshot::existing("article", "a1", fields(json!({"_version_": 5, "t": 1})));
        let doc = SolrSerializer::default()
            .serialize(&snapshot, "id", UpdateMode::None, &MetadataStore::new())
            .unwrap();
        assert!(doc.get("_version_").is_none());
    }

    #[test]
    fn test_atomic_set_scalar() {
        let snapshot = Snapshot::existing(
            "atomic",
            "atom-1",
            fields(json!({"title": "a new title"})),
        )
        .with_previous(fields(json!({"title": "an original title"})));
        let doc = atomic(ArrayUpdate::Set)
            .serialize(&snapshot, "id", UpdateMode::Atomic, &with_version("atom-1", 9))
            .unwrap();
        assert_eq!(
            Value::Object(doc),
            json!({"id": "atom-1", "title": {"set": "a new title"}, "_version_": 9})
        );
    }

    #[test]
    fn test_atomic_set_to_null() {
        let snapshot = Snapshot::existing("atomic", "atom-1", fields(json!({"title": null})))
            .with_previous(fields(json!({"title": "an original title"})));
        let doc = atomic(ArrayUpdate::Set)
            .serialize(&snapshot, "id", UpdateMode::Atomic, &with_version("atom-1", 9))
            .unwrap();
        assert_eq!(doc["title"], json!({"set": null}));
    }

    #[test]
    fn test_atomic_no_changes_is_not_dirty() {
        let snapshot = Snapshot::existing("atomic", "atom-1", fields(json!({"title": "same"})))
            .with_previous(fields(json!({"title": "same"})));
        let err = atomic(ArrayUpdate::Set)
            .serialize(&snapshot, "id", UpdateMode::Atomic, &with_version("atom-1", 9))
            .unwrap_err();
        assert_eq!(
            err.to_string(),
            "Cannot use atomic update because record of type 'atomic' with id 'atom-1' has no pending changes."
        );
    }

    #[test]
    fn test_atomic_ordered_arrays() {
        let unchanged = Snapshot::existing(
            "atomic",
            "atom-1",
            fields(json!({"title": "title two", "categories": ["a", "b"]})),
        )
        .with_previous(fields(json!({"title": "title one", "categories": ["a", "b"]})));
        let doc = atomic(ArrayUpdate::Set)
            .serialize(&unchanged, "id", UpdateMode::Atomic, &with_version("atom-1", 1))
            .unwrap();
        assert!(doc.get("categories").is_none());

        let reordered = Snapshot::existing("atomic", "atom-1", fields(json!({"categories": ["b", "a"]})))
            .with_previous(fields(json!({"categories": ["a", "b"]})));
        let doc = atomic(ArrayUpdate::Set)
            .serialize(&reordered, "id", UpdateMode::Atomic, &with_version("atom-1", 1))
            .unwrap();
        assert_eq!(doc["categories"], json!({"set": ["b", "a"]}));
    }

    #[test]
    fn test_atomic_add_remove_arrays() {
        let reordered = Snapshot::existing(
            "atomic",
            "atom-1",
            fields(json!({"title": "new title", "categories": ["b", "a"]})),
        )
        .with_previous(fields(json!({"title": "old", "categories": ["a", "b"]})));
        let doc = atomic(ArrayUpdate::AddRemove)
            .serialize(&reordered, "id", UpdateMode::Atomic, &with_version("atom-1", 1))
            .unwrap();
        assert!(doc.get("categories").is_none());

        let single = Snapshot::existing("atomic", "atom-1", fields(json!({"categories": ["a", "b"]})))
            .with_previous(fields(json!({"categories": ["a"]})));
        let doc = atomic(ArrayUpdate::AddRemove)
            .serialize(&single, "id", UpdateMode::Atomic, &with_version("atom-1", 1))
            .unwrap();
        assert_eq!(doc["categories"], json!({"add": "b"}));

        let both = Snapshot::existing("atomic", "atom-1", fields(json!({"categories": ["c", "d", "e"]})))
            .with_previous(fields(json!({"categories": ["a", "b", "c"]})));
        let doc = atomic(ArrayUpdate::AddRemove)
            .serialize(&both, "id", UpdateMode::Atomic, &with_version("atom-1", 1))
            .unwrap();
        assert_eq!(
            doc["categories"],
            json!({"add": ["d", "e"], "remove": ["a", "b"]})
        );
    }

    #[test]
    fn test_atomic_requires_version() {
        let snapshot = Snapshot::existing("atomic", "atom-1", fields(json!({"title": "x"})));
        let err = atomic(ArrayUpdate::Set)
            .serialize(&snapshot, "id", UpdateMode::Atomic, &MetadataStore::new())
            .unwrap_err();
        assert!(matches!(err, SolrError::MissingVersionMetadata { .. }));
    }

    #[test]
    fn test_delete_document_carries_only_id_and_version() {
        let snapshot = Snapshot::existing("article", "d1", fields(json!({"title": "gone"})));
        let doc = SolrSerializer::default()
            .serialize_for_delete(&snapshot, "id", UpdateMode::LastWriteWins, &MetadataStore::new())
            .unwrap();
        assert_eq!(Value::Object(doc), json!({"id": "d1", "_version_": 0}));
    }

    #[test]
    fn test_normalize_record_lifts_meta() {
        let record = SolrSerializer::default()
            .normalize_record(
                "article",
                "id",
                &json!({"id": 12, "title": "x", "_version_": 1234, "score": 1.5}),
            )
            .unwrap();
        assert_eq!(record.id, "12");
        assert_eq!(Value::Object(record.attributes), json!({"title": "x"}));
        assert_eq!(record.meta.version, Some(Version(1234)));
        assert_eq!(record.meta.score, Some(1.5));
    }

    #[test]
    fn test_normalize_record_requires_unique_key() {
        let err = SolrSerializer::default()
            .normalize_record("article", "id", &json!({"title": "x"}))
            .unwrap_err();
        assert!(matches!(err, SolrError::MalformedResponse(_)));
    }

    struct Suffixed;

    impl AttributeMapper for Suffixed {
        fn key_for_attribute(&self, _type_name: &str, attr: &str) -> String {
            format!("{}_s", attr)
        }

        fn attribute_for_key(&self, _type_name: &str, key: &str) -> Option<String> {
            key.strip_suffix("_s").map(str::to_string)
        }
    }

    #[test]
    fn test_mapper_applies_both_directions() {
        let serializer = SolrSerializer::new("_version_", ArrayUpdate::Set, Arc::new(Suffixed));
        let snapshot = Snapshot::new_record("article", Some(json!("a")), fields(json!({"title": "x"})));
        let doc = serializer
            .serialize(&snapshot, "id", UpdateMode::None, &MetadataStore::new())
            .unwrap();
        assert_eq!(Value::Object(doc.clone()), json!({"id": "a", "title_s": "x"}));

        let record = serializer
            .normalize_record("article", "id", &Value::Object(doc))
            .unwrap();
        assert_eq!(Value::Object(record.attributes), json!({"title": "x"}));
    }
}
