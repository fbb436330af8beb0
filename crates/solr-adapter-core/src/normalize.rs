//! Response envelope normalization.
//!
//! Solr answers reads with one of two envelopes:
//!
//! ```text
//! Real-time get:   { "doc": { ... } | null }
//! Search:          { "response": { "numFound": N, "start": S, "docs": [ ... ] } }
//! ```
//!
//! The functions here pull documents and paging/version metadata out of
//! either shape. They never touch the [`MetadataStore`](crate::metadata::MetadataStore);
//! merging [`ResponseMeta`] into it is the caller's job.

use serde_json::Value;

use crate::error::{Result, SolrError};
use crate::metadata::ResponseMeta;
use crate::record::{id_key, Version};

/// Extract exactly one document from a response.
///
/// `id` is only used for error context.
pub fn normalize_single(payload: &Value, type_name: &str, id: &str) -> Result<Value> {
    if let Some(doc) = payload.get("doc") {
        if doc.is_null() {
            return Err(not_found(type_name, id));
        }
        return Ok(doc.clone());
    }

    let docs = payload
        .get("response")
        .and_then(|r| r.get("docs"))
        .and_then(Value::as_array)
        .ok_or_else(|| {
            SolrError::malformed(format!(
                "expected 'doc' or 'response.docs' in response for type '{}'",
                type_name
            ))
        })?;

    match docs.as_slice() {
        [] => Err(not_found(type_name, id)),
        [doc] => Ok(doc.clone()),
        _ => Err(SolrError::TooManyResults {
            type_name: type_name.to_string(),
            id: id.to_string(),
            count: docs.len(),
        }),
    }
}

/// Extract the `response.docs` array from a search response.
pub fn normalize_array(payload: &Value) -> Result<Vec<Value>> {
    payload
        .get("response")
        .and_then(|r| r.get("docs"))
        .and_then(Value::as_array)
        .cloned()
        .ok_or_else(|| SolrError::malformed("expected 'response.docs' to be an array"))
}

/// Extract paging metadata and document versions.
///
/// Versions are collected from `response.docs` and from the real-time get
/// `doc`, whichever are present. Documents without a unique key or a
/// parseable version are skipped.
pub fn normalize_meta(payload: &Value, unique_key: &str, version_field: &str) -> ResponseMeta {
    let response = payload.get("response");
    let mut meta = ResponseMeta {
        offset: response.and_then(|r| r.get("start")).and_then(Value::as_u64),
        total: response
            .and_then(|r| r.get("numFound"))
            .and_then(Value::as_u64),
        versions: Vec::new(),
    };

    let docs = response
        .and_then(|r| r.get("docs"))
        .and_then(Value::as_array)
        .map(|docs| docs.iter())
        .into_iter()
        .flatten();
    let single = payload.get("doc").filter(|d| d.is_object());

    for doc in docs.chain(single) {
        let id = doc.get(unique_key).filter(|v| !v.is_null());
        let version = doc.get(version_field).and_then(Version::from_value);
        if let (Some(id), Some(version)) = (id, version) {
            meta.versions.push((id_key(id), version));
        }
    }

    meta
}

fn not_found(type_name: &str, id: &str) -> SolrError {
    SolrError::NotFound {
        type_name: type_name.to_string(),
        id: id.to_string(),
    }
}
