//! Per-type metadata side table: paging totals and document versions.
//!
//! The table is a plain value owned by the caller's session and passed
//! explicitly to whoever needs it. Every successful read merges its
//! [`ResponseMeta`] in (last write wins); a version lookup for an id
//! that was never recorded is an error, never a default.

use serde::Serialize;
use std::collections::HashMap;

use crate::error::{Result, SolrError};
use crate::record::Version;

/// Metadata extracted from one response.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct ResponseMeta {
    /// `response.start`
    pub offset: Option<u64>,
    /// `response.numFound`
    pub total: Option<u64>,
    /// `(id, version)` for every document in the response that carried one.
    pub versions: Vec<(String, Version)>,
}

/// Accumulated metadata for one entity type.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct TypeMetadata {
    pub offset: Option<u64>,
    pub total: Option<u64>,
    pub versions: HashMap<String, Version>,
}

#[derive(Debug, Clone, Default)]
pub struct MetadataStore {
    types: HashMap<String, TypeMetadata>,
}

impl MetadataStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn metadata_for(&self, type_name: &str) -> Option<&TypeMetadata> {
        self.types.get(type_name)
    }

    /// Merge a response's metadata into the table for `type_name`.
    ///
    /// `offset`/`total` are only overwritten when the response carried
    /// them; versions are upserted per id.
    pub fn merge(&mut self, type_name: &str, meta: ResponseMeta) {
        let entry = self.types.entry(type_name.to_string()).or_default();
        if meta.offset.is_some() {
            entry.offset = meta.offset;
        }
        if meta.total.is_some() {
            entry.total = meta.total;
        }
        if !meta.versions.is_empty() {
            tracing::debug!(
                type_name,
                count = meta.versions.len(),
                "refreshing document versions"
            );
        }
        for (id, version) in meta.versions {
            entry.versions.insert(id, version);
        }
    }

    pub fn record_version(&mut self, type_name: &str, id: &str, version: Version) {
        self.types
            .entry(type_name.to_string())
            .or_default()
            .versions
            .insert(id.to_string(), version);
    }

    /// Drop the recorded version for `id`, returning it if present.
    pub fn forget_version(&mut self, type_name: &str, id: &str) -> Option<Version> {
        self.types
            .get_mut(type_name)
            .and_then(|meta| meta.versions.remove(id))
    }

    /// The last recorded version of `id`.
    ///
    /// Fails with [`SolrError::MissingVersionMetadata`] when nothing was ever
    /// recorded for the type, and [`SolrError::MissingVersionForRecord`] when
    /// the id itself has no entry.
    pub fn version_for(&self, type_name: &str, id: &str) -> Result<Version> {
        let meta = self
            .types
            .get(type_name)
            .ok_or_else(|| SolrError::MissingVersionMetadata {
                type_name: type_name.to_string(),
            })?;
        meta.versions
            .get(id)
            .copied()
            .ok_or_else(|| SolrError::MissingVersionForRecord {
                type_name: type_name.to_string(),
                id: id.to_string(),
            })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_missing_type_then_missing_id() {
        let mut store = MetadataStore::new();
        assert!(matches!(
            store.version_for("article", "1"),
            Err(SolrError::MissingVersionMetadata { .. })
        ));

        store.merge(
            "article",
            ResponseMeta {
                total: Some(1),
                ..Default::default()
            },
        );
        assert!(matches!(
            store.version_for("article", "1"),
            Err(SolrError::MissingVersionForRecord { .. })
        ));
    }

    #[test]
    fn test_merge_keeps_absent_paging_fields() {
        let mut store = MetadataStore::new();
        store.merge(
            "article",
            ResponseMeta {
                offset: Some(40),
                total: Some(37),
                versions: vec![("1".into(), Version(10))],
            },
        );
        store.merge(
            "article",
            ResponseMeta {
                offset: None,
                total: None,
                versions: vec![("1".into(), Version(11)), ("2".into(), Version(20))],
            },
        );
        let meta = store.metadata_for("article").unwrap();
        assert_eq!(meta.offset, Some(40));
        assert_eq!(meta.total, Some(37));
        assert_eq!(store.version_for("article", "1").unwrap(), Version(11));
        assert_eq!(store.version_for("article", "2").unwrap(), Version(20));
    }

    #[test]
    fn test_forget_version() {
        let mut store = MetadataStore::new();
        store.record_version("article", "1", Version(5));
        assert_eq!(store.forget_version("article", "1"), Some(Version(5)));
        assert_eq!(store.forget_version("article", "1"), None);
        assert_eq!(store.forget_version("missing", "1"), None);
    }
}
