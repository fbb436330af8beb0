//! Operation façade over a [`Transport`].
//!
//! [`SolrAdapter`] runs each data-access operation end to end: build the
//! request, execute it, classify failures, normalize the payload, and
//! fold response metadata into the caller's [`Session`].
//!
//! | Operation | Request | Result |
//! |-----------|---------|--------|
//! | [`find`](SolrAdapter::find) | `Find` | one record or `NotFound`/`TooManyResults` |
//! | [`find_many`](SolrAdapter::find_many) | `FindMany` | records in response order |
//! | [`find_all`](SolrAdapter::find_all) | `FindAll` | records |
//! | [`query`](SolrAdapter::query) | `Query` | records |
//! | [`query_record`](SolrAdapter::query_record) | `QueryRecord` | one record |
//! | [`create_record`](SolrAdapter::create_record) | `CreateRecord` | [`WriteResult`] |
//! | [`update_record`](SolrAdapter::update_record) | `UpdateRecord` | [`WriteResult`] |
//! | [`delete_record`](SolrAdapter::delete_record) | `DeleteRecord` | `()` |
//!
//! Every call issues one request, except writes with
//! `refresh_after_write`, which follow up with one `find` when the write is
//! already visible to reads (real-time get, or a hard or soft commit). Nothing is
//! retried: on a conflict
//! ([`SolrError::ConcurrentModification`](solr_adapter_core::SolrError::ConcurrentModification))
//! the caller should `find` the record again and resubmit.

use serde_json::Value;
use solr_adapter_core::classify::classify_failure;
use solr_adapter_core::commit::CommitDirective;
use solr_adapter_core::metadata::MetadataStore;
use solr_adapter_core::normalize::{normalize_array, normalize_meta, normalize_single};
use solr_adapter_core::query::SearchQuery;
use solr_adapter_core::record::id_key;
use solr_adapter_core::request::{Request, RequestBuilder};
use solr_adapter_core::serializer::{AttributeMapper, IdentityMapper, SolrSerializer};
use solr_adapter_core::transport::Transport;
use solr_adapter_core::update_mode::UpdateMode;
use solr_adapter_core::{NormalizedRecord, Result, Snapshot, SolrError, Version};
use std::sync::Arc;

use crate::config::Config;

/// Caller-owned state carried between operations.
///
/// Holds the per-type metadata table; versions recorded by reads here are
/// what optimistic-concurrency writes attach.
#[derive(Debug, Default)]
pub struct Session {
    metadata: MetadataStore,
}

impl Session {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn metadata(&self) -> &MetadataStore {
        &self.metadata
    }

    pub fn metadata_mut(&mut self) -> &mut MetadataStore {
        &mut self.metadata
    }
}

/// Outcome of a create or update.
#[derive(Debug, Clone, PartialEq)]
pub struct WriteResult {
    pub id: String,
    /// Version constraint sent with the write, if any.
    pub sent_version: Option<Version>,
    /// The record as read back after the write, when refreshing is on and
    /// the read succeeded.
    pub refreshed: Option<NormalizedRecord>,
}

pub struct SolrAdapter<T> {
    transport: T,
    builder: RequestBuilder,
    serializer: SolrSerializer,
    update_mode: UpdateMode,
    refresh_after_write: bool,
    /// Whether a read issued right after a write sees that write: real-time
    /// get reads the update log, and a hard or soft commit reopens searchers.
    writes_visible: bool,
}

impl<T: Transport> SolrAdapter<T> {
    pub fn new(config: &Config, transport: T) -> Self {
        Self {
            transport,
            builder: RequestBuilder::new(config.build_options(), Arc::new(config.clone())),
            serializer: SolrSerializer::new(
                config.solr.version_field.clone(),
                config.write.array_updates,
                Arc::new(IdentityMapper),
            ),
            update_mode: config.write.update_mode,
            refresh_after_write: config.write.refresh_after_write,
            writes_visible: config.solr.enable_real_time_get
                || matches!(
                    config.commit_policy().directive(),
                    CommitDirective::Hard | CommitDirective::Soft
                ),
        }
    }

    /// Replace the attribute key mapping.
    pub fn with_mapper(mut self, mapper: Arc<dyn AttributeMapper>) -> Self {
        self.serializer = SolrSerializer::new(
            self.serializer.version_field().to_string(),
            self.serializer.array_update(),
            mapper,
        );
        self
    }

    pub fn with_update_mode(mut self, mode: UpdateMode) -> Self {
        self.update_mode = mode;
        self
    }

    pub fn builder(&self) -> &RequestBuilder {
        &self.builder
    }

    pub fn transport(&self) -> &T {
        &self.transport
    }

    pub fn update_mode(&self) -> UpdateMode {
        self.update_mode
    }

    async fn execute(&self, request: &Request) -> Result<Value> {
        self.transport
            .execute(request)
            .await
            .map_err(classify_failure)
    }

    fn absorb_meta(&self, session: &mut Session, type_name: &str, payload: &Value) {
        let unique_key = self.builder.unique_key(type_name);
        let meta = normalize_meta(payload, &unique_key, self.builder.version_field());
        session.metadata.merge(type_name, meta);
    }

    fn to_records(&self, type_name: &str, docs: &[Value]) -> Result<Vec<NormalizedRecord>> {
        let unique_key = self.builder.unique_key(type_name);
        docs.iter()
            .map(|doc| self.serializer.normalize_record(type_name, &unique_key, doc))
            .collect()
    }

    async fn fetch_single(
        &self,
        session: &mut Session,
        type_name: &str,
        request: Request,
        context: &str,
    ) -> Result<NormalizedRecord> {
        let payload = self.execute(&request).await?;
        self.absorb_meta(session, type_name, &payload);
        let doc = normalize_single(&payload, type_name, context)?;
        let unique_key = self.builder.unique_key(type_name);
        self.serializer.normalize_record(type_name, &unique_key, &doc)
    }

    async fn fetch_many(
        &self,
        session: &mut Session,
        type_name: &str,
        request: Request,
    ) -> Result<Vec<NormalizedRecord>> {
        let payload = self.execute(&request).await?;
        self.absorb_meta(session, type_name, &payload);
        let docs = normalize_array(&payload)?;
        self.to_records(type_name, &docs)
    }

    pub async fn find(
        &self,
        session: &mut Session,
        type_name: &str,
        id: impl Into<Value>,
    ) -> Result<NormalizedRecord> {
        let id = id.into();
        let context = id_key(&id);
        let request = self.builder.find(type_name, id);
        self.fetch_single(session, type_name, request, &context).await
    }

    /// Fetch several records by id. An empty id list returns immediately.
    pub async fn find_many(
        &self,
        session: &mut Session,
        type_name: &str,
        ids: Vec<Value>,
    ) -> Result<Vec<NormalizedRecord>> {
        if ids.is_empty() {
            return Ok(Vec::new());
        }
        let request = self.builder.find_many(type_name, ids);
        self.fetch_many(session, type_name, request).await
    }

    pub async fn find_all(
        &self,
        session: &mut Session,
        type_name: &str,
    ) -> Result<Vec<NormalizedRecord>> {
        let request = self.builder.find_all(type_name);
        self.fetch_many(session, type_name, request).await
    }

    /// Run a search. Paging totals land in the session's metadata for
    /// `type_name`.
    pub async fn query(
        &self,
        session: &mut Session,
        type_name: &str,
        query: SearchQuery,
    ) -> Result<Vec<NormalizedRecord>> {
        let request = self.builder.query(type_name, query);
        self.fetch_many(session, type_name, request).await
    }

    /// Run a search that must match exactly one document.
    pub async fn query_record(
        &self,
        session: &mut Session,
        type_name: &str,
        query: SearchQuery,
    ) -> Result<NormalizedRecord> {
        let context = query.q.clone().unwrap_or_else(|| "*:*".to_string());
        let request = self.builder.query_record(type_name, query);
        self.fetch_single(session, type_name, request, &context).await
    }

    /// Create a record. A snapshot without an id gets a random UUID.
    pub async fn create_record(
        &self,
        session: &mut Session,
        mut snapshot: Snapshot,
    ) -> Result<WriteResult> {
        snapshot.is_new = true;
        if snapshot.id.is_none() {
            let generated = uuid::Uuid::new_v4().to_string();
            tracing::debug!(type_name = %snapshot.type_name, id = %generated, "generated record id");
            snapshot.id = Some(Value::String(generated));
        }
        self.write(session, snapshot, true).await
    }

    pub async fn update_record(
        &self,
        session: &mut Session,
        mut snapshot: Snapshot,
    ) -> Result<WriteResult> {
        snapshot.is_new = false;
        require_id(&snapshot)?;
        self.write(session, snapshot, false).await
    }

    /// Delete a record. Its recorded version is forgotten on success.
    ///
    /// A snapshot without an id is rejected with
    /// [`SolrError::MissingRecordId`] before anything is sent.
    pub async fn delete_record(&self, session: &mut Session, snapshot: Snapshot) -> Result<()> {
        require_id(&snapshot)?;
        let type_name = snapshot.type_name.clone();
        let unique_key = self.builder.unique_key(&type_name);
        let doc = self.serializer.serialize_for_delete(
            &snapshot,
            &unique_key,
            self.update_mode,
            &session.metadata,
        )?;

        let request = self.builder.delete_record(&type_name, doc);
        self.execute(&request).await?;

        let id = snapshot.id_key().unwrap_or_default();
        session.metadata.forget_version(&type_name, &id);
        tracing::info!(type_name = %type_name, id = %id, "deleted record");
        Ok(())
    }

    async fn write(
        &self,
        session: &mut Session,
        snapshot: Snapshot,
        create: bool,
    ) -> Result<WriteResult> {
        let type_name = snapshot.type_name.clone();
        let unique_key = self.builder.unique_key(&type_name);
        let doc = self.serializer.serialize(
            &snapshot,
            &unique_key,
            self.update_mode,
            &session.metadata,
        )?;
        let sent_version = doc
            .get(self.builder.version_field())
            .and_then(Version::from_value);

        let request = if create {
            self.builder.create_record(&type_name, doc)
        } else {
            self.builder.update_record(&type_name, doc)
        };
        self.execute(&request).await?;

        let id = snapshot.id_key().unwrap_or_default();
        tracing::info!(
            type_name = %type_name,
            id = %id,
            version = ?sent_version,
            "{} record",
            if create { "created" } else { "updated" }
        );

        let refreshed = self.refresh(session, &snapshot).await;
        Ok(WriteResult {
            id,
            sent_version,
            refreshed,
        })
    }

    /// Read the record back so its new version is on file. On any failure,
    /// with refreshing disabled, or when the write is not yet visible to
    /// reads, the now stale version is dropped.
    async fn refresh(&self, session: &mut Session, snapshot: &Snapshot) -> Option<NormalizedRecord> {
        let type_name = snapshot.type_name.as_str();
        let id = snapshot.id.clone()?;
        let key = id_key(&id);

        if !self.refresh_after_write {
            session.metadata.forget_version(type_name, &key);
            return None;
        }
        if !self.writes_visible {
            tracing::debug!(
                type_name,
                id = %key,
                "skipping refresh: search would serve the pre-write document"
            );
            session.metadata.forget_version(type_name, &key);
            return None;
        }

        match self.find(session, type_name, id).await {
            Ok(record) => Some(record),
            Err(e) => {
                tracing::warn!(type_name, id = %key, error = %e, "refresh after write failed");
                session.metadata.forget_version(type_name, &key);
                None
            }
        }
    }
}

fn require_id(snapshot: &Snapshot) -> Result<()> {
    match snapshot.id {
        Some(ref id) if !id.is_null() => Ok(()),
        _ => Err(SolrError::MissingRecordId {
            type_name: snapshot.type_name.clone(),
        }),
    }
}
