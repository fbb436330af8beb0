//! Request descriptors and the builder that produces them.
//!
//! [`RequestBuilder::build`] selects a [`Handler`] for an
//! ([`Operation`], configuration) pair, resolves the per-type context
//! through a [`TypeResolver`], runs the handler's payload rule, and
//! returns an immutable [`Request`] ready for a
//! [`Transport`](crate::transport::Transport).
//!
//! # Handler selection
//!
//! | Operation | Handler |
//! |-----------|---------|
//! | `Find`, `FindMany` | `RealTimeGet` when enabled, else `Search` |
//! | `FindAll`, `Query`, `QueryRecord` | `Search` |
//! | `CreateRecord`, `UpdateRecord` | `Update` |
//! | `DeleteRecord` | `Delete` |

use serde::Serialize;
use serde_json::Value;
use std::fmt;
use std::sync::Arc;

use crate::commit::CommitPolicy;
use crate::handler::{Handler, HandlerContext, HandlerData, HandlerType, HttpMethod};
use crate::hooks::TypeResolver;
use crate::query::{to_query_pairs, SearchQuery};
use crate::record::Fields;

pub const DEFAULT_VERSION_FIELD: &str = "_version_";

/// Data-access operations the adapter exposes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub enum Operation {
    Find,
    FindMany,
    FindAll,
    Query,
    QueryRecord,
    CreateRecord,
    UpdateRecord,
    DeleteRecord,
}

impl Operation {
    pub fn as_str(self) -> &'static str {
        match self {
            Operation::Find => "find",
            Operation::FindMany => "findMany",
            Operation::FindAll => "findAll",
            Operation::Query => "query",
            Operation::QueryRecord => "queryRecord",
            Operation::CreateRecord => "createRecord",
            Operation::UpdateRecord => "updateRecord",
            Operation::DeleteRecord => "deleteRecord",
        }
    }

    pub fn is_write(self) -> bool {
        matches!(
            self,
            Operation::CreateRecord | Operation::UpdateRecord | Operation::DeleteRecord
        )
    }
}

impl fmt::Display for Operation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// An immutable, fully built Solr request.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Request {
    core: Option<String>,
    handler: Handler,
    method: HttpMethod,
    path: String,
    payload: Value,
}

impl Request {
    pub fn core(&self) -> Option<&str> {
        self.core.as_deref()
    }

    pub fn handler(&self) -> &Handler {
        &self.handler
    }

    pub fn method(&self) -> HttpMethod {
        self.method
    }

    /// Handler route, possibly carrying a query string (`update?_version_=..`).
    pub fn path(&self) -> &str {
        &self.path
    }

    pub fn payload(&self) -> &Value {
        &self.payload
    }

    /// `core/path`, relative to the server's base URL.
    pub fn relative_url(&self) -> String {
        combine_path(&["", self.core.as_deref().unwrap_or(""), &self.path])
    }

    /// Query-string pairs for read verbs; empty for writes.
    pub fn query_pairs(&self) -> Vec<(String, String)> {
        if self.method.is_read() {
            to_query_pairs(&self.payload)
        } else {
            Vec::new()
        }
    }

    /// JSON body for write verbs; `None` for reads.
    pub fn body(&self) -> Option<&Value> {
        if self.method.is_read() {
            None
        } else {
            Some(&self.payload)
        }
    }
}

/// Join path segments with single forward slashes, skipping empty parts.
///
/// ```rust
/// use solr_adapter_core::request::combine_path;
///
/// assert_eq!(combine_path(&["/solr/", "/articles", "select"]), "/solr/articles/select");
/// assert_eq!(combine_path(&["http://h:8983/solr", "", "get"]), "http://h:8983/solr/get");
/// ```
pub fn combine_path(parts: &[&str]) -> String {
    let mut out = String::new();
    for (i, part) in parts.iter().enumerate() {
        if i > 0 && part.is_empty() {
            continue;
        }
        if out.is_empty() {
            out.push_str(part);
            continue;
        }
        match (out.ends_with('/'), part.starts_with('/')) {
            (false, false) => {
                out.push('/');
                out.push_str(part);
            }
            (true, true) => out.push_str(&part[1..]),
            _ => out.push_str(part),
        }
    }
    out
}

/// Configuration that shapes every built request.
#[derive(Debug, Clone, PartialEq)]
pub struct BuildOptions {
    pub enable_real_time_get: bool,
    pub version_field: String,
    pub commit: CommitPolicy,
    /// Overrides the `select` route for searches (e.g. `search`, `/browse`).
    pub search_path: Option<String>,
}

impl Default for BuildOptions {
    fn default() -> Self {
        Self {
            enable_real_time_get: false,
            version_field: DEFAULT_VERSION_FIELD.to_string(),
            commit: CommitPolicy::default(),
            search_path: None,
        }
    }
}

/// Builds [`Request`]s for operations on entity types.
#[derive(Clone)]
pub struct RequestBuilder {
    options: BuildOptions,
    resolver: Arc<dyn TypeResolver>,
}

impl fmt::Debug for RequestBuilder {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RequestBuilder")
            .field("options", &self.options)
            .finish_non_exhaustive()
    }
}

impl RequestBuilder {
    pub fn new(options: BuildOptions, resolver: Arc<dyn TypeResolver>) -> Self {
        Self { options, resolver }
    }

    pub fn options(&self) -> &BuildOptions {
        &self.options
    }

    pub fn resolver(&self) -> &dyn TypeResolver {
        self.resolver.as_ref()
    }

    pub fn unique_key(&self, type_name: &str) -> String {
        self.resolver.unique_key_for_type(type_name)
    }

    pub fn version_field(&self) -> &str {
        &self.options.version_field
    }

    /// Select the handler for an operation.
    pub fn handler_for(&self, operation: Operation) -> Handler {
        let handler_type = match operation {
            Operation::Find | Operation::FindMany if self.options.enable_real_time_get => {
                HandlerType::RealTimeGet
            }
            Operation::Find
            | Operation::FindMany
            | Operation::FindAll
            | Operation::Query
            | Operation::QueryRecord => HandlerType::Search,
            Operation::CreateRecord | Operation::UpdateRecord => HandlerType::Update,
            Operation::DeleteRecord => HandlerType::Delete,
        };

        let handler = Handler::new(handler_type);
        match (handler_type, self.options.search_path.as_deref()) {
            (HandlerType::Search, Some(path)) => handler.with_path(path),
            _ => handler,
        }
    }

    /// Build the request for `operation` on `type_name`.
    ///
    /// # Panics
    ///
    /// Panics when `data` does not fit the selected handler (see
    /// [`Handler::build_payload`]).
    pub fn build(&self, type_name: &str, operation: Operation, data: HandlerData) -> Request {
        let handler = self.handler_for(operation);

        let filter_query = match handler.handler_type {
            HandlerType::Search => self.resolver.filter_query_for_type(type_name, operation),
            _ => None,
        };

        let ctx = HandlerContext {
            unique_key: self.resolver.unique_key_for_type(type_name),
            version_field: self.options.version_field.clone(),
            filter_query,
            commit: self.options.commit,
        };

        let built = handler.build_payload(&ctx, data);
        let core = self.resolver.core_for_type(type_name);

        tracing::debug!(
            type_name,
            operation = operation.as_str(),
            handler = ?handler.handler_type,
            method = handler.method.as_str(),
            path = %built.path,
            core = core.as_deref().unwrap_or(""),
            "built Solr request"
        );

        Request {
            core,
            method: handler.method,
            handler,
            path: built.path,
            payload: built.payload,
        }
    }

    pub fn find(&self, type_name: &str, id: Value) -> Request {
        self.build(type_name, Operation::Find, HandlerData::Id(id))
    }

    pub fn find_many(&self, type_name: &str, ids: Vec<Value>) -> Request {
        self.build(type_name, Operation::FindMany, HandlerData::Ids(ids))
    }

    pub fn find_all(&self, type_name: &str) -> Request {
        self.build(
            type_name,
            Operation::FindAll,
            HandlerData::Query(SearchQuery::default()),
        )
    }

    pub fn query(&self, type_name: &str, query: SearchQuery) -> Request {
        self.build(type_name, Operation::Query, HandlerData::Query(query))
    }

    pub fn query_record(&self, type_name: &str, query: SearchQuery) -> Request {
        self.build(type_name, Operation::QueryRecord, HandlerData::Query(query))
    }

    pub fn create_record(&self, type_name: &str, doc: Fields) -> Request {
        self.build(type_name, Operation::CreateRecord, HandlerData::Document(doc))
    }

    pub fn update_record(&self, type_name: &str, doc: Fields) -> Request {
        self.build(type_name, Operation::UpdateRecord, HandlerData::Document(doc))
    }

    pub fn delete_record(&self, type_name: &str, doc: Fields) -> Request {
        self.build(type_name, Operation::DeleteRecord, HandlerData::Document(doc))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::commit::CommitType;
    use crate::hooks::DefaultTypes;
    use serde_json::json;

    struct Typed;

    impl TypeResolver for Typed {
        fn core_for_type(&self, type_name: &str) -> Option<String> {
            Some(format!("{}s", type_name))
        }

        fn filter_query_for_type(&self, type_name: &str, _operation: Operation) -> Option<String> {
            Some(format!("type:{}", type_name))
        }
    }

    fn builder(rtg: bool) -> RequestBuilder {
        RequestBuilder::new(
            BuildOptions {
                enable_real_time_get: rtg,
                ..Default::default()
            },
            Arc::new(DefaultTypes),
        )
    }

    #[test]
    fn test_handler_selection_without_rtg() {
        let b = builder(false);
        assert_eq!(b.handler_for(Operation::Find).handler_type, HandlerType::Search);
        assert_eq!(b.handler_for(Operation::FindMany).handler_type, HandlerType::Search);
        assert_eq!(b.handler_for(Operation::FindAll).handler_type, HandlerType::Search);
        assert_eq!(b.handler_for(Operation::CreateRecord).handler_type, HandlerType::Update);
        assert_eq!(b.handler_for(Operation::UpdateRecord).handler_type, HandlerType::Update);
        assert_eq!(b.handler_for(Operation::DeleteRecord).handler_type, HandlerType::Delete);
    }

    #[test]
    fn test_handler_selection_with_rtg() {
        let b = builder(true);
        assert_eq!(b.handler_for(Operation::Find).handler_type, HandlerType::RealTimeGet);
        assert_eq!(b.handler_for(Operation::FindMany).handler_type, HandlerType::RealTimeGet);
        assert_eq!(b.handler_for(Operation::Query).handler_type, HandlerType::Search);
        assert_eq!(b.handler_for(Operation::QueryRecord).handler_type, HandlerType::Search);
    }

    #[test]
    fn test_find_by_id_search_request() {
        let req = builder(false).find("dummy", json!(101));
        assert_eq!(req.method(), HttpMethod::Get);
        assert_eq!(req.relative_url(), "select");
        assert_eq!(req.payload(), &json!({"q": "id:101", "wt": "json"}));
        assert!(req.body().is_none());
    }

    #[test]
    fn test_find_by_id_real_time_get_request() {
        let req = builder(true).find("dummy", json!(101));
        assert_eq!(req.path(), "get");
        assert_eq!(req.query_pairs(), vec![("id".to_string(), "101".to_string())]);
    }

    #[test]
    fn test_resolver_supplies_core_and_filter() {
        let b = RequestBuilder::new(BuildOptions::default(), Arc::new(Typed));
        let req = b.find("dummy", json!(101));
        assert_eq!(req.core(), Some("dummys"));
        assert_eq!(req.relative_url(), "dummys/select");
        assert_eq!(req.payload()["fq"], json!("type:dummy"));
    }

    #[test]
    fn test_rtg_bypasses_filter() {
        let b = RequestBuilder::new(
            BuildOptions {
                enable_real_time_get: true,
                ..Default::default()
            },
            Arc::new(Typed),
        );
        let req = b.find("dummy", json!(101));
        assert_eq!(req.payload(), &json!({"id": 101}));
    }

    #[test]
    fn test_update_request_is_post_with_body() {
        let b = RequestBuilder::new(
            BuildOptions {
                commit: CommitPolicy::new(CommitType::Soft, None),
                ..Default::default()
            },
            Arc::new(DefaultTypes),
        );
        let mut doc = Fields::new();
        doc.insert("id".into(), json!("a"));
        let req = b.create_record("article", doc);
        assert_eq!(req.method(), HttpMethod::Post);
        assert!(req.query_pairs().is_empty());
        assert_eq!(
            req.body(),
            Some(&json!({"add": {"doc": {"id": "a"}}, "commit": {"softCommit": true}}))
        );
    }

    #[test]
    fn test_search_path_override() {
        let b = RequestBuilder::new(
            BuildOptions {
                search_path: Some("search".into()),
                ..Default::default()
            },
            Arc::new(DefaultTypes),
        );
        assert_eq!(b.find_all("article").path(), "search");
        assert_eq!(b.handler_for(Operation::CreateRecord).path, "update");
    }

    #[test]
    fn test_combine_path_variants() {
        assert_eq!(combine_path(&["/solr", "core", "select"]), "/solr/core/select");
        assert_eq!(combine_path(&["/solr/", "/core/", "/select"]), "/solr/core/select");
        assert_eq!(combine_path(&["", "", "update?_version_=1"]), "update?_version_=1");
    }
}
