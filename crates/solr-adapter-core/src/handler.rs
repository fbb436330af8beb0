//! Solr request handler variants.
//!
//! Each [`HandlerType`] owns a default route, an HTTP method, and one
//! payload rule:
//!
//! | Variant | Path | Method | Payload |
//! |---------|------|--------|---------|
//! | `Search` | `select` | GET | `q`/`fq`/`rows`/`start`/`wt=json` |
//! | `RealTimeGet` | `get` | GET | `{<uniqueKey>: id or [ids]}` |
//! | `Update` | `update` | POST | `{add: {doc}}` + commit directive |
//! | `Delete` | `update` | POST | `{delete: {id}}`, version moved to `?_version_=` |

use serde::Serialize;
use serde_json::{json, Map, Value};
use std::fmt;

use crate::commit::CommitPolicy;
use crate::query::SearchQuery;
use crate::record::Fields;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub enum HttpMethod {
    #[serde(rename = "GET")]
    Get,
    #[serde(rename = "POST")]
    Post,
}

impl HttpMethod {
    pub fn as_str(self) -> &'static str {
        match self {
            HttpMethod::Get => "GET",
            HttpMethod::Post => "POST",
        }
    }

    /// Read verbs carry their payload in the query string.
    pub fn is_read(self) -> bool {
        matches!(self, HttpMethod::Get)
    }
}

impl fmt::Display for HttpMethod {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub enum HandlerType {
    Search,
    RealTimeGet,
    Update,
    Delete,
}

impl HandlerType {
    pub fn default_path(self) -> &'static str {
        match self {
            HandlerType::Search => "select",
            HandlerType::RealTimeGet => "get",
            HandlerType::Update | HandlerType::Delete => "update",
        }
    }

    pub fn default_method(self) -> HttpMethod {
        match self {
            HandlerType::Search | HandlerType::RealTimeGet => HttpMethod::Get,
            HandlerType::Update | HandlerType::Delete => HttpMethod::Post,
        }
    }
}

/// Input a handler builds its payload from.
#[derive(Debug, Clone, PartialEq)]
pub enum HandlerData {
    Id(Value),
    Ids(Vec<Value>),
    Query(SearchQuery),
    Document(Fields),
}

impl HandlerData {
    fn kind(&self) -> &'static str {
        match self {
            HandlerData::Id(_) => "id",
            HandlerData::Ids(_) => "id list",
            HandlerData::Query(_) => "query",
            HandlerData::Document(_) => "document",
        }
    }
}

/// Everything a payload rule needs to know beyond its input data.
#[derive(Debug, Clone, PartialEq)]
pub struct HandlerContext {
    pub unique_key: String,
    pub version_field: String,
    pub filter_query: Option<String>,
    pub commit: CommitPolicy,
}

/// A concrete handler: variant plus the route and method it will use.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Handler {
    pub handler_type: HandlerType,
    pub path: String,
    pub method: HttpMethod,
}

/// Output of a payload rule: the final route (which may carry a query
/// string) and the payload.
#[derive(Debug, Clone, PartialEq)]
pub struct BuiltPayload {
    pub path: String,
    pub payload: Value,
}

impl Handler {
    pub fn new(handler_type: HandlerType) -> Self {
        Self {
            handler_type,
            path: handler_type.default_path().to_string(),
            method: handler_type.default_method(),
        }
    }

    /// Route to a non-default handler path (e.g. a custom `/search`).
    pub fn with_path(mut self, path: impl Into<String>) -> Self {
        self.path = path.into();
        self
    }

    /// Build the payload for `data`.
    ///
    /// # Panics
    ///
    /// Panics when `data` is not an input this variant accepts (a
    /// document passed to a search, an id list passed to an update), or
    /// when a search is given an empty id list.
    pub fn build_payload(&self, ctx: &HandlerContext, data: HandlerData) -> BuiltPayload {
        match self.handler_type {
            HandlerType::Search => self.plain(search_payload(ctx, data)),
            HandlerType::RealTimeGet => self.plain(real_time_get_payload(ctx, data)),
            HandlerType::Update => self.plain(update_payload(ctx, data)),
            HandlerType::Delete => delete_payload(&self.path, ctx, data),
        }
    }

    fn plain(&self, payload: Value) -> BuiltPayload {
        BuiltPayload {
            path: self.path.clone(),
            payload,
        }
    }
}

fn contract_violation(handler: HandlerType, data: &HandlerData) -> ! {
    panic!(
        "{:?} handler cannot build a payload from a {}",
        handler,
        data.kind()
    )
}

/// `key:id` clause for the search OR-chain.
fn id_clause(key: &str, id: &Value) -> String {
    match id {
        Value::String(s) => format!("{}:{}", key, s),
        other => format!("{}:{}", key, other),
    }
}

fn search_payload(ctx: &HandlerContext, data: HandlerData) -> Value {
    let mut payload = Map::new();
    payload.insert("wt".into(), json!("json"));

    let mut fq: Vec<String> = Vec::new();

    match data {
        HandlerData::Id(id) => {
            payload.insert("q".into(), json!(id_clause(&ctx.unique_key, &id)));
        }
        HandlerData::Ids(ids) => {
            assert!(!ids.is_empty(), "Search handler requires at least one id");
            let q = ids
                .iter()
                .map(|id| id_clause(&ctx.unique_key, id))
                .collect::<Vec<_>>()
                .join(" OR ");
            payload.insert("q".into(), json!(q));
            // Solr's default page is 10 rows; ask for every id.
            payload.insert("rows".into(), json!(ids.len()));
        }
        HandlerData::Query(query) => {
            let SearchQuery {
                q,
                fq: query_fq,
                limit,
                offset,
                params,
            } = query;
            for (key, value) in params {
                payload.insert(key, value);
            }
            payload.insert("wt".into(), json!("json"));
            payload.insert("q".into(), json!(q.unwrap_or_else(|| "*:*".to_string())));
            if let Some(rows) = limit {
                payload.insert("rows".into(), json!(rows));
            }
            if let Some(start) = offset {
                payload.insert("start".into(), json!(start));
            }
            fq.extend(query_fq);
        }
        other @ HandlerData::Document(_) => contract_violation(HandlerType::Search, &other),
    }

    if let Some(filter) = ctx.filter_query.as_deref() {
        if !filter.trim().is_empty() {
            fq.push(filter.to_string());
        }
    }

    match fq.len() {
        0 => {}
        1 => {
            payload.insert("fq".into(), json!(fq[0]));
        }
        _ => {
            payload.insert("fq".into(), json!(fq));
        }
    }

    Value::Object(payload)
}

fn real_time_get_payload(ctx: &HandlerContext, data: HandlerData) -> Value {
    let ids = match data {
        HandlerData::Id(id) => id,
        HandlerData::Ids(ids) => Value::Array(ids),
        other => contract_violation(HandlerType::RealTimeGet, &other),
    };
    let mut payload = Map::new();
    payload.insert(ctx.unique_key.clone(), ids);
    Value::Object(payload)
}

fn update_payload(ctx: &HandlerContext, data: HandlerData) -> Value {
    let doc = match data {
        HandlerData::Document(doc) => doc,
        other => contract_violation(HandlerType::Update, &other),
    };
    let mut payload = Map::new();
    payload.insert("add".into(), json!({ "doc": doc }));
    ctx.commit.apply(&mut payload);
    Value::Object(payload)
}

fn delete_payload(base_path: &str, ctx: &HandlerContext, data: HandlerData) -> BuiltPayload {
    let mut doc = match data {
        HandlerData::Document(doc) => doc,
        other => contract_violation(HandlerType::Delete, &other),
    };

    let id = doc.remove(&ctx.unique_key).unwrap_or_else(|| {
        panic!(
            "Delete handler requires the document to carry its unique key '{}'",
            ctx.unique_key
        )
    });

    // Solr's delete-by-id takes the version as a request parameter, not
    // inside the delete command. Null means "no version supplied"; 0 is a
    // real value and is kept.
    let path = match doc.remove(&ctx.version_field) {
        Some(Value::Null) | None => base_path.to_string(),
        Some(version) => {
            let separator = if base_path.contains('?') { '&' } else { '?' };
            let text = match version {
                Value::String(s) => s,
                other => other.to_string(),
            };
            format!("{}{}{}={}", base_path, separator, ctx.version_field, text)
        }
    };

    BuiltPayload {
        path,
        payload: json!({ "delete": { "id": id } }),
    }
}
