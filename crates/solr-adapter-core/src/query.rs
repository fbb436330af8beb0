//! Search query input and query-string encoding.

use serde::{Deserialize, Deserializer, Serialize};
use serde_json::{Map, Value};

/// A caller-supplied search, in adapter vocabulary.
///
/// `limit`/`offset` are translated to Solr's `rows`/`start`; `q` defaults to
/// `*:*`. Any other key is passed through to Solr untouched (`sort`, `fl`,
/// `defType`, ...).
///
/// ```rust
/// use solr_adapter_core::query::SearchQuery;
///
/// let query: SearchQuery = serde_json::from_value(serde_json::json!({
///     "q": "title:rust",
///     "fq": "public:true",
///     "limit": 10,
///     "sort": "score desc"
/// })).unwrap();
/// assert_eq!(query.fq, vec!["public:true".to_string()]);
/// assert_eq!(query.params["sort"], "score desc");
/// ```
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SearchQuery {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub q: Option<String>,
    #[serde(
        default,
        deserialize_with = "one_or_many",
        skip_serializing_if = "Vec::is_empty"
    )]
    pub fq: Vec<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub limit: Option<u64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub offset: Option<u64>,
    #[serde(flatten)]
    pub params: Map<String, Value>,
}

impl SearchQuery {
    pub fn new(q: impl Into<String>) -> Self {
        Self {
            q: Some(q.into()),
            ..Default::default()
        }
    }

    pub fn filter(mut self, fq: impl Into<String>) -> Self {
        self.fq.push(fq.into());
        self
    }

    pub fn limit(mut self, limit: u64) -> Self {
        self.limit = Some(limit);
        self
    }

    pub fn offset(mut self, offset: u64) -> Self {
        self.offset = Some(offset);
        self
    }
}

fn one_or_many<'de, D>(deserializer: D) -> Result<Vec<String>, D::Error>
where
    D: Deserializer<'de>,
{
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum OneOrMany {
        One(String),
        Many(Vec<String>),
    }

    Ok(match Option::<OneOrMany>::deserialize(deserializer)? {
        None => Vec::new(),
        Some(OneOrMany::One(s)) => vec![s],
        Some(OneOrMany::Many(v)) => v,
    })
}

/// Flatten a read payload into query-string pairs.
///
/// Arrays become repeated keys (`fq=a&fq=b`), `null` values are skipped,
/// strings are emitted verbatim and nested objects as JSON text.
pub fn to_query_pairs(payload: &Value) -> Vec<(String, String)> {
    let mut pairs = Vec::new();
    let Value::Object(map) = payload else {
        return pairs;
    };

    for (key, value) in map {
        match value {
            Value::Array(items) => {
                for item in items {
                    if let Some(s) = scalar_text(item) {
                        pairs.push((key.clone(), s));
                    }
                }
            }
            other => {
                if let Some(s) = scalar_text(other) {
                    pairs.push((key.clone(), s));
                }
            }
        }
    }
    pairs
}

fn scalar_text(value: &Value) -> Option<String> {
    match value {
        Value::Null => None,
        Value::String(s) => Some(s.clone()),
        Value::Bool(b) => Some(b.to_string()),
        Value::Number(n) => Some(n.to_string()),
        other => Some(other.to_string()),
    }
}
