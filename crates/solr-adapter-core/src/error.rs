//! Error taxonomy for Solr operations.
//!
//! Every failure the protocol layer can report is a variant of
//! [`SolrError`]. None of them are retried internally: a caller that
//! receives [`SolrError::ConcurrentModification`] is expected to re-fetch
//! the record (refreshing its version) and submit the write again.
//!
//! Contract violations by the caller (an operation paired with the wrong
//! kind of input, an empty id list for a search) are not represented here.
//! They panic.

use serde_json::Value;
use std::fmt;
use thiserror::Error;

/// Result alias used throughout the core crate.
pub type Result<T> = std::result::Result<T, SolrError>;

/// A failed transport call, as reported by a [`Transport`](crate::transport::Transport).
///
/// `status` is `None` when no HTTP response was received at all
/// (connection refused, DNS failure, timeout inside the transport).
#[derive(Debug, Clone, PartialEq)]
pub struct TransportFailure {
    pub status: Option<u16>,
    pub message: String,
    pub response_body: Option<Value>,
}

impl TransportFailure {
    /// A failure that carries only a message, e.g. a network error.
    pub fn message(message: impl Into<String>) -> Self {
        Self {
            status: None,
            message: message.into(),
            response_body: None,
        }
    }

    /// A failure derived from a non-success HTTP response.
    pub fn http(status: u16, response_body: Option<Value>) -> Self {
        let message = response_body
            .as_ref()
            .and_then(error_msg)
            .map(str::to_string)
            .unwrap_or_else(|| format!("Solr responded with HTTP {}", status));
        Self {
            status: Some(status),
            message,
            response_body,
        }
    }
}

impl fmt::Display for TransportFailure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.status {
            Some(status) => write!(f, "HTTP {}: {}", status, self.message),
            None => write!(f, "{}", self.message),
        }
    }
}

/// Extract `error.msg` from a Solr error envelope.
pub(crate) fn error_msg(body: &Value) -> Option<&str> {
    body.get("error")
        .and_then(|e| e.get("msg"))
        .and_then(Value::as_str)
}

/// All recoverable failures surfaced by the adapter.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum SolrError {
    /// Zero documents where exactly one was expected.
    #[error("Record not found for type '{type_name}' and id '{id}'.")]
    NotFound { type_name: String, id: String },

    /// More than one document where exactly one was expected.
    #[error(
        "Query for single document of type '{type_name}' returned {count} documents when exactly one was expected."
    )]
    TooManyResults {
        type_name: String,
        id: String,
        count: usize,
    },

    /// HTTP 409 from Solr: the `_version_` constraint did not match.
    #[error("Concurrent modification: {message}")]
    ConcurrentModification { message: String },

    /// Atomic update requested for a record with no changed attributes.
    #[error(
        "Cannot use atomic update because record of type '{type_name}' with id '{id}' has no pending changes."
    )]
    NotDirty { type_name: String, id: String },

    /// No metadata has ever been recorded for this type.
    #[error("No version metadata recorded for type '{type_name}'; load the record before updating it.")]
    MissingVersionMetadata { type_name: String },

    /// Metadata exists for the type but carries no version for this id.
    #[error("No version recorded for record of type '{type_name}' with id '{id}'; load the record before updating it.")]
    MissingVersionForRecord { type_name: String, id: String },

    /// A write or delete was given a snapshot with no id to address.
    #[error("Record of type '{type_name}' has no id; updates and deletes need one.")]
    MissingRecordId { type_name: String },

    /// The response envelope did not have the expected shape.
    #[error("Malformed Solr response: {0}")]
    MalformedResponse(String),

    /// Any other transport-level failure.
    #[error("Solr request failed: {0}")]
    Transport(TransportFailure),
}

impl SolrError {
    pub fn malformed(msg: impl Into<String>) -> Self {
        SolrError::MalformedResponse(msg.into())
    }

    /// True for a version conflict that the caller can resolve by re-fetching.
    pub fn is_conflict(&self) -> bool {
        matches!(self, SolrError::ConcurrentModification { .. })
    }

    pub fn is_not_found(&self) -> bool {
        matches!(self, SolrError::NotFound { .. })
    }
}

impl From<TransportFailure> for SolrError {
    fn from(failure: TransportFailure) -> Self {
        SolrError::Transport(failure)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_not_found_message_names_type_and_id() {
        let err = SolrError::NotFound {
            type_name: "article".into(),
            id: "a1".into(),
        };
        assert_eq!(
            err.to_string(),
            "Record not found for type 'article' and id 'a1'."
        );
        assert!(err.is_not_found());
        assert!(!err.is_conflict());
    }

    #[test]
    fn test_http_failure_prefers_solr_error_msg() {
        let failure = TransportFailure::http(400, Some(json!({"error": {"msg": "undefined field foo"}})));
        assert_eq!(failure.message, "undefined field foo");
        assert_eq!(failure.to_string(), "HTTP 400: undefined field foo");
    }

    #[test]
    fn test_http_failure_without_body() {
        let failure = TransportFailure::http(503, None);
        assert_eq!(failure.status, Some(503));
        assert_eq!(failure.message, "Solr responded with HTTP 503");
    }

    #[test]
    fn test_message_failure_has_no_status() {
        let failure = TransportFailure::message("connection refused");
        assert_eq!(failure.status, None);
        assert_eq!(failure.to_string(), "connection refused");
    }
}
