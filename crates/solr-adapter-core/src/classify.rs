//! Classification of failed Solr responses.

use crate::error::{error_msg, SolrError, TransportFailure};

/// HTTP status Solr returns when a `_version_` constraint fails.
pub const VERSION_CONFLICT_STATUS: u16 = 409;

/// Map a transport failure into a [`SolrError`].
///
/// A 409 becomes [`SolrError::ConcurrentModification`] carrying Solr's
/// `error.msg` (or `"version conflict"`); anything else passes through as
/// [`SolrError::Transport`].
pub fn classify_failure(failure: TransportFailure) -> SolrError {
    if failure.status == Some(VERSION_CONFLICT_STATUS) {
        let message = failure
            .response_body
            .as_ref()
            .and_then(error_msg)
            .unwrap_or("version conflict")
            .to_string();
        tracing::warn!(%message, "version conflict reported by Solr");
        return SolrError::ConcurrentModification { message };
    }

    tracing::warn!(status = ?failure.status, message = %failure.message, "Solr request failed");
    SolrError::Transport(failure)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_conflict_uses_server_message() {
        let body = json!({
            "responseHeader": {"status": 409},
            "error": {"msg": "version conflict for d1 expected=1 actual=2", "code": 409}
        });
        let err = classify_failure(TransportFailure::http(409, Some(body)));
        assert_eq!(
            err,
            SolrError::ConcurrentModification {
                message: "version conflict for d1 expected=1 actual=2".into()
            }
        );
        assert!(err.is_conflict());
    }

    #[test]
    fn test_conflict_without_body_gets_generic_message() {
        let err = classify_failure(TransportFailure::http(409, None));
        assert_eq!(
            err,
            SolrError::ConcurrentModification {
                message: "version conflict".into()
            }
        );
    }

    #[test]
    fn test_other_statuses_pass_through() {
        let failure = TransportFailure::http(500, Some(json!({"error": {"msg": "boom"}})));
        let err = classify_failure(failure.clone());
        assert_eq!(err, SolrError::Transport(failure));
        assert_eq!(err.to_string(), "Solr request failed: HTTP 500: boom");

        let network = TransportFailure::message("connection refused");
        assert_eq!(
            classify_failure(network.clone()),
            SolrError::Transport(network)
        );
    }
}
