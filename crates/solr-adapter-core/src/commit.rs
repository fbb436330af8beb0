//! Commit policy for update requests.
//!
//! See [Near Real Time Searching](https://solr.apache.org/guide/solr/latest/configuration-guide/commits-transaction-logs.html).

use serde::{Deserialize, Serialize};
use serde_json::{json, Map, Value};
use std::str::FromStr;

/// Kind of commit command to embed in an update payload.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum CommitType {
    /// Flush to disk and reopen searchers.
    Hard,
    /// Reopen searchers only; changes become visible outside real-time get.
    Soft,
    /// Send no commit; rely on autoCommit or a later request.
    #[default]
    None,
}

impl FromStr for CommitType {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "hard" => Ok(CommitType::Hard),
            "soft" => Ok(CommitType::Soft),
            "none" => Ok(CommitType::None),
            other => Err(format!(
                "unknown commit type '{}'. Use hard, soft, or none.",
                other
            )),
        }
    }
}

/// The single effective commit instruction for one write.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CommitDirective {
    /// `add.commitWithin = ms`
    Within(u64),
    /// `commit: {}`
    Hard,
    /// `commit: {softCommit: true}`
    Soft,
    None,
}

/// Commit configuration: a commit type plus an optional commit-within window.
///
/// A positive `commit_within_ms` always wins over `commit_type`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct CommitPolicy {
    pub commit_type: CommitType,
    pub commit_within_ms: Option<u64>,
}

impl CommitPolicy {
    pub fn new(commit_type: CommitType, commit_within_ms: Option<u64>) -> Self {
        Self {
            commit_type,
            commit_within_ms,
        }
    }

    pub fn directive(&self) -> CommitDirective {
        match (self.commit_within_ms, self.commit_type) {
            (Some(ms), _) if ms > 0 => CommitDirective::Within(ms),
            (_, CommitType::Hard) => CommitDirective::Hard,
            (_, CommitType::Soft) => CommitDirective::Soft,
            (_, CommitType::None) => CommitDirective::None,
        }
    }

    /// Embed the effective directive into an `{add: {...}}` payload.
    pub fn apply(&self, payload: &mut Map<String, Value>) {
        match self.directive() {
            CommitDirective::Within(ms) => {
                if let Some(Value::Object(add)) = payload.get_mut("add") {
                    add.insert("commitWithin".to_string(), Value::from(ms));
                }
            }
            CommitDirective::Hard => {
                payload.insert("commit".to_string(), json!({}));
            }
            CommitDirective::Soft => {
                payload.insert("commit".to_string(), json!({"softCommit": true}));
            }
            CommitDirective::None => {}
        }
    }
}
