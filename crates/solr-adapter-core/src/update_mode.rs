//! Update modes and the version-token decision they drive.
//!
//! See [Updating Parts of Documents](https://solr.apache.org/guide/solr/latest/indexing-guide/partial-document-updates.html)
//! for Solr's optimistic concurrency contract.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::error::Result;
use crate::record::Version;

/// Controls whether and how the version field is attached to outbound
/// documents. Exactly one mode applies to each write, and it is always
/// chosen by the caller.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum UpdateMode {
    /// Send only changed fields as `set`/`add`/`remove` operations,
    /// guarded by the last known version.
    Atomic,
    /// Replace the whole document, guarded by the last known version.
    #[default]
    OptimisticConcurrency,
    /// Replace the whole document unconditionally (`_version_ = 0`).
    LastWriteWins,
    /// Send no version field; the server config decides what happens.
    None,
}

impl UpdateMode {
    pub fn as_str(self) -> &'static str {
        match self {
            UpdateMode::Atomic => "atomic",
            UpdateMode::OptimisticConcurrency => "optimistic-concurrency",
            UpdateMode::LastWriteWins => "last-write-wins",
            UpdateMode::None => "none",
        }
    }

    /// Decide the version token for one outbound write.
    ///
    /// `lookup` is only invoked for a previously persisted record under
    /// [`Atomic`](UpdateMode::Atomic) or
    /// [`OptimisticConcurrency`](UpdateMode::OptimisticConcurrency); its
    /// failure propagates unchanged so a missing version can never degrade
    /// into an unconditional overwrite.
    pub fn resolve_version<F>(self, is_new: bool, lookup: F) -> Result<Option<Version>>
    where
        F: FnOnce() -> Result<Version>,
    {
        match self {
            UpdateMode::None => Ok(None),
            _ if is_new => Ok(Some(Version::MUST_NOT_EXIST)),
            UpdateMode::LastWriteWins => Ok(Some(Version::OVERWRITE)),
            UpdateMode::OptimisticConcurrency | UpdateMode::Atomic => lookup().map(Some),
        }
    }
}

impl fmt::Display for UpdateMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for UpdateMode {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s {
            "atomic" => Ok(UpdateMode::Atomic),
            "optimistic-concurrency" | "occ" => Ok(UpdateMode::OptimisticConcurrency),
            "last-write-wins" | "lww" => Ok(UpdateMode::LastWriteWins),
            "none" => Ok(UpdateMode::None),
            other => Err(format!(
                "unknown update mode '{}'. Use atomic, optimistic-concurrency, last-write-wins, or none.",
                other
            )),
        }
    }
}
