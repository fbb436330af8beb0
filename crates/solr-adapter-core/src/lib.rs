//! # Solr Adapter Core
//!
//! Protocol logic for talking to Apache Solr as a document store:
//! request handler selection, wire payloads, commit policy, optimistic
//! concurrency through `_version_`, and response normalization.
//!
//! This crate performs no I/O. HTTP is delegated to a
//! [`Transport`](transport::Transport) implementation supplied by the
//! caller, and per-type routing to a [`TypeResolver`](hooks::TypeResolver).
//!
//! # Data flow
//!
//! ```text
//! operation ──► RequestBuilder ──► Request ──► Transport
//!                  │  Handler                      │
//!                  │  CommitPolicy                 ├─ Ok(body) ──► normalize_* ──► records
//!                  ▼                               │                   │
//!            SolrSerializer ◄── MetadataStore ◄────┼──── ResponseMeta ─┘
//!         (version constraint)                     └─ Err ──► classify_failure
//! ```
//!
//! | Module | Purpose |
//! |--------|---------|
//! | [`update_mode`] | Update modes and the version each one attaches |
//! | [`commit`] | Commit type and `commitWithin` directives |
//! | [`handler`] | `Search`, `RealTimeGet`, `Update`, `Delete` payload rules |
//! | [`request`] | Operations, the request builder, built requests |
//! | [`normalize`] | Single/array/metadata extraction from response envelopes |
//! | [`serializer`] | Outbound documents, atomic diffs, record normalization |
//! | [`metadata`] | Per-type paging totals and document versions |
//! | [`classify`] | Failed response → [`SolrError`](error::SolrError) |

pub mod classify;
pub mod commit;
pub mod error;
pub mod handler;
pub mod hooks;
pub mod metadata;
pub mod normalize;
pub mod query;
pub mod record;
pub mod request;
pub mod serializer;
pub mod transport;
pub mod update_mode;

pub use error::{Result, SolrError, TransportFailure};
pub use record::{Fields, NormalizedRecord, RecordMeta, Snapshot, Version};
