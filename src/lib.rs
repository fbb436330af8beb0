//! # Solr Adapter
//!
//! Use Apache Solr as a document store: find, query, create, update and
//! delete records, with optimistic concurrency on Solr's `_version_`
//! field and configurable commit behavior.
//!
//! The protocol logic lives in [`solr_adapter_core`]; this crate adds
//! configuration, logging, an HTTP transport, and the operation façade.
//!
//! ## Architecture
//!
//! ```text
//! ┌──────────────┐   ┌──────────────────┐   ┌───────────────┐
//! │ SolrAdapter  │──▶│ solr-adapter-core │──▶│ HttpTransport │──▶ Solr
//! │  + Session   │◀──│ build / normalize │◀──│   (reqwest)   │
//! └──────┬───────┘   └──────────────────┘   └───────────────┘
//!        │
//!   ┌────┴─────┐
//!   │   CLI    │
//!   │  (solr)  │
//!   └──────────┘
//! ```
//!
//! ## Quick Start
//!
//! ```bash
//! solr plan find article --id 101         # show the request, no network
//! solr get article 101
//! solr query article --q "title:rust" --limit 5
//! solr update article 101 --json '{"title": "New title"}'
//! ```
//!
//! ## Modules
//!
//! | Module | Purpose |
//! |--------|---------|
//! | [`config`] | TOML configuration and per-type routing |
//! | [`logging`] | `tracing-subscriber` setup |
//! | [`transport`] | reqwest-backed HTTP transport |
//! | [`adapter`] | Operations over a transport with a caller-owned session |

pub mod adapter;
pub mod config;
pub mod logging;
pub mod transport;

pub use adapter::{Session, SolrAdapter, WriteResult};
pub use solr_adapter_core;
