//! Per-type routing hooks supplied by the application.
//!
//! The builder asks a [`TypeResolver`] three questions about each entity
//! type: which core holds it, which filter query restricts a search to it,
//! and which field is its unique key. Every method has a default, so an
//! application only overrides what differs from a single-core setup.

use crate::request::Operation;

pub const DEFAULT_UNIQUE_KEY: &str = "id";

pub trait TypeResolver: Send + Sync {
    /// Solr core for the type; `None` routes to the server's default core.
    fn core_for_type(&self, _type_name: &str) -> Option<String> {
        None
    }

    /// Optional `fq` clause restricting searches to the type.
    ///
    /// Useful when several types share one core:
    ///
    /// ```rust
    /// use solr_adapter_core::hooks::TypeResolver;
    /// use solr_adapter_core::request::Operation;
    ///
    /// struct SharedCore;
    ///
    /// impl TypeResolver for SharedCore {
    ///     fn filter_query_for_type(&self, type_name: &str, _op: Operation) -> Option<String> {
    ///         Some(format!("doc_type:{}", type_name))
    ///     }
    /// }
    ///
    /// assert_eq!(
    ///     SharedCore.filter_query_for_type("article", Operation::Query).as_deref(),
    ///     Some("doc_type:article")
    /// );
    /// ```
    fn filter_query_for_type(&self, _type_name: &str, _operation: Operation) -> Option<String> {
        None
    }

    fn unique_key_for_type(&self, _type_name: &str) -> String {
        DEFAULT_UNIQUE_KEY.to_string()
    }
}

/// Resolver with every default: no core, no filter, `id` as unique key.
#[derive(Debug, Clone, Copy, Default)]
pub struct DefaultTypes;

impl TypeResolver for DefaultTypes {}
