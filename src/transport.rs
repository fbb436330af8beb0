//! reqwest-backed [`Transport`].
//!
//! Reads are sent as `GET <base>/<core>/<path>?<pairs>`, writes as
//! `POST` with a JSON body. Any non-2xx answer becomes a
//! [`TransportFailure`] carrying the status and, when it parses, the JSON
//! error envelope. No retries happen here.

use anyhow::Result;
use async_trait::async_trait;
use serde_json::Value;
use solr_adapter_core::handler::HttpMethod;
use solr_adapter_core::request::{combine_path, Request};
use solr_adapter_core::transport::Transport;
use solr_adapter_core::TransportFailure;
use std::time::Duration;

use crate::config::Config;

#[derive(Debug, Clone)]
pub struct HttpTransport {
    client: reqwest::Client,
    base_url: String,
}

impl HttpTransport {
    pub fn new(base_url: impl Into<String>, timeout: Option<Duration>) -> Result<Self> {
        let mut builder = reqwest::Client::builder();
        if let Some(timeout) = timeout {
            builder = builder.timeout(timeout);
        }
        Ok(Self {
            client: builder.build()?,
            base_url: base_url.into(),
        })
    }

    pub fn from_config(config: &Config) -> Result<Self> {
        Self::new(
            config.solr.base_url.clone(),
            config.solr.timeout_secs.map(Duration::from_secs),
        )
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    /// Absolute URL for a request, without read parameters.
    pub fn url_for(&self, request: &Request) -> String {
        combine_path(&[self.base_url.as_str(), request.relative_url().as_str()])
    }
}

#[async_trait]
impl Transport for HttpTransport {
    async fn execute(&self, request: &Request) -> Result<Value, TransportFailure> {
        let url = self.url_for(request);

        let builder = match request.method() {
            HttpMethod::Get => self.client.get(&url).query(&request.query_pairs()),
            HttpMethod::Post => {
                let body = request.body().cloned().unwrap_or(Value::Null);
                self.client.post(&url).json(&body)
            }
        };

        tracing::debug!(method = request.method().as_str(), %url, "sending Solr request");

        let response = builder
            .send()
            .await
            .map_err(|e| TransportFailure::message(format!("request to {} failed: {}", url, e)))?;

        let status = response.status();
        let text = response
            .text()
            .await
            .map_err(|e| TransportFailure::message(format!("reading response from {} failed: {}", url, e)))?;
        let body: Option<Value> = serde_json::from_str(&text).ok();

        tracing::debug!(status = status.as_u16(), %url, "Solr responded");

        if !status.is_success() {
            return Err(TransportFailure::http(status.as_u16(), body));
        }

        body.ok_or_else(|| {
            TransportFailure::message(format!(
                "Solr returned a non-JSON body from {} (HTTP {})",
                url,
                status.as_u16()
            ))
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use solr_adapter_core::hooks::DefaultTypes;
    use solr_adapter_core::request::RequestBuilder;
    use std::sync::Arc;

    #[test]
    fn test_url_joins_base_core_and_path() {
        let mut config = Config::minimal("http://localhost:8983/solr/");
        config.solr.default_core = Some("articles".into());
        let builder = RequestBuilder::new(config.build_options(), Arc::new(config.clone()));
        let transport = HttpTransport::from_config(&config).unwrap();

        let request = builder.find("article", json!("a1"));
        assert_eq!(
            transport.url_for(&request),
            "http://localhost:8983/solr/articles/select"
        );

        let bare = RequestBuilder::new(config.build_options(), Arc::new(DefaultTypes));
        let delete = bare.delete_record(
            "article",
            json!({"id": "a1", "_version_": 3}).as_object().cloned().unwrap(),
        );
        assert_eq!(
            transport.url_for(&delete),
            "http://localhost:8983/solr/update?_version_=3"
        );
    }
}
