//! Elasticsearch search backend over the REST API

use async_trait::async_trait;
use reqwest::{Client, RequestBuilder, StatusCode};
use serde_json::Value;
use std::time::Duration;
use tracing::debug;
use url::Url;

use qarag_core::document::ID_FIELD;
use qarag_core::{
    Connector, Document, Error, IndexSchema, MultiMatchQuery, Result, SearchBackend, SearchConfig,
    SearchHit, SearchResult,
};

/// Elasticsearch backend handle
pub struct ElasticsearchBackend {
    client: Client,
    base_url: Url,
    username: String,
    password: Option<String>,
}

impl ElasticsearchBackend {
    pub fn new(config: &SearchConfig, timeout: Duration) -> Result<Self> {
        let base_url = Url::parse(&config.url).map_err(|e| {
            Error::Configuration(format!("invalid search backend url '{}': {}", config.url, e))
        })?;

        let client = Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| Error::SearchBackend(e.to_string()))?;

        Ok(Self {
            client,
            base_url,
            username: config.username.clone(),
            password: config.password.clone(),
        })
    }

    fn endpoint(&self, segments: &[&str]) -> Result<Url> {
        let mut url = self.base_url.clone();
        url.path_segments_mut()
            .map_err(|_| Error::Configuration(format!("'{}' cannot be a base url", self.base_url)))?
            .pop_if_empty()
            .extend(segments);
        Ok(url)
    }

    fn authorized(&self, request: RequestBuilder) -> RequestBuilder {
        match self.password {
            Some(ref password) => request.basic_auth(&self.username, Some(password)),
            None => request,
        }
    }
}

#[async_trait]
impl SearchBackend for ElasticsearchBackend {
    fn name(&self) -> &str {
        "elasticsearch"
    }

    async fn ping(&self) -> Result<bool> {
        let response = self
            .authorized(self.client.head(self.base_url.clone()))
            .send()
            .await
            .map_err(|e| transport_error(e, Error::SearchBackend))?;

        Ok(response.status().is_success())
    }

    async fn index_exists(&self, index: &str) -> Result<bool> {
        let url = self.endpoint(&[index])?;
        let response = self
            .authorized(self.client.head(url))
            .send()
            .await
            .map_err(|e| transport_error(e, Error::SearchBackend))?;

        match response.status() {
            status if status.is_success() => Ok(true),
            StatusCode::NOT_FOUND => Ok(false),
            status => Err(Error::SearchBackend(format!(
                "index existence check for '{}' failed with status {}",
                index, status
            ))),
        }
    }

    async fn create_index(&self, index: &str, schema: &IndexSchema) -> Result<()> {
        let url = self.endpoint(&[index])?;
        let response = self
            .authorized(self.client.put(url))
            .json(&schema.to_index_body())
            .send()
            .await
            .map_err(|e| transport_error(e, Error::SearchBackend))?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            return Err(Error::SearchBackend(format!(
                "creating index '{}' failed with status {}: {}",
                index, status, body
            )));
        }

        Ok(())
    }

    async fn upsert(&self, index: &str, document: &Document) -> Result<()> {
        let url = self.endpoint(&[index, "_doc", &document.id])?;
        let response = self
            .authorized(self.client.put(url))
            .json(document)
            .send()
            .await
            .map_err(|e| transport_error(e, |msg| Error::indexing(&document.id, msg)))?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            return Err(Error::indexing(
                &document.id,
                format!("status {}: {}", status, body),
            ));
        }

        Ok(())
    }

    async fn search(&self, index: &str, query: &MultiMatchQuery) -> Result<SearchResult> {
        let url = self.endpoint(&[index, "_search"])?;
        let response = self
            .authorized(self.client.post(url))
            .json(&query.to_search_body())
            .send()
            .await
            .map_err(|e| transport_error(e, Error::Retrieval))?;

        let status = response.status();
        if status == StatusCode::NOT_FOUND {
            return Err(Error::Retrieval(format!("index '{}' does not exist", index)));
        }
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(Error::Retrieval(format!(
                "search on '{}' failed with status {}: {}",
                index, status, body
            )));
        }

        let body: Value = response
            .json()
            .await
            .map_err(|e| transport_error(e, Error::Retrieval))?;
        let result = parse_search_response(&body)?;
        debug!(index, hits = result.hits.len(), "elasticsearch search completed");
        Ok(result)
    }
}

/// Map a reqwest failure, keeping timeouts distinct from other causes
fn transport_error<F>(err: reqwest::Error, wrap: F) -> Error
where
    F: FnOnce(String) -> Error,
{
    if err.is_timeout() {
        Error::Timeout(err.to_string())
    } else {
        wrap(err.to_string())
    }
}

/// Extract scored documents from a `_search` response body, in response order.
///
/// The document id falls back to the hit's `_id` when the source has no key field.
pub fn parse_search_response(body: &Value) -> Result<SearchResult> {
    let hits = body["hits"]["hits"]
        .as_array()
        .ok_or_else(|| Error::Retrieval("search response has no hits array".to_string()))?;

    let mut result = SearchResult::default();
    for hit in hits {
        let mut source = hit["_source"].clone();
        let Some(fields) = source.as_object_mut() else {
            return Err(Error::Retrieval("search hit has no _source".to_string()));
        };
        if !fields.contains_key(ID_FIELD) {
            if let Some(id) = hit["_id"].as_str() {
                fields.insert(ID_FIELD.to_string(), Value::String(id.to_string()));
            }
        }

        let document: Document = serde_json::from_value(source)
            .map_err(|e| Error::Retrieval(format!("malformed search hit: {}", e)))?;
        let score = hit["_score"].as_f64().unwrap_or(0.0) as f32;

        result.hits.push(SearchHit { document, score });
    }

    Ok(result)
}

/// Opens Elasticsearch handles for the connection manager
pub struct ElasticsearchConnector {
    config: SearchConfig,
    timeout: Duration,
}

impl ElasticsearchConnector {
    pub fn new(config: SearchConfig, timeout: Duration) -> Self {
        Self { config, timeout }
    }
}

#[async_trait]
impl Connector for ElasticsearchConnector {
    type Backend = ElasticsearchBackend;

    async fn open(&self) -> Result<ElasticsearchBackend> {
        ElasticsearchBackend::new(&self.config, self.timeout)
    }

    fn describe(&self) -> String {
        self.config.url.clone()
    }
}
