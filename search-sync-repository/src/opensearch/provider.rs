//! OpenSearch engine implementation.
//!
//! Index-level calls (create, delete, refresh, aliases, bulk) go through the
//! typed OpenSearch API. Calls scoped to a document type are sent as raw
//! requests against `/{index}/{type}/...` paths.

use async_trait::async_trait;
use opensearch::{
    cat::CatIndicesParts,
    http::{
        headers::HeaderMap,
        request::JsonBody,
        response::Response,
        transport::{SingleNodeConnectionPool, TransportBuilder},
        Method,
    },
    indices::{IndicesCreateParts, IndicesDeleteParts, IndicesGetAliasParts, IndicesRefreshParts},
    BulkParts, OpenSearch,
};
use serde_json::{json, Value};
use tracing::{debug, info, warn};
use url::Url;

use search_sync_shared::{SearchHit, SearchRequest, SearchResponse};

use crate::config::SearchEngineConfig;
use crate::errors::SearchIndexError;
use crate::interfaces::SearchEngineClient;
use crate::types::{
    parse_matches, AliasAction, BatchOperationSummary, BulkOperation, IndexDocumentResponse,
};

/// OpenSearch engine client.
///
/// # Example
///
/// ```ignore
/// use search_sync_repository::{OpenSearchEngine, SearchEngineClient, SearchEngineConfig};
///
/// let engine = OpenSearchEngine::new(SearchEngineConfig::new("http://localhost:9200"))?;
/// engine.create_index("blog", None).await?;
/// engine
///     .index_document("blog", "posts", "1", &serde_json::json!({ "title": "foo" }), false)
///     .await?;
/// ```
pub struct OpenSearchEngine {
    client: OpenSearch,
    config: SearchEngineConfig,
}

impl OpenSearchEngine {
    /// Create a client for the engine at `config.url`.
    ///
    /// No request is made; use [`SearchEngineClient::health_check`] to verify
    /// the engine is reachable.
    pub fn new(config: SearchEngineConfig) -> Result<Self, SearchIndexError> {
        let parsed_url =
            Url::parse(&config.url).map_err(|e| SearchIndexError::connection(e.to_string()))?;

        let conn_pool = SingleNodeConnectionPool::new(parsed_url);
        let mut builder = TransportBuilder::new(conn_pool).disable_proxy();
        if let Some(timeout) = config.request_timeout {
            builder = builder.timeout(timeout);
        }
        let transport = builder
            .build()
            .map_err(|e| SearchIndexError::connection(e.to_string()))?;

        info!(url = %config.url, "Created OpenSearch engine client");

        Ok(Self {
            client: OpenSearch::new(transport),
            config,
        })
    }

    /// Build a request path from raw segments, percent-encoding each one.
    fn path(segments: &[&str]) -> Result<String, SearchIndexError> {
        if segments.iter().any(|s| s.is_empty()) {
            return Err(SearchIndexError::validation(format!(
                "Empty path segment in {:?}",
                segments
            )));
        }

        let mut url = Url::parse("http://engine/")
            .map_err(|e| SearchIndexError::validation(e.to_string()))?;
        url.path_segments_mut()
            .map_err(|_| SearchIndexError::validation("URL cannot hold a path"))?
            .clear()
            .extend(segments);
        Ok(url.path().to_string())
    }

    /// Send a raw JSON request and read its response.
    async fn send_json(
        &self,
        method: Method,
        path: &str,
        params: &[(&str, &str)],
        body: Option<Value>,
    ) -> Result<Value, SearchIndexError> {
        let query = if params.is_empty() {
            None
        } else {
            Some(params)
        };

        let response = self
            .client
            .send::<JsonBody<Value>, [(&str, &str)]>(
                method,
                path,
                HeaderMap::new(),
                query,
                body.map(JsonBody::new),
                None,
            )
            .await
            .map_err(|e| SearchIndexError::connection(e.to_string()))?;

        Self::read_response(response).await
    }

    /// Read a response body, turning error statuses and `error` fields into
    /// engine errors. An empty body reads as `null`.
    async fn read_response(response: Response) -> Result<Value, SearchIndexError> {
        let status = response.status_code();
        let text = response
            .text()
            .await
            .map_err(|e| SearchIndexError::parse(e.to_string()))?;

        let body = if text.trim().is_empty() {
            Value::Null
        } else {
            serde_json::from_str(&text).unwrap_or(Value::String(text))
        };

        if !status.is_success() || body.get("error").is_some() {
            return Err(SearchIndexError::from_response(status.as_u16(), &body));
        }
        Ok(body)
    }

    /// Parse hits and total count from a search response body.
    ///
    /// `hits.total` is either a number or an object with a `value` field.
    fn parse_search_response(body: &Value) -> Result<SearchResponse, SearchIndexError> {
        let hits = body
            .get("hits")
            .ok_or_else(|| SearchIndexError::parse("Search response has no hits"))?;

        let total = match hits.get("total") {
            Some(Value::Number(n)) => n.as_u64().unwrap_or(0),
            Some(Value::Object(obj)) => obj.get("value").and_then(Value::as_u64).unwrap_or(0),
            _ => 0,
        };

        let parsed: Vec<SearchHit> = match hits.get("hits") {
            Some(list) => serde_json::from_value(list.clone())
                .map_err(|e| SearchIndexError::parse(e.to_string()))?,
            None => Vec::new(),
        };

        let took_ms = body.get("took").and_then(Value::as_u64).unwrap_or(0);
        Ok(SearchResponse::new(parsed, total, took_ms))
    }
}

#[async_trait]
impl SearchEngineClient for OpenSearchEngine {
    async fn index_document(
        &self,
        index: &str,
        doc_type: &str,
        id: &str,
        document: &Value,
        percolate: bool,
    ) -> Result<IndexDocumentResponse, SearchIndexError> {
        let path = Self::path(&[index, doc_type, id])?;
        let params: &[(&str, &str)] = if percolate { &[("percolate", "*")] } else { &[] };

        let body = self
            .send_json(Method::Put, &path, params, Some(document.clone()))
            .await?;

        let response = IndexDocumentResponse::from_body(&body);
        debug!(
            index = %index,
            doc_type = %doc_type,
            id = %id,
            matches = response.matches.len(),
            "Document indexed"
        );
        Ok(response)
    }

    async fn delete_document(
        &self,
        index: &str,
        doc_type: &str,
        id: &str,
    ) -> Result<(), SearchIndexError> {
        let path = Self::path(&[index, doc_type, id])?;
        self.send_json(Method::Delete, &path, &[], None).await?;

        debug!(index = %index, doc_type = %doc_type, id = %id, "Document deleted");
        Ok(())
    }

    async fn search(
        &self,
        index: &str,
        doc_type: &str,
        request: &SearchRequest,
    ) -> Result<SearchResponse, SearchIndexError> {
        let path = Self::path(&[index, doc_type, "_search"])?;
        let sort_param = request.sort_param();
        let params: Vec<(&str, &str)> = sort_param.map(|s| vec![("sort", s)]).unwrap_or_default();

        debug!(index = %index, doc_type = %doc_type, request = %request, "Searching");
        let body = self
            .send_json(Method::Get, &path, &params, Some(request.to_body()))
            .await?;

        Self::parse_search_response(&body)
    }

    async fn percolate(
        &self,
        index: &str,
        doc_type: &str,
        document: &Value,
        filter: Option<&Value>,
    ) -> Result<Vec<String>, SearchIndexError> {
        let path = Self::path(&[index, doc_type, "_percolate"])?;
        let mut body = json!({ "doc": document });
        if let Some(filter) = filter {
            body["query"] = filter.clone();
        }

        let response = self.send_json(Method::Get, &path, &[], Some(body)).await?;
        Ok(parse_matches(&response))
    }

    async fn bulk(
        &self,
        index: &str,
        doc_type: &str,
        operations: &[BulkOperation],
    ) -> Result<BatchOperationSummary, SearchIndexError> {
        if operations.is_empty() {
            return Ok(BatchOperationSummary::empty());
        }
        if let Some(max) = self.config.max_batch_size {
            if operations.len() > max {
                return Err(SearchIndexError::batch_size_exceeded(operations.len(), max));
            }
        }

        let lines: Vec<JsonBody<Value>> = operations
            .iter()
            .flat_map(|op| op.to_lines(index, doc_type))
            .map(JsonBody::new)
            .collect();

        let response = self
            .client
            .bulk(BulkParts::Index(index))
            .body(lines)
            .send()
            .await
            .map_err(|e| SearchIndexError::bulk_index(e.to_string()))?;

        let body = Self::read_response(response).await?;
        let summary = BatchOperationSummary::from_bulk_response(&body);

        debug!(
            index = %index,
            doc_type = %doc_type,
            total = summary.total,
            failed = summary.failed,
            "Bulk request completed"
        );
        Ok(summary)
    }

    async fn create_index(
        &self,
        index: &str,
        body: Option<&Value>,
    ) -> Result<(), SearchIndexError> {
        let indices = self.client.indices();
        let request = indices.create(IndicesCreateParts::Index(index));
        let response = match body {
            Some(body) => request.body(body.clone()).send().await,
            None => request.send().await,
        }
        .map_err(|e| SearchIndexError::connection(e.to_string()))?;

        Self::read_response(response).await?;
        info!(index = %index, "Created index");
        Ok(())
    }

    async fn delete_index(&self, index: &str) -> Result<(), SearchIndexError> {
        let response = self
            .client
            .indices()
            .delete(IndicesDeleteParts::Index(&[index]))
            .send()
            .await
            .map_err(|e| SearchIndexError::connection(e.to_string()))?;

        Self::read_response(response).await?;
        info!(index = %index, "Deleted index");
        Ok(())
    }

    async fn refresh_index(&self, index: &str) -> Result<(), SearchIndexError> {
        let response = self
            .client
            .indices()
            .refresh(IndicesRefreshParts::Index(&[index]))
            .send()
            .await
            .map_err(|e| SearchIndexError::connection(e.to_string()))?;

        Self::read_response(response).await?;
        debug!(index = %index, "Refreshed index");
        Ok(())
    }

    async fn put_mapping(
        &self,
        index: &str,
        doc_type: &str,
        mapping: &Value,
    ) -> Result<(), SearchIndexError> {
        let path = Self::path(&[index, doc_type, "_mapping"])?;
        let mut body = serde_json::Map::new();
        body.insert(doc_type.to_string(), mapping.clone());

        self.send_json(Method::Put, &path, &[], Some(Value::Object(body)))
            .await?;
        info!(index = %index, doc_type = %doc_type, "Updated mapping");
        Ok(())
    }

    async fn delete_by_query(
        &self,
        index: &str,
        doc_type: &str,
        query: &Value,
    ) -> Result<u64, SearchIndexError> {
        let path = Self::path(&[index, doc_type, "_delete_by_query"])?;
        let body = self
            .send_json(Method::Post, &path, &[], Some(json!({ "query": query })))
            .await?;

        let deleted = body.get("deleted").and_then(Value::as_u64).unwrap_or(0);
        info!(index = %index, doc_type = %doc_type, deleted, "Deleted documents by query");
        Ok(deleted)
    }

    async fn update_aliases(&self, actions: &[AliasAction]) -> Result<(), SearchIndexError> {
        if actions.is_empty() {
            return Ok(());
        }

        let response = self
            .client
            .indices()
            .update_aliases()
            .body(json!({ "actions": actions }))
            .send()
            .await
            .map_err(|e| SearchIndexError::connection(e.to_string()))?;

        Self::read_response(response).await?;
        info!(actions = ?actions, "Updated aliases");
        Ok(())
    }

    async fn indices_for_alias(&self, alias: &str) -> Result<Vec<String>, SearchIndexError> {
        let response = self
            .client
            .indices()
            .get_alias(IndicesGetAliasParts::Name(&[alias]))
            .send()
            .await
            .map_err(|e| SearchIndexError::connection(e.to_string()))?;

        match Self::read_response(response).await {
            Ok(Value::Object(indices)) => Ok(indices.keys().cloned().collect()),
            Ok(_) => Ok(Vec::new()),
            Err(e) if e.is_not_found() => {
                debug!(alias = %alias, "Alias does not exist");
                Ok(Vec::new())
            }
            Err(e) => Err(e),
        }
    }

    async fn list_indices(&self, pattern: &str) -> Result<Vec<String>, SearchIndexError> {
        let response = self
            .client
            .cat()
            .indices(CatIndicesParts::Index(&[pattern]))
            .format("json")
            .send()
            .await
            .map_err(|e| SearchIndexError::connection(e.to_string()))?;

        let body = match Self::read_response(response).await {
            Ok(body) => body,
            Err(e) if e.is_not_found() => return Ok(Vec::new()),
            Err(e) => return Err(e),
        };

        Ok(body
            .as_array()
            .map(|rows| {
                rows.iter()
                    .filter_map(|row| row.get("index").and_then(Value::as_str))
                    .map(String::from)
                    .collect()
            })
            .unwrap_or_default())
    }

    async fn health_check(&self) -> Result<bool, SearchIndexError> {
        let response = self
            .client
            .ping()
            .send()
            .await
            .map_err(|e| SearchIndexError::connection(e.to_string()))?;

        let healthy = response.status_code().is_success();
        if !healthy {
            warn!(status = %response.status_code(), "Engine ping failed");
        }
        Ok(healthy)
    }
}
